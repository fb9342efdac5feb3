use std::path::PathBuf;

use clap::Parser;

use igconv::{
    ConvertOptions, DEFAULT_SKIP_DIRS, Format, RecordCodec, TopLevelFilter, TreeConverter,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input folder holding the IG source tree
    #[arg(short = 'i', long)]
    in_folder: PathBuf,
    /// Output folder for the converted tree (created if absent)
    #[arg(short = 'o', long)]
    out_folder: PathBuf,
    /// Target format for the ig.ini rewrite (json or xml)
    #[arg(short = 'f', long)]
    format: Format,
    /// Top-level folders to leave out of the run entirely
    #[arg(long, num_args = 1.., conflicts_with = "only",
          default_values_t = DEFAULT_SKIP_DIRS.map(String::from))]
    skip: Vec<String>,
    /// Process only these top-level folders, skipping all others
    #[arg(long, num_args = 1.., conflicts_with = "skip")]
    only: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    println!("Output format: {}", cli.format);

    let top_level = if cli.only.is_empty() {
        TopLevelFilter::Deny(cli.skip.into_iter().collect())
    } else {
        TopLevelFilter::Allow(cli.only.into_iter().collect())
    };
    let options = ConvertOptions {
        top_level,
        ..ConvertOptions::new(cli.format)
    };

    let codec = RecordCodec::new();
    let converter = TreeConverter::new(&codec, options);
    converter.run(&cli.in_folder, &cli.out_folder)?;

    Ok(())
}
