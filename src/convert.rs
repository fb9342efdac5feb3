use std::path::{Path, PathBuf};

use crate::codec::{Format, RecordCodec};
use crate::error::{Error, Result};
use crate::{ConvertOptions, ini};

/// Walks an IG source tree and mirrors it under the output root, converting
/// every recognized resource file to the opposite encoding.
///
/// One failed entry never stops the run: conversion failures fall back to a
/// verbatim copy and I/O failures skip the entry, both with a message on
/// stderr.
pub struct TreeConverter<'a> {
    codec: &'a RecordCodec,
    options: ConvertOptions,
}

impl<'a> TreeConverter<'a> {
    pub fn new(codec: &'a RecordCodec, options: ConvertOptions) -> TreeConverter<'a> {
        TreeConverter { codec, options }
    }

    pub fn run(&self, input_root: &Path, output_root: &Path) -> Result<()> {
        if !input_root.is_dir() {
            return Err(Error::Input(format!(
                "input folder {} does not exist or is not a directory",
                input_root.display()
            )));
        }
        std::fs::create_dir_all(output_root)?;
        self.process_folder(input_root, output_root, true)
    }

    fn process_folder(&self, input_dir: &Path, output_dir: &Path, at_root: bool) -> Result<()> {
        for entry in std::fs::read_dir(input_dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    eprintln!("Skipping unreadable entry in {}: {}", input_dir.display(), e);
                    continue;
                }
            };
            if let Err(e) = self.process_entry(&entry.path(), output_dir, at_root) {
                eprintln!("Skipping {}: {}", entry.path().display(), e);
            }
        }
        Ok(())
    }

    fn process_entry(&self, path: &Path, output_dir: &Path, at_root: bool) -> Result<()> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Input(format!("{} has no usable file name", path.display())))?;
        println!("Processing {}", path.display());

        if path.is_dir() {
            if at_root && !self.options.top_level.allows(name) {
                println!("Ignoring folder {name}");
                return Ok(());
            }
            let subdirectory = output_dir.join(name);
            std::fs::create_dir_all(&subdirectory)?;
            return self.process_folder(path, &subdirectory, false);
        }

        if name == self.options.config_file {
            ini::patch_config(
                path,
                output_dir,
                &self.options.config_key,
                self.options.target_format,
            )?;
            return Ok(());
        }

        let source = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Format::from_extension);
        match source {
            Some(source) => {
                if let Err(e) = self.convert_file(path, output_dir, source, source.opposite()) {
                    eprintln!("Copying {} unchanged: {}", path.display(), e);
                    copy_verbatim(path, output_dir, name)?;
                }
            }
            None => copy_verbatim(path, output_dir, name)?,
        }
        Ok(())
    }

    /// Re-encode one resource file. Returns the written path, or the
    /// decode/encode/io error for the caller to downgrade to a copy.
    pub fn convert_file(
        &self,
        input: &Path,
        output_dir: &Path,
        source: Format,
        target: Format,
    ) -> Result<PathBuf> {
        let bytes = std::fs::read(input)?;
        let record = self.codec.decode(&bytes, source)?;

        let file_stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::Input(format!("{} has no usable file stem", input.display())))?;
        let destination = output_dir.join(format!("{}.{}", file_stem, target.extension()));

        let encoded = self.codec.encode(&record, target)?;
        std::fs::write(&destination, encoded)?;
        Ok(destination)
    }
}

fn copy_verbatim(input: &Path, output_dir: &Path, name: &str) -> Result<()> {
    std::fs::copy(input, output_dir.join(name))?;
    Ok(())
}
