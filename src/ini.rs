use std::path::{Path, PathBuf};

use crate::codec::Format;
use crate::error::{Error, Result};

/// Rewrite the IG config file so its resource reference matches the target
/// encoding's extension.
///
/// Lines whose trimmed content starts with `key` and that carry a `key = value`
/// pair are replaced by `<key> = input/<basename>.<target extension>`; every
/// other line passes through unchanged. The whole output is buffered and
/// written in one call so a failed write never leaves a partial file behind.
pub fn patch_config(input: &Path, output_dir: &Path, key: &str, target: Format) -> Result<PathBuf> {
    let file_name = input
        .file_name()
        .ok_or_else(|| Error::Input(format!("config path {} has no file name", input.display())))?;
    let content = std::fs::read_to_string(input)?;

    let mut patched = String::with_capacity(content.len());
    for line in content.lines() {
        match rewrite_line(line, key, target) {
            Some(replacement) => patched.push_str(&replacement),
            None => patched.push_str(line),
        }
        patched.push('\n');
    }

    let destination = output_dir.join(file_name);
    std::fs::write(&destination, patched)?;
    Ok(destination)
}

fn rewrite_line(line: &str, key: &str, target: Format) -> Option<String> {
    if !line.trim_start().starts_with(key) {
        return None;
    }
    let (_, value) = line.split_once('=')?;
    let base_name = Path::new(value.trim_start())
        .file_stem()
        .and_then(|s| s.to_str())?;
    Some(format!("{key} = input/{base_name}.{}", target.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ig_line_is_rewritten_to_target_extension() {
        assert_eq!(
            rewrite_line("ig = myIG.xml", "ig", Format::Json),
            Some(String::from("ig = input/myIG.json"))
        );
        assert_eq!(
            rewrite_line("ig=input/myIG.json", "ig", Format::Xml),
            Some(String::from("ig = input/myIG.xml"))
        );
    }

    #[test]
    fn other_lines_pass_through() {
        assert_eq!(rewrite_line("template = default", "ig", Format::Json), None);
        assert_eq!(rewrite_line("", "ig", Format::Json), None);
        assert_eq!(rewrite_line("[IG]", "ig", Format::Json), None);
    }

    #[test]
    fn key_line_without_assignment_passes_through() {
        assert_eq!(rewrite_line("ig resource follows", "ig", Format::Json), None);
    }

    #[test]
    fn whole_file_patch_preserves_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("ig.ini");
        std::fs::write(&source, "[IG]\nig = myIG.xml\ntemplate = default\n")?;

        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir)?;
        let written = patch_config(&source, &out_dir, "ig", Format::Json)?;

        let patched = std::fs::read_to_string(written)?;
        assert_eq!(patched, "[IG]\nig = input/myIG.json\ntemplate = default\n");
        Ok(())
    }
}
