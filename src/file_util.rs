use anyhow::{bail, Context};
use std::path::{Path, PathBuf};

/// Collect the `*.<ext>` files in `dir`, lexicographically sorted. The
/// extension match is case-sensitive and unvalidated, as the flag
/// documents.
pub fn scan_images(dir: &Path, ext: &str) -> anyhow::Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.{ext}", dir.display());
    let entries =
        glob::glob(&pattern).with_context(|| format!("invalid image pattern {pattern}"))?;
    let mut files: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
    files.sort();
    if files.is_empty() {
        bail!("no *.{ext} images found in {}", dir.display());
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("polymark-scan-tests").join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn scan_sorts_and_filters_by_extension() {
        let dir = scratch_dir("sorted");
        for name in ["b.png", "a.png", "c.jpg", "notes.txt"] {
            fs::write(dir.join(name), b"").unwrap();
        }
        let files = scan_images(&dir, "png").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.png", "b.png"]);
    }

    #[test]
    fn scan_without_matches_errors() {
        let dir = scratch_dir("empty");
        assert!(scan_images(&dir, "png").is_err());
    }
}
