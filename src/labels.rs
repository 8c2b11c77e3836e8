//! Per-image label records: one JSON file per image, mapping polygon ids
//! to their point lists.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One polygon vertex in image pixels. Serializes as a `[x, y]` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point(pub i32, pub i32);

/// All polygons of one image, keyed by id. Serializes to a JSON object
/// with string-encoded integer keys and `[x, y]` pairs in draw order.
pub type PolygonMap = BTreeMap<u32, Vec<Point>>;

/// `<label_dir>/<image basename without extension>.json`
pub fn label_path(label_dir: &Path, image_path: &Path) -> PathBuf {
    let stem = image_path.file_stem().unwrap_or_default().to_string_lossy();
    label_dir.join(format!("{stem}.json"))
}

pub fn save(path: &Path, polygons: &PolygonMap) -> anyhow::Result<()> {
    let data = serde_json::to_string_pretty(polygons)
        .with_context(|| format!("serializing labels for {}", path.display()))?;
    fs::write(path, data).with_context(|| format!("writing labels to {}", path.display()))?;
    Ok(())
}

/// `Ok(None)` when no record exists; malformed JSON is an error.
pub fn load(path: &Path) -> anyhow::Result<Option<PolygonMap>> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("reading labels from {}", path.display()))
        }
    };
    let polygons = serde_json::from_str(&data)
        .with_context(|| format!("parsing labels in {}", path.display()))?;
    Ok(Some(polygons))
}

/// Returns whether a record was actually removed.
pub fn delete(path: &Path) -> anyhow::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("deleting labels at {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("polymark-label-tests").join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn label_path_is_basename_with_json_extension() {
        let path = label_path(Path::new("/labels"), Path::new("/images/img001.png"));
        assert_eq!(path, Path::new("/labels/img001.json"));
    }

    #[test]
    fn label_path_keeps_dotted_stems() {
        let path = label_path(Path::new("/labels"), Path::new("/images/frame.0001.png"));
        assert_eq!(path, Path::new("/labels/frame.0001.json"));
    }

    #[test]
    fn save_load_round_trip() {
        let dir = scratch_dir("round-trip");
        let path = dir.join("img.json");
        let mut polygons = PolygonMap::new();
        polygons.insert(1, vec![Point(10, 10), Point(20, 10), Point(20, 20)]);
        polygons.insert(2, vec![]);
        save(&path, &polygons).unwrap();
        assert_eq!(load(&path).unwrap(), Some(polygons));
    }

    #[test]
    fn keys_are_string_encoded_integers() {
        let dir = scratch_dir("keys");
        let path = dir.join("img.json");
        let mut polygons = PolygonMap::new();
        polygons.insert(1, vec![Point(3, 4)]);
        save(&path, &polygons).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"1": [[3, 4]]}));
    }

    #[test]
    fn load_missing_record_is_none() {
        let dir = scratch_dir("missing");
        assert_eq!(load(&dir.join("nope.json")).unwrap(), None);
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = scratch_dir("malformed");
        let path = dir.join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn delete_reports_absence() {
        let dir = scratch_dir("delete");
        let path = dir.join("img.json");
        assert!(!delete(&path).unwrap());
        fs::write(&path, "{}").unwrap();
        assert!(delete(&path).unwrap());
        assert!(!path.exists());
    }
}
