//! JSON file helpers shared by the cache, the registry and the city lists.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};

/// Read and parse a JSON document. `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path, e)),
    };
    serde_json::from_str(&data)
        .map(Some)
        .map_err(|e| Error::json(path, e))
}

/// Pretty-print `value` to `path`, creating parent directories.
///
/// Writes a sibling `.tmp` file first and renames it into place, so readers
/// never observe a half-written document.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::json(path, e))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);
    fs::write(tmp, json).map_err(|e| Error::io(tmp, e))?;
    fs::rename(tmp, path).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let got: Option<BTreeMap<String, u64>> = read_json(&dir.path().join("nope.json")).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn test_write_creates_dirs_and_leaves_no_tmp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cities.json");
        let mut map = BTreeMap::new();
        map.insert("Durham".to_string(), 291_928u64);

        write_json(&path, &map).unwrap();

        let back: BTreeMap<String, u64> = read_json(&path).unwrap().unwrap();
        assert_eq!(back, map);
        assert!(!dir.path().join("nested").join("cities.json.tmp").exists());
    }

    #[test]
    fn test_malformed_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let got: Result<Option<BTreeMap<String, u64>>> = read_json(&path);
        assert!(matches!(got, Err(Error::Json { .. })));
    }
}
