use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::error::StorageError;
use super::record::SampleRecord;

/// Directory of sample files: `<id>.yaml` records and `<id>.jpg` photos.
///
/// Every file is created with `create_new`, so a sample can never overwrite
/// an earlier one.
#[derive(Debug, Clone)]
pub struct SampleStore {
    dir: PathBuf,
}

impl SampleStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the photo and returns its file name, relative to the store.
    pub fn write_photo(&self, id: &str, jpeg: &[u8]) -> Result<String, StorageError> {
        let name = format!("{}.jpg", id);
        self.write_new(&name, id, jpeg)?;
        Ok(name)
    }

    pub fn persist(&self, record: &SampleRecord) -> Result<PathBuf, StorageError> {
        let yaml = serde_yaml::to_string(record)?;
        let name = format!("{}.yaml", record.id);
        self.write_new(&name, &record.id, yaml.as_bytes())?;
        log::debug!("Persisted sample {} to {}", record.id, self.dir.display());
        Ok(self.dir.join(name))
    }

    pub fn load(&self, id: &str) -> Result<SampleRecord, StorageError> {
        let path = self.dir.join(format!("{}.yaml", id));
        let contents = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(id.to_string()),
            _ => StorageError::Io(e),
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// All records in the store, ordered by id.
    pub fn records(&self) -> Result<Vec<SampleRecord>, StorageError> {
        let mut ids: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                match path.extension().and_then(|e| e.to_str()) {
                    Some("yaml") => path.file_stem()?.to_str().map(String::from),
                    _ => None,
                }
            })
            .filter(|stem| stem != crate::scan::LOG_STEM)
            .collect();
        ids.sort();
        ids.iter().map(|id| self.load(id)).collect()
    }

    fn write_new(&self, name: &str, id: &str, contents: &[u8]) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.dir.join(name))
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::Duplicate(id.to_string()),
                _ => StorageError::Io(e),
            })?;
        file.write_all(contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::AntennaReading;
    use crate::peripheral::AntennaState;
    use chrono::Utc;

    fn record(id: &str) -> SampleRecord {
        SampleRecord {
            id: id.to_string(),
            captured_at: Utc::now(),
            position: None,
            photo: None,
            readings: vec![AntennaReading {
                antenna: AntennaState::new(1).unwrap(),
                power: -43.25,
            }],
        }
    }

    #[test]
    fn records_are_write_once() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SampleStore::open(tmp.path().join("samples")).unwrap();

        store.persist(&record("a")).unwrap();
        assert!(matches!(
            store.persist(&record("a")),
            Err(StorageError::Duplicate(id)) if id == "a"
        ));
        assert_eq!(store.load("a").unwrap().readings[0].power, -43.25);
    }

    #[test]
    fn photos_are_write_once() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SampleStore::open(tmp.path()).unwrap();

        assert_eq!(store.write_photo("a", &[0xFF, 0xD8]).unwrap(), "a.jpg");
        assert!(store.write_photo("a", &[0x00]).is_err());
        assert_eq!(fs::read(tmp.path().join("a.jpg")).unwrap(), vec![0xFF, 0xD8]);
    }

    #[test]
    fn lists_records_in_id_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SampleStore::open(tmp.path()).unwrap();
        for id in ["b", "c", "a"] {
            store.persist(&record(id)).unwrap();
        }
        store.write_photo("a", &[0xFF]).unwrap();

        let ids: Vec<String> = store.records().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(matches!(store.load("zz"), Err(StorageError::NotFound(_))));
    }
}
