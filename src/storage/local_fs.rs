use super::*;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

// Object ids are v5 uuids of the key, so arbitrary keys (`..`, leading `/`,
// very long names) never turn into paths outside the storage root.
const KEY_NAMESPACE: Uuid = Uuid::from_u128(0x6f8d_3c1e_92a4_4b7f_a0e5_1d2c_3b4a_5f60);

#[derive(Debug, Serialize, Deserialize)]
struct ObjectMeta {
    key: String,
}

/// Flat directory of `<id>` payload files with `<id>.meta` sidecars holding
/// the original key.
pub struct LocalFileStorage {
    storage_path: PathBuf,
}

impl LocalFileStorage {
    pub fn new(storage_path: PathBuf) -> Result<Self, StorageError> {
        if !storage_path.exists() {
            std::fs::create_dir_all(&storage_path)?;
        }
        Ok(Self { storage_path })
    }

    fn object_paths(&self, key: &str) -> (PathBuf, PathBuf) {
        let id = Uuid::new_v5(&KEY_NAMESPACE, key.as_bytes()).simple().to_string();
        let data = self.storage_path.join(&id);
        let meta = self.storage_path.join(format!("{id}.meta"));
        (data, meta)
    }

    fn temp_path(&self) -> PathBuf {
        self.storage_path.join(format!("{}.tmp", Uuid::new_v4()))
    }

    async fn write_meta(&self, meta_path: &Path, key: &str) -> Result<(), StorageError> {
        let meta = serde_json::to_vec(&ObjectMeta {
            key: key.to_string(),
        })?;
        let tmp = self.temp_path();
        fs::write(&tmp, meta).await?;
        if let Err(err) = fs::rename(&tmp, meta_path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn read_meta(&self, meta_path: &Path) -> Result<Option<ObjectMeta>, StorageError> {
        match fs::read(meta_path).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl Storage for LocalFileStorage {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        let (data_path, meta_path) = self.object_paths(key);

        match self.read_meta(&meta_path).await? {
            Some(meta) if meta.key == key => {}
            _ => return Ok(None),
        }

        match fs::read(&data_path).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        let (data_path, meta_path) = self.object_paths(key);
        self.write_meta(&meta_path, key).await?;

        let tmp = self.temp_path();
        fs::write(&tmp, &bytes).await?;
        if let Err(err) = fs::rename(&tmp, &data_path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, bytes: Bytes) -> Result<PutOutcome, StorageError> {
        let (data_path, meta_path) = self.object_paths(key);
        if fs::try_exists(&data_path).await? {
            return Ok(PutOutcome::AlreadyExists);
        }

        // The sidecar is identical for every writer of this key, so it can be
        // replaced freely. The payload hard link is the commit point.
        self.write_meta(&meta_path, key).await?;

        let tmp = self.temp_path();
        fs::write(&tmp, &bytes).await?;
        let linked = fs::hard_link(&tmp, &data_path).await;
        let _ = fs::remove_file(&tmp).await;

        match linked {
            Ok(()) => Ok(PutOutcome::Created),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(PutOutcome::AlreadyExists),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn storage() -> (tempfile::TempDir, LocalFileStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().join("objects")).unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn keys_are_opaque() {
        let (dir, storage) = storage();
        let keys = ["docs/report.pdf", "../../etc/passwd.", "/leading/slash.txt", "a/b/c/d."];

        for (i, key) in keys.iter().enumerate() {
            storage.put(key, Bytes::from(vec![i as u8; 4])).await.unwrap();
        }
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(
                storage.get(key).await.unwrap(),
                Some(Bytes::from(vec![i as u8; 4]))
            );
        }
        let outside: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(outside, vec![std::ffi::OsString::from("objects")]);
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let (_dir, storage) = storage();
        assert!(storage.get("docs/none.txt").await.unwrap().is_none());
        assert!(!storage.exists("docs/none.txt").await.unwrap());
    }

    #[tokio::test]
    async fn put_if_absent_does_not_overwrite() {
        let (_dir, storage) = storage();
        let first = storage
            .put_if_absent("docs/report.pdf", Bytes::from_static(b"first"))
            .await
            .unwrap();
        let second = storage
            .put_if_absent("docs/report.pdf", Bytes::from_static(b"second"))
            .await
            .unwrap();

        assert_eq!(first, PutOutcome::Created);
        assert_eq!(second, PutOutcome::AlreadyExists);
        assert_eq!(
            storage.get("docs/report.pdf").await.unwrap(),
            Some(Bytes::from_static(b"first"))
        );
    }

    #[tokio::test]
    async fn concurrent_creates_have_one_winner() {
        let (_dir, storage) = storage();
        let storage = Arc::new(storage);
        let mut handles = Vec::new();
        for i in 0..8u8 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage
                    .put_if_absent("race/key.bin", Bytes::from(vec![i; 64]))
                    .await
                    .unwrap()
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() == PutOutcome::Created {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn leaves_no_temp_files_behind() {
        let (_dir, storage) = storage();
        storage
            .put_if_absent("x/y.z", Bytes::from_static(b"data"))
            .await
            .unwrap();
        storage
            .put_if_absent("x/y.z", Bytes::from_static(b"data"))
            .await
            .unwrap();

        let mut entries = fs::read_dir(&storage.storage_path).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name();
            assert!(!name.to_string_lossy().ends_with(".tmp"), "stray {name:?}");
        }
    }
}
