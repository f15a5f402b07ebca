use std::{io, path::PathBuf};

use actix_web::web;
use async_trait::async_trait;
use uuid::Uuid;

/// Keeps photo evidence outside the database. The ledger only stores the
/// returned reference; the payload is never interpreted.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    async fn store(&self, payload: &str) -> io::Result<String>;

    /// Deletes a payload by the reference `store` returned.
    async fn remove(&self, reference: &str) -> io::Result<()>;
}

const REFERENCE_PREFIX: &str = "uploads/";

/// Writes each payload to its own file under the upload directory.
pub struct LocalEvidenceStore {
    dir: PathBuf,
}

impl LocalEvidenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl EvidenceStore for LocalEvidenceStore {
    async fn store(&self, payload: &str) -> io::Result<String> {
        // Generated names only; nothing from the request reaches the path.
        let name = format!("evidence-{}", Uuid::new_v4().to_simple());
        let dir = self.dir.clone();
        let bytes = payload.as_bytes().to_vec();
        let file_name = name.clone();

        web::block(move || {
            std::fs::create_dir_all(&dir)?;
            std::fs::write(dir.join(file_name), bytes)
        })
        .await
        .map_err(io::Error::other)??;

        Ok(format!("{REFERENCE_PREFIX}{name}"))
    }

    async fn remove(&self, reference: &str) -> io::Result<()> {
        let name = reference
            .strip_prefix(REFERENCE_PREFIX)
            .filter(|n| n.starts_with("evidence-") && !n.contains(['/', '\\']) && !n.contains(".."))
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, format!("not an evidence reference: {reference}"))
            })?
            .to_string();
        let path = self.dir.join(name);

        web::block(move || std::fs::remove_file(path))
            .await
            .map_err(io::Error::other)?
    }
}

#[cfg(test)]
pub struct MemoryEvidenceStore {
    stored: std::sync::Mutex<Vec<(String, String)>>,
    next: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MemoryEvidenceStore {
    pub fn new() -> Self {
        Self {
            stored: std::sync::Mutex::new(Vec::new()),
            next: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl EvidenceStore for MemoryEvidenceStore {
    async fn store(&self, payload: &str) -> io::Result<String> {
        let n = self.next.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        let reference = format!("mem://{n}");
        self.stored
            .lock()
            .unwrap()
            .push((reference.clone(), payload.to_string()));
        Ok(reference)
    }

    async fn remove(&self, reference: &str) -> io::Result<()> {
        let mut stored = self.stored.lock().unwrap();
        let before = stored.len();
        stored.retain(|(r, _)| r != reference);
        if stored.len() == before {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn local_store_writes_payload_under_generated_name() {
        let dir = std::env::temp_dir().join(format!("absensi-evidence-{}", Uuid::new_v4()));
        let store = LocalEvidenceStore::new(&dir);

        let reference = store.store("photo-bytes").await.unwrap();

        let name = reference.strip_prefix("uploads/").unwrap();
        assert!(name.starts_with("evidence-"));
        assert_eq!(std::fs::read_to_string(dir.join(name)).unwrap(), "photo-bytes");

        store.remove(&reference).await.unwrap();
        assert!(!dir.join(name).exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[actix_web::test]
    async fn local_store_refuses_foreign_references() {
        let store = LocalEvidenceStore::new(std::env::temp_dir());
        for reference in ["uploads/../secret", "uploads/app.log", "/etc/passwd"] {
            let err = store.remove(reference).await.unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "{reference}");
        }
    }
}
