use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Durable home of the persist-intent flag: "the user previously asked to
/// stay connected". Nothing else about the session is persisted; account
/// and chain are always re-derived from the live provider.
#[async_trait]
pub trait IntentStore: Send + Sync {
    async fn load_intent(&self) -> Result<bool>;
    async fn store_intent(&self, intent: bool) -> Result<()>;
}

#[derive(Default)]
pub struct NoopIntentStore;

#[async_trait]
impl IntentStore for NoopIntentStore {
    async fn load_intent(&self) -> Result<bool> {
        Ok(false)
    }

    async fn store_intent(&self, _intent: bool) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryIntentStore {
    intent: AtomicBool,
}

#[async_trait]
impl IntentStore for InMemoryIntentStore {
    async fn load_intent(&self) -> Result<bool> {
        Ok(self.intent.load(Ordering::SeqCst))
    }

    async fn store_intent(&self, intent: bool) -> Result<()> {
        self.intent.store(intent, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    persist_intent: bool,
}

/// Single JSON record on disk, the native equivalent of the browser-local
/// storage slot. A missing file reads as "no intent".
pub struct FileIntentStore {
    path: PathBuf,
}

impl FileIntentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl IntentStore for FileIntentStore {
    async fn load_intent(&self) -> Result<bool> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => {
                let record: SessionRecord = serde_json::from_slice(&raw)
                    .with_context(|| format!("corrupt session record at {}", self.path.display()))?;
                Ok(record.persist_intent)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).with_context(|| {
                format!("failed to read session record at {}", self.path.display())
            }),
        }
    }

    async fn store_intent(&self, intent: bool) -> Result<()> {
        let record = SessionRecord {
            persist_intent: intent,
        };
        let raw = serde_json::to_vec(&record)?;
        tokio::fs::write(&self.path, raw).await.with_context(|| {
            format!("failed to write session record at {}", self.path.display())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    fn scratch_path(tag: &str) -> PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let unique = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "tc-storage-{tag}-{}-{unique}.json",
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn in_memory_roundtrip() -> Result<()> {
        let store = InMemoryIntentStore::default();
        assert!(!store.load_intent().await?);
        store.store_intent(true).await?;
        assert!(store.load_intent().await?);
        store.store_intent(false).await?;
        assert!(!store.load_intent().await?);
        Ok(())
    }

    #[tokio::test]
    async fn file_store_survives_reopen() -> Result<()> {
        let path = scratch_path("reopen");
        let store = FileIntentStore::new(&path);
        assert!(!store.load_intent().await?, "missing file reads as false");

        store.store_intent(true).await?;
        drop(store);

        let reopened = FileIntentStore::new(&path);
        assert!(reopened.load_intent().await?);

        reopened.store_intent(false).await?;
        assert!(!reopened.load_intent().await?);

        tokio::fs::remove_file(&path).await.ok();
        Ok(())
    }

    #[tokio::test]
    async fn file_store_rejects_corrupt_record() -> Result<()> {
        let path = scratch_path("corrupt");
        tokio::fs::write(&path, b"not json").await?;
        let store = FileIntentStore::new(&path);
        assert!(store.load_intent().await.is_err());
        tokio::fs::remove_file(&path).await.ok();
        Ok(())
    }
}
