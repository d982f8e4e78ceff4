//! Object storage abstraction for document artifacts

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;

#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    /// Store bytes under a path, returning the stored path
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String>;

    async fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Remove a set of objects. Objects that no longer exist count as
    /// removed, so a retried deletion converges.
    async fn delete(&self, paths: &[String]) -> Result<()>;

    /// Produce a time-limited URL for direct download
    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String>;
}

/// Filesystem-backed storage rooted at a local directory
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        // Storage keys are produced internally, but reject traversal anyway
        if Path::new(path)
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)))
        {
            bail!("invalid storage path: {}", path);
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl ObjectStorage for FsStorage {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .with_context(|| format!("failed to write {}", target.display()))?;
        Ok(path.to_string())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let target = self.resolve(path)?;
        tokio::fs::read(&target)
            .await
            .with_context(|| format!("failed to read {}", target.display()))
    }

    async fn delete(&self, paths: &[String]) -> Result<()> {
        for path in paths {
            let target = self.resolve(path)?;
            match tokio::fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("failed to delete {}", target.display()))
                }
            }
        }
        Ok(())
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String> {
        let target = self.resolve(path)?;
        let expires = Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);
        Ok(format!(
            "file://{}?expires={}",
            target.display(),
            expires.timestamp()
        ))
    }
}

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::Mutex;

/// In-memory storage with failure injection, used by tests
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_puts: Mutex<u32>,
    fail_deletes: Mutex<u32>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` put calls fail
    pub fn fail_next_puts(&self, n: u32) {
        *self.fail_puts.lock().unwrap() = n;
    }

    /// Make the next `n` delete calls fail
    pub fn fail_next_deletes(&self, n: u32) {
        *self.fail_deletes.lock().unwrap() = n;
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    fn take_failure(counter: &Mutex<u32>) -> bool {
        let mut remaining = counter.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        if Self::take_failure(&self.fail_puts) {
            bail!("injected put failure for {}", path);
        }
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes);
        Ok(path.to_string())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .with_context(|| format!("object not found: {}", path))
    }

    async fn delete(&self, paths: &[String]) -> Result<()> {
        if Self::take_failure(&self.fail_deletes) {
            bail!("injected delete failure");
        }
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String> {
        if !self.contains(path) {
            bail!("object not found: {}", path);
        }
        Ok(format!("memory://{}?ttl={}", path, ttl.as_secs()))
    }
}
