use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use anyhow::{bail, Result};
use tokio::sync::Mutex;

use crate::{
    db::{Blob, Database},
    log_debug,
};

const ENABLE_LOGS: bool = false;

#[derive(Default)]
struct CacheEntries {
    blobs: HashMap<String, Arc<Blob>>,
    missing: HashSet<String>,
    torn_down: bool,
}

/// Screenshot blobs for one viewer session, cached by id.
///
/// Misses are remembered too, so a capture whose screenshot was never stored
/// costs one lookup. Storage errors are returned and not cached. After
/// [`BlobCache::teardown`] every lookup fails.
#[derive(Clone)]
pub struct BlobCache {
    db: Database,
    entries: Arc<Mutex<CacheEntries>>,
}

impl BlobCache {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            entries: Arc::new(Mutex::new(CacheEntries::default())),
        }
    }

    pub async fn get(&self, blob_id: &str) -> Result<Option<Arc<Blob>>> {
        {
            let entries = self.entries.lock().await;
            if entries.torn_down {
                bail!("blob cache has been torn down");
            }
            if let Some(blob) = entries.blobs.get(blob_id) {
                log_debug!("blob cache hit for {}", blob_id);
                return Ok(Some(blob.clone()));
            }
            if entries.missing.contains(blob_id) {
                return Ok(None);
            }
        }

        let fetched = self.db.get_blob(blob_id).await?;

        let mut entries = self.entries.lock().await;
        if entries.torn_down {
            bail!("blob cache has been torn down");
        }
        match fetched {
            Some(blob) => {
                let blob = Arc::new(blob);
                entries.blobs.insert(blob_id.to_string(), blob.clone());
                Ok(Some(blob))
            }
            None => {
                log_debug!("no blob stored for {}", blob_id);
                entries.missing.insert(blob_id.to_string());
                Ok(None)
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.blobs.len()
    }

    /// Drop every cached blob and refuse further lookups.
    pub async fn teardown(&self) {
        let mut entries = self.entries.lock().await;
        entries.blobs.clear();
        entries.missing.clear();
        entries.torn_down = true;
    }
}
