use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use serde::Serialize;

use crate::{
    db::Database,
    engine::GroupingMode,
    log_info, log_warn,
    settings::{ExportSettings, DEFAULT_EXPORT_BATCH_SIZE},
};

use super::{
    bundle::{ExportBundle, ExportedCapture},
    csv::to_csv,
};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => bail!("unknown export format '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Stamp derived grouping fields computed under this mode.
    pub derive_with: Option<GroupingMode>,
    pub batch_size: usize,
}

impl ExportOptions {
    pub fn from_settings(format: ExportFormat, settings: &ExportSettings, mode: GroupingMode) -> Self {
        Self {
            format,
            derive_with: settings.include_derived.then_some(mode),
            batch_size: settings.batch_size,
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            derive_with: None,
            batch_size: DEFAULT_EXPORT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProgress {
    pub processed: usize,
    pub total: usize,
}

/// Clears the busy flag when the export finishes, however it finishes.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs one export at a time. A second export started while one is running
/// is rejected, not queued.
#[derive(Clone)]
pub struct ExportCoordinator {
    db: Database,
    busy: Arc<AtomicBool>,
}

impl ExportCoordinator {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                log_warn!("Rejected export: another export is still running");
                anyhow!("an export is already running")
            })?;
        Ok(BusyGuard(self.busy.clone()))
    }

    /// Export every capture of a session, drafts included. `on_progress` is
    /// called after each batch; the task yields between batches.
    pub async fn export_session<F>(
        &self,
        session_id: &str,
        options: &ExportOptions,
        mut on_progress: F,
    ) -> Result<String>
    where
        F: FnMut(ExportProgress),
    {
        let _guard = self.begin()?;

        let session = self
            .db
            .get_session(session_id)
            .await?
            .ok_or_else(|| anyhow!("Session not found"))?;
        let total = self.db.count_captures_for_session(session_id).await?;
        let batch_size = options.batch_size.max(1);

        let mut captures: Vec<ExportedCapture> = Vec::with_capacity(total);
        loop {
            let batch = self
                .db
                .list_captures_for_session(session_id, batch_size, captures.len())
                .await?;
            let fetched = batch.len();
            captures.extend(
                batch
                    .into_iter()
                    .map(|capture| ExportedCapture::new(capture, options.derive_with)),
            );

            on_progress(ExportProgress {
                processed: captures.len(),
                total: total.max(captures.len()),
            });

            if fetched < batch_size {
                break;
            }
            tokio::task::yield_now().await;
        }

        log_info!(
            "Exported {} captures from session {} as {:?}",
            captures.len(),
            session_id,
            options.format
        );

        match options.format {
            ExportFormat::Json => {
                let bundle = ExportBundle {
                    exported_at: Utc::now().to_rfc3339(),
                    session,
                    captures,
                };
                Ok(serde_json::to_string_pretty(&bundle)?)
            }
            ExportFormat::Csv => Ok(to_csv(&captures)),
        }
    }
}
