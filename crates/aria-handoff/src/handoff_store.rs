use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use aria_core::write_text_atomic;

use crate::handoff_contract::{HandoffAuditEvent, HandoffRecord, HandoffStatus};

pub const HANDOFF_RECORDS_FILE_NAME: &str = "handoff-records.json";
pub const HANDOFF_AUDIT_FILE_NAME: &str = "handoff-audit.jsonl";
const HANDOFF_RECORDS_SCHEMA_VERSION: u32 = 1;

/// Authoritative storage for handoff records plus the append-only audit log.
#[async_trait]
pub trait HandoffStore: Send + Sync {
    async fn read_record(&self, user_id: &str) -> Result<Option<HandoffRecord>>;
    async fn write_record(&self, record: HandoffRecord) -> Result<()>;
    async fn append_audit(&self, event: HandoffAuditEvent) -> Result<()>;
    /// Records currently under human control or pending it, for timeout
    /// sweeps and admin-facing listings.
    async fn list_non_ai_records(&self) -> Result<Vec<HandoffRecord>>;
}

#[derive(Debug, Default)]
/// Public struct `InMemoryHandoffStore` used across Aria components.
pub struct InMemoryHandoffStore {
    records: Mutex<HashMap<String, HandoffRecord>>,
    audit: Mutex<Vec<HandoffAuditEvent>>,
}

impl InMemoryHandoffStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the audit trail, oldest first.
    pub fn audit_events(&self) -> Result<Vec<HandoffAuditEvent>> {
        let audit = self
            .audit
            .lock()
            .map_err(|_| anyhow!("handoff audit lock is poisoned"))?;
        Ok(audit.clone())
    }
}

#[async_trait]
impl HandoffStore for InMemoryHandoffStore {
    async fn read_record(&self, user_id: &str) -> Result<Option<HandoffRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow!("handoff records lock is poisoned"))?;
        Ok(records.get(user_id).cloned())
    }

    async fn write_record(&self, record: HandoffRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("handoff records lock is poisoned"))?;
        records.insert(record.user_id.clone(), record);
        Ok(())
    }

    async fn append_audit(&self, event: HandoffAuditEvent) -> Result<()> {
        let mut audit = self
            .audit
            .lock()
            .map_err(|_| anyhow!("handoff audit lock is poisoned"))?;
        audit.push(event);
        Ok(())
    }

    async fn list_non_ai_records(&self) -> Result<Vec<HandoffRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow!("handoff records lock is poisoned"))?;
        let mut non_ai: Vec<HandoffRecord> = records
            .values()
            .filter(|record| record.status != HandoffStatus::Ai)
            .cloned()
            .collect();
        non_ai.sort_by(|left, right| left.user_id.cmp(&right.user_id));
        Ok(non_ai)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HandoffRecordsFile {
    schema_version: u32,
    #[serde(default)]
    records: Vec<HandoffRecord>,
}

impl Default for HandoffRecordsFile {
    fn default() -> Self {
        Self {
            schema_version: HANDOFF_RECORDS_SCHEMA_VERSION,
            records: Vec::new(),
        }
    }
}

/// JSON-file-backed store for single-instance deployments: records live in
/// `handoff-records.json` (atomic rewrite) and audit events append to
/// `handoff-audit.jsonl` under the state directory.
#[derive(Debug)]
pub struct FileHandoffStore {
    state_dir: PathBuf,
    // Serializes read-modify-write cycles on the records file.
    write_lock: Mutex<()>,
}

impl FileHandoffStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn records_path(&self) -> PathBuf {
        self.state_dir.join(HANDOFF_RECORDS_FILE_NAME)
    }

    fn audit_path(&self) -> PathBuf {
        self.state_dir.join(HANDOFF_AUDIT_FILE_NAME)
    }

    fn load_records_file(&self) -> Result<HandoffRecordsFile> {
        let path = self.records_path();
        if !path.exists() {
            return Ok(HandoffRecordsFile::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read handoff records {}", path.display()))?;
        let parsed = serde_json::from_str::<HandoffRecordsFile>(&raw)
            .with_context(|| format!("invalid handoff records {}", path.display()))?;
        if parsed.schema_version != HANDOFF_RECORDS_SCHEMA_VERSION {
            bail!(
                "unsupported handoff records schema_version {} (expected {})",
                parsed.schema_version,
                HANDOFF_RECORDS_SCHEMA_VERSION
            );
        }
        Ok(parsed)
    }

    fn store_records_file(&self, file: &HandoffRecordsFile) -> Result<()> {
        let rendered =
            serde_json::to_string_pretty(file).context("failed to render handoff records")?;
        write_text_atomic(&self.records_path(), &rendered)
    }
}

#[async_trait]
impl HandoffStore for FileHandoffStore {
    async fn read_record(&self, user_id: &str) -> Result<Option<HandoffRecord>> {
        let file = self.load_records_file()?;
        Ok(file
            .records
            .into_iter()
            .find(|record| record.user_id == user_id))
    }

    async fn write_record(&self, record: HandoffRecord) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("handoff records write lock is poisoned"))?;
        let mut file = self.load_records_file()?;
        if let Some(existing) = file
            .records
            .iter_mut()
            .find(|existing| existing.user_id == record.user_id)
        {
            *existing = record;
        } else {
            file.records.push(record);
        }
        self.store_records_file(&file)
    }

    async fn append_audit(&self, event: HandoffAuditEvent) -> Result<()> {
        use std::io::Write;

        let path = self.audit_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let line = serde_json::to_string(&event).context("failed to render audit event")?;
        let mut handle = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open handoff audit log {}", path.display()))?;
        writeln!(handle, "{line}")
            .with_context(|| format!("failed to append handoff audit log {}", path.display()))?;
        Ok(())
    }

    async fn list_non_ai_records(&self) -> Result<Vec<HandoffRecord>> {
        let file = self.load_records_file()?;
        Ok(file
            .records
            .into_iter()
            .filter(|record| record.status != HandoffStatus::Ai)
            .collect())
    }
}

/// Reads the audit trail written by a `FileHandoffStore`, oldest first.
/// Unparseable lines are skipped with a warning so one corrupt entry does not
/// hide the rest of the trail.
pub fn read_handoff_audit_events(state_dir: &Path) -> Result<Vec<HandoffAuditEvent>> {
    let path = state_dir.join(HANDOFF_AUDIT_FILE_NAME);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read handoff audit log {}", path.display()))?;
    let mut events = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<HandoffAuditEvent>(trimmed) {
            Ok(event) => events.push(event),
            Err(error) => {
                eprintln!(
                    "handoff audit parse failure: file={} line={} detail={}",
                    path.display(),
                    index + 1,
                    error
                );
            }
        }
    }
    Ok(events)
}
