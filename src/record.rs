use crate::aggregate::AggregateResult;
use crate::emotion::{Emotion, EmotionDistribution};
use crate::error::{AnalysisError, Result};
use crate::media::{MediaItem, MediaKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

pub type RecordId = Uuid;

/// Authenticated submitter, as handed over by the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    Video,
    Images,
}

impl SubmissionKind {
    /// A batch is a video submission as soon as any one item is a video.
    pub fn of(items: &[MediaItem]) -> SubmissionKind {
        if items.iter().any(|i| i.kind == MediaKind::Video) {
            SubmissionKind::Video
        } else {
            SubmissionKind::Images
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub user_id: String,
    pub username: String,
    pub timestamp: DateTime<Utc>,
    pub scores: EmotionDistribution,
    pub dominant_emotion: Emotion,
    #[serde(rename = "type")]
    pub kind: SubmissionKind,
    pub filenames: Vec<String>,
    pub samples: usize,
    pub votes: BTreeMap<Emotion, u32>,
}

/// A record as read back from a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub record: AnalysisRecord,
}

pub fn build_record(
    aggregate: &AggregateResult,
    submitter: &Identity,
    kind: SubmissionKind,
    filenames: Vec<String>,
    now: DateTime<Utc>,
) -> Result<AnalysisRecord> {
    // Means of valid distributions are themselves valid, so this only fails
    // on a broken aggregate.
    let scores = EmotionDistribution::new(*aggregate.scores())
        .map_err(|e| AnalysisError::persistence(format!("invalid aggregate scores: {e}")))?;

    Ok(AnalysisRecord {
        user_id: submitter.user_id.clone(),
        username: submitter.username.clone(),
        timestamp: now,
        scores,
        dominant_emotion: aggregate.dominant_label(),
        kind,
        filenames,
        samples: aggregate.samples(),
        votes: Emotion::ALL
            .iter()
            .map(|&label| (label, aggregate.votes(label)))
            .collect(),
    })
}

/// Where finished analyses go. Keyed by submitter and timestamp; the only
/// read needed is the submitter's most recent record.
pub trait RecordStore: Send + Sync {
    fn insert(&self, record: &AnalysisRecord) -> Result<RecordId>;
    fn latest_for(&self, user_id: &str) -> Result<Option<StoredRecord>>;
}

fn latest<'a>(records: impl Iterator<Item = &'a StoredRecord>, user_id: &str) -> Option<StoredRecord> {
    records
        .filter(|r| r.record.user_id == user_id)
        // max_by_key keeps the last of equal timestamps, i.e. the newest insert
        .max_by_key(|r| r.record.timestamp)
        .cloned()
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<StoredRecord>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryStore {
    fn insert(&self, record: &AnalysisRecord) -> Result<RecordId> {
        let id = Uuid::new_v4();
        let mut records = self
            .records
            .lock()
            .map_err(|e| AnalysisError::persistence(e))?;
        records.push(StoredRecord {
            id,
            record: record.clone(),
        });
        Ok(id)
    }

    fn latest_for(&self, user_id: &str) -> Result<Option<StoredRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|e| AnalysisError::persistence(e))?;
        Ok(latest(records.iter(), user_id))
    }
}

/// Append-only file holding one JSON record per line.
pub struct JsonlStore {
    path: PathBuf,
    // serializes appends from concurrent submissions
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> JsonlStore {
        JsonlStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

impl RecordStore for JsonlStore {
    fn insert(&self, record: &AnalysisRecord) -> Result<RecordId> {
        let stored = StoredRecord {
            id: Uuid::new_v4(),
            record: record.clone(),
        };
        let mut line = serde_json::to_string(&stored).map_err(AnalysisError::persistence)?;
        line.push('\n');

        let _guard = self.write_lock.lock().map_err(|e| AnalysisError::persistence(e))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(AnalysisError::persistence)?;
        file.write_all(line.as_bytes())
            .map_err(AnalysisError::persistence)?;
        debug!("Stored record {} in {}", stored.id, self.path.display());

        Ok(stored.id)
    }

    fn latest_for(&self, user_id: &str) -> Result<Option<StoredRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AnalysisError::persistence(e)),
        };

        let mut records = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(AnalysisError::persistence)?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredRecord>(&line) {
                Ok(r) => records.push(r),
                Err(e) => warn!("Skipping malformed record at line {}: {e}", n + 1),
            }
        }

        Ok(latest(records.iter(), user_id))
    }
}
