//! Rolling, durable log of published posts.
//!
//! The in-memory [`History`] is authoritative for the lifetime of the process.
//! Every successful append rewrites the whole log through a [`HistoryBackend`],
//! and a failed load always degrades to an empty history.

pub mod json;

use crate::guard::{DuplicatePolicy, Verdict};
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default sliding-window size.
pub const MAX_HISTORY: usize = 1000;

/// On-disk timestamp layout, shared by every backend.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SHA-256 of the raw UTF-8 bytes, lowercase hex.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).ok()?;
    Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

mod timestamp_serde {
    use super::{format_timestamp, parse_timestamp};
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub content: String,
    pub hash: String,
    /// Advisory only; eviction is purely positional.
    #[serde(rename = "date", with = "timestamp_serde")]
    pub timestamp: DateTime<Utc>,
}

impl PostRecord {
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_timestamp(content, Utc::now())
    }

    /// Timestamps are kept at whole-second precision so a reloaded record
    /// compares equal to the one that was written.
    pub fn with_timestamp(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let content = content.into();
        Self {
            hash: content_hash(&content),
            content,
            timestamp: timestamp.trunc_subsecs(0),
        }
    }
}

/// Insertion-ordered, capacity-bounded sequence of records with a hash index.
#[derive(Debug, Clone)]
pub struct History {
    records: VecDeque<PostRecord>,
    hashes: HashMap<String, usize>,
    max_records: usize,
}

impl History {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: VecDeque::new(),
            hashes: HashMap::new(),
            max_records: max_records.max(1),
        }
    }

    /// Builds a history from stored records, keeping only the newest `max_records`.
    ///
    /// Stored hashes are not trusted: older files carry MD5 digests, so every
    /// hash is recomputed from its content before it enters the index.
    pub fn from_records(records: Vec<PostRecord>, max_records: usize) -> Self {
        let mut history = Self::new(max_records);
        let mut rehashed = 0;
        for mut record in records {
            let hash = content_hash(&record.content);
            if record.hash != hash {
                record.hash = hash;
                rehashed += 1;
            }
            history.push(record);
        }
        if rehashed > 0 {
            debug!("History: recomputed {} stored hashes", rehashed);
        }
        history
    }

    /// Appends a record and evicts from the front while over capacity.
    /// Returns the number of evicted records.
    pub fn push(&mut self, record: PostRecord) -> usize {
        *self.hashes.entry(record.hash.clone()).or_insert(0) += 1;
        self.records.push_back(record);

        let mut evicted = 0;
        while self.records.len() > self.max_records {
            if let Some(old) = self.records.pop_front() {
                self.forget_hash(&old.hash);
                evicted += 1;
            }
        }
        evicted
    }

    fn forget_hash(&mut self, hash: &str) {
        if let Some(count) = self.hashes.get_mut(hash) {
            *count -= 1;
            if *count == 0 {
                self.hashes.remove(hash);
            }
        }
    }

    pub fn contains_hash(&self, hash: &str) -> bool {
        self.hashes.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PostRecord> {
        self.records.iter()
    }

    pub fn to_vec(&self) -> Vec<PostRecord> {
        self.records.iter().cloned().collect()
    }
}

#[derive(Debug, Error)]
pub enum HistoryReadError {
    #[error("no history found at {0}")]
    NotFound(String),
    #[error("permission denied reading history at {0}")]
    Permission(String),
    #[error("history at {path} is corrupt: {reason}")]
    Parse { path: String, reason: String },
    #[error("i/o error reading history at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("database error reading history: {0}")]
    Database(#[from] rusqlite::Error),
}

impl HistoryReadError {
    pub fn from_io(path: impl Into<String>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::Permission(path),
            _ => Self::Io { path, source: err },
        }
    }
}

#[derive(Debug, Error)]
pub enum HistoryWriteError {
    #[error("i/o error writing history at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("database error writing history: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Durable storage for the whole history blob.
///
/// `replace_all` must be crash-consistent: a later `read_all` sees either the
/// previous or the new contents, never a mix.
pub trait HistoryBackend: Send + Sync {
    fn read_all(&self) -> Result<Vec<PostRecord>, HistoryReadError>;
    fn replace_all(&self, records: &[PostRecord]) -> Result<(), HistoryWriteError>;
    fn location(&self) -> String;
}

/// Outcome of [`HistoryStore::admit`].
#[derive(Debug)]
pub enum Admission {
    Accepted(PostRecord),
    /// Kept in memory, but the backend rejected the write.
    AcceptedUnpersisted(PostRecord, HistoryWriteError),
    Rejected(Verdict),
}

pub struct HistoryStore {
    history: Mutex<History>,
    backend: Box<dyn HistoryBackend>,
}

impl HistoryStore {
    /// Loads the persisted history. Never fails: any read error is logged and
    /// the store starts empty.
    pub fn load(backend: Box<dyn HistoryBackend>, max_records: usize) -> Self {
        let history = match backend.read_all() {
            Ok(records) => {
                let history = History::from_records(records, max_records);
                info!(
                    "History: loaded {} posts from {}",
                    history.len(),
                    backend.location()
                );
                history
            }
            Err(HistoryReadError::NotFound(path)) => {
                info!("History: nothing stored at {}, starting empty", path);
                History::new(max_records)
            }
            Err(e) => {
                warn!("History: failed to load, starting empty: {}", e);
                History::new(max_records)
            }
        };

        Self {
            history: Mutex::new(history),
            backend,
        }
    }

    fn lock(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends, trims to capacity and persists the full history.
    ///
    /// On a persist failure the record stays in memory and the error is returned.
    pub fn append(&self, record: PostRecord) -> Result<(), HistoryWriteError> {
        let mut history = self.lock();
        self.push_and_persist(&mut history, record)
    }

    fn push_and_persist(
        &self,
        history: &mut History,
        record: PostRecord,
    ) -> Result<(), HistoryWriteError> {
        let evicted = history.push(record);
        if evicted > 0 {
            debug!("History: evicted {} oldest posts", evicted);
        }
        self.backend.replace_all(&history.to_vec())
    }

    /// Runs the duplicate check and, if the candidate passes, the append in a
    /// single critical section.
    pub fn admit(&self, candidate: &str, policy: &dyn DuplicatePolicy) -> Admission {
        let mut history = self.lock();

        let verdict = policy.check(candidate, &history);
        if verdict != Verdict::Unique {
            return Admission::Rejected(verdict);
        }

        let record = PostRecord::new(candidate);
        match self.push_and_persist(&mut history, record.clone()) {
            Ok(()) => Admission::Accepted(record),
            Err(e) => Admission::AcceptedUnpersisted(record, e),
        }
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    pub fn snapshot(&self) -> Vec<PostRecord> {
        self.lock().to_vec()
    }

    pub fn with_history<R>(&self, f: impl FnOnce(&History) -> R) -> R {
        f(&self.lock())
    }
}
