//! Journal store — per-user documents held in memory and mirrored to one JSON
//! file per user under `<data_dir>/users/`.
//!
//! Every write builds the updated document on a copy, persists it (temp file +
//! rename) and only then swaps it in, so memory never runs ahead of disk.
//! Writers are serialized per user; the shared map is only locked for the
//! copy and the swap, never across file I/O.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

use crate::diagnosis::{self, DiagnosisKind};
use crate::events::{JournalEvent, RecordUpdate};
use crate::record::{DailyRecordPatch, DateKey, DraftPatch, RecordError};
use crate::types::{DailyRecord, DiagnosisEntry, UserDocument};

const MAX_USER_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid user id `{0}`")]
    InvalidUser(String),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("failed to persist journal: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode journal: {0}")]
    Encode(#[from] serde_json::Error),
}

/// User ids double as file names: `[A-Za-z0-9_-]{1,64}`.
pub fn validate_user(user: &str) -> Result<(), StoreError> {
    let ok = !user.is_empty()
        && user.len() <= MAX_USER_LEN
        && user
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidUser(user.to_string()))
    }
}

pub struct JournalStore {
    dir: PathBuf,
    docs: RwLock<HashMap<String, UserDocument>>,
    writers: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    event_tx: broadcast::Sender<JournalEvent>,
}

impl JournalStore {
    /// Open (or create) the store under `data_dir` and load every user file.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let dir = data_dir.join("users");
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create journal dir {}", dir.display()))?;

        let mut docs = HashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(user) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if validate_user(user).is_err() {
                warn!("Skipping journal file with invalid name: {}", path.display());
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str::<UserDocument>(&content) {
                    Ok(doc) => {
                        docs.insert(user.to_string(), doc);
                    }
                    Err(e) => error!("Failed to parse journal {}: {}", path.display(), e),
                },
                Err(e) => error!("Failed to read journal {}: {}", path.display(), e),
            }
        }

        info!("Loaded {} journal(s) from {}", docs.len(), dir.display());
        let (event_tx, _) = broadcast::channel(256);
        Ok(Self {
            dir,
            docs: RwLock::new(docs),
            writers: Mutex::new(HashMap::new()),
            event_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JournalEvent> {
        self.event_tx.subscribe()
    }

    fn user_path(&self, user: &str) -> PathBuf {
        self.dir.join(format!("{}.json", user))
    }

    /// Lock serializing writes of one user.
    fn writer(&self, user: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut writers = self.writers.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(writers.entry(user.to_string()).or_default())
    }

    async fn persist(&self, user: &str, doc: &UserDocument) -> Result<(), StoreError> {
        let path = self.user_path(user);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(doc)?;
        let written = match tokio::fs::write(&tmp, content).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                debug!("No temp file to remove at {}: {}", tmp.display(), cleanup);
            }
            return Err(e.into());
        }
        debug!("Persisted journal for {}", user);
        Ok(())
    }

    /// Apply `update` to a copy of the user's document, persist it and commit.
    async fn modify<T>(
        &self,
        user: &str,
        update: impl FnOnce(&mut UserDocument) -> T,
    ) -> Result<T, StoreError> {
        validate_user(user)?;
        let writer = self.writer(user);
        let _serialized = writer.lock().await;

        let mut doc = self
            .docs
            .read()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default();
        let out = update(&mut doc);
        if let Err(e) = self.persist(user, &doc).await {
            error!("Failed to persist journal for {}: {}", user, e);
            return Err(e);
        }
        self.docs.write().await.insert(user.to_string(), doc);
        Ok(out)
    }

    /// The user's document; a fresh default if they have never written.
    pub async fn document(&self, user: &str) -> Result<UserDocument, StoreError> {
        validate_user(user)?;
        Ok(self
            .docs
            .read()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn records(&self, user: &str) -> Result<BTreeMap<String, DailyRecord>, StoreError> {
        Ok(self.document(user).await?.daily_records)
    }

    pub async fn record(
        &self,
        user: &str,
        date: &DateKey,
    ) -> Result<Option<DailyRecord>, StoreError> {
        validate_user(user)?;
        Ok(self
            .docs
            .read()
            .await
            .get(user)
            .and_then(|doc| doc.daily_records.get(&date.to_string()))
            .cloned())
    }

    /// Merge `patch` into the day record. Fields absent from the patch keep
    /// their stored values.
    pub async fn merge_record(
        &self,
        user: &str,
        date: &DateKey,
        patch: DailyRecordPatch,
    ) -> Result<DailyRecord, StoreError> {
        let key = date.to_string();
        let record = self
            .modify(user, |doc| {
                let record = doc.daily_records.entry(key.clone()).or_default();
                patch.apply(record);
                record.clone()
            })
            .await?;

        info!("Record {} updated for {}", key, user);
        let _ = self
            .event_tx
            .send(JournalEvent::RecordUpdated(RecordUpdate {
                user: user.to_string(),
                date: key,
                record: record.clone(),
            }));
        Ok(record)
    }

    pub async fn update_draft(
        &self,
        user: &str,
        patch: DraftPatch,
    ) -> Result<UserDocument, StoreError> {
        self.modify(user, |doc| {
            patch.apply(doc);
            doc.clone()
        })
        .await
    }

    /// Score a questionnaire and prepend the result to its history.
    pub async fn record_diagnosis(
        &self,
        user: &str,
        kind: DiagnosisKind,
        checked: usize,
    ) -> Result<DiagnosisEntry, StoreError> {
        let entry = DiagnosisEntry {
            date: diagnosis::timestamp_now(),
            result: diagnosis::diagnose(checked).to_string(),
        };
        self.modify(user, |doc| {
            diagnosis::push_history(kind.history_mut(doc), entry.clone());
        })
        .await?;
        info!("Diagnosis {} recorded for {} ({} checked)", kind, user, checked);
        Ok(entry)
    }

    pub async fn diagnosis_history(
        &self,
        user: &str,
        kind: DiagnosisKind,
    ) -> Result<Vec<DiagnosisEntry>, StoreError> {
        let doc = self.document(user).await?;
        Ok(kind.history(&doc).to_vec())
    }
}
