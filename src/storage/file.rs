//! JSON-document store on the local filesystem.
//!
//! Every document write goes through [`write_file_locked`]: exclusive `fs2` lock on
//! a sibling `.lock` file, full write to a sibling temp file, fsync, atomic rename.
//! The destination only ever appears by rename, so readers see either no document,
//! the old one or the new one, never an empty or torn one.

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use fs2::FileExt;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{session_not_found, EventSink, NewProfile, PinStore, Profile, ProfileStore, SessionStore, StoreError, UssdEvent};
use crate::crm::{CrmError, MarketingCrm, MarketingDecision};
use crate::pin::PinRecord;
use crate::ussd::session::SessionRecord;
use crate::validation::safe_filename;

/// Largest document the store will parse; anything bigger is treated as corrupt.
const MAX_DOCUMENT_BYTES: u64 = 256 * 1024;

pub struct FileStorage {
    data_dir: PathBuf,
    /// Serializes read-compare-write cycles on session documents within this process.
    session_guard: Mutex<()>,
    /// Serializes phone-index check and profile creation.
    profile_guard: Mutex<()>,
    opt_out_guard: Mutex<()>,
}

impl FileStorage {
    /// Open (creating if needed) a store rooted at `data_dir`.
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        for sub in ["profiles", "phones", "pins", "sessions"] {
            fs::create_dir_all(data_dir.join(sub)).await?;
        }
        debug!("file storage ready at {}", data_dir.display());
        Ok(FileStorage {
            data_dir,
            session_guard: Mutex::new(()),
            profile_guard: Mutex::new(()),
            opt_out_guard: Mutex::new(()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.data_dir
    }

    fn doc_path(&self, dir: &str, key: &str) -> PathBuf {
        self.data_dir.join(dir).join(format!("{}.json", safe_filename(key)))
    }

    fn events_path(&self) -> PathBuf {
        self.data_dir.join("events.jsonl")
    }

    fn opt_outs_path(&self) -> PathBuf {
        self.data_dir.join("marketing_opt_outs.json")
    }

    /// Count the documents in one collection (`profiles`, `sessions`, ...).
    pub async fn count_documents(&self, dir: &str) -> Result<usize, StoreError> {
        let mut entries = fs::read_dir(self.data_dir.join(dir)).await?;
        let mut n = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                n += 1;
            }
        }
        Ok(n)
    }

    async fn load_opt_outs(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(read_json::<Vec<String>>(&self.opt_outs_path())
            .await?
            .map(|v| v.into_iter().collect())
            .unwrap_or_default())
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match fs::metadata(path).await {
        Ok(meta) if meta.len() > MAX_DOCUMENT_BYTES => {
            warn!("refusing oversized document {} ({} bytes)", path.display(), meta.len());
            return Err(StoreError::Io(std::io::Error::new(ErrorKind::InvalidData, "document too large")));
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let data = fs::read_to_string(path).await?;
    // Guard against any accidental leading NULs
    let cleaned = data.trim_start_matches('\0');
    Ok(Some(serde_json::from_str(cleaned)?))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(value)?;
    write_file_locked(path, &content)
}

/// Write content to a file with exclusive locking and an atomic rename.
fn write_file_locked(path: &Path, content: &str) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path.file_name().and_then(|s| s.to_str()).unwrap_or("doc.json");

    // Never open the destination itself: creating it here would publish an empty document.
    // fs2 locks are blocking; documents are small so the critical section is short.
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(dir.join(format!(".{}.lock", base)))?;
    lock_file.lock_exclusive()?;
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                tmp.write_all(content.as_bytes())?;
                tmp.flush()?;
                let _ = tmp.sync_all();
                break candidate;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
            }
            Err(e) => return Err(e.into()),
        }
    };

    std::fs::rename(&tmp_path, path)?;
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }
    let _ = lock_file.unlock();
    Ok(())
}

/// Append one line under an exclusive lock.
fn append_line_locked(path: &Path, line: &str) -> Result<(), StoreError> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.lock_exclusive()?;
    let result = writeln!(file, "{}", line).and_then(|_| file.flush());
    let _ = file.unlock();
    result.map_err(StoreError::from)
}

#[async_trait]
impl ProfileStore for FileStorage {
    async fn get_profile_by_phone(&self, phone_number: &str) -> Result<Option<Profile>, StoreError> {
        let Some(id) = read_json::<String>(&self.doc_path("phones", phone_number)).await? else {
            return Ok(None);
        };
        self.get_profile_by_id(&id).await
    }

    async fn get_profile_by_id(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        read_json(&self.doc_path("profiles", id)).await
    }

    async fn create_profile(&self, new: NewProfile) -> Result<Profile, StoreError> {
        let _guard = self.profile_guard.lock().await;
        let index_path = self.doc_path("phones", &new.phone_number);
        if read_json::<String>(&index_path).await?.is_some() {
            return Err(StoreError::AlreadyExists { entity: "profile", id: new.phone_number });
        }
        let profile = Profile {
            id: Uuid::new_v4().to_string(),
            phone_number: new.phone_number,
            first_name: new.first_name,
            last_name: new.last_name,
            date_of_birth: new.date_of_birth,
            created_at: Utc::now(),
        };
        write_json(&self.doc_path("profiles", &profile.id), &profile)?;
        write_json(&index_path, &profile.id)?;
        Ok(profile)
    }
}

#[async_trait]
impl PinStore for FileStorage {
    async fn get_pin_by_profile(&self, profile_id: &str) -> Result<Option<PinRecord>, StoreError> {
        read_json(&self.doc_path("pins", profile_id)).await
    }

    async fn save_pin(&self, record: PinRecord) -> Result<PinRecord, StoreError> {
        write_json(&self.doc_path("pins", &record.profile_id), &record)?;
        Ok(record)
    }
}

#[async_trait]
impl SessionStore for FileStorage {
    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        read_json(&self.doc_path("sessions", session_id)).await
    }

    async fn get_or_create_session(&self, session_id: &str, phone_number: &str) -> Result<SessionRecord, StoreError> {
        let _guard = self.session_guard.lock().await;
        let path = self.doc_path("sessions", session_id);
        if let Some(existing) = read_json::<SessionRecord>(&path).await? {
            return Ok(existing);
        }
        let record = SessionRecord::new(session_id, phone_number);
        write_json(&path, &record)?;
        Ok(record)
    }

    async fn update_session(&self, record: SessionRecord) -> Result<SessionRecord, StoreError> {
        let _guard = self.session_guard.lock().await;
        let path = self.doc_path("sessions", &record.session_id);
        let stored = read_json::<SessionRecord>(&path)
            .await?
            .ok_or_else(|| session_not_found(&record.session_id))?;
        if stored.version != record.version {
            return Err(StoreError::Conflict {
                session_id: record.session_id,
                expected: record.version,
                found: stored.version,
            });
        }
        let committed = record.committed();
        write_json(&path, &committed)?;
        Ok(committed)
    }
}

#[async_trait]
impl EventSink for FileStorage {
    async fn save_event(&self, event: UssdEvent) -> Result<(), StoreError> {
        let line = serde_json::to_string(&event)?;
        append_line_locked(&self.events_path(), &line)
    }
}

/// Local opt-out list, used when no remote CRM is configured.
#[async_trait]
impl MarketingCrm for FileStorage {
    async fn is_opted_out(&self, phone_number: &str) -> Result<bool, CrmError> {
        Ok(self.load_opt_outs().await?.contains(phone_number))
    }

    async fn opt_out_or_opt_in(&self, phone_number: &str, decision: MarketingDecision) -> Result<(), CrmError> {
        let _guard = self.opt_out_guard.lock().await;
        let mut opt_outs = self.load_opt_outs().await?;
        match decision {
            MarketingDecision::OptOut => opt_outs.insert(phone_number.to_string()),
            MarketingDecision::OptIn => opt_outs.remove(phone_number),
        };
        let list: Vec<&String> = opt_outs.iter().collect();
        write_json(&self.opt_outs_path(), &list)?;
        Ok(())
    }
}
