//! File-backed conversation store.
//!
//! Implements `ConversationStore` from `twin-core` with one JSON record per
//! session at `{dir}/{session_id}.json`, holding a pretty-printed array of
//! `{role, content}` objects.
//!
//! Writes never modify a record in place: the full new log goes to a
//! temporary file in the same directory, is flushed to disk, then renamed over
//! the record. Appends to the same session are serialized by a per-session
//! async lock, and each append re-reads the log under that lock. The write
//! itself runs on the blocking pool and finishes even if the caller is
//! dropped; an unfinished temp file is always removed.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use twin_core::chat::store::ConversationStore;
use twin_types::chat::{SessionId, SessionSummary, Turn};
use twin_types::error::StoreError;

const RECORD_EXTENSION: &str = "json";

type LockTable = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Directory of per-session JSON records.
pub struct FileConversationStore {
    dir: PathBuf,
    locks: LockTable,
}

/// Hold on one session's append lock.
///
/// Dropping it (including when the owning future is cancelled) releases the
/// mutex and removes the table entry once nobody else references it.
struct SessionLease {
    locks: LockTable,
    key: String,
    lock: Option<Arc<Mutex<()>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SessionLease {
    async fn acquire(&mut self) {
        if let Some(lock) = &self.lock {
            self.guard = Some(Arc::clone(lock).lock_owned().await);
        }
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.guard.take();
        self.lock.take();
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Write `contents` to a temp file in `dir`, flush it to disk and rename it
/// over `target`. The temp file is deleted on any failure.
fn replace_atomically(dir: &Path, target: &Path, prefix: &str, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

impl FileConversationStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!(dir = %dir.display(), "Opened conversation store");
        Ok(Self {
            dir,
            locks: Arc::new(DashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, session_id: &SessionId) -> PathBuf {
        self.dir
            .join(format!("{}.{RECORD_EXTENSION}", session_id.as_str()))
    }

    fn lease(&self, session_id: &SessionId) -> SessionLease {
        let key = session_id.as_str().to_string();
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        SessionLease {
            locks: Arc::clone(&self.locks),
            key,
            lock: Some(lock),
            guard: None,
        }
    }

    async fn read_record(&self, session_id: &SessionId) -> Result<Vec<Turn>, StoreError> {
        let path = self.record_path(session_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            session_id: session_id.to_string(),
            reason: e.to_string(),
        })
    }
}

impl ConversationStore for FileConversationStore {
    async fn load(&self, session_id: &SessionId) -> Result<Vec<Turn>, StoreError> {
        self.read_record(session_id).await
    }

    async fn append(&self, session_id: &SessionId, turns: &[Turn]) -> Result<(), StoreError> {
        let mut lease = self.lease(session_id);
        lease.acquire().await;

        let mut log = self.read_record(session_id).await?;
        log.extend_from_slice(turns);
        let total = log.len();
        let json = serde_json::to_vec_pretty(&log)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let dir = self.dir.clone();
        let target = self.record_path(session_id);
        let prefix = format!(".{}.{RECORD_EXTENSION}.", session_id.as_str());

        // The write owns the lease, so a cancelled caller neither interrupts
        // the rename nor lets another append in before it lands.
        tokio::task::spawn_blocking(move || {
            let _lease = lease;
            replace_atomically(&dir, &target, &prefix, &json)
        })
        .await
        .map_err(|e| StoreError::Io(format!("record write task failed: {e}")))??;

        tracing::debug!(
            session_id = %session_id,
            appended = turns.len(),
            total,
            "Appended turns"
        );
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut found: Vec<(SystemTime, SessionSummary)> = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(session_id) = SessionId::parse(stem) else {
                tracing::debug!(path = %path.display(), "Skipping file with non-session name");
                continue;
            };

            let turns = match self.read_record(&session_id).await {
                Ok(turns) => turns,
                Err(err) => {
                    tracing::warn!(session_id = %session_id, "Skipping unreadable session record: {err}");
                    continue;
                }
            };

            let modified = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((modified, SessionSummary::from_turns(session_id, &turns)));
        }

        found.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(found.into_iter().map(|(_, summary)| summary).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sid(raw: &str) -> SessionId {
        SessionId::parse(raw).unwrap()
    }

    async fn store() -> (TempDir, FileConversationStore) {
        let tmp = TempDir::new().unwrap();
        let store = FileConversationStore::open(tmp.path().join("memory"))
            .await
            .unwrap();
        (tmp, store)
    }

    #[tokio::test]
    async fn test_load_unknown_session_is_empty() {
        let (_tmp, store) = store().await;
        assert!(store.load(&sid("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_concatenates_in_call_order() {
        let (_tmp, store) = store().await;
        let id = sid("s1");

        store
            .append(&id, &[Turn::user("Hello"), Turn::assistant("Hi there")])
            .await
            .unwrap();
        store
            .append(&id, &[Turn::user("How are you?"), Turn::assistant("Fine.")])
            .await
            .unwrap();

        let turns = store.load(&id).await.unwrap();
        assert_eq!(
            turns,
            vec![
                Turn::user("Hello"),
                Turn::assistant("Hi there"),
                Turn::user("How are you?"),
                Turn::assistant("Fine."),
            ]
        );
    }

    #[tokio::test]
    async fn test_repeated_loads_are_identical() {
        let (_tmp, store) = store().await;
        let id = sid("s1");
        store.append(&id, &[Turn::user("a")]).await.unwrap();

        let first = store.load(&id).await.unwrap();
        let second = store.load(&id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_record_layout_is_pretty_role_content_array() {
        let (_tmp, store) = store().await;
        let id = sid("layout");
        store
            .append(&id, &[Turn::user("Hello"), Turn::assistant("Hi there")])
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(store.dir().join("layout.json"))
            .await
            .unwrap();
        assert!(raw.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["role"], "user");
        assert_eq!(value[1]["content"], "Hi there");
    }

    #[tokio::test]
    async fn test_content_with_newlines_roundtrips() {
        let (_tmp, store) = store().await;
        let id = sid("s1");
        let content = "line one\nline two\r\n\"quoted\" \\ üñíçødé";
        store.append(&id, &[Turn::assistant(content)]).await.unwrap();

        assert_eq!(store.load(&id).await.unwrap()[0].content, content);
    }

    #[tokio::test]
    async fn test_append_leaves_no_temp_files() {
        let (_tmp, store) = store().await;
        store.append(&sid("s1"), &[Turn::user("a")]).await.unwrap();
        store.append(&sid("s1"), &[Turn::user("b")]).await.unwrap();

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(store.dir()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["s1.json"]);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let (_tmp, store) = store().await;
        let store = Arc::new(store);
        let id = sid("busy");

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(
                        &id,
                        &[Turn::user(format!("q{i}")), Turn::assistant(format!("a{i}"))],
                    )
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let turns = store.load(&id).await.unwrap();
        assert_eq!(turns.len(), 40);
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
        assert!(store.locks.is_empty());
    }

    async fn dir_names(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_cancelled_append_leaves_no_temp_file_or_lock() {
        let (_tmp, store) = store().await;
        let id = sid("s1");
        store.append(&id, &[Turn::user("first")]).await.unwrap();

        let big = "x".repeat(32 * 1024 * 1024);
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(5),
            store.append(&id, &[Turn::assistant(big.clone())]),
        )
        .await;

        // The detached write may still be running; wait for it to settle.
        for _ in 0..300 {
            if store.locks.is_empty() && dir_names(store.dir()).await == vec!["s1.json"] {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert_eq!(dir_names(store.dir()).await, vec!["s1.json"]);
        assert!(store.locks.is_empty());

        // Either the whole append landed or none of it did.
        let turns = store.load(&id).await.unwrap();
        assert_eq!(turns[0], Turn::user("first"));
        match turns.len() {
            1 => {}
            2 => assert_eq!(turns[1].content.len(), big.len()),
            n => panic!("unexpected log length {n}"),
        }

        store.append(&id, &[Turn::user("after")]).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap().last(), Some(&Turn::user("after")));
        assert!(store.locks.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_record_fails_load_and_is_skipped_in_listing() {
        let (_tmp, store) = store().await;
        store
            .append(&sid("good"), &[Turn::user("Hello"), Turn::assistant("Hi")])
            .await
            .unwrap();
        tokio::fs::write(store.dir().join("broken.json"), "{ not json")
            .await
            .unwrap();
        tokio::fs::write(store.dir().join("notes.txt"), "ignored")
            .await
            .unwrap();

        assert!(matches!(
            store.load(&sid("broken")).await,
            Err(StoreError::Corrupt { .. })
        ));

        let sessions = store.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id.as_str(), "good");
        assert_eq!(sessions[0].message_count, 2);
        assert_eq!(sessions[0].last_message.as_deref(), Some("Hi"));
    }

    #[tokio::test]
    async fn test_append_to_corrupt_record_keeps_it_untouched() {
        let (_tmp, store) = store().await;
        let path = store.dir().join("broken.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        assert!(store.append(&sid("broken"), &[Turn::user("a")]).await.is_err());
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "{ not json");
    }
}
