//! Per-identity conversation histories backed by one JSON file.
//!
//! The whole mapping is loaded at startup and rewritten after every completed
//! exchange. Writes go to a temp file in the same directory which is then
//! renamed over the target, so a reader sees either the old or the new file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use relay_core::types::{History, IdentityKey, Turn};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// IdentityKey → History, ordered by key for a stable file layout.
pub type Histories = BTreeMap<IdentityKey, History>;

/// Read the persisted mapping.
///
/// A missing file is an empty mapping. An unreadable or malformed file is
/// logged and also treated as empty: corrupt state means "start fresh".
pub fn load_histories(path: &Path) -> Histories {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no history file yet, starting empty");
            return Histories::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "history file unreadable, starting empty");
            return Histories::new();
        }
    };

    match serde_json::from_str::<Histories>(&raw) {
        Ok(histories) => histories,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "history file is malformed, starting empty");
            Histories::new()
        }
    }
}

/// Serialize the full mapping (indented, UTF-8, non-ASCII kept as-is) and
/// atomically replace the file at `path`.
pub fn save_histories(path: &Path, histories: &Histories) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(histories)?;
    write_atomic(path, json.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

/// Owns every identity's history and its backing file.
///
/// The store is the sole writer: all mutation goes through `append` and
/// `save`. Exchanges for the same identity are serialized with
/// `lock_identity`; different identities proceed independently.
pub struct HistoryStore {
    path: PathBuf,
    histories: Mutex<Histories>,
    /// Held across serialize + write so an older snapshot never lands after a newer one.
    write_lock: tokio::sync::Mutex<()>,
    identity_locks: DashMap<IdentityKey, Arc<tokio::sync::Mutex<()>>>,
}

impl HistoryStore {
    /// Load the store from `path`. Never fails; see [`load_histories`].
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let histories = load_histories(&path);
        info!(path = %path.display(), identities = histories.len(), "history store loaded");
        Self::with_histories(path, histories)
    }

    pub fn with_histories(path: impl Into<PathBuf>, histories: Histories) -> Self {
        Self {
            path: path.into(),
            histories: Mutex::new(histories),
            write_lock: tokio::sync::Mutex::new(()),
            identity_locks: DashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of identities with a history.
    pub fn len(&self) -> usize {
        self.histories().len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories().is_empty()
    }

    /// Wait until no other exchange for `key` is in flight.
    ///
    /// Hold the returned guard for the whole read-modify-write of the
    /// identity's history (append user turn, call model, append reply, save).
    pub async fn lock_identity(&self, key: &IdentityKey) -> OwnedMutexGuard<()> {
        let lock = self
            .identity_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Create the persona history for `key` on first contact.
    ///
    /// Returns `true` when the history was created by this call.
    pub fn ensure_identity(&self, key: &IdentityKey) -> bool {
        let mut histories = self.histories();
        if histories.contains_key(key) {
            return false;
        }
        histories.insert(key.clone(), History::for_identity(key));
        info!(identity = %key, "new identity, persona created");
        true
    }

    /// Append one turn to `key`'s history, creating the history if needed.
    pub fn append(&self, key: &IdentityKey, turn: Turn) {
        let mut histories = self.histories();
        histories
            .entry(key.clone())
            .or_insert_with(|| History::for_identity(key))
            .append(turn);
    }

    /// Snapshot of one identity's history.
    pub fn history(&self, key: &IdentityKey) -> Option<History> {
        self.histories().get(key).cloned()
    }

    /// Snapshot of the full mapping.
    pub fn snapshot(&self) -> Histories {
        self.histories().clone()
    }

    /// Persist the full mapping to the backing file.
    ///
    /// The map lock is held only to clone; serialization and the file write
    /// run on the blocking pool.
    pub async fn save(&self) -> Result<(), StoreError> {
        let _write = self.write_lock.lock().await;
        let snapshot = self.snapshot();
        let identities = snapshot.len();
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || save_histories(&path, &snapshot)).await??;
        debug!(path = %self.path.display(), identities, "history store saved");
        Ok(())
    }

    fn histories(&self) -> MutexGuard<'_, Histories> {
        self.histories.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::types::{DocumentKind, Role, TurnPayload};

    fn sample() -> Histories {
        let kim = IdentityKey::from("Kim");
        let mut history = History::for_identity(&kim);
        history.append(Turn::user("안녕하세요", TurnPayload::TextOnly));
        history.append(Turn::assistant("반갑습니다"));
        history.append(Turn::user(
            "",
            TurnPayload::WithImage {
                image: vec![1, 2, 3, 4],
            },
        ));
        history.append(Turn::user(
            "summarize",
            TurnPayload::WithExtractedDocument {
                kind: DocumentKind::Pdf,
                text: "page\u{0c}text".into(),
            },
        ));

        let mut map = Histories::new();
        map.insert(kim, history);
        map.insert(
            IdentityKey::from("Lee"),
            History::for_identity(&IdentityKey::from("Lee")),
        );
        map
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_histories(&dir.path().join("nope.json")).is_empty());
    }

    #[test]
    fn malformed_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_histories(&path).is_empty());

        let store = HistoryStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        let original = sample();

        save_histories(&path, &original).unwrap();
        let loaded = load_histories(&path);
        assert_eq!(loaded, original);

        // Saving what was loaded reproduces the same bytes.
        let first = std::fs::read_to_string(&path).unwrap();
        save_histories(&path, &loaded).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn file_layout_matches_record_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        save_histories(&path, &sample()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("안녕하세요"), "non-ASCII must not be escaped");
        assert!(raw.contains("\n  "), "output must be indented");

        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let kim = value["Kim"].as_array().unwrap();
        assert_eq!(kim[0]["role"], "system");
        assert_eq!(kim[1]["content"], "안녕하세요");
        assert_eq!(kim[3]["image_base64"], "AQIDBA==");
        assert_eq!(kim[4]["pdf_text"], "page\u{0c}text");
    }

    #[tokio::test]
    async fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/h.json");
        let store = HistoryStore::with_histories(&path, sample());
        store.save().await.unwrap();
        assert_eq!(load_histories(&path), sample());
    }

    #[test]
    fn ensure_identity_creates_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::load(dir.path().join("h.json"));
        let key = IdentityKey::from("Kim");

        assert!(store.ensure_identity(&key));
        assert!(!store.ensure_identity(&key));

        let history = store.history(&key).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.turns()[0].role, Role::System);
    }

    #[tokio::test]
    async fn append_preserves_order_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        let key = IdentityKey::from("Kim");

        let store = HistoryStore::load(&path);
        store.ensure_identity(&key);
        store.append(&key, Turn::user("one", TurnPayload::TextOnly));
        store.append(&key, Turn::assistant("two"));
        store.save().await.unwrap();

        let reloaded = HistoryStore::load(&path);
        let history = reloaded.history(&key).unwrap();
        let texts: Vec<&str> = history.turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts[1..], ["one", "two"]);
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn append_to_unknown_identity_seeds_persona_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::load(dir.path().join("h.json"));
        let key = IdentityKey::from("Park");
        store.append(&key, Turn::user("hi", TurnPayload::TextOnly));

        let history = store.history(&key).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[0].role, Role::System);
    }

    #[tokio::test]
    async fn save_does_not_block_readers_of_other_identities() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(HistoryStore::with_histories(dir.path().join("h.json"), sample()));

        let saver = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.save().await })
        };
        // Reads stay available while the write is in flight.
        assert_eq!(store.history(&IdentityKey::from("Lee")).unwrap().len(), 1);
        saver.await.unwrap().unwrap();

        store.append(&IdentityKey::from("Lee"), Turn::assistant("later"));
        store.save().await.unwrap();
        let on_disk = load_histories(store.path());
        assert_eq!(on_disk[&IdentityKey::from("Lee")].len(), 2);
    }

    #[tokio::test]
    async fn identity_lock_serializes_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(HistoryStore::load(dir.path().join("h.json")));
        let key = IdentityKey::from("Kim");

        let guard = store.lock_identity(&key).await;

        let contender = {
            let store = Arc::clone(&store);
            let key = key.clone();
            tokio::spawn(async move {
                let _g = store.lock_identity(&key).await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        // A different identity is not blocked.
        let _other = store.lock_identity(&IdentityKey::from("Lee")).await;

        drop(guard);
        contender.await.unwrap();
    }
}
