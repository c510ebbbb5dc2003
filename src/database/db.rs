use super::Collections;
use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

const GROUPS: &str = "groups";
const ECONOMY: &str = "economy";
const STATS: &str = "stats";
const GAMES: &str = "games";
const WARNINGS: &str = "warnings";
const BOTDATA: &str = "botdata";

/// Process-wide state with a `load`/`read`/`mutate`/`save` lifecycle.
///
/// Record mutation happens under a short synchronous lock that is never held
/// across an await. Whole events are serialized per chat through
/// [`Store::lock_chat`], and saves are serialized against each other by a
/// dedicated writer lock.
pub struct Store {
    dir: PathBuf,
    data: Mutex<Collections>,
    chat_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    writer: Mutex<()>,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Store {
            dir: dir.into(),
            data: Mutex::new(Collections::default()),
            chat_locks: Mutex::new(HashMap::new()),
            writer: Mutex::new(()),
        }
    }

    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let store = Store::new(dir);
        store.load();
        store
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn data(&self) -> MutexGuard<'_, Collections> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replaces the in-memory state with what is on disk. A missing or corrupt
    /// collection file leaves that collection empty.
    pub fn load(&self) {
        let loaded = Collections {
            groups: load_collection(&self.dir, GROUPS),
            economy: load_collection(&self.dir, ECONOMY),
            stats: load_collection(&self.dir, STATS),
            games: load_collection(&self.dir, GAMES),
            warnings: load_collection(&self.dir, WARNINGS),
            botdata: load_collection(&self.dir, BOTDATA),
        };
        *self.data() = loaded;
    }

    pub fn read<R>(&self, f: impl FnOnce(&Collections) -> R) -> R {
        f(&self.data())
    }

    pub fn mutate<R>(&self, f: impl FnOnce(&mut Collections) -> R) -> R {
        f(&mut self.data())
    }

    /// Writes every collection to `<dir>/<name>.json` through a temp file and a
    /// rename, so a crash leaves at most one collection stale.
    pub fn save(&self) -> anyhow::Result<()> {
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let snapshot = self.read(Collections::clone);
        self.write_all(&snapshot)
    }

    /// `save` for contexts that must not block, such as a panic hook running
    /// on a thread that may still hold the data lock. Returns `false` when
    /// either lock is busy and nothing was written.
    pub fn try_save(&self) -> anyhow::Result<bool> {
        let _writer = match self.writer.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => return Ok(false),
        };
        let snapshot = match self.data.try_lock() {
            Ok(data) => data.clone(),
            Err(TryLockError::Poisoned(e)) => e.into_inner().clone(),
            Err(TryLockError::WouldBlock) => return Ok(false),
        };
        self.write_all(&snapshot)?;
        Ok(true)
    }

    fn write_all(&self, snapshot: &Collections) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating data dir {}", self.dir.display()))?;
        write_collection(&self.dir, GROUPS, &snapshot.groups)?;
        write_collection(&self.dir, ECONOMY, &snapshot.economy)?;
        write_collection(&self.dir, STATS, &snapshot.stats)?;
        write_collection(&self.dir, GAMES, &snapshot.games)?;
        write_collection(&self.dir, WARNINGS, &snapshot.warnings)?;
        write_collection(&self.dir, BOTDATA, &snapshot.botdata)?;
        log::debug!("Store saved to {}", self.dir.display());
        Ok(())
    }

    /// `save` off the async executor.
    pub async fn persist(self: Arc<Self>) -> anyhow::Result<()> {
        tokio::task::spawn_blocking(move || self.save())
            .await
            .context("store writer task panicked")?
    }

    /// Serializes event processing for one chat.
    pub async fn lock_chat(&self, chat: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.chat_locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(chat.to_owned())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

fn collection_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.json", name))
}

fn load_collection<T: DeserializeOwned + Default>(dir: &Path, name: &str) -> T {
    let path = collection_path(dir, name);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("No {} collection at {}, starting empty", name, path.display());
            return T::default();
        }
        Err(e) => {
            log::warn!("Can't read {}: {}, starting empty", path.display(), e);
            return T::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(v) => {
            log::info!("Loaded {} collection", name);
            v
        }
        Err(e) => {
            log::warn!("Corrupt {} collection ({}), starting empty", name, e);
            T::default()
        }
    }
}

fn write_collection<T: Serialize>(dir: &Path, name: &str, value: &T) -> anyhow::Result<()> {
    let path = collection_path(dir, name);
    let tmp = dir.join(format!("{}.json.tmp", name));
    let body = serde_json::to_vec_pretty(value)
        .with_context(|| format!("serializing {} collection", name))?;
    fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{GameSession, Pet, UserEconomy, UserStats, WarnEvent, WarnEventKind};
    use std::collections::BTreeMap;

    fn populated(store: &Store) {
        store.mutate(|c| {
            let g = c.groups.entry("g1".into()).or_default();
            g.mute("1");
            g.ban("2");
            g.warn("3");
            g.block_word("spam");
            g.antilink = true;
            g.slowmode = 10;
            g.welcome_message = "ciao {user}".into();
            c.economy.insert(
                "1".into(),
                UserEconomy {
                    money: 42,
                    bank: 7,
                    inventory: vec!["spada".into(), "scudo".into()],
                    last_daily: Some(123),
                    pet: Some(Pet {
                        name: "Fido".into(),
                        kind: "cane".into(),
                        level: 2,
                    }),
                    ..UserEconomy::default()
                },
            );
            c.stats.insert(
                "1".into(),
                UserStats {
                    level: 4,
                    xp: 12,
                    messages: 99,
                    last_xp: Some(5),
                    ..UserStats::default()
                },
            );
            c.games.insert(
                "g1".into(),
                GameSession {
                    secret: 33,
                    attempts: BTreeMap::from([("1".to_string(), 2)]),
                },
            );
            c.warnings.insert(
                "g1".into(),
                vec![WarnEvent {
                    user: "3".into(),
                    issuer: "9".into(),
                    kind: WarnEventKind::Warn,
                    at: 77,
                }],
            );
            c.botdata.commands_run = 5;
        });
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        populated(&store);
        store.save().unwrap();

        let reloaded = Store::open(dir.path());
        let before = store.read(Collections::clone);
        let after = reloaded.read(Collections::clone);
        assert_eq!(before, after);
        assert!(!dir.path().join("groups.json.tmp").exists());
    }

    #[test]
    fn corrupt_file_only_empties_its_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        populated(&store);
        store.save().unwrap();
        fs::write(dir.path().join("economy.json"), "{not json").unwrap();

        let reloaded = Store::open(dir.path());
        reloaded.read(|c| {
            assert!(c.economy.is_empty());
            assert!(c.groups.contains_key("g1"));
            assert_eq!(c.stats.get("1").map(|s| s.level), Some(4));
        });
    }

    #[test]
    fn try_save_skips_while_a_mutation_is_running() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        populated(&store);
        let saved = store.mutate(|_| store.try_save().unwrap());
        assert!(!saved);
        assert!(!dir.path().join("groups.json").exists());

        assert!(store.try_save().unwrap());
        assert!(dir.path().join("groups.json").exists());
    }

    #[test]
    fn missing_dir_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("nope"));
        assert_eq!(store.read(Collections::clone), Collections::default());
    }

    #[tokio::test]
    async fn persist_writes_from_async_context() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::new(dir.path()));
        populated(&store);
        store.clone().persist().await.unwrap();
        assert!(dir.path().join("games.json").exists());
    }

    #[tokio::test]
    async fn chat_lock_is_shared_per_chat() {
        let store = Store::new("unused");
        let guard = store.lock_chat("a").await;
        assert!(store
            .chat_locks
            .lock()
            .unwrap()
            .get("a")
            .map(|l| l.try_lock().is_err())
            .unwrap_or(false));
        let _other = store.lock_chat("b").await;
        drop(guard);
        let _again = store.lock_chat("a").await;
    }
}
