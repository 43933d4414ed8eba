use keyring::Entry;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::common::config::{ClientConfig, SessionBackend};
use crate::common::error::StorageError;
use crate::common::models::Session;

const SERVICE: &str = "advosia";
pub const SESSION_KEY: &str = "advosia_session";

/// Durable home of the persisted `{token, user}` record.
///
/// Every `save` replaces the whole record; there are no partial writes.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<Session>, StorageError>;
    fn save(&self, session: &Session) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Picks the backend named by the configuration.
pub fn storage_from_config(config: &ClientConfig) -> Arc<dyn SessionStorage> {
    match config.session_backend {
        SessionBackend::Keyring => {
            let fallback = config.keyring_fallback.then(|| FileStorage::new(&config.session_file));
            Arc::new(KeyringStorage::new(fallback))
        }
        SessionBackend::File => Arc::new(FileStorage::new(&config.session_file)),
        SessionBackend::Memory => Arc::new(MemoryStorage::default()),
    }
}

fn decode(raw: &str) -> Result<Option<Session>, StorageError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let session: Session = serde_json::from_str(raw)?;
    Ok(session.bearer().is_some().then_some(session))
}

/// OS keyring, optionally falling back to a local file when the keyring is unusable.
pub struct KeyringStorage {
    fallback: Option<FileStorage>,
}

impl KeyringStorage {
    pub fn new(fallback: Option<FileStorage>) -> Self {
        Self { fallback }
    }

    fn entry() -> Entry {
        Entry::new(SERVICE, SESSION_KEY)
    }
}

impl SessionStorage for KeyringStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        match Self::entry().get_password() {
            Ok(raw) => decode(&raw),
            Err(e) => match &self.fallback {
                Some(file) => file.load(),
                None => {
                    log::debug!("no session in keyring: {}", e);
                    Ok(None)
                }
            },
        }
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        let raw = serde_json::to_string(session)?;
        match Self::entry().set_password(&raw) {
            Ok(()) => Ok(()),
            Err(e) => match &self.fallback {
                Some(file) => {
                    // never log the record itself, it carries the token
                    log::warn!("keyring unavailable ({}), persisting session to fallback file", e);
                    file.save(session)
                }
                None => Err(StorageError::FallbackDisabled),
            },
        }
    }

    fn clear(&self) -> Result<(), StorageError> {
        if let Err(e) = Self::entry().delete_password() {
            if !is_missing_entry(&e) {
                log::warn!("failed to delete session from keyring: {}", e);
            }
        }
        if let Some(file) = &self.fallback {
            file.clear()?;
        }
        Ok(())
    }
}

/// Deleting an entry that was never written is not a failure.
fn is_missing_entry(err: &keyring::Error) -> bool {
    matches!(err, keyring::Error::NoEntry)
}

/// JSON file on disk.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        decode(&raw)
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_vec(session)?;
        // write-then-rename so a reader never sees half a record
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// Process-local storage, used by tests and `SESSION_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<Session>>,
}

impl MemoryStorage {
    pub fn with_session(session: Session) -> Self {
        Self { slot: Mutex::new(Some(session)) }
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        *self.slot.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::models::{Role, UserSummary};

    fn sample() -> Session {
        Session::new(
            "tok-123",
            UserSummary { id: 4, name: "Ada".into(), email: "ada@example.com".into(), role: Role::Lawyer },
        )
    }

    #[test]
    fn file_storage_replaces_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested").join("session.json"));
        assert!(storage.load().unwrap().is_none());

        storage.save(&sample()).unwrap();
        assert_eq!(storage.load().unwrap(), Some(sample()));

        let mut other = sample();
        other.token = "tok-456".into();
        storage.save(&other).unwrap();
        assert_eq!(storage.load().unwrap().unwrap().token, "tok-456");

        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
        storage.clear().unwrap();
    }

    #[test]
    fn record_without_token_counts_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"token":"","user":null}"#).unwrap();
        assert!(FileStorage::new(&path).load().unwrap().is_none());
    }

    #[test]
    fn only_real_keyring_failures_count() {
        assert!(is_missing_entry(&keyring::Error::NoEntry));
        assert!(!is_missing_entry(&keyring::Error::BadEncoding(vec![0xff])));
        assert!(!is_missing_entry(&keyring::Error::WrongCredentialPlatform));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(FileStorage::new(&path).load(), Err(StorageError::Serialization(_))));
    }
}
