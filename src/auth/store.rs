use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::StorageError;
use super::token::AccessToken;

const SESSION_FILE_VERSION: u32 = 1;

/// Persistence backend for the access token (the browser-storage role).
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> Result<Option<AccessToken>, StorageError>;
    fn save(&self, token: &AccessToken) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// File-backed token storage using a small TOML file.
///
/// # Example
/// ```no_run
/// use quill::auth::{AccessToken, FileTokenStorage, TokenStorage};
///
/// let storage = FileTokenStorage::new("/tmp/quill/session.toml");
/// storage.save(&AccessToken::new("access"))?;
/// # Ok::<(), quill::auth::StorageError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open for writing, owner-only from the moment the file exists.
    fn open_private(path: &Path) -> Result<fs::File, StorageError> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            options.mode(0o600);
            let handle = options.open(path)?;
            // `mode` only applies on creation; tighten a file that predates it.
            handle.set_permissions(fs::Permissions::from_mode(0o600))?;
            Ok(handle)
        }
        #[cfg(not(unix))]
        {
            Ok(options.open(path)?)
        }
    }

    fn ensure_parent(path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<AccessToken>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::Io(err.to_string())),
        };
        let file: SessionFile = toml::from_str(&raw)?;
        if file.version != SESSION_FILE_VERSION {
            return Err(StorageError::UnsupportedVersion(file.version));
        }
        Ok(Some(file.access_token))
    }

    fn save(&self, token: &AccessToken) -> Result<(), StorageError> {
        Self::ensure_parent(&self.path)?;
        let file = SessionFile {
            version: SESSION_FILE_VERSION,
            access_token: token.clone(),
            saved_at: Utc::now(),
        };
        let serialized = toml::to_string(&file)?;
        let mut handle = Self::open_private(&self.path)?;
        handle.write_all(serialized.as_bytes())?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    version: u32,
    access_token: AccessToken,
    saved_at: DateTime<Utc>,
}

/// Process-local storage, for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<AccessToken>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }

    /// What is currently persisted.
    pub fn persisted(&self) -> Option<AccessToken> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Result<Option<AccessToken>, StorageError> {
        Ok(self.persisted())
    }

    fn save(&self, token: &AccessToken) -> Result<(), StorageError> {
        *self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}

/// Single source of truth for the access token.
///
/// Holds the in-memory value and mirrors every change into a [`TokenStorage`].
/// The in-memory value is authoritative: if persisting fails, memory is still
/// updated and the storage error is returned to the caller.
pub struct TokenStore {
    current: RwLock<Option<AccessToken>>,
    storage: Arc<dyn TokenStorage>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl TokenStore {
    /// Create an empty store; nothing is read from `storage`.
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            current: RwLock::new(None),
            storage,
        }
    }

    /// Create a store hydrated from whatever `storage` holds.
    pub fn load(storage: Arc<dyn TokenStorage>) -> Result<Self, StorageError> {
        let current = storage.load()?.filter(|token| !token.is_empty());
        Ok(Self {
            current: RwLock::new(current),
            storage,
        })
    }

    /// Store backed only by process memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStorage::new()))
    }

    pub fn get(&self) -> Option<AccessToken> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set(&self, token: AccessToken) -> Result<(), StorageError> {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.clone());
        self.storage.save(&token)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        self.storage.clear()
    }

    pub fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }
}
