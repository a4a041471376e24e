//! Credential ownership.
//!
//! The [`Session`] is the single authority over the bearer token. Every
//! component reads the token through it at the moment of use, never caching
//! a copy across an `.await`, because an unauthorized response elsewhere can
//! clear it mid-flight.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TokenStoreError {
  #[error("failed to access token file {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("could not determine data directory")]
  NoDataDir,
}

/// Persistence for a single bearer token.
pub trait TokenStore: Send + Sync {
  fn get(&self) -> Option<String>;
  fn set(&self, token: &str) -> Result<(), TokenStoreError>;
  fn remove(&self) -> Result<(), TokenStoreError>;
}

/// Token store that lives only as long as the process.
#[derive(Default)]
pub struct MemoryTokenStore {
  token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
  pub fn with_token(token: &str) -> Self {
    Self {
      token: Mutex::new(Some(token.to_string())),
    }
  }

  fn slot(&self) -> MutexGuard<'_, Option<String>> {
    self.token.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl TokenStore for MemoryTokenStore {
  fn get(&self) -> Option<String> {
    self.slot().clone()
  }

  fn set(&self, token: &str) -> Result<(), TokenStoreError> {
    *self.slot() = Some(token.to_string());
    Ok(())
  }

  fn remove(&self) -> Result<(), TokenStoreError> {
    *self.slot() = None;
    Ok(())
  }
}

/// Token store backed by a file in the user's data directory.
pub struct FileTokenStore {
  path: PathBuf,
}

impl FileTokenStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Open the store at the default location.
  pub fn open_default() -> Result<Self, TokenStoreError> {
    Ok(Self::new(Self::default_path()?))
  }

  /// Get the default token path
  pub fn default_path() -> Result<PathBuf, TokenStoreError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or(TokenStoreError::NoDataDir)?;

    Ok(data_dir.join("flightdesk").join("token"))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn io_error(&self, source: std::io::Error) -> TokenStoreError {
    TokenStoreError::Io {
      path: self.path.clone(),
      source,
    }
  }
}

impl TokenStore for FileTokenStore {
  fn get(&self) -> Option<String> {
    let contents = std::fs::read_to_string(&self.path).ok()?;
    let token = contents.trim();
    if token.is_empty() {
      None
    } else {
      Some(token.to_string())
    }
  }

  fn set(&self, token: &str) -> Result<(), TokenStoreError> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
    }
    std::fs::write(&self.path, token).map_err(|e| self.io_error(e))
  }

  fn remove(&self) -> Result<(), TokenStoreError> {
    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(self.io_error(e)),
    }
  }
}

/// Signals emitted by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
  /// The credential was rejected; the operator must authenticate again.
  LoginRequired,
}

struct SessionInner {
  store: Box<dyn TokenStore>,
  token: RwLock<Option<String>>,
  events: mpsc::UnboundedSender<SessionEvent>,
}

/// Shared handle to the current credential.
#[derive(Clone)]
pub struct Session {
  inner: Arc<SessionInner>,
}

impl Session {
  /// Create a session whose events are dropped.
  pub fn new(store: impl TokenStore + 'static) -> Self {
    Self::with_events(store).0
  }

  /// Create a session together with the receiving end of its event channel.
  pub fn with_events(
    store: impl TokenStore + 'static,
  ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let token = store.get();
    let session = Self {
      inner: Arc::new(SessionInner {
        store: Box::new(store),
        token: RwLock::new(token),
        events: tx,
      }),
    };
    (session, rx)
  }

  /// Current bearer token, if any.
  pub fn token(&self) -> Option<String> {
    self
      .inner
      .token
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  pub fn is_authenticated(&self) -> bool {
    self.token().is_some()
  }

  /// Store a freshly issued token.
  pub fn set_token(&self, token: &str) -> Result<(), TokenStoreError> {
    self.inner.store.set(token)?;
    *self.inner.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
    debug!("session token stored");
    Ok(())
  }

  /// Remove the token without signalling (explicit logout).
  pub fn clear(&self) -> Result<(), TokenStoreError> {
    self.take_token();
    self.inner.store.remove()
  }

  /// Drop the credential after an unauthorized response.
  ///
  /// Emits [`SessionEvent::LoginRequired`] only when a token was actually
  /// present, so concurrent 401s produce a single signal. Returns whether
  /// this call performed the transition.
  pub fn expire(&self) -> bool {
    if self.take_token().is_none() {
      return false;
    }
    if let Err(e) = self.inner.store.remove() {
      warn!(error = %e, "failed to remove persisted token");
    }
    warn!("session expired, login required");
    let _ = self.inner.events.send(SessionEvent::LoginRequired);
    true
  }

  fn take_token(&self) -> Option<String> {
    self
      .inner
      .token
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .take()
  }
}

impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("authenticated", &self.is_authenticated())
      .finish_non_exhaustive()
  }
}
