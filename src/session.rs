//! Per-session conversation state.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;
use uuid::Uuid;

use crate::render::PlotMode;

/// What the next formula text of a session will be plotted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingMode {
  #[default]
  Idle,
  ExpectExplicit,
  ExpectImplicit,
  ExpectSurface,
}

impl PendingMode {
  pub fn plot_mode(self) -> Option<PlotMode> {
    match self {
      PendingMode::Idle => None,
      PendingMode::ExpectExplicit => Some(PlotMode::Explicit),
      PendingMode::ExpectImplicit => Some(PlotMode::Implicit),
      PendingMode::ExpectSurface => Some(PlotMode::Surface),
    }
  }
}

impl From<PlotMode> for PendingMode {
  fn from(mode: PlotMode) -> Self {
    match mode {
      PlotMode::Explicit => PendingMode::ExpectExplicit,
      PlotMode::Implicit => PendingMode::ExpectImplicit,
      PlotMode::Surface => PendingMode::ExpectSurface,
    }
  }
}

/// Opaque identifier of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
  pub fn generate() -> Self {
    SessionId::from(Uuid::new_v4())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for SessionId {
  fn from(id: &str) -> Self {
    SessionId(id.to_string())
  }
}

impl From<String> for SessionId {
  fn from(id: String) -> Self {
    SessionId(id)
  }
}

impl From<Uuid> for SessionId {
  fn from(id: Uuid) -> Self {
    SessionId(id.to_string())
  }
}

impl fmt::Display for SessionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Default)]
pub struct Session {
  pending: PendingMode,
}

impl Session {
  pub fn pending(&self) -> PendingMode {
    self.pending
  }

  pub fn select(&mut self, mode: PendingMode) {
    self.pending = mode;
  }

  /// Return the pending mode and reset it to `Idle`.
  pub fn take_pending(&mut self) -> PendingMode {
    std::mem::take(&mut self.pending)
  }
}

/// Sessions by id, created on first use and kept for the life of the
/// process.
#[derive(Debug, Default)]
pub struct SessionStore {
  sessions: Mutex<HashMap<SessionId, Arc<Mutex<Session>>>>,
}

impl SessionStore {
  pub fn new() -> Self {
    SessionStore::default()
  }

  /// Handle to the session, creating it if needed. The map lock is only
  /// held for the lookup.
  pub fn session(&self, id: &SessionId) -> Arc<Mutex<Session>> {
    let mut sessions =
      self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
    sessions
      .entry(id.clone())
      .or_insert_with(|| {
        debug!(session = %id, "new session");
        Arc::new(Mutex::new(Session::default()))
      })
      .clone()
  }

  pub fn pending_mode(&self, id: &SessionId) -> PendingMode {
    let session = self.session(id);
    let session = session.lock().unwrap_or_else(PoisonError::into_inner);
    session.pending()
  }

  pub fn len(&self) -> usize {
    self
      .sessions
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn take_pending_resets_to_idle() {
    let mut session = Session::default();
    session.select(PendingMode::ExpectSurface);
    assert_eq!(session.take_pending(), PendingMode::ExpectSurface);
    assert_eq!(session.pending(), PendingMode::Idle);
  }

  #[test]
  fn sessions_are_created_once() {
    let store = SessionStore::new();
    let id = SessionId::from("alice");
    let a = store.session(&id);
    let b = store.session(&id);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(store.len(), 1);
  }

  #[test]
  fn generated_ids_differ() {
    assert_ne!(SessionId::generate(), SessionId::generate());
  }
}
