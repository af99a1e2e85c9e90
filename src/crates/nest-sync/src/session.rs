//! Session context: who is signed in and what they are looking at

use crate::feed::View;
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct SessionState {
    active_view: View,
    user: Option<String>,
    credential: Option<String>,
}

/// Shared, explicitly-passed session state
///
/// Held behind an `Arc` by the feed controller, the router's caller and the
/// sync session.
#[derive(Debug, Default)]
pub struct SessionContext {
    inner: RwLock<SessionState>,
}

impl SessionContext {
    /// Create a signed-out session looking at the main feed
    pub fn new() -> Self {
        Self::default()
    }

    /// View currently on screen
    pub fn active_view(&self) -> View {
        self.inner.read().active_view
    }

    /// Switch views, returning the previous one
    pub fn set_active_view(&self, view: View) -> View {
        std::mem::replace(&mut self.inner.write().active_view, view)
    }

    /// Signed-in user name
    pub fn user(&self) -> Option<String> {
        self.inner.read().user.clone()
    }

    /// Bearer credential
    pub fn credential(&self) -> Option<String> {
        self.inner.read().credential.clone()
    }

    /// Whether a credential is present
    pub fn is_signed_in(&self) -> bool {
        self.inner.read().credential.is_some()
    }

    /// Store the user and credential
    pub fn sign_in(&self, user: Option<String>, credential: impl Into<String>) {
        let mut state = self.inner.write();
        state.user = user;
        state.credential = Some(credential.into());
    }

    /// Forget the user and credential, returning the revoked credential
    pub fn sign_out(&self) -> Option<String> {
        let mut state = self.inner.write();
        state.user = None;
        state.credential.take()
    }
}
