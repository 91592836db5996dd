//! Client-side session cache
//!
//! Keeps the last known identity and token across reloads and reconciles
//! them against the server. The server is the source of truth: the cached
//! snapshot only fills gaps the server leaves empty, and any failed
//! verification is a hard logout.
//!
//! The session is sans-IO. It tells the caller which token to verify
//! ([`Session::pending_verification`]) and is then fed the outcome
//! ([`Session::complete_verification`]); persistence goes through an
//! injected [`SessionStorage`].

use crate::errors::{ClaimsError, SessionError};
use crate::location::Location;
use crate::types::PublicUser;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

/// What survives a reload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub user: PublicUser,
}

/// Local persistence for the session snapshot
pub trait SessionStorage {
    fn load(&self) -> Result<Option<PersistedSession>, SessionError>;
    fn save(&mut self, session: &PersistedSession) -> Result<(), SessionError>;
    fn clear(&mut self) -> Result<(), SessionError>;
}

/// In-memory storage, mostly for tests and short-lived clients
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    inner: Option<PersistedSession>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: PersistedSession) -> Self {
        Self {
            inner: Some(snapshot),
        }
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedSession>, SessionError> {
        Ok(self.inner.clone())
    }

    fn save(&mut self, session: &PersistedSession) -> Result<(), SessionError> {
        self.inner = Some(session.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SessionError> {
        self.inner = None;
        Ok(())
    }
}

/// JSON file storage for native clients
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<PersistedSession>, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, session: &PersistedSession) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Lifecycle state of the client session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    /// Restored from storage, waiting for the server to confirm the token
    Verifying { token: String, cached: PublicUser },
    Authenticated { token: String, user: PublicUser },
}

/// Why a verification did not produce an identity.
///
/// All variants lead to the same hard logout; transient failures are not
/// distinguished from rejected tokens at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    Unauthorized,
    Server(u16),
    Network(String),
}

/// Merge a server response into a cached identity.
///
/// A server field wins only when it is non-empty; otherwise the cached value
/// is kept, so a verification can never blank a known display name.
pub fn merge_identity(cached: &PublicUser, server: &PublicUser) -> PublicUser {
    PublicUser {
        id: prefer(&server.id, &cached.id),
        username: prefer(&server.username, &cached.username),
        name: prefer(&server.name, &cached.name),
        email: prefer(&server.email, &cached.email),
        profile_image: prefer(&server.profile_image, &cached.profile_image),
        location: Location {
            city: prefer(&server.location.city, &cached.location.city),
            country: prefer(&server.location.country, &cached.location.country),
        },
        bio: prefer(&server.bio, &cached.bio),
    }
}

fn prefer(server: &str, cached: &str) -> String {
    if server.trim().is_empty() {
        cached.to_string()
    } else {
        server.to_string()
    }
}

/// Explicit, injectable session context
#[derive(Debug)]
pub struct Session<S: SessionStorage> {
    storage: S,
    state: SessionState,
}

impl<S: SessionStorage> Session<S> {
    /// Initialise from the persisted snapshot.
    ///
    /// A stored token moves the session to `Verifying`; no token, or an
    /// unreadable snapshot (which is also wiped), leaves it anonymous. Fails
    /// only when an unreadable snapshot cannot be wiped.
    pub fn restore(mut storage: S) -> Result<Self, SessionError> {
        let state = match storage.load() {
            Ok(Some(snapshot)) if !snapshot.token.is_empty() => SessionState::Verifying {
                token: snapshot.token,
                cached: snapshot.user,
            },
            Ok(_) => SessionState::Anonymous,
            Err(_) => {
                storage.clear()?;
                SessionState::Anonymous
            }
        };
        Ok(Self { storage, state })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Token the caller should send to `GET /auth/verify`, if any
    pub fn pending_verification(&self) -> Option<&str> {
        match &self.state {
            SessionState::Verifying { token, .. } => Some(token),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    /// Token to attach to outgoing requests
    pub fn token(&self) -> Option<&str> {
        match &self.state {
            SessionState::Verifying { token, .. } | SessionState::Authenticated { token, .. } => {
                Some(token)
            }
            SessionState::Anonymous => None,
        }
    }

    /// Best known identity, verified or not
    pub fn current_user(&self) -> Option<&PublicUser> {
        match &self.state {
            SessionState::Verifying { cached, .. } => Some(cached),
            SessionState::Authenticated { user, .. } => Some(user),
            SessionState::Anonymous => None,
        }
    }

    /// Feed the outcome of the startup verification
    pub fn complete_verification(
        &mut self,
        outcome: Result<PublicUser, VerificationFailure>,
    ) -> Result<&SessionState, SessionError> {
        let token = match self.token() {
            Some(token) => token.to_string(),
            None => return Ok(&self.state),
        };

        match outcome {
            Ok(server) => {
                let cached = self.current_user().cloned().unwrap_or_default();
                let user = merge_identity(&cached, &server);
                self.authenticate(token, user)?;
            }
            Err(_) => self.logout()?,
        }
        Ok(&self.state)
    }

    /// Store the result of a successful login or registration
    pub fn login(&mut self, token: String, user: PublicUser) -> Result<(), SessionError> {
        self.authenticate(token, user)
    }

    /// Apply the server's answer to a profile update
    pub fn apply_profile_update(&mut self, server: PublicUser) -> Result<(), SessionError> {
        let token = match self.token() {
            Some(token) => token.to_string(),
            None => return Ok(()),
        };
        let cached = self.current_user().cloned().unwrap_or_default();
        let user = merge_identity(&cached, &server);
        self.authenticate(token, user)
    }

    /// Clear token and identity
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.state = SessionState::Anonymous;
        self.storage.clear()
    }

    /// Global response hook: any 401 forces a logout, whichever gate
    /// rejection caused it. Returns whether the session was cleared.
    pub fn handle_response_status(&mut self, status: u16) -> Result<bool, SessionError> {
        if status == 401 && !matches!(self.state, SessionState::Anonymous) {
            self.logout()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Unverified claims of the current token, for display only
    pub fn display_hint(&self) -> Option<ClaimsHint> {
        self.token().and_then(|t| decode_claims_hint(t).ok())
    }

    fn authenticate(&mut self, token: String, user: PublicUser) -> Result<(), SessionError> {
        self.storage.save(&PersistedSession {
            token: token.clone(),
            user: user.clone(),
        })?;
        self.state = SessionState::Authenticated { token, user };
        Ok(())
    }
}

/// Claims read from a token without checking its signature.
///
/// A rendering hint only: nothing about permissions may depend on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsHint {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ClaimsHint {
    /// Whether the hinted expiry lies before `now` (unix seconds)
    pub fn looks_expired(&self, now: i64) -> bool {
        self.exp.map(|exp| exp <= now).unwrap_or(false)
    }
}

pub fn decode_claims_hint(token: &str) -> Result<ClaimsHint, ClaimsError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(ClaimsError::Malformed),
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| ClaimsError::Encoding)?;
    serde_json::from_slice(&bytes).map_err(|_| ClaimsError::Payload)
}
