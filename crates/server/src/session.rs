//! Server-side session store. Each browser gets a UUID key in an HttpOnly
//! cookie; the record behind it holds the FieldView tokens, the user, and the
//! eagerly cached field list. Sessions live in process memory only and are
//! lost on restart.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use axum::extract::Request;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use shared::domain::{Field, FieldViewUser};

pub const SESSION_COOKIE: &str = "sid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey(pub Uuid);

impl SessionKey {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<FieldViewUser>,
    pub fields: Option<Vec<Field>>,
}

/// Partial session write; only populated members are merged into the record,
/// the rest keep their prior values.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<FieldViewUser>,
    pub fields: Option<Vec<Field>>,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    /// Clone of the current record; an unknown key reads as the all-absent
    /// session.
    pub fn snapshot(&self, key: SessionKey) -> Session {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key.0)
            .cloned()
            .unwrap_or_default()
    }

    pub fn apply(&self, key: SessionKey, update: SessionUpdate) {
        let mut sessions = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.entry(key.0).or_default();
        if let Some(access_token) = update.access_token {
            session.access_token = Some(access_token);
        }
        if let Some(refresh_token) = update.refresh_token {
            session.refresh_token = Some(refresh_token);
        }
        if let Some(user) = update.user {
            session.user = Some(user);
        }
        if let Some(fields) = update.fields {
            session.fields = Some(fields);
        }
    }

    pub fn clear(&self, key: SessionKey) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key.0);
    }
}

/// Ensures every request carries a session key: an existing `sid` cookie is
/// reused, otherwise a fresh key is minted and set on the response.
pub async fn attach_session(mut request: Request, next: Next) -> Response {
    let existing = cookie_session_key(request.headers());
    let key = existing.unwrap_or_else(SessionKey::fresh);
    request.extensions_mut().insert(key);

    let mut response = next.run(request).await;
    if existing.is_none() {
        let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly", key.0);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

fn cookie_session_key(headers: &HeaderMap) -> Option<SessionKey> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            pair.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .find_map(|raw| Uuid::parse_str(raw).ok())
        .map(SessionKey)
}
