//! Explicit session context shared by the stores and the notification
//! listener.
//!
//! A [`Session`] is built once at startup and passed by reference to
//! whatever needs the backend location, credentials, or the identity of
//! the current user. Nothing reads these from global state.

use taskboard_proto::task::UserId;
use url::Url;

/// Errors that can occur when building a [`Session`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The URL could not be parsed.
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        /// The URL as given.
        url: String,
        /// Parser error.
        source: url::ParseError,
    },

    /// The URL uses a scheme this client cannot talk to.
    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Account id.
    pub id: UserId,
    /// Display name.
    pub username: String,
}

/// Backend location plus the credentials and identity of the caller.
#[derive(Debug, Clone)]
pub struct Session {
    api_url: Url,
    ws_url: Option<Url>,
    token: Option<String>,
    actor: Option<Actor>,
}

impl Session {
    /// Creates an anonymous session for the API rooted at `api_url`.
    ///
    /// A trailing slash is added if missing so relative routes resolve
    /// under the API root.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidUrl`] if the URL does not parse, or
    /// [`SessionError::UnsupportedScheme`] if it is not `http`/`https`.
    pub fn new(api_url: &str) -> Result<Self, SessionError> {
        let url = parse_with_trailing_slash(api_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SessionError::UnsupportedScheme(url.scheme().to_string()));
        }
        Ok(Self {
            api_url: url,
            ws_url: None,
            token: None,
            actor: None,
        })
    }

    /// Attaches a bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Attaches the identity of the signed-in user.
    #[must_use]
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Overrides the notification WebSocket URL.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidUrl`] if the URL does not parse, or
    /// [`SessionError::UnsupportedScheme`] if it is not `ws`/`wss`.
    pub fn with_ws_url(mut self, ws_url: &str) -> Result<Self, SessionError> {
        let url = Url::parse(ws_url).map_err(|source| SessionError::InvalidUrl {
            url: ws_url.to_string(),
            source,
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(SessionError::UnsupportedScheme(url.scheme().to_string()));
        }
        self.ws_url = Some(url);
        Ok(self)
    }

    /// Root of the REST API, always ending in `/`.
    #[must_use]
    pub const fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Bearer token, if signed in.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The signed-in user, if known.
    #[must_use]
    pub const fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    /// URL of the notification WebSocket.
    ///
    /// Uses the explicit override if one was set; otherwise derives
    /// `ws(s)://<api host>/ws` from the API URL. The token, if any, is
    /// passed as a `token` query parameter.
    #[must_use]
    pub fn notifications_url(&self) -> Url {
        let mut url = self.ws_url.clone().unwrap_or_else(|| {
            let mut derived = self.api_url.clone();
            let scheme = if self.api_url.scheme() == "https" {
                "wss"
            } else {
                "ws"
            };
            // http -> ws and https -> wss are always permitted.
            let _ = derived.set_scheme(scheme);
            derived.set_path("/ws");
            derived.set_query(None);
            derived
        });
        if let Some(token) = &self.token {
            url.query_pairs_mut().append_pair("token", token);
        }
        url
    }
}

fn parse_with_trailing_slash(raw: &str) -> Result<Url, SessionError> {
    let mut url = Url::parse(raw).map_err(|source| SessionError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
