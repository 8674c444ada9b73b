use async_trait::async_trait;
use base64::prelude::{Engine, BASE64_STANDARD};

/// Type to represent an authentication error message.
pub type AuthError = String;

/// Trait used to represent a user-defined custom authentication.
///
/// The provider is asked for credentials before every request and the
/// returned value is sent as the `Authorization` header to whichever host
/// the request goes to.
///
/// The authenticator can be set using `DatabaseBuilder::authenticator_provider`.
/// `DatabaseBuilder::user` and `DatabaseBuilder::bearer_token` install
/// [`PlainTextAuthenticator`] and [`BearerTokenAuthenticator`].
#[async_trait]
pub trait AuthenticatorProvider: Sync + Send {
    /// Returns the value of the `Authorization` header,
    /// or `None` if the request should be sent without one.
    async fn authorization_header(&self) -> Result<Option<String>, AuthError>;
}

/// Authenticator provider that sends a username and password with HTTP basic authentication.
pub struct PlainTextAuthenticator {
    username: String,
    password: String,
}

impl PlainTextAuthenticator {
    /// Creates new [`PlainTextAuthenticator`] instance with provided username and password.
    pub fn new(username: String, password: String) -> Self {
        PlainTextAuthenticator { username, password }
    }
}

#[async_trait]
impl AuthenticatorProvider for PlainTextAuthenticator {
    async fn authorization_header(&self) -> Result<Option<String>, AuthError> {
        let credentials = format!("{}:{}", self.username, self.password);
        Ok(Some(format!("Basic {}", BASE64_STANDARD.encode(credentials))))
    }
}

/// Authenticator provider that sends a JWT bearer token.
pub struct BearerTokenAuthenticator {
    token: String,
}

impl BearerTokenAuthenticator {
    /// Creates new [`BearerTokenAuthenticator`] instance with provided token.
    pub fn new(token: String) -> Self {
        BearerTokenAuthenticator { token }
    }
}

#[async_trait]
impl AuthenticatorProvider for BearerTokenAuthenticator {
    async fn authorization_header(&self) -> Result<Option<String>, AuthError> {
        Ok(Some(format!("Bearer {}", self.token)))
    }
}
