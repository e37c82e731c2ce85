use crate::config::AuthConfig;
use crate::error::EngineError;

/// OAuth grant used for the username/password flow.
pub const PASSWORD_GRANT: &str = "password";

/// Resolved authentication parameters.
///
/// Built once at startup and shared read-only (behind an `Arc`) with the
/// protocol client. There are no setters.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    grant_type: String,
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
    token_url: String,
}

impl Credentials {
    /// Resolve credentials from the `event_stream.auth` section.
    ///
    /// Every field is required; empty (or whitespace-only) values fail
    /// with a `Config` error naming the key.
    pub fn resolve(auth: &AuthConfig) -> Result<Self, EngineError> {
        let up = &auth.user_pass;
        let token_url = required("event_stream.auth.token_url", &auth.token_url)?;
        if !(token_url.starts_with("https://") || token_url.starts_with("http://")) {
            return Err(EngineError::Config(format!(
                "event_stream.auth.token_url: expected http(s) URL, got '{token_url}'"
            )));
        }

        Ok(Self {
            grant_type: PASSWORD_GRANT.to_string(),
            client_id: required("event_stream.auth.user_pass.client_id", &up.client_id)?,
            client_secret: required("event_stream.auth.user_pass.client_secret", &up.client_secret)?,
            username: required("event_stream.auth.user_pass.username", &up.username)?,
            password: required("event_stream.auth.user_pass.password", &up.password)?,
            token_url,
        })
    }

    pub fn grant_type(&self) -> &str {
        &self.grant_type
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

fn required(key: &str, value: &str) -> Result<String, EngineError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EngineError::Config(format!("{key} is required")));
    }
    Ok(value.to_string())
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}
