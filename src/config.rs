//! Credential loading from the process environment.
//!
//! All five secrets are required up front: a missing credential is a fatal
//! startup error, not something to discover halfway through a run after
//! articles have already been summarized.

use std::env;
use std::fmt;

/// OAuth1 credentials for the posting account plus the LLM API key.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_secret: String,
    pub openrouter_api_key: String,
}

/// Environment variable names, in the order they are reported when missing.
const REQUIRED_VARS: [&str; 5] = [
    "X_API_KEY",
    "X_API_SECRET",
    "X_ACCESS_TOKEN",
    "X_ACCESS_SECRET",
    "OPENROUTER_API_KEY",
];

impl Credentials {
    /// Read all required credentials, reporting every missing variable at
    /// once so the operator fixes the environment in one pass.
    pub fn from_env() -> Result<Self, MissingCredentials> {
        let mut values = Vec::with_capacity(REQUIRED_VARS.len());
        let mut missing = Vec::new();
        for name in REQUIRED_VARS {
            match env::var(name) {
                Ok(v) if !v.trim().is_empty() => values.push(v),
                _ => missing.push(name),
            }
        }
        if !missing.is_empty() {
            return Err(MissingCredentials { names: missing });
        }
        let mut values = values.into_iter();
        Ok(Self {
            api_key: values.next().unwrap_or_default(),
            api_secret: values.next().unwrap_or_default(),
            access_token: values.next().unwrap_or_default(),
            access_secret: values.next().unwrap_or_default(),
            openrouter_api_key: values.next().unwrap_or_default(),
        })
    }
}

// Never let secrets leak into debug/log output.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_secret", &"<redacted>")
            .field("openrouter_api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
pub struct MissingCredentials {
    pub names: Vec<&'static str>,
}

impl fmt::Display for MissingCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "missing required environment variables: {}",
            self.names.join(", ")
        )
    }
}

impl std::error::Error for MissingCredentials {}
