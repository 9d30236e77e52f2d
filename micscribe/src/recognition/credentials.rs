/// Service credentials loaded from a local file
///
/// The file path comes from an environment variable, read once at startup.

use crate::recognition::error::{RecognitionError, RecognitionResult};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Default environment variable naming the credential file
pub const DEFAULT_CREDENTIALS_ENV: &str = "MICSCRIBE_CREDENTIALS";

/// Credentials for the recognition service
///
/// The file is JSON: `{ "api_key": "..." }`.
#[derive(Deserialize, Clone, PartialEq)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Build credentials from a key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Load credentials from the file named by `env_var`
    ///
    /// # Returns
    /// * `Ok(Some(credentials))` - the variable is set and the file is valid
    /// * `Ok(None)` - the variable is unset; the client connects anonymously
    ///
    /// # Errors
    /// Returns `RecognitionError::Credentials` if the file cannot be read or
    /// parsed.
    pub fn from_env(env_var: &str) -> RecognitionResult<Option<Self>> {
        match std::env::var_os(env_var) {
            Some(path) => {
                debug!("Loading credentials from ${}", env_var);
                Self::from_file(Path::new(&path)).map(Some)
            }
            None => {
                warn!("{} is not set, connecting without credentials", env_var);
                Ok(None)
            }
        }
    }

    /// Load credentials from a JSON file
    pub fn from_file(path: &Path) -> RecognitionResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RecognitionError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;

        let credentials: Self = serde_json::from_str(&content).map_err(|e| {
            RecognitionError::Credentials(format!("cannot parse {}: {}", path.display(), e))
        })?;

        if credentials.api_key.trim().is_empty() {
            return Err(RecognitionError::Credentials(format!(
                "{} has an empty api_key",
                path.display()
            )));
        }

        Ok(credentials)
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}
