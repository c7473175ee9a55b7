use geoscreen_location::UpdateRequest;
use serde::Deserialize;

/// Errors raised while loading a [`ScreenConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid JSON or has mistyped fields.
    #[error("invalid screen config: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Tunables for [`LocationScreen`](crate::LocationScreen).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Parameters of the live subscription.
    pub updates: UpdateRequest,
    /// Start live updates as soon as a location prompt is granted, instead of
    /// waiting for the next mount.
    pub subscribe_on_grant: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            updates: UpdateRequest::default(),
            subscribe_on_grant: true,
        }
    }
}

impl ScreenConfig {
    /// Parses a JSON document. Missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if the document cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
