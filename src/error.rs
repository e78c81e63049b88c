/// Failures of the refresh-grant exchange. All of them are fatal to a rotation.
#[derive(Debug, thiserror::Error)]
pub enum TokenRefreshError {
    #[error("Token refresh request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Token refresh failed with HTTP {code}: {body}")]
    HttpStatus { code: u16, body: String },

    #[error("Failed to parse token response: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("No access token in response")]
    MissingAccessToken,
}

impl TokenRefreshError {
    pub fn code(&self) -> &'static str {
        match self {
            TokenRefreshError::Network(_) => "network_error",
            TokenRefreshError::HttpStatus { .. } => "http_status_error",
            TokenRefreshError::Parse(_) => "parse_error",
            TokenRefreshError::MissingAccessToken => "missing_access_token",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RotateError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid configuration: {detail}")]
    Config { detail: String },

    #[error(transparent)]
    Refresh(#[from] TokenRefreshError),

    #[error("Secret propagation failed for {failed} of {total} target(s)")]
    Propagation { failed: usize, total: usize },

    #[error("Token was rotated but could not be written to {channel}: {source}")]
    OutputWrite {
        channel: String,
        source: std::io::Error,
    },

    #[error("Rotation already ran (state: {state})")]
    AlreadyRan { state: crate::rotation::RotationState },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RotateError {
    /// Error code string for structured JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            RotateError::MissingInput(_) => "missing_input",
            RotateError::Config { .. } => "config_error",
            RotateError::Refresh(e) => e.code(),
            RotateError::Propagation { .. } => "propagation_error",
            RotateError::OutputWrite { .. } => "output_write_error",
            RotateError::AlreadyRan { .. } => "already_ran",
            RotateError::Io(_) => "io_error",
        }
    }

    /// True when the new credential exists upstream even though this run failed.
    pub fn rotation_succeeded(&self) -> bool {
        matches!(
            self,
            RotateError::OutputWrite { .. } | RotateError::Propagation { .. }
        )
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("message".into(), serde_json::Value::String(self.to_string()));
        obj.insert("code".into(), serde_json::Value::String(self.code().to_string()));
        obj.insert(
            "rotated".into(),
            serde_json::Value::Bool(self.rotation_succeeded()),
        );
        serde_json::json!({ "error": obj })
    }
}
