use std::fmt;

/// A credential value. `Debug` and `Display` never show the contents.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Builds a secret from optional input. Surrounding whitespace is
    /// dropped and blank values count as absent.
    pub fn non_empty(value: Option<String>) -> Option<Self> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Self)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short preview safe for human output: first four characters, then `***`.
    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(4).collect();
        if self.0.chars().count() <= 8 {
            "***".to_string()
        } else {
            format!("{head}***")
        }
    }

    /// Replace every occurrence of this secret in `text`.
    pub fn redact_in(&self, text: &str) -> String {
        if self.0.is_empty() {
            return text.to_string();
        }
        text.replace(&self.0, "***")
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}
