//! Closed identifiers for the supervised services.
//!
//! Service keys used to be free-form strings in the command surface; the
//! enum makes invalid keys unrepresentable past the parsing boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three kinds of bundled services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    WebServer,
    Database,
    Interpreter,
}

/// An interpreter version tag such as `8.2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    /// Accepts dotted numeric tags only (`8.2`, `8.10.1`).
    pub fn new(tag: impl Into<String>) -> Result<Self, ParseServiceKeyError> {
        let tag = tag.into();
        let valid = !tag.is_empty()
            && !tag.starts_with('.')
            && !tag.ends_with('.')
            && tag.chars().all(|c| c.is_ascii_digit() || c == '.');
        if valid {
            Ok(Self(tag))
        } else {
            Err(ParseServiceKeyError {
                input: format!("interpreter-{tag}"),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one supervised service instance. Interpreters are keyed per
/// version so multiple versions can run side by side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKey {
    WebServer,
    Database,
    Interpreter(VersionTag),
}

impl ServiceKey {
    pub fn kind(&self) -> ServiceKind {
        match self {
            Self::WebServer => ServiceKind::WebServer,
            Self::Database => ServiceKind::Database,
            Self::Interpreter(_) => ServiceKind::Interpreter,
        }
    }

    pub fn version(&self) -> Option<&VersionTag> {
        match self {
            Self::Interpreter(tag) => Some(tag),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebServer => f.write_str("web-server"),
            Self::Database => f.write_str("database"),
            Self::Interpreter(tag) => write!(f, "interpreter-{tag}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseServiceKeyError {
    pub input: String,
}

impl fmt::Display for ParseServiceKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown service key '{}'", self.input)
    }
}

impl std::error::Error for ParseServiceKeyError {}

impl FromStr for ServiceKey {
    type Err = ParseServiceKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web-server" => Ok(Self::WebServer),
            "database" => Ok(Self::Database),
            other => match other.strip_prefix("interpreter-") {
                Some(tag) => VersionTag::new(tag).map(Self::Interpreter),
                None => Err(ParseServiceKeyError {
                    input: other.to_string(),
                }),
            },
        }
    }
}
