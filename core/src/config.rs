//! Strict parsing of `Service::config` settings.
//!
//! # Design
//! Settings arrive as a JSON mapping. Every key is checked on its own first so
//! that all problems (unknown keys, mistyped values, source keys given to a
//! single-source service) are reported together; only a fully valid mapping
//! is turned into a `ServiceConfig`, so nothing is ever partially applied.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::CallError;
use crate::request::Credentials;

/// Keys that configure request defaults.
const DEFAULT_KEYS: &[&str] = &[
    "location",
    "port",
    "method",
    "headers",
    "parameters",
    "body",
    "credentials",
    "options",
];

/// Keys only multi-source services accept.
const SOURCE_KEYS: &[&str] = &["path", "local_path", "pattern", "fingerprint"];

/// Parsed `config()` settings. Absent keys are `None` and leave the current
/// value alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub location: Option<String>,
    pub port: Option<u16>,
    pub method: Option<String>,
    pub headers: Option<IndexMap<String, String>>,
    pub parameters: Option<Value>,
    pub body: Option<Value>,
    pub credentials: Option<Credentials>,
    pub options: Option<Map<String, Value>>,
    pub path: Option<String>,
    pub local_path: Option<String>,
    pub pattern: Option<String>,
    pub fingerprint: Option<String>,
}

impl ServiceConfig {
    /// Validate and parse `settings`. `accepts_sources` enables the
    /// multi-source keys.
    pub fn from_value(settings: &Value, accepts_sources: bool) -> Result<Self, CallError> {
        let Value::Object(entries) = settings else {
            return Err(CallError::configuration(vec![
                "settings must be a mapping".to_string(),
            ]));
        };

        let mut errors = Vec::new();
        for (key, value) in entries {
            let key = key.as_str();
            if SOURCE_KEYS.contains(&key) {
                if !accepts_sources {
                    errors.push(format!("'{key}' is only accepted by multi-source services"));
                    continue;
                }
            } else if !DEFAULT_KEYS.contains(&key) {
                errors.push(format!("unknown setting '{key}'"));
                continue;
            }
            let mut single = Map::new();
            single.insert(key.to_string(), value.clone());
            if let Err(e) = serde_json::from_value::<ServiceConfig>(Value::Object(single)) {
                errors.push(format!("'{key}': {e}"));
            }
        }
        if !errors.is_empty() {
            return Err(CallError::configuration(errors));
        }

        serde_json::from_value(settings.clone())
            .map_err(|e| CallError::configuration(vec![e.to_string()]))
    }

    /// The multi-source part of the settings.
    pub fn source(&self) -> SourceConfig {
        SourceConfig {
            path: self.path.clone(),
            local_path: self.local_path.clone(),
            pattern: self.pattern.clone(),
            fingerprint: self.fingerprint.clone(),
        }
    }
}

/// Settings of a multi-source (file or SSH) transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceConfig {
    /// Directory listed for candidates. Falls back to the request location.
    pub path: Option<String>,
    /// Local directory remote files are downloaded into.
    pub local_path: Option<String>,
    /// Glob filter. Falls back to the request method.
    pub pattern: Option<String>,
    /// Expected remote host key fingerprint.
    pub fingerprint: Option<String>,
}

impl SourceConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Overwrite the fields set in `other`.
    pub fn update(&mut self, other: SourceConfig) {
        if other.path.is_some() {
            self.path = other.path;
        }
        if other.local_path.is_some() {
            self.local_path = other.local_path;
        }
        if other.pattern.is_some() {
            self.pattern = other.pattern;
        }
        if other.fingerprint.is_some() {
            self.fingerprint = other.fingerprint;
        }
    }
}
