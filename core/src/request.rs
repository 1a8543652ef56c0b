//! Request values and service-wide request defaults.
//!
//! # Design
//! `Request` is a plain value. Supplementing it with defaults never mutates
//! the caller's instance: `RequestDefaults::supplement` returns a new
//! effective request, so one `Request` can be reused across calls without
//! picking up state from an earlier call.
//!
//! `parameters`, `body` and `options` are opaque JSON values; each transport
//! decides what they mean.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ServiceConfig;

/// Ordered header list. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value for `name`, compared ASCII case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Request headers over `defaults`: every own header is kept, and a
    /// default is added only when no own header shares its name.
    pub fn merged_over(&self, defaults: &Headers) -> Headers {
        let mut merged = self.0.clone();
        for (name, value) in &defaults.0 {
            if !self.contains(name) {
                merged.push((name.clone(), value.clone()));
            }
        }
        Headers(merged)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Login credentials. `domain` is used by transports that support it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub domain: Option<String>,
}

impl Credentials {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Both name and password unset.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.password.is_empty()
    }
}

/// A single call's request.
///
/// `method` names the endpoint, file or operation; `location` is the base
/// address it is resolved against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub location: String,
    pub method: String,
    pub headers: Headers,
    pub parameters: Value,
    pub body: Value,
    pub credentials: Credentials,
    pub port: Option<u16>,
    pub options: Map<String, Value>,
}

impl Request {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Self::default()
        }
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.body = body.into();
        self
    }

    pub fn parameters(mut self, parameters: impl Into<Value>) -> Self {
        self.parameters = parameters.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(name, value);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Same request addressed to another method.
    pub fn with_method(&self, method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..self.clone()
        }
    }

    /// String option, if present.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }
}

/// Fallback values for every request a service issues.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestDefaults {
    pub location: String,
    pub method: String,
    pub headers: Headers,
    pub parameters: Value,
    pub body: Value,
    pub credentials: Credentials,
    pub port: Option<u16>,
    pub options: Map<String, Value>,
}

impl RequestDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(name, value);
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Build the effective request: empty scalar fields take the default,
    /// credentials are replaced wholesale only when the request has none,
    /// headers and options are merged with the request winning.
    pub fn supplement(&self, request: &Request) -> Request {
        let mut effective = request.clone();
        if effective.location.is_empty() {
            effective.location.clone_from(&self.location);
        }
        if effective.method.is_empty() {
            effective.method.clone_from(&self.method);
        }
        if is_empty_value(&effective.parameters) {
            effective.parameters = self.parameters.clone();
        }
        if is_empty_value(&effective.body) {
            effective.body = self.body.clone();
        }
        if effective.credentials.is_empty() && !self.credentials.is_empty() {
            effective.credentials = self.credentials.clone();
        }
        if effective.port.is_none() {
            effective.port = self.port;
        }
        effective.headers = request.headers.merged_over(&self.headers);
        for (key, value) in &self.options {
            if !effective.options.contains_key(key) {
                effective.options.insert(key.clone(), value.clone());
            }
        }
        effective
    }

    /// Overwrite exactly the fields present in `config`.
    pub fn apply(&mut self, config: ServiceConfig) {
        if let Some(location) = config.location {
            self.location = location;
        }
        if let Some(port) = config.port {
            self.port = Some(port);
        }
        if let Some(method) = config.method {
            self.method = method;
        }
        if let Some(headers) = config.headers {
            self.headers = headers.into_iter().collect();
        }
        if let Some(parameters) = config.parameters {
            self.parameters = parameters;
        }
        if let Some(body) = config.body {
            self.body = body;
        }
        if let Some(credentials) = config.credentials {
            self.credentials = credentials;
        }
        if let Some(options) = config.options {
            self.options = options;
        }
    }
}

/// Null, empty string, empty array and empty object all count as unset.
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> RequestDefaults {
        RequestDefaults::new()
            .location("http://localhost:3000")
            .header("X-Foo", "1")
    }

    #[test]
    fn default_header_fills_empty_request() {
        let effective = defaults().supplement(&Request::new("users"));
        assert_eq!(effective.headers.get("X-Foo"), Some("1"));
    }

    #[test]
    fn request_header_wins_on_collision() {
        let request = Request::new("users").header("X-Foo", "2");
        let effective = defaults().supplement(&request);
        assert_eq!(effective.headers.get("X-Foo"), Some("2"));
        assert_eq!(effective.headers.len(), 1);
    }

    #[test]
    fn header_collision_ignores_case() {
        let request = Request::new("users").header("x-foo", "2");
        let effective = defaults().supplement(&request);
        assert_eq!(effective.headers.len(), 1);
        assert_eq!(effective.headers.get("X-FOO"), Some("2"));
    }

    #[test]
    fn supplement_leaves_caller_request_untouched() {
        let request = Request::new("users");
        let _ = defaults().supplement(&request);
        assert!(request.location.is_empty());
        assert!(request.headers.is_empty());
    }

    #[test]
    fn empty_scalars_take_defaults() {
        let mut d = defaults();
        d.body = json!({"a": 1});
        d.parameters = json!({"page": "2"});
        d.port = Some(8080);
        let effective = d.supplement(&Request::new("users").body(""));
        assert_eq!(effective.location, "http://localhost:3000");
        assert_eq!(effective.body, json!({"a": 1}));
        assert_eq!(effective.parameters, json!({"page": "2"}));
        assert_eq!(effective.port, Some(8080));
    }

    #[test]
    fn own_scalars_are_kept() {
        let request = Request::new("users")
            .location("http://other")
            .body(json!({"b": 2}));
        let effective = defaults().supplement(&request);
        assert_eq!(effective.location, "http://other");
        assert_eq!(effective.body, json!({"b": 2}));
    }

    #[test]
    fn credentials_replaced_only_when_request_has_none() {
        let d = defaults().credentials(Credentials::new("admin", "secret"));
        let effective = d.supplement(&Request::new("users"));
        assert_eq!(effective.credentials.name, "admin");

        let own = Request::new("users").credentials(Credentials::new("me", ""));
        let effective = d.supplement(&own);
        assert_eq!(effective.credentials.name, "me");
        assert!(effective.credentials.password.is_empty());
    }

    #[test]
    fn options_merge_with_request_winning() {
        let mut d = defaults();
        d.options.insert("verb".to_string(), json!("GET"));
        d.options.insert("timeout_secs".to_string(), json!(5));
        let effective = d.supplement(&Request::new("users").option("verb", "POST"));
        assert_eq!(effective.option_str("verb"), Some("POST"));
        assert_eq!(effective.options.get("timeout_secs"), Some(&json!(5)));
    }

    #[test]
    fn empty_values() {
        assert!(is_empty_value(&Value::Null));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!({})));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
    }
}
