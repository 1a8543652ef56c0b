//! Normalized responses, transport metadata and raw payloads.

use serde_json::Value;
use uuid::Uuid;

use crate::markup::Element;
use crate::request::Headers;

/// Interpreted payload of a response.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Data {
    /// No data (an empty file, a JSON `null`).
    #[default]
    Empty,
    /// Raw text passed through unchanged.
    Text(String),
    /// Decoded JSON, query string, or converted markup.
    Structured(Value),
    /// Parsed markup tree, kept as a tree.
    Markup(Element),
    /// One entry per source of a merged fan-out.
    List(Vec<Data>),
}

impl Data {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Data]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// The normalized result of one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub data: Data,
    pub status_code: u16,
    /// Empty when the call succeeded.
    pub error: String,
}

impl Response {
    pub fn new(data: Data, status_code: u16) -> Self {
        Self {
            data,
            status_code,
            error: String::new(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

/// Transport metadata for one call. A `status_code` of 0 means unset.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseInformation {
    pub call_id: Uuid,
    pub status_code: u16,
    pub message: String,
    pub headers: Headers,
}

impl ResponseInformation {
    pub fn new() -> Self {
        Self {
            call_id: Uuid::new_v4(),
            status_code: 0,
            message: String::new(),
            headers: Headers::new(),
        }
    }

    pub fn with_status(mut self, status_code: u16, message: impl Into<String>) -> Self {
        self.status_code = status_code;
        self.message = message.into();
        self
    }

    /// Status message, falling back to the numeric code when none was given.
    pub fn describe_status(&self) -> String {
        if self.message.is_empty() {
            format!("status {}", self.status_code)
        } else {
            format!("{} {}", self.status_code, self.message)
        }
    }
}

impl Default for ResponseInformation {
    fn default() -> Self {
        Self::new()
    }
}

/// One retrieved resource of a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub content: String,
}

impl Resource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// What a transport returned before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPayload {
    Single(String),
    Many(Vec<Resource>),
}

impl RawPayload {
    /// Text of a single payload.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(text) => Some(text),
            Self::Many(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_response_is_empty_success() {
        let response = Response::default();
        assert!(response.is_success());
        assert!(response.data.is_empty());
        assert_eq!(response.status_code, 0);
    }

    #[test]
    fn information_gets_a_fresh_call_id() {
        assert_ne!(ResponseInformation::new().call_id, ResponseInformation::new().call_id);
    }

    #[test]
    fn describe_status_falls_back_to_code() {
        let info = ResponseInformation::new().with_status(503, "");
        assert_eq!(info.describe_status(), "status 503");
        let info = ResponseInformation::new().with_status(404, "Not Found");
        assert_eq!(info.describe_status(), "404 Not Found");
    }
}
