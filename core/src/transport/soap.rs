//! SOAP 1.1 over the HTTP transport.
//!
//! The request `method` names the operation and `body` holds its arguments
//! as a JSON object. Nested objects become nested elements and arrays repeat
//! their element. The returned payload is the whole response envelope; use
//! a `MarkupInterpreter` (usually behind `NamespaceStrip`) to read it.

use quick_xml::escape::escape;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::CallError;
use crate::markup::{Parser, XmlParser};
use crate::request::Request;
use crate::response::{RawPayload, ResponseInformation};
use crate::service::Transport;

use super::http::{endpoint, HttpMethod, HttpRequest, HttpTransport};

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// SOAP transport. Owns an `HttpTransport` for the round-trip.
#[derive(Debug, Default)]
pub struct SoapTransport {
    http: HttpTransport,
}

impl SoapTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http(http: HttpTransport) -> Self {
        Self { http }
    }
}

impl Transport for SoapTransport {
    fn name(&self) -> &'static str {
        "soap"
    }

    fn validate(&self, request: &Request) -> Result<(), CallError> {
        check_arguments(&request.body)
    }

    fn raw_call(
        &mut self,
        request: &Request,
        info: &mut ResponseInformation,
    ) -> Result<RawPayload, CallError> {
        let http = soap_request(request)?;
        let target = http.url.to_string();
        let text = self.http.execute(http, info)?;

        if let Some(fault) = fault_string(&text) {
            warn!(url = %target, fault = %fault, "SOAP fault");
            return Err(CallError::connectivity_message(target, format!("SOAP fault: {fault}")));
        }
        Ok(RawPayload::Single(text))
    }
}

fn soap_request(request: &Request) -> Result<HttpRequest, CallError> {
    let url = endpoint(&request.location, request.port)?;
    let namespace = request.option_str("namespace");
    let action = match (request.option_str("action"), namespace) {
        (Some(action), _) => action.to_string(),
        (None, Some(ns)) => format!("{}/{}", ns.trim_end_matches('/'), request.method),
        (None, None) => request.method.clone(),
    };

    let envelope = envelope(&request.method, namespace, &request.body)?;
    debug!(operation = %request.method, action = %action, "built SOAP envelope");

    let mut headers = request.headers.clone();
    if !headers.contains("content-type") {
        headers.push("Content-Type", "text/xml; charset=utf-8");
    }
    headers.push("SOAPAction", format!("\"{action}\""));

    Ok(HttpRequest {
        method: HttpMethod::Post,
        url,
        headers,
        body: Some(envelope),
    })
}

/// Build the envelope for `operation` with `arguments`.
pub fn envelope(
    operation: &str,
    namespace: Option<&str>,
    arguments: &Value,
) -> Result<String, CallError> {
    check_name(operation)?;
    let mut out = String::from(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    out.push_str(&format!(r#"<soap:Envelope xmlns:soap="{ENVELOPE_NS}"><soap:Body>"#));

    let tag = match namespace {
        Some(ns) => {
            out.push_str(&format!(r#"<m:{operation} xmlns:m="{}">"#, escape(ns)));
            format!("m:{operation}")
        }
        None => {
            out.push_str(&format!("<{operation}>"));
            operation.to_string()
        }
    };
    check_arguments(arguments)?;
    if let Value::Object(map) = arguments {
        write_fields(map, &mut out)?;
    }
    out.push_str(&format!("</{tag}></soap:Body></soap:Envelope>"));
    Ok(out)
}

/// Operation arguments are a mapping, or null for none.
fn check_arguments(arguments: &Value) -> Result<(), CallError> {
    match arguments {
        Value::Object(_) | Value::Null => Ok(()),
        other => Err(CallError::invalid_request(format!(
            "SOAP operation arguments must be a mapping, got {}",
            kind(other)
        ))),
    }
}

fn write_fields(map: &Map<String, Value>, out: &mut String) -> Result<(), CallError> {
    for (name, value) in map {
        write_element(name, value, out)?;
    }
    Ok(())
}

fn write_element(name: &str, value: &Value, out: &mut String) -> Result<(), CallError> {
    check_name(name)?;
    match value {
        Value::Null => out.push_str(&format!("<{name}/>")),
        Value::Array(items) => {
            for item in items {
                write_element(name, item, out)?;
            }
        }
        Value::Object(map) => {
            out.push_str(&format!("<{name}>"));
            write_fields(map, out)?;
            out.push_str(&format!("</{name}>"));
        }
        Value::String(s) => out.push_str(&format!("<{name}>{}</{name}>", escape(s.as_str()))),
        scalar => out.push_str(&format!("<{name}>{scalar}</{name}>")),
    }
    Ok(())
}

/// XML element names: a letter or `_` followed by letters, digits, `_`,
/// `-` or `.`.
fn check_name(name: &str) -> Result<(), CallError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CallError::invalid_request(format!("'{name}' is not a valid element name")))
    }
}

/// The `faultstring` of a response envelope that carries a `Fault`.
fn fault_string(text: &str) -> Option<String> {
    let root = XmlParser.parse(text).ok()?;
    let fault = root.find("Fault")?;
    let message = fault
        .find("faultstring")
        .map(|e| e.text())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "unspecified fault".to_string());
    Some(message)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
