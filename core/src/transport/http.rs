//! HTTP/REST transport over `ureq`.
//!
//! # Design
//! A call is first described as a plain `HttpRequest` (method, URL, headers,
//! optional body) and then executed by `HttpTransport::execute`, the only
//! place that touches the network. Building is pure and unit-tested; the
//! SOAP transport reuses `execute` with its own envelope.
//!
//! Non-2xx statuses are returned as data: the status lands in
//! `ResponseInformation` and the interpreter decides what it means. Only
//! transport-level failures (DNS, refused connection, broken body) become
//! `CallError::Connectivity`.

use std::str::FromStr;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::CallError;
use crate::query;
use crate::request::{is_empty_value, Credentials, Headers, Request};
use crate::response::{RawPayload, ResponseInformation};
use crate::service::Transport;

/// HTTP method of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl FromStr for HttpMethod {
    type Err = CallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(CallError::invalid_request(format!("unsupported HTTP verb '{other}'"))),
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Describe `request` as an HTTP exchange.
    ///
    /// The URL is `location` with `/method` appended to its path, `port`
    /// applied, and `parameters` encoded into the query string. The verb
    /// comes from the `verb` option, else POST with a body and GET without.
    pub fn from_request(request: &Request) -> Result<Self, CallError> {
        let mut url = endpoint(&request.location, request.port)?;
        append_path(&mut url, &request.method);
        let encoded = query::encode(&request.parameters)?;
        if !encoded.is_empty() {
            let combined = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
                _ => encoded,
            };
            url.set_query(Some(&combined));
        }

        let mut headers = request.headers.clone();
        let body = encode_body(&request.body, &mut headers)?;
        add_basic_auth(&request.credentials, &mut headers);

        let method = match request.option_str("verb") {
            Some(verb) => verb.parse()?,
            None if body.is_some() => HttpMethod::Post,
            None => HttpMethod::Get,
        };
        if body.is_some() && matches!(method, HttpMethod::Get | HttpMethod::Head | HttpMethod::Delete) {
            return Err(CallError::invalid_request(format!(
                "{method:?} requests cannot carry a body"
            )));
        }

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }
}

/// Parse `location` and apply `port`.
pub(crate) fn endpoint(location: &str, port: Option<u16>) -> Result<Url, CallError> {
    if location.is_empty() {
        return Err(CallError::invalid_request("no location given and no default location set"));
    }
    let mut url = Url::parse(location)
        .map_err(|e| CallError::invalid_request(format!("invalid location '{location}': {e}")))?;
    if let Some(port) = port {
        url.set_port(Some(port))
            .map_err(|()| CallError::invalid_request(format!("'{location}' cannot carry a port")))?;
    }
    Ok(url)
}

fn append_path(url: &mut Url, method: &str) {
    let method = method.trim_start_matches('/');
    if method.is_empty() {
        return;
    }
    let base = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{base}/{method}"));
}

/// Strings go out verbatim; any other non-empty value as JSON.
fn encode_body(body: &Value, headers: &mut Headers) -> Result<Option<String>, CallError> {
    if is_empty_value(body) {
        return Ok(None);
    }
    match body {
        Value::String(text) => Ok(Some(text.clone())),
        other => {
            let text = serde_json::to_string(other)
                .map_err(|e| CallError::invalid_request(format!("body is not serialisable: {e}")))?;
            if !headers.contains("content-type") {
                headers.push("content-type", "application/json");
            }
            Ok(Some(text))
        }
    }
}

fn add_basic_auth(credentials: &Credentials, headers: &mut Headers) {
    if credentials.is_empty() || headers.contains("authorization") {
        return;
    }
    let user = match &credentials.domain {
        Some(domain) if !domain.is_empty() => format!("{domain}\\{}", credentials.name),
        _ => credentials.name.clone(),
    };
    let token = STANDARD.encode(format!("{user}:{}", credentials.password));
    headers.push("authorization", format!("Basic {token}"));
}

/// Blocking HTTP transport. The agent is built on the first call and reused.
#[derive(Debug, Default)]
pub struct HttpTransport {
    agent: Option<ureq::Agent>,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overall timeout for each request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn agent(&mut self) -> &ureq::Agent {
        let timeout = self.timeout;
        self.agent.get_or_insert_with(|| {
            debug!("creating HTTP agent");
            ureq::Agent::config_builder()
                .http_status_as_error(false)
                .timeout_global(timeout)
                .build()
                .new_agent()
        })
    }

    /// Perform one round-trip and record status and headers in `info`.
    pub fn execute(
        &mut self,
        request: HttpRequest,
        info: &mut ResponseInformation,
    ) -> Result<String, CallError> {
        let target = request.url.to_string();
        debug!(method = ?request.method, url = %target, "sending HTTP request");
        let agent = self.agent();
        let url = request.url.as_str();

        let result = match request.method {
            HttpMethod::Get => with_headers(agent.get(url), &request.headers).call(),
            HttpMethod::Head => with_headers(agent.head(url), &request.headers).call(),
            HttpMethod::Delete => with_headers(agent.delete(url), &request.headers).call(),
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => {
                let builder = match request.method {
                    HttpMethod::Put => agent.put(url),
                    HttpMethod::Patch => agent.patch(url),
                    _ => agent.post(url),
                };
                let builder = with_headers(builder, &request.headers);
                match &request.body {
                    Some(body) => builder.send(body.as_str()),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(|e| CallError::connectivity(target.as_str(), e))?;

        let status = response.status();
        info.status_code = status.as_u16();
        info.message = status.canonical_reason().unwrap_or_default().to_string();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                info.headers.push(name.as_str(), value);
            }
        }

        response
            .body_mut()
            .read_to_string()
            .map_err(|e| CallError::connectivity(target.as_str(), e))
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &Headers) -> ureq::RequestBuilder<B> {
    for (name, value) in headers.iter() {
        builder = builder.header(name, value);
    }
    builder
}

impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    fn raw_call(
        &mut self,
        request: &Request,
        info: &mut ResponseInformation,
    ) -> Result<RawPayload, CallError> {
        let http = HttpRequest::from_request(request)?;
        self.execute(http, info).map(RawPayload::Single)
    }
}
