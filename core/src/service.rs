//! The service call lifecycle.
//!
//! # Design
//! `Service` owns one transport, its request defaults and its interpreter
//! chain, all supplied at construction. A call runs these steps in order and
//! never goes back:
//!
//! 1. build the request (stamp the method on a given request, or assemble
//!    one from body, parameters, headers and options);
//! 2. let the transport validate the request shape;
//! 3. supplement it with the defaults into a new effective request;
//! 4. allocate fresh `ResponseInformation`;
//! 5. run the `before_first_call` hook once per service, then `before`;
//! 6. perform the raw transport call;
//! 7. run the `after_raw` hook;
//! 8. interpret the payload (one interpretation per resource for fan-out
//!    payloads, merged with `ResponseMerger`);
//! 9. run the `after` hook;
//! 10. retain and return the response.
//!
//! Any error aborts the call. The last interpreted response then still
//! reflects the previous successful call.

use serde_json::{Map, Value};
use tracing::{debug, info, info_span, warn};

use crate::config::{ServiceConfig, SourceConfig};
use crate::error::CallError;
use crate::interpreter::Interpreter;
use crate::merge::ResponseMerger;
use crate::request::{Headers, Request, RequestDefaults};
use crate::response::{RawPayload, Response, ResponseInformation};

/// Transport-specific raw call.
pub trait Transport {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Reject malformed requests before any I/O.
    fn validate(&self, _request: &Request) -> Result<(), CallError> {
        Ok(())
    }

    /// Perform the I/O and fill `info` with status and headers.
    fn raw_call(
        &mut self,
        request: &Request,
        info: &mut ResponseInformation,
    ) -> Result<RawPayload, CallError>;

    /// Whether `path`, `local_path`, `pattern` and `fingerprint` settings
    /// are accepted.
    fn accepts_sources(&self) -> bool {
        false
    }

    /// Apply multi-source settings. Must validate before changing anything.
    fn configure_sources(&mut self, _source: SourceConfig) -> Result<(), CallError> {
        Ok(())
    }
}

/// Extension points around a call. Every method defaults to a no-op.
pub trait CallHooks {
    fn before_first_call(&mut self, _request: &Request) -> Result<(), CallError> {
        Ok(())
    }

    fn before(&mut self, _request: &Request) -> Result<(), CallError> {
        Ok(())
    }

    fn after_raw(&mut self, _request: &Request, _raw: &mut RawPayload) -> Result<(), CallError> {
        Ok(())
    }

    fn after(&mut self, _request: &Request, _response: &mut Response) -> Result<(), CallError> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl CallHooks for NoHooks {}

/// What a caller hands to `Service::call`.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// A complete request; only its method is stamped.
    Request(Request),
    /// Loose parts assembled into a new request.
    Parts {
        body: Value,
        parameters: Value,
        headers: Headers,
        options: Map<String, Value>,
    },
}

impl Call {
    /// No body, parameters, headers or options.
    pub fn empty() -> Self {
        Self::Parts {
            body: Value::Null,
            parameters: Value::Null,
            headers: Headers::new(),
            options: Map::new(),
        }
    }

    pub fn body(body: impl Into<Value>) -> Self {
        Self::empty().with_body(body)
    }

    pub fn with_body(self, value: impl Into<Value>) -> Self {
        self.map_parts(|body, _, _, _| *body = value.into())
    }

    pub fn with_parameters(self, value: impl Into<Value>) -> Self {
        self.map_parts(|_, parameters, _, _| *parameters = value.into())
    }

    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.map_parts(|_, _, headers, _| headers.push(name, value))
    }

    pub fn with_option(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.map_parts(|_, _, _, options| {
            options.insert(key.into(), value.into());
        })
    }

    fn map_parts(
        self,
        f: impl FnOnce(&mut Value, &mut Value, &mut Headers, &mut Map<String, Value>),
    ) -> Self {
        match self {
            Self::Parts {
                mut body,
                mut parameters,
                mut headers,
                mut options,
            } => {
                f(&mut body, &mut parameters, &mut headers, &mut options);
                Self::Parts {
                    body,
                    parameters,
                    headers,
                    options,
                }
            }
            request @ Self::Request(_) => request,
        }
    }

    fn into_request(self, method: &str) -> Request {
        match self {
            Self::Request(request) if method.is_empty() => request,
            Self::Request(request) => request.with_method(method),
            Self::Parts {
                body,
                parameters,
                headers,
                options,
            } => Request {
                method: method.to_string(),
                body,
                parameters,
                headers,
                options,
                ..Request::default()
            },
        }
    }
}

impl From<Request> for Call {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

/// A service bound to one transport.
pub struct Service<T: Transport> {
    transport: T,
    defaults: RequestDefaults,
    interpreter: Box<dyn Interpreter>,
    hooks: Box<dyn CallHooks>,
    called: bool,
    last_raw: Option<RawPayload>,
    last_response: Option<Response>,
    last_information: Option<ResponseInformation>,
}

impl<T: Transport> Service<T> {
    pub fn new(transport: T, defaults: RequestDefaults, interpreter: Box<dyn Interpreter>) -> Self {
        Self {
            transport,
            defaults,
            interpreter,
            hooks: Box::new(NoHooks),
            called: false,
            last_raw: None,
            last_response: None,
            last_information: None,
        }
    }

    pub fn with_hooks(mut self, hooks: Box<dyn CallHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Run one call through the full lifecycle.
    pub fn call(&mut self, method: &str, call: impl Into<Call>) -> Result<Response, CallError> {
        let mut information = ResponseInformation::new();
        let span = info_span!(
            "service_call",
            call_id = %information.call_id,
            transport = self.transport.name(),
            method
        );
        let _guard = span.enter();

        let request = call.into().into_request(method);
        self.transport.validate(&request)?;

        let effective = self.defaults.supplement(&request);
        if effective.method.is_empty() {
            return Err(CallError::invalid_request("no method given and no default method set"));
        }
        debug!(location = %effective.location, method = %effective.method, "effective request built");

        let result = self.run(&effective, &mut information);
        self.last_information = Some(information);

        match result {
            Ok(response) => {
                info!(status = response.status_code, success = response.is_success(), "call completed");
                self.last_response = Some(response.clone());
                Ok(response)
            }
            Err(err) => {
                warn!(error = %err, "call failed");
                Err(err)
            }
        }
    }

    /// Shortcut for a complete request carrying its own method.
    pub fn call_request(&mut self, request: Request) -> Result<Response, CallError> {
        let method = request.method.clone();
        self.call(&method, request)
    }

    fn run(
        &mut self,
        request: &Request,
        information: &mut ResponseInformation,
    ) -> Result<Response, CallError> {
        if !self.called {
            self.called = true;
            debug!("running first-call hook");
            self.hooks.before_first_call(request)?;
        }
        self.hooks.before(request)?;

        let mut raw = self.transport.raw_call(request, information)?;
        debug!(status = information.status_code, "raw call returned");
        self.hooks.after_raw(request, &mut raw)?;
        self.last_raw = Some(raw.clone());

        let mut response = match &raw {
            RawPayload::Single(text) => self.interpreter.interpret(request, text, information)?,
            RawPayload::Many(resources) => {
                let mut responses = Vec::with_capacity(resources.len());
                for resource in resources {
                    let per_resource = request.with_method(resource.name.as_str());
                    debug!(resource = %resource.name, "interpreting resource");
                    responses.push(self.interpreter.interpret(
                        &per_resource,
                        &resource.content,
                        information,
                    )?);
                }
                ResponseMerger.merge(responses)
            }
        };

        self.hooks.after(request, &mut response)?;
        Ok(response)
    }

    /// Validate `settings` and apply them. Nothing is applied on error.
    pub fn config(&mut self, settings: &Value) -> Result<&mut Self, CallError> {
        let config = ServiceConfig::from_value(settings, self.transport.accepts_sources())?;
        let source = config.source();
        if !source.is_empty() {
            self.transport.configure_sources(source)?;
        }
        self.defaults.apply(config);
        debug!(transport = self.transport.name(), "configuration applied");
        Ok(self)
    }

    pub fn last_raw_response(&self) -> Option<&RawPayload> {
        self.last_raw.as_ref()
    }

    pub fn last_interpreted_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    pub fn last_response_information(&self) -> Option<&ResponseInformation> {
        self.last_information.as_ref()
    }

    pub fn interpreter(&self) -> &dyn Interpreter {
        self.interpreter.as_ref()
    }

    pub fn set_interpreter(&mut self, interpreter: Box<dyn Interpreter>) {
        self.interpreter = interpreter;
    }

    pub fn request_defaults(&self) -> &RequestDefaults {
        &self.defaults
    }

    pub fn set_request_defaults(&mut self, defaults: RequestDefaults) {
        self.defaults = defaults;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Drop the retained raw payload, response and metadata.
    pub fn free(&mut self) {
        self.last_raw = None;
        self.last_response = None;
        self.last_information = None;
    }
}

/// Object-safe face of a `Service`, for keyed collections of services over
/// different transports.
pub trait CallService {
    fn call(&mut self, method: &str, call: Call) -> Result<Response, CallError>;
    fn config(&mut self, settings: &Value) -> Result<(), CallError>;
    fn last_interpreted_response(&self) -> Option<&Response>;
    fn free(&mut self);
}

impl<T: Transport> CallService for Service<T> {
    fn call(&mut self, method: &str, call: Call) -> Result<Response, CallError> {
        Service::call(self, method, call)
    }

    fn config(&mut self, settings: &Value) -> Result<(), CallError> {
        Service::config(self, settings).map(|_| ())
    }

    fn last_interpreted_response(&self) -> Option<&Response> {
        Service::last_interpreted_response(self)
    }

    fn free(&mut self) {
        Service::free(self);
    }
}
