//! Uniform service calls over HTTP, SOAP, SSH and local files.
//!
//! # Overview
//! A `Service` pairs one transport with request defaults and an interpreter
//! chain. `Service::call(method, call)` merges the call with the defaults,
//! performs the raw transport call and normalizes the payload into a
//! `Response` whose `data` is text, structured JSON, a markup tree or, for
//! fan-out calls, a list of those.
//!
//! ```no_run
//! use callkit_core::{Call, HttpTransport, JsonInterpreter, RequestDefaults, Service};
//!
//! let defaults = RequestDefaults::new().location("http://localhost:3000");
//! let mut users = Service::new(HttpTransport::new(), defaults, Box::new(JsonInterpreter));
//! let response = users.call("users", Call::empty())?;
//! println!("{:?}", response.data);
//! # Ok::<(), callkit_core::CallError>(())
//! ```
//!
//! # Design
//! - The lifecycle is synchronous and single-threaded; a service is used by
//!   one caller at a time (`&mut self`). Transport connections are opened on
//!   the first call and reused.
//! - Requests and defaults are plain values. The effective request is always
//!   a new value; neither the caller's request nor the defaults are mutated.
//! - Interpreters are one object-safe trait. Decorators wrap exactly one
//!   inner interpreter, so chains are linear and composed explicitly.
//! - Network and file access sit behind the `Transport`, `Filesystem`,
//!   `RemoteSession` and `SessionFactory` traits. Everything above them is
//!   deterministic and unit-tested without I/O.
//! - The crate emits `tracing` events and spans but never installs a
//!   subscriber.

pub mod config;
pub mod convert;
pub mod error;
pub mod interpreter;
pub mod markup;
pub mod merge;
pub mod pattern;
pub mod query;
pub mod registry;
pub mod request;
pub mod response;
pub mod service;
pub mod transport;

pub use config::{ServiceConfig, SourceConfig};
pub use convert::StructuralConverter;
pub use error::{CallError, FsError, SessionError};
pub use interpreter::{
    ChainBuilder, Interpreter, JsonInterpreter, MarkupInterpreter, Plain, QueryInterpreter,
    RawCheck, ResponseCheck, ValidationErrors, Validator,
};
pub use markup::{Element, Node, Parser, XmlParser};
pub use merge::ResponseMerger;
pub use pattern::Pattern;
pub use registry::ServiceRegistry;
pub use request::{Credentials, Headers, Request, RequestDefaults};
pub use response::{Data, RawPayload, Resource, Response, ResponseInformation};
pub use service::{Call, CallHooks, CallService, NoHooks, Service, Transport};
pub use transport::{
    FileTransport, Filesystem, HttpTransport, LocalFilesystem, RemoteSession, SessionFactory,
    SessionParams, SoapTransport, SshTransport,
};
