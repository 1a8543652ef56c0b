//! Interpreters turn a raw transport payload into a `Response`.
//!
//! # Design
//! `Interpreter` is a single object-safe trait. The base variants decode one
//! format each; the decorators in [`decorator`] implement the same trait and
//! wrap exactly one inner interpreter, so a chain is always linear and the
//! outermost node runs first. Chains are composed explicitly with
//! [`ChainBuilder`].
//!
//! A non-success status code is reported through `Response::error`, never as
//! a Rust error. `Err` is reserved for payloads that cannot be decoded and
//! for decorator rejections.

pub mod decorator;
mod json;
mod markup;
mod plain;
mod query_string;

pub use decorator::{
    ChainBuilder, NamespaceFix, NamespaceStrip, PostValidate, PreValidate, RawCheck,
    ResponseCheck, ValidationErrors, Validator,
};
pub use json::JsonInterpreter;
pub use markup::MarkupInterpreter;
pub use plain::Plain;
pub use query_string::QueryInterpreter;

use crate::error::CallError;
use crate::request::Request;
use crate::response::{Response, ResponseInformation};

/// Converts `(request, raw payload, metadata)` into a normalized response.
pub trait Interpreter {
    fn interpret(
        &self,
        request: &Request,
        raw: &str,
        info: &ResponseInformation,
    ) -> Result<Response, CallError>;
}

impl<I: Interpreter + ?Sized> Interpreter for Box<I> {
    fn interpret(
        &self,
        request: &Request,
        raw: &str,
        info: &ResponseInformation,
    ) -> Result<Response, CallError> {
        (**self).interpret(request, raw, info)
    }
}

/// Error text for a status outside `[200, 300)`. Status 0 (unset) passes.
pub(crate) fn range_status_error(info: &ResponseInformation) -> Option<String> {
    let code = info.status_code;
    if code == 0 || (200..300).contains(&code) {
        None
    } else {
        Some(info.describe_status())
    }
}

/// Error text for any status other than 200. Status 0 (unset) passes.
pub(crate) fn strict_status_error(info: &ResponseInformation) -> Option<String> {
    match info.status_code {
        0 | 200 => None,
        _ => Some(info.describe_status()),
    }
}

pub(crate) fn finish(response: Response, status_error: Option<String>) -> Response {
    match status_error {
        Some(error) => response.with_error(error),
        None => response,
    }
}
