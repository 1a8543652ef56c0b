//! Interpreter decorators: validation and namespace rewriting.
//!
//! Each decorator owns exactly one inner interpreter and implements
//! `Interpreter` itself. Validation runs either on the raw payload
//! (`PreValidate`, inner never called on failure) or on the produced
//! response (`PostValidate`, response discarded on failure). The namespace
//! decorators rewrite markup text before handing it on, so they must sit
//! outside the markup interpreter they feed.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::warn;

use super::Interpreter;
use crate::error::CallError;
use crate::request::Request;
use crate::response::{Response, ResponseInformation};

/// Accumulated validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    fn into_result(self) -> Result<(), CallError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(CallError::validation(self.0))
        }
    }
}

/// Checks a raw payload, a response, or both.
pub trait Validator {
    fn validate_raw(&self, _request: &Request, _raw: &str) -> ValidationErrors {
        ValidationErrors::new()
    }

    fn validate_response(&self, _response: &Response) -> ValidationErrors {
        ValidationErrors::new()
    }
}

/// Raw-payload validator from a closure.
pub struct RawCheck<F>(pub F);

impl<F> RawCheck<F>
where
    F: Fn(&Request, &str, &mut ValidationErrors),
{
    pub fn new(check: F) -> Self {
        Self(check)
    }
}

impl<F> Validator for RawCheck<F>
where
    F: Fn(&Request, &str, &mut ValidationErrors),
{
    fn validate_raw(&self, request: &Request, raw: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        (self.0)(request, raw, &mut errors);
        errors
    }
}

/// Response validator from a closure.
pub struct ResponseCheck<F>(pub F);

impl<F> ResponseCheck<F>
where
    F: Fn(&Response, &mut ValidationErrors),
{
    pub fn new(check: F) -> Self {
        Self(check)
    }
}

impl<F> Validator for ResponseCheck<F>
where
    F: Fn(&Response, &mut ValidationErrors),
{
    fn validate_response(&self, response: &Response) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        (self.0)(response, &mut errors);
        errors
    }
}

/// Validates the raw payload before delegating.
pub struct PreValidate {
    inner: Box<dyn Interpreter>,
    validator: Box<dyn Validator>,
}

impl PreValidate {
    pub fn new(inner: Box<dyn Interpreter>, validator: Box<dyn Validator>) -> Self {
        Self { inner, validator }
    }
}

impl Interpreter for PreValidate {
    fn interpret(
        &self,
        request: &Request,
        raw: &str,
        info: &ResponseInformation,
    ) -> Result<Response, CallError> {
        let errors = self.validator.validate_raw(request, raw);
        if !errors.is_empty() {
            warn!(method = %request.method, errors = ?errors.messages(), "raw payload rejected");
        }
        errors.into_result()?;
        self.inner.interpret(request, raw, info)
    }
}

/// Validates the response after delegating.
pub struct PostValidate {
    inner: Box<dyn Interpreter>,
    validator: Box<dyn Validator>,
}

impl PostValidate {
    pub fn new(inner: Box<dyn Interpreter>, validator: Box<dyn Validator>) -> Self {
        Self { inner, validator }
    }
}

impl Interpreter for PostValidate {
    fn interpret(
        &self,
        request: &Request,
        raw: &str,
        info: &ResponseInformation,
    ) -> Result<Response, CallError> {
        let response = self.inner.interpret(request, raw, info)?;
        let errors = self.validator.validate_response(&response);
        if !errors.is_empty() {
            warn!(method = %request.method, errors = ?errors.messages(), "response rejected");
        }
        errors.into_result()?;
        Ok(response)
    }
}

/// Rewrites relative namespace URIs to `http://` form before delegating.
pub struct NamespaceFix {
    inner: Box<dyn Interpreter>,
}

impl NamespaceFix {
    pub fn new(inner: Box<dyn Interpreter>) -> Self {
        Self { inner }
    }
}

impl Interpreter for NamespaceFix {
    fn interpret(
        &self,
        request: &Request,
        raw: &str,
        info: &ResponseInformation,
    ) -> Result<Response, CallError> {
        self.inner.interpret(request, &fix_namespaces(raw), info)
    }
}

/// Removes namespace declarations and name prefixes before delegating.
pub struct NamespaceStrip {
    inner: Box<dyn Interpreter>,
}

impl NamespaceStrip {
    pub fn new(inner: Box<dyn Interpreter>) -> Self {
        Self { inner }
    }
}

impl Interpreter for NamespaceStrip {
    fn interpret(
        &self,
        request: &Request,
        raw: &str,
        info: &ResponseInformation,
    ) -> Result<Response, CallError> {
        self.inner.interpret(request, &strip_namespaces(raw), info)
    }
}

/// Builds a linear chain. Every call wraps the chain built so far, so the
/// last decorator added is the first to run.
///
/// ```
/// use callkit_core::interpreter::{ChainBuilder, MarkupInterpreter, RawCheck};
///
/// let chain = ChainBuilder::new(MarkupInterpreter::new())
///     .strip_namespaces()
///     .pre_validate(RawCheck::new(|_, raw, errors| {
///         if raw.is_empty() {
///             errors.push("empty payload");
///         }
///     }))
///     .build();
/// # let _ = chain;
/// ```
pub struct ChainBuilder {
    chain: Box<dyn Interpreter>,
}

impl ChainBuilder {
    pub fn new(base: impl Interpreter + 'static) -> Self {
        Self {
            chain: Box::new(base),
        }
    }

    pub fn fix_namespaces(self) -> Self {
        Self {
            chain: Box::new(NamespaceFix::new(self.chain)),
        }
    }

    pub fn strip_namespaces(self) -> Self {
        Self {
            chain: Box::new(NamespaceStrip::new(self.chain)),
        }
    }

    pub fn pre_validate(self, validator: impl Validator + 'static) -> Self {
        Self {
            chain: Box::new(PreValidate::new(self.chain, Box::new(validator))),
        }
    }

    pub fn post_validate(self, validator: impl Validator + 'static) -> Self {
        Self {
            chain: Box::new(PostValidate::new(self.chain, Box::new(validator))),
        }
    }

    pub fn build(self) -> Box<dyn Interpreter> {
        self.chain
    }
}

fn static_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("namespace pattern is a valid regex"))
}

fn declaration_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    static_regex(
        &CELL,
        r#"xmlns(?P<prefix>:[A-Za-z_][\w.-]*)?(?P<eq>\s*=\s*)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#,
    )
}

fn scheme_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    static_regex(&CELL, r"^[A-Za-z][A-Za-z0-9+.-]*:")
}

/// `xmlns[:p]="value"` → `xmlns[:p]="http://value"` unless `value` already
/// has a scheme or is empty.
pub fn fix_namespaces(raw: &str) -> Cow<'_, str> {
    declaration_regex().replace_all(raw, |caps: &Captures<'_>| {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let prefix = caps.name("prefix").map_or("", |m| m.as_str());
        let eq = caps.name("eq").map_or("=", |m| m.as_str());
        let (value, quote) = match (caps.name("dq"), caps.name("sq")) {
            (Some(m), _) => (m.as_str(), '"'),
            (None, Some(m)) => (m.as_str(), '\''),
            (None, None) => return whole.to_string(),
        };
        if value.is_empty() || scheme_regex().is_match(value) {
            whole.to_string()
        } else {
            format!("xmlns{prefix}{eq}{quote}http://{value}{quote}")
        }
    })
}

/// Drop `prefix:` from tag names, then the `xmlns` declarations, then
/// `prefix:` from attribute names.
pub fn strip_namespaces(raw: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    static DECLARATION: OnceLock<Regex> = OnceLock::new();
    static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();

    let tags = static_regex(&TAG, r"(</?)[A-Za-z_][\w.-]*:");
    let declarations = static_regex(
        &DECLARATION,
        r#"\s+xmlns(?::[A-Za-z_][\w.-]*)?\s*=\s*(?:"[^"]*"|'[^']*')"#,
    );
    let attributes = static_regex(&ATTRIBUTE, r"(\s)[A-Za-z_][\w.-]*:([A-Za-z_][\w.-]*\s*=)");

    let without_tags = tags.replace_all(raw, "$1");
    let without_declarations = declarations.replace_all(&without_tags, "");
    attributes
        .replace_all(&without_declarations, "$1$2")
        .into_owned()
}
