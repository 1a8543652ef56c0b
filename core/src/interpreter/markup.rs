use tracing::debug;

use super::{finish, strict_status_error, Interpreter};
use crate::convert::StructuralConverter;
use crate::error::CallError;
use crate::markup::{Parser, XmlParser};
use crate::request::Request;
use crate::response::{Data, Response, ResponseInformation};

/// Parses markup with a pluggable `Parser`.
///
/// With `to_structure` the tree is converted into nested JSON values,
/// otherwise it is returned as `Data::Markup`. Only status 200 (or an unset
/// status, for file transports) counts as success.
pub struct MarkupInterpreter {
    parser: Box<dyn Parser>,
    to_structure: bool,
}

impl MarkupInterpreter {
    /// XML parser, tree converted to nested values.
    pub fn new() -> Self {
        Self {
            parser: Box::new(XmlParser),
            to_structure: true,
        }
    }

    pub fn with_parser(parser: Box<dyn Parser>) -> Self {
        Self {
            parser,
            to_structure: true,
        }
    }

    /// Keep the parsed tree instead of converting it.
    pub fn keep_tree(mut self) -> Self {
        self.to_structure = false;
        self
    }
}

impl Default for MarkupInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter for MarkupInterpreter {
    fn interpret(
        &self,
        request: &Request,
        raw: &str,
        info: &ResponseInformation,
    ) -> Result<Response, CallError> {
        let tree = self.parser.parse(raw)?;
        debug!(method = %request.method, root = %tree.name, "parsed markup payload");
        let data = if self.to_structure {
            Data::Structured(StructuralConverter.convert(&tree))
        } else {
            Data::Markup(tree)
        };
        Ok(finish(Response::new(data, info.status_code), strict_status_error(info)))
    }
}
