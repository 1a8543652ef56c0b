use super::{finish, range_status_error, Interpreter};
use crate::error::CallError;
use crate::query;
use crate::request::Request;
use crate::response::{Data, Response, ResponseInformation};

/// Decodes an `application/x-www-form-urlencoded` payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryInterpreter;

impl Interpreter for QueryInterpreter {
    fn interpret(
        &self,
        _request: &Request,
        raw: &str,
        info: &ResponseInformation,
    ) -> Result<Response, CallError> {
        let value = query::decode(raw.trim())?;
        let response = Response::new(Data::Structured(value), info.status_code);
        Ok(finish(response, range_status_error(info)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_grouped_keys() {
        let response = QueryInterpreter
            .interpret(
                &Request::new("token"),
                "a[0]=x&a[1]=y&token=abc\n",
                &ResponseInformation::new().with_status(200, "OK"),
            )
            .unwrap();
        assert_eq!(
            response.data,
            Data::Structured(json!({"a": ["x", "y"], "token": "abc"}))
        );
    }

    #[test]
    fn empty_payload_is_empty_mapping() {
        let response = QueryInterpreter
            .interpret(&Request::new("token"), "", &ResponseInformation::new())
            .unwrap();
        assert_eq!(response.data, Data::Structured(json!({})));
    }
}
