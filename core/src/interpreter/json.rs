use serde_json::Value;

use super::{finish, range_status_error, Interpreter};
use crate::error::CallError;
use crate::request::Request;
use crate::response::{Data, Response, ResponseInformation};

/// Decodes a JSON payload into `Data::Structured`.
///
/// An empty payload and the literal `null` are both a valid empty result
/// (`Data::Empty`); only malformed input is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonInterpreter;

impl Interpreter for JsonInterpreter {
    fn interpret(
        &self,
        _request: &Request,
        raw: &str,
        info: &ResponseInformation,
    ) -> Result<Response, CallError> {
        let data = if raw.trim().is_empty() {
            Data::Empty
        } else {
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Null) => Data::Empty,
                Ok(value) => Data::Structured(value),
                Err(e) => return Err(CallError::interpretation("JSON", e)),
            }
        };
        Ok(finish(Response::new(data, info.status_code), range_status_error(info)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn interpret(raw: &str) -> Result<Response, CallError> {
        JsonInterpreter.interpret(
            &Request::new("users"),
            raw,
            &ResponseInformation::new().with_status(200, "OK"),
        )
    }

    #[test]
    fn decodes_object_keeping_key_order() {
        let response = interpret(r#"{"z":1,"a":[true,null],"m":{"k":"v"}}"#).unwrap();
        let value = response.data.as_structured().unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert_eq!(serde_json::to_string(value).unwrap(), r#"{"z":1,"a":[true,null],"m":{"k":"v"}}"#);
    }

    #[test]
    fn decodes_scalars_and_arrays() {
        assert_eq!(interpret("[1,2]").unwrap().data, Data::Structured(json!([1, 2])));
        assert_eq!(interpret(r#""s""#).unwrap().data, Data::Structured(json!("s")));
        assert_eq!(interpret("false").unwrap().data, Data::Structured(json!(false)));
    }

    #[test]
    fn null_and_empty_are_valid_empty_results() {
        assert!(interpret("null").unwrap().data.is_empty());
        assert!(interpret("  ").unwrap().data.is_empty());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let err = interpret("{not json").unwrap_err();
        assert!(matches!(err, CallError::Interpretation { format: "JSON", .. }));
    }

    #[test]
    fn error_status_still_decodes_body() {
        let response = JsonInterpreter
            .interpret(
                &Request::new("users"),
                r#"{"message":"boom"}"#,
                &ResponseInformation::new().with_status(500, "Internal Server Error"),
            )
            .unwrap();
        assert_eq!(response.error, "500 Internal Server Error");
        assert_eq!(response.data, Data::Structured(json!({"message": "boom"})));
    }
}
