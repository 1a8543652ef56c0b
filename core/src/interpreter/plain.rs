use tracing::trace;

use super::{finish, range_status_error, Interpreter};
use crate::error::CallError;
use crate::request::Request;
use crate::response::{Data, Response, ResponseInformation};

/// Passes the raw payload through as `Data::Text`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl Interpreter for Plain {
    fn interpret(
        &self,
        request: &Request,
        raw: &str,
        info: &ResponseInformation,
    ) -> Result<Response, CallError> {
        trace!(method = %request.method, bytes = raw.len(), "passing payload through");
        let response = Response::new(Data::Text(raw.to_string()), info.status_code);
        Ok(finish(response, range_status_error(info)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_payload_unchanged() {
        let info = ResponseInformation::new().with_status(200, "OK");
        let response = Plain.interpret(&Request::new("a"), "  raw\n", &info).unwrap();
        assert_eq!(response.data, Data::Text("  raw\n".to_string()));
        assert_eq!(response.status_code, 200);
        assert!(response.is_success());
    }

    #[test]
    fn non_2xx_sets_error() {
        let info = ResponseInformation::new().with_status(404, "Not Found");
        let response = Plain.interpret(&Request::new("a"), "", &info).unwrap();
        assert_eq!(response.error, "404 Not Found");
    }
}
