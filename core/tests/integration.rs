//! HTTP and SOAP services against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port in a background thread, then
//! drives `Service` over real sockets with each interpreter. Status codes,
//! headers and SOAP faults come from the server, so the whole lifecycle is
//! exercised end to end.

use std::net::SocketAddr;
use std::sync::OnceLock;

use callkit_core::interpreter::RawCheck;
use callkit_core::{
    Call, CallError, ChainBuilder, Credentials, Data, HttpTransport, JsonInterpreter,
    MarkupInterpreter, Plain, QueryInterpreter, Request, RequestDefaults, Service, SoapTransport,
};
use serde_json::{json, Value};

/// Address of a mock server shared by every test in this file.
fn server() -> SocketAddr {
    static ADDR: OnceLock<SocketAddr> = OnceLock::new();
    *ADDR.get_or_init(|| {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run(listener).await
            })
            .unwrap();
        });
        addr
    })
}

fn defaults() -> RequestDefaults {
    RequestDefaults::new().location(format!("http://{}", server()))
}

fn echoed(data: &Data) -> &Value {
    data.as_structured().expect("echo returns JSON")
}

#[test]
fn json_user_lifecycle() {
    let mut users = Service::new(HttpTransport::new(), defaults(), Box::new(JsonInterpreter));

    let created = users
        .call("users", Call::body(json!({"name": "Ann", "email": "ann@example.com"})))
        .unwrap();
    assert_eq!(created.status_code, 201);
    assert!(created.is_success());
    let id = echoed(&created.data)["id"].as_str().unwrap().to_string();

    let fetched = users.call(&format!("users/{id}"), Call::empty()).unwrap();
    assert_eq!(echoed(&fetched.data)["name"], "Ann");

    let listed = users.call("users", Call::empty()).unwrap();
    assert!(echoed(&listed.data)
        .as_array()
        .unwrap()
        .iter()
        .any(|u| u["id"] == id.as_str()));

    let info = users.last_response_information().unwrap();
    assert_eq!(info.status_code, 200);
    assert_eq!(info.headers.get("content-type"), Some("application/json"));

    let removed = users
        .call(&format!("users/{id}"), Call::empty().with_option("verb", "DELETE"))
        .unwrap();
    assert_eq!(echoed(&removed.data)["id"], id.as_str());

    let gone = users.call(&format!("users/{id}"), Call::empty()).unwrap();
    assert_eq!(gone.status_code, 404);
    assert!(!gone.is_success());
}

#[test]
fn missing_resource_reports_status_error() {
    let mut users = Service::new(HttpTransport::new(), defaults(), Box::new(Plain));
    let response = users
        .call("users/00000000-0000-0000-0000-000000000000", Call::empty())
        .unwrap();
    assert_eq!(response.status_code, 404);
    assert_eq!(response.error, "404 Not Found");
    assert!(!response.is_success());
}

#[test]
fn status_codes_are_data() {
    let mut service = Service::new(HttpTransport::new(), defaults(), Box::new(Plain));
    let response = service.call("status/503", Call::empty()).unwrap();
    assert_eq!(response.data, Data::Text("status 503".to_string()));
    assert_eq!(response.error, "503 Service Unavailable");

    let response = service.call("status/204", Call::empty()).unwrap();
    assert!(response.is_success());
}

#[test]
fn query_string_payload() {
    let mut token = Service::new(HttpTransport::new(), defaults(), Box::new(QueryInterpreter));
    let response = token.call("token", Call::empty()).unwrap();
    assert_eq!(
        response.data,
        Data::Structured(json!({
            "access_token": "abc123",
            "expires_in": "3600",
            "scope": ["read", "write"]
        }))
    );
}

#[test]
fn xml_page_is_converted() {
    let mut page = Service::new(HttpTransport::new(), defaults(), Box::new(MarkupInterpreter::new()));
    let response = page.call("page", Call::empty()).unwrap();
    assert_eq!(
        response.data,
        Data::Structured(json!({
            "@attributes": {"lang": "en"},
            "head": {"title": "Mock page"},
            "body": {"p": [{"@attributes": {"class": "intro"}, "@text": "Hello"}, "World"]}
        }))
    );
}

#[test]
fn defaults_headers_parameters_and_credentials_reach_the_wire() {
    let defaults = defaults()
        .header("X-Client", "callkit")
        .header("X-Trace", "default")
        .credentials(Credentials::new("ann", "secret"));
    let mut echo = Service::new(HttpTransport::new(), defaults, Box::new(JsonInterpreter));

    let response = echo
        .call(
            "echo",
            Call::body(json!({"q": "rust"}))
                .with_parameters(json!({"page": 2, "tags": ["a", "b"]}))
                .with_header("X-Trace", "call")
                .with_option("verb", "PUT"),
        )
        .unwrap();
    let echoed = echoed(&response.data);

    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["query"], "page=2&tags%5B0%5D=a&tags%5B1%5D=b");
    assert_eq!(echoed["headers"]["x-client"], "callkit");
    assert_eq!(echoed["headers"]["x-trace"], "call");
    assert_eq!(echoed["headers"]["content-type"], "application/json");
    assert_eq!(echoed["headers"]["authorization"], "Basic YW5uOnNlY3JldA==");
    assert_eq!(serde_json::from_str::<Value>(echoed["body"].as_str().unwrap()).unwrap(), json!({"q": "rust"}));
}

#[test]
fn config_updates_defaults_between_calls() {
    let mut echo = Service::new(HttpTransport::new(), RequestDefaults::new(), Box::new(JsonInterpreter));
    echo.config(&json!({
        "location": format!("http://{}", server()),
        "headers": {"X-Configured": "yes"}
    }))
    .unwrap();

    let response = echo.call_request(Request::new("echo")).unwrap();
    assert_eq!(echoed(&response.data)["headers"]["x-configured"], "yes");

    let Err(err) = echo.config(&json!({"pattern": "*.txt"})) else {
        panic!("source settings accepted by an HTTP service");
    };
    assert!(matches!(err, CallError::Configuration { .. }));
}

#[test]
fn pre_validation_rejects_raw_payload() {
    let chain = ChainBuilder::new(Plain)
        .pre_validate(RawCheck::new(|_, raw, errors| {
            if raw.contains("503") {
                errors.push("backend unavailable");
            }
        }))
        .build();
    let mut service = Service::new(HttpTransport::new(), defaults(), chain);
    let err = service.call("status/503", Call::empty()).unwrap_err();
    assert_eq!(err.messages(), ["backend unavailable"]);
}

#[test]
fn unreachable_backend_is_connectivity_error() {
    let mut service = Service::new(
        HttpTransport::new(),
        RequestDefaults::new().location("http://127.0.0.1:1"),
        Box::new(Plain),
    );
    let err = service.call("anything", Call::empty()).unwrap_err();
    assert!(matches!(err, CallError::Connectivity { .. }));
    assert!(service.last_interpreted_response().is_none());
}

fn soap_service() -> Service<SoapTransport> {
    let mut defaults = RequestDefaults::new().location(format!("http://{}/soap", server()));
    defaults.options.insert("namespace".to_string(), json!("urn:users"));
    let chain = ChainBuilder::new(MarkupInterpreter::new()).strip_namespaces().build();
    Service::new(SoapTransport::new(), defaults, chain)
}

#[test]
fn soap_operation_round_trip() {
    let mut soap = soap_service();
    let response = soap.call("GetUser", Call::body(json!({"id": 7}))).unwrap();
    assert_eq!(
        response.data,
        Data::Structured(json!({
            "Body": {"GetUserResponse": {"user": {
                "@attributes": {"id": "7"},
                "name": "Ann",
                "email": "ann@example.com"
            }}}
        }))
    );
}

#[test]
fn soap_fault_is_connectivity_error() {
    let mut soap = soap_service();
    let err = soap.call("DropTables", Call::empty()).unwrap_err();
    match err {
        CallError::Connectivity { message, .. } => {
            assert_eq!(message, "SOAP fault: unknown operation 'urn:users/DropTables'");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn soap_rejects_non_mapping_arguments() {
    let mut soap = soap_service();
    let err = soap.call("GetUser", Call::body("raw text")).unwrap_err();
    assert!(matches!(err, CallError::InvalidRequest { .. }));
}
