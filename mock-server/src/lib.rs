use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    #[serde(default)]
    pub email: String,
}

pub type Db = Arc<RwLock<BTreeMap<Uuid, User>>>;

pub const TOKEN_BODY: &str = "access_token=abc123&expires_in=3600&scope[]=read&scope[]=write";

pub const PAGE_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html lang="en">
  <head><title>Mock page</title></head>
  <body>
    <p class="intro">Hello</p>
    <p>World</p>
  </body>
</html>"#;

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(BTreeMap::new()));
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(user).delete(user))
        .route("/token", get(token))
        .route("/page", get(page))
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/soap", post(soap))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

async fn list_users(State(db): State<Db>) -> Json<Vec<User>> {
    let users = db.read().await;
    Json(users.values().cloned().collect())
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<CreateUser>,
) -> Result<(StatusCode, Json<User>), StatusCode> {
    if input.name.trim().is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    let user = User {
        id: Uuid::new_v4(),
        name: input.name,
        email: input.email,
    };
    debug!(id = %user.id, "created user");
    db.write().await.insert(user.id, user.clone());
    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET` returns the user; `DELETE` removes it and returns the removed record.
async fn user(
    method: Method,
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, StatusCode> {
    let found = if method == Method::DELETE {
        db.write().await.remove(&id)
    } else {
        db.read().await.get(&id).cloned()
    };
    debug!(%id, %method, found = found.is_some(), "user lookup");
    found.map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn token() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/x-www-form-urlencoded")],
        TOKEN_BODY,
    )
}

async fn page() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/xml")], PAGE_BODY)
}

/// Reflects the request back as JSON.
async fn echo(method: Method, headers: HeaderMap, RawQuery(query): RawQuery, body: String) -> Json<Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
        .collect();
    Json(json!({
        "method": method.as_str(),
        "headers": headers,
        "query": query.unwrap_or_default(),
        "body": body,
    }))
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

/// Answers `GetUser` with a user element and anything else with a fault.
async fn soap(headers: HeaderMap, body: String) -> impl IntoResponse {
    let action = headers
        .get("soapaction")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .trim_matches('"')
        .to_string();
    debug!(%action, "SOAP request");

    let xml = [(header::CONTENT_TYPE, "text/xml; charset=utf-8")];
    if action.ends_with("GetUser") && body.contains("GetUser") {
        let envelope = format!(
            r#"<?xml version="1.0" encoding="utf-8"?><soap:Envelope xmlns:soap="{ENVELOPE_NS}"><soap:Body><m:GetUserResponse xmlns:m="urn:users"><m:user id="7"><m:name>Ann</m:name><m:email>ann@example.com</m:email></m:user></m:GetUserResponse></soap:Body></soap:Envelope>"#
        );
        (StatusCode::OK, xml, envelope)
    } else {
        let envelope = format!(
            r#"<?xml version="1.0" encoding="utf-8"?><soap:Envelope xmlns:soap="{ENVELOPE_NS}"><soap:Body><soap:Fault><faultcode>soap:Client</faultcode><faultstring>unknown operation '{action}'</faultstring></soap:Fault></soap:Body></soap:Envelope>"#
        );
        (StatusCode::INTERNAL_SERVER_ERROR, xml, envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serializes_to_json() {
        let user = User {
            id: Uuid::nil(),
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["name"], "Ann");
        assert_eq!(json["email"], "ann@example.com");
    }

    #[test]
    fn create_user_defaults_email_to_empty() {
        let input: CreateUser = serde_json::from_str(r#"{"name":"Bob"}"#).unwrap();
        assert_eq!(input.name, "Bob");
        assert!(input.email.is_empty());
    }

    #[test]
    fn create_user_rejects_missing_name() {
        let result: Result<CreateUser, _> = serde_json::from_str(r#"{"email":"x@y"}"#);
        assert!(result.is_err());
    }
}
