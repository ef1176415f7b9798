//! REST pass-through tests driven through the router with `tower::oneshot`.
//!
//! Two upstreams are used: a closed local port, where every request that
//! passes validation fails with a transport error, and a small axum app
//! standing in for the platform API.

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used, missing_docs)]

use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::extract::Path;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

use zone_gateway::app_state::AppState;
use zone_gateway::build_app;
use zone_gateway::config::GatewayConfig;

const TOKEN: &str = "test-token";
const CLOSED_UPSTREAM: &str = "http://127.0.0.1:1";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn api_root(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "401: Unauthorized").into_response();
    }
    axum::Json(json!({"message": "API running."})).into_response()
}

async fn template(headers: HeaderMap, axum::Json(body): axum::Json<Value>) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "401: Unauthorized").into_response();
    }
    let rendered = format!("rendered:{}", body["template"].as_str().unwrap_or_default());
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], rendered).into_response()
}

async fn entity_state(Path(entity_id): Path<String>) -> Response {
    if entity_id == "sensor.office_target_1_x" {
        axum::Json(json!({"entity_id": entity_id, "state": "-250"})).into_response()
    } else {
        (StatusCode::NOT_FOUND, "404: Not Found").into_response()
    }
}

async fn service(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "401: Unauthorized").into_response();
    }
    axum::Json(json!([])).into_response()
}

async fn config_leak() -> &'static str {
    "upstream configuration"
}

/// Starts the fake platform API and returns its base URL.
async fn fake_platform() -> String {
    let app = Router::new()
        .route("/api/", get(api_root))
        .route("/api/config", get(config_leak))
        .route("/api/template", post(template))
        .route("/api/states/{entity_id}", get(entity_state))
        .route("/api/services/{domain}/{service}", post(service));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn app_for(base_url: &str, token: &str) -> Router {
    let config = GatewayConfig::from_lookup(|key| match key {
        "HA_URL" => Some(base_url.to_string()),
        "HA_TOKEN" => Some(token.to_string()),
        "HTTP_TIMEOUT_SECS" => Some("2".to_string()),
        _ => None,
    })
    .unwrap();
    build_app(AppState::new(config).unwrap())
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send_raw(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes)
}

async fn send_to(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, bytes) = send_raw(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    send_to(app_for(CLOSED_UPSTREAM, TOKEN), request).await
}

#[tokio::test]
async fn template_without_body_field_is_rejected() {
    let (status, body) = send(post_json("/api/template", &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1001);
    assert_eq!(body["error"]["message"], "No template provided");
}

#[tokio::test]
async fn service_calls_validate_required_fields() {
    let (status, body) = send(post_json(
        "/api/services/number/set_value",
        &json!({"entity_id": "number.office_zone_1_begin_x"}),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Missing entity_id or value");

    let (status, body) = send(post_json("/api/services/switch/turn_on", &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Missing entity_id");

    let (status, body) = send(post_json(
        "/api/services/select/select_option",
        &json!({"entity_id": "select.office_zone_type"}),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Missing entity_id or option");
}

#[tokio::test]
async fn unreachable_upstream_maps_to_bad_gateway() {
    let (status, body) = send(post_json(
        "/api/services/light/turn_off",
        &json!({"entity_id": "light.office_status_led"}),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], 5001);

    let (status, _) = send(get_request("/api/entities/sensor.office_target_1_x")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn health_reports_failed_probe() {
    let (status, body) = send(get_request("/api/health")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["backend_status"], "running");
    assert_eq!(body["ha_api_url"], "http://127.0.0.1:1/api/");
    assert_eq!(body["supervisor_token_available"], false);
    assert_eq!(body["ha_url_override"], true);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn health_reports_live_upstream() {
    let base = fake_platform().await;
    let (status, body) = send_to(app_for(&base, TOKEN), get_request("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ha_response_status"], 200);
    assert_eq!(body["ha_response_type"], "application/json");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn template_is_relayed_verbatim() {
    let base = fake_platform().await;
    let (status, headers, bytes) = send_raw(
        app_for(&base, TOKEN),
        post_json("/api/template", &json!({"template": "{{ 1 + 1 }}"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("text/plain; charset=utf-8")
    );
    assert_eq!(&bytes[..], b"rendered:{{ 1 + 1 }}");
}

#[tokio::test]
async fn service_call_success_returns_message() {
    let base = fake_platform().await;
    let (status, body) = send_to(
        app_for(&base, TOKEN),
        post_json(
            "/api/services/number/set_value",
            &json!({"entity_id": "number.office_zone_1_begin_x", "value": -1500}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"message": "Entity number.office_zone_1_begin_x updated successfully."})
    );
}

#[tokio::test]
async fn upstream_refusal_relays_its_status() {
    let base = fake_platform().await;
    let (status, body) = send_to(
        app_for(&base, "wrong-token"),
        post_json(
            "/api/services/switch/turn_on",
            &json!({"entity_id": "switch.office_bluetooth_switch"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], 5002);
    assert_eq!(
        body["error"]["message"],
        "Failed to turn on switch switch.office_bluetooth_switch."
    );
    assert_eq!(body["error"]["details"], "401: Unauthorized");
}

#[tokio::test]
async fn entity_state_found_and_missing() {
    let base = fake_platform().await;
    let app = app_for(&base, TOKEN);

    let (status, body) = send_to(
        app.clone(),
        get_request("/api/entities/sensor.office_target_1_x"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "-250");

    // Repeated misses keep answering 404.
    for _ in 0..2 {
        let (status, body) =
            send_to(app.clone(), get_request("/api/entities/sensor.office_gone")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Entity not found");
    }
}

#[tokio::test]
async fn entity_path_cannot_escape_the_states_endpoint() {
    let base = fake_platform().await;
    let (status, body) = send_to(
        app_for(&base, TOKEN),
        get_request("/api/entities/..%2Fconfig"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid entity_id");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (status, body) = send(get_request("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/template"].is_object());
}
