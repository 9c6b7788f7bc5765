//! Stateless HTTP relay between the chat client and the model provider.
//!
//! The relay holds the provider credential; clients post `{messages}` and get
//! the provider's JSON back unchanged.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use serde_json::{json, Value};

use crate::config::AdvisorConfig;
use crate::http_client::build_http_client;
use crate::llm_client::{LlmClient, UpstreamModel};

#[derive(Clone)]
pub struct RelayState {
    pub upstream: Arc<dyn UpstreamModel>,
}

pub fn relay_router(state: RelayState) -> Router {
    Router::new()
        .route("/", any(relay_handler))
        .with_state(Arc::new(state))
}

pub async fn serve_relay(config: &AdvisorConfig) -> Result<()> {
    let bind_addr = config
        .relay_bind
        .parse::<SocketAddr>()
        .context("Invalid relay_bind / ADVISOR_RELAY_BIND (expected host:port)")?;

    let upstream = LlmClient::new(
        build_http_client()?,
        config.upstream_api_url.clone(),
        config.upstream_api_key.clone(),
    );
    if !upstream.has_api_key() {
        tracing::warn!("OPENAI_API_KEY is unset; upstream requests will be unauthenticated");
    }
    tracing::info!("Forwarding to {}", upstream.completions_url());

    let app = relay_router(RelayState {
        upstream: Arc::new(upstream),
    });

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind relay to {}", bind_addr))?;
    tracing::info!("Relay listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("Relay server failed")?;
    Ok(())
}

async fn relay_handler(
    State(state): State<Arc<RelayState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return respond(StatusCode::OK, Body::empty());
    }

    if method != Method::POST {
        return error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    }

    let messages = match parse_messages(&headers, &body) {
        Ok(messages) => messages,
        Err(reason) => return error_response(StatusCode::BAD_REQUEST, reason),
    };

    tracing::debug!("Forwarding {} messages upstream", messages.len());

    match state.upstream.complete(messages).await {
        Ok(reply) if reply.is_success() => {
            respond(mirror_status(reply.status), Body::from(reply.body))
        }
        Ok(reply) => {
            tracing::warn!("Upstream returned {} {}", reply.status, reply.reason);
            let payload = json!({
                "error": format!("Upstream API error: {} {}", reply.status, reply.reason)
                    .trim_end()
                    .to_string(),
                "details": reply.body,
            });
            respond(mirror_status(reply.status), Body::from(payload.to_string()))
        }
        Err(error) => {
            tracing::error!("Failed to reach upstream: {:#}", error);
            let payload = json!({
                "error": "Failed to communicate with upstream model API",
                "details": format!("{:#}", error),
            });
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                Body::from(payload.to_string()),
            )
        }
    }
}

fn parse_messages(headers: &HeaderMap, body: &[u8]) -> Result<Vec<Value>, &'static str> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));
    if !is_json {
        return Err("Content-Type must be application/json");
    }

    let payload: Value =
        serde_json::from_slice(body).map_err(|_| "Invalid JSON in request body")?;

    match payload.get("messages") {
        Some(Value::Array(messages)) => Ok(messages.clone()),
        _ => Err("Missing or invalid messages array"),
    }
}

fn mirror_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    respond(status, Body::from(json!({ "error": message }).to_string()))
}

fn respond(status: StatusCode, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    apply_cors_headers(response.headers_mut());
    response
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::UpstreamReply;
    use async_trait::async_trait;
    use std::sync::Mutex;

    enum Script {
        Reply(u16, &'static str),
        Unreachable,
    }

    struct ScriptedUpstream {
        script: Script,
        received: Mutex<Vec<Vec<Value>>>,
    }

    #[async_trait]
    impl UpstreamModel for ScriptedUpstream {
        async fn complete(&self, messages: Vec<Value>) -> Result<UpstreamReply> {
            self.received.lock().unwrap().push(messages);
            match self.script {
                Script::Reply(status, body) => Ok(UpstreamReply {
                    status,
                    reason: StatusCode::from_u16(status)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or_default()
                        .to_string(),
                    body: body.to_string(),
                }),
                Script::Unreachable => Err(anyhow::anyhow!("connection refused")),
            }
        }
    }

    fn state(script: Script) -> (Arc<RelayState>, Arc<ScriptedUpstream>) {
        let upstream = Arc::new(ScriptedUpstream {
            script,
            received: Mutex::new(Vec::new()),
        });
        let state = Arc::new(RelayState {
            upstream: upstream.clone(),
        });
        (state, upstream)
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers
    }

    async fn call(
        state: Arc<RelayState>,
        method: Method,
        headers: HeaderMap,
        body: &'static str,
    ) -> (StatusCode, HeaderMap, String) {
        let response = relay_handler(State(state), method, headers, Bytes::from(body)).await;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn assert_cors(headers: &HeaderMap) {
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, OPTIONS"
        );
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn preflight_returns_empty_success_with_cors() {
        let (state, upstream) = state(Script::Unreachable);
        let (status, headers, body) = call(state, Method::OPTIONS, HeaderMap::new(), "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
        assert_cors(&headers);
        assert!(upstream.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_post_methods_are_rejected() {
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let (state, _) = state(Script::Unreachable);
            let (status, headers, _) = call(state, method, json_headers(), "{}").await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert_cors(&headers);
        }
    }

    #[tokio::test]
    async fn bad_requests_never_reach_upstream() {
        let cases: [(HeaderMap, &'static str); 4] = [
            (HeaderMap::new(), r#"{"messages":[]}"#),
            (json_headers(), "{not json"),
            (json_headers(), r#"{"prompt":"hi"}"#),
            (json_headers(), r#"{"messages":"hi"}"#),
        ];
        for (headers, body) in cases {
            let (state, upstream) = state(Script::Reply(200, "{}"));
            let (status, response_headers, response_body) =
                call(state, Method::POST, headers, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_cors(&response_headers);
            let payload: Value = serde_json::from_str(&response_body).unwrap();
            assert!(payload["error"].is_string());
            assert!(upstream.received.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn upstream_success_is_returned_verbatim() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Hello!"}}],"usage":{"total_tokens":9}}"#;
        let (state, upstream) = state(Script::Reply(200, raw));
        let (status, headers, body) = call(
            state,
            Method::POST,
            json_headers(),
            r#"{"messages":[{"role":"system","content":"ctx"},{"role":"user","content":"hi"}]}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, raw);
        assert_cors(&headers);

        let received = upstream.received.lock().unwrap();
        assert_eq!(received[0].len(), 2);
        assert_eq!(received[0][1]["content"], "hi");
    }

    #[tokio::test]
    async fn upstream_error_status_is_mirrored_with_details() {
        let (state, _) = state(Script::Reply(429, r#"{"error":"rate limited"}"#));
        let (status, headers, body) =
            call(state, Method::POST, json_headers(), r#"{"messages":[]}"#).await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_cors(&headers);
        let payload: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(payload["error"], "Upstream API error: 429 Too Many Requests");
        assert_eq!(payload["details"], r#"{"error":"rate limited"}"#);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_500() {
        let (state, _) = state(Script::Unreachable);
        let (status, _, body) =
            call(state, Method::POST, json_headers(), r#"{"messages":[]}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let payload: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(payload["error"], "Failed to communicate with upstream model API");
        assert_eq!(payload["details"], "connection refused");
    }
}
