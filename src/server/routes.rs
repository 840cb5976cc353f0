//! Request routing and handlers.

use chrono::Utc;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE, HeaderValue,
};
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::AppState;
use crate::core::gateway::{GeminiCallRequest, ProxyResearchRequest};
use crate::error::NewsroomError;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Body returned for a rejected endpoint override.
const UNAUTHORIZED_ENDPOINT_MESSAGE: &str = "Unauthorized endpoint provided";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Deserialize)]
struct ResearchBody {
    #[serde(default)]
    query: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployBody {
    #[serde(default)]
    agent_id: Option<String>,
}

/// Dispatch one request. Never fails; errors become JSON responses.
pub async fn route<B>(state: &AppState, request: Request<B>) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    tracing::debug!(%method, %path, "HTTP request");

    if method == Method::OPTIONS {
        return with_cors(Response::new(Full::new(Bytes::new())));
    }

    let response = match (method, path.as_str()) {
        (Method::GET, "/api/health") => json_response(
            StatusCode::OK,
            &json!({"ok": true, "version": env!("CARGO_PKG_VERSION")}),
        ),
        (Method::POST, "/api/gemini") => match read_json::<_, GeminiCallRequest>(request).await {
            Ok(call) => {
                let response = state.gateway.gemini(call).await;
                json_response(status_from(response.status), &response.body)
            }
            Err(response) => response,
        },
        (Method::POST, "/api/proxy-research") => {
            match read_json::<_, ProxyResearchRequest>(request).await {
                Ok(call) => proxy_research(state, call).await,
                Err(response) => response,
            }
        }
        (Method::POST, "/api/research") => match read_json::<_, ResearchBody>(request).await {
            Ok(body) => research(state, &body.query).await,
            Err(response) => response,
        },
        (Method::POST, "/api/agents/deploy") => match read_optional_json::<_, DeployBody>(request).await
        {
            Ok(body) => deploy(state, body.agent_id.as_deref()).await,
            Err(response) => response,
        },
        (_, path) => json_response(
            StatusCode::NOT_FOUND,
            &json!({"ok": false, "error": format!("no route for {path}")}),
        ),
    };
    with_cors(response)
}

async fn proxy_research(state: &AppState, call: ProxyResearchRequest) -> Response<Full<Bytes>> {
    match state.gateway.proxy_research(call).await {
        Ok(payload) => json_response(StatusCode::OK, &payload),
        Err(NewsroomError::UnauthorizedEndpoint { .. }) => json_response(
            StatusCode::FORBIDDEN,
            &json!({"error": UNAUTHORIZED_ENDPOINT_MESSAGE}),
        ),
        Err(error) => json_response(
            status_from(error.http_status()),
            &json!({"error": error.to_string()}),
        ),
    }
}

async fn research(state: &AppState, query: &str) -> Response<Full<Bytes>> {
    if query.trim().is_empty() {
        return error_response(&NewsroomError::InvalidRequest("query is required".to_string()));
    }
    let items = state
        .rotation
        .perform_research(&state.gateway, query.trim())
        .await;
    json_response(StatusCode::OK, &json!({"ok": true, "items": items}))
}

async fn deploy(state: &AppState, agent_id: Option<&str>) -> Response<Full<Bytes>> {
    match state.runner.deploy(agent_id, Utc::now(), None).await {
        Ok(Some(report)) => json_response(StatusCode::OK, &json!({"ok": true, "report": report})),
        Ok(None) => json_response(
            StatusCode::OK,
            &json!({"ok": true, "report": null, "message": "No agent due"}),
        ),
        Err(error) => error_response(&error),
    }
}

async fn read_body<B>(request: Request<B>) -> Result<Bytes, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    match Limited::new(request.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(error) => {
            tracing::warn!(error = %error, "Rejected request body");
            Err(json_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                &json!({"ok": false, "error": format!("request body rejected: {error}")}),
            ))
        }
    }
}

async fn read_json<B, T>(request: Request<B>) -> Result<T, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<BoxError>,
    T: DeserializeOwned,
{
    let bytes = read_body(request).await?;
    serde_json::from_slice(&bytes).map_err(|e| {
        error_response(&NewsroomError::InvalidRequest(format!("invalid JSON body: {e}")))
    })
}

/// Like [`read_json`], but an empty body decodes as `T::default()`.
async fn read_optional_json<B, T>(request: Request<B>) -> Result<T, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<BoxError>,
    T: DeserializeOwned + Default,
{
    let bytes = read_body(request).await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes).map_err(|e| {
        error_response(&NewsroomError::InvalidRequest(format!("invalid JSON body: {e}")))
    })
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn error_response(error: &NewsroomError) -> Response<Full<Bytes>> {
    json_response(
        status_from(error.http_status()),
        &json!({"ok": false, "error": error.to_string(), "code": error.error_code()}),
    )
}

fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn with_cors(mut response: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, GET, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("authorization, x-client-info, apikey, content-type"),
    );
    response
}
