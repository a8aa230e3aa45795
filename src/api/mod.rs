// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The HTTP front door: `GET /?radix=&start=&numberOfDigits=`.

use std::net::Ipv4Addr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::cdf::Radix;
use crate::config::Config;
use crate::index::Index;
use crate::service::Service;
use crate::store::ObjectStore;
use crate::store::http::HttpStore;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Service>,
    pub index: Arc<Index>,
    pub max_digits_per_request: i64,
}

/// Query parameters arrive as raw strings so that validation failures
/// produce the API's own one-line reasons instead of a framework rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GetParams {
    radix: Option<String>,
    start: Option<String>,
    #[serde(rename = "numberOfDigits")]
    number_of_digits: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetResponse {
    /// The requested digits, e.g. `"31415926535897932384"`.
    pub content: String,
}

enum ApiError {
    BadRequest(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, reason) = match self {
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_owned(),
            ),
        };
        error!(%status, %reason, "request failed");
        (status, [(header::CONTENT_TYPE, "text/plain")], reason).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_digits))
        .fallback(not_found)
        .layer(axum::middleware::map_response(allow_any_origin))
        .with_state(state)
}

/// Every response carries the permissive CORS header; the upstream contract
/// applies it to errors and unknown paths as well.
async fn allow_any_origin(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        header::HeaderValue::from_static("*"),
    );
    response
}

fn parse_param(value: Option<&str>, name: &str, default: i64) -> Result<i64, ApiError> {
    match value {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("invalid request: {name}"))),
    }
}

async fn get_digits(
    State(state): State<AppState>,
    Query(params): Query<GetParams>,
) -> Result<Json<GetResponse>, ApiError> {
    let radix = parse_param(params.radix.as_deref(), "radix", 10)?;
    let radix = match radix {
        10 => Radix::Decimal,
        16 => Radix::Hexadecimal,
        _ => {
            return Err(ApiError::BadRequest(
                "radix must be either 10 or 16".to_owned(),
            ));
        }
    };
    let set = state.index.result_set(radix);

    let start = parse_param(params.start.as_deref(), "start", 0)?;
    if start < 0 {
        return Err(ApiError::BadRequest("start is negative".to_owned()));
    }
    if start as u64 > set.total_digits() {
        return Err(ApiError::BadRequest("start out of range".to_owned()));
    }

    let n = parse_param(params.number_of_digits.as_deref(), "numberOfDigits", 100)?;
    if n < 0 {
        return Err(ApiError::BadRequest(
            "numberOfDigits is negative".to_owned(),
        ));
    }
    if n > state.max_digits_per_request {
        return Err(ApiError::BadRequest("numberOfDigits is too big".to_owned()));
    }

    info!(radix = %radix, start, n, "get digits");
    let digits = state
        .service
        .get(set, start as u64, n as u64)
        .await
        .map_err(|_| ApiError::Internal)?;
    let content = String::from_utf8(digits).map_err(|_| ApiError::Internal)?;
    Ok(Json(GetResponse { content }))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        format!("The requested url {} was not found.\n", uri.path()),
    )
}

/// Loads the index, wires the store and serves the API until interrupted.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let index = Index::load(&config.index_path)?;
    let store = HttpStore::new(config.object_store_endpoint.clone());
    let service = Service::new(store.bucket(&config.bucket_name));
    let state = AppState {
        service: Arc::new(service),
        index: Arc::new(index),
        max_digits_per_request: config.max_digits_per_request,
    };

    let listener =
        tokio::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.port)).await?;
    info!(port = config.port, bucket = %config.bucket_name, "serving digits");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!(error = %e, "failed to install signal handler"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutting down");
}
