//! HTTP front door for the USSD gateway.
//!
//! The gateway POSTs a form per keystroke (`sessionId`, `phoneNumber`, `text`,
//! optionally `serviceCode`) and renders the plain-text `CON`/`END` body it gets
//! back. `GET /healthz` reports the process counters as JSON.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use axum::{
    extract::{Form, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use log::{info, warn};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::time::timeout;

use crate::config::ServerConfig;
use crate::logutil::mask_phone;
use crate::metrics;
use crate::ussd::{UssdEngine, UssdRequest, UssdResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackForm {
    pub session_id: String,
    pub phone_number: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub service_code: Option<String>,
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<UssdEngine>,
    pub request_timeout: Duration,
}

pub fn router(engine: Arc<UssdEngine>, config: &ServerConfig) -> Router {
    let state = ServerState {
        engine,
        request_timeout: Duration::from_secs(config.request_timeout_seconds),
    };
    Router::new()
        .route(&config.callback_path, post(ussd_callback))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(engine: Arc<UssdEngine>, config: &ServerConfig) -> Result<()> {
    let addr: SocketAddr = config
        .bind_address
        .parse()
        .map_err(|e| anyhow!("Invalid bind address {}: {}", config.bind_address, e))?;
    let app = router(engine, config);

    info!("Serving USSD callbacks on http://{}{}", addr, config.callback_path);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn ussd_callback(State(state): State<ServerState>, Form(form): Form<CallbackForm>) -> impl IntoResponse {
    let request = UssdRequest::new(form.session_id, form.phone_number, form.text);
    let response = match timeout(state.request_timeout, state.engine.handle(&request)).await {
        Ok(response) => response,
        Err(_) => {
            metrics::inc_timeouts();
            warn!(
                "USSD callback timed out after {:?} session={} phone={} service={}",
                state.request_timeout,
                request.session_id,
                mask_phone(&request.phone_number),
                form.service_code.as_deref().unwrap_or("-")
            );
            UssdResponse::generic_failure()
        }
    };
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], response.to_string())
}

async fn healthz() -> impl IntoResponse {
    Json(metrics::snapshot())
}
