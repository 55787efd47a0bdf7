use crate::app::AppState;
use crate::auth::Session;
use crate::drivers::websocket::WebsocketConnection;
use crate::drivers::Driver;
use crate::protocols::Protocol;
use crate::utils::status::get_os_info;
use anyhow::Context;
use axum::extract::Query;
use axum::http::header;
use axum::{
    body::Body,
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::{HeaderMap, Method, Response, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use log::{debug, error, info};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub struct WsDriver {
    app_state: AppState,
}

#[async_trait::async_trait]
impl Driver for WsDriver {
    async fn run(&self) -> anyhow::Result<()> {
        let addr = self.app_state.config.snapshot().await.bind_addr();

        let app = Router::new()
            .route("/api/v1", get(ws_handler))
            .route("/api/v1/action", post(action_handler))
            .route("/info", get(info_handler))
            .with_state(self.app_state.clone())
            .layer(
                CorsLayer::new()
                    .allow_origin(tower_http::cors::Any)
                    .allow_methods([Method::GET, Method::POST])
                    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
            )
            .into_make_service_with_connect_info::<SocketAddr>();

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!("web server listening on {}", addr);

        let stop_token = self.app_state.stop_notify.clone();
        let state = self.app_state.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                stop_token.notified().await;
                info!("Shutdown signal received, closing connections...");

                let mut ws_handlers = state.ws_connections.lock().await;
                for handler in ws_handlers.drain(..) {
                    if let Err(err) = handler.await {
                        error!("Error handling websocket connection: {}", err);
                    }
                }
            })
            .await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

// WebSocket处理函数
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Response<Body>, HandlerError> {
    info!("WebSocket connection received from {:?}", addr);
    // 执行验证逻辑
    let (token, session) = WebsocketConnection::verify_connection(&state, &params)
        .await
        .map_err(HandlerError::Unauthorized)?;
    Ok(ws.on_upgrade(move |socket| handle_ws_connection(socket, token, session, state, addr)))
}

// WebSocket连接处理
async fn handle_ws_connection(
    socket: WebSocket,
    token: String,
    session: Session,
    state: AppState,
    addr: SocketAddr,
) {
    let state_clone = state.clone();
    info!("{} attached from {}", session.username, addr);

    // 将连接加入管理
    let join_handle = tokio::spawn(async move {
        let state_clone = state.clone();
        match state
            .ws_conn_manager
            .serve_connection(socket, token, session, state_clone, addr)
            .await
        {
            Ok(_) => debug!("WebSocket connection closed: {}", addr),
            Err(e) => error!("WebSocket error: {}: {}", addr, e),
        }
    });

    let mut handles = state_clone.ws_connections.lock().await;
    handles.retain(|handle| !handle.is_finished());
    handles.push(join_handle);
}

#[derive(Debug, Error)]
enum HandlerError {
    #[error("Malformed authorization header")]
    BadAuthorization,
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response<Body> {
        let status = match self {
            HandlerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            HandlerError::BadAuthorization => StatusCode::BAD_REQUEST,
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain")],
            self.to_string(),
        )
            .into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, HandlerError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| HandlerError::BadAuthorization)?;
    value
        .strip_prefix("Bearer ")
        .map(|token| Some(token.trim()))
        .ok_or(HandlerError::BadAuthorization)
}

// 单次请求处理
async fn action_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Response<Body>, HandlerError> {
    let token = bearer_token(&headers)?;
    let response = state.protocol_v1.process_text(token, &body).await;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        response,
    )
        .into_response())
}

// info请求处理
async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (os, arch) = get_os_info();
    let response_body = json!({
        "name": "Warden Daemon",
        "os": os,
        "arch": arch,
        "version": crate::app::VERSION,
        "api_version": "v1",
        "observers": state.supervisor.broadcaster().observer_count(),
    })
    .to_string();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        response_body,
    )
}

impl WsDriver {
    pub fn new(app_state: AppState) -> Self {
        Self { app_state }
    }
}
