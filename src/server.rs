use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path as AxumPath, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use html_escape::encode_text;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::api::{ApiError, ProjectClient, Session};
use crate::normalize::Normalizer;

/// Serves normalized previews of stored projects, read-only.
pub struct PreviewServerHandle {
    pub addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    server_handle: tokio::task::JoinHandle<()>,
}

impl PreviewServerHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.server_handle.await;
    }
}

struct ServerState {
    client: ProjectClient,
    normalizer: Normalizer,
}

pub async fn start_preview_server(
    addr: SocketAddr,
    client: ProjectClient,
    normalizer: Normalizer,
) -> Result<PreviewServerHandle> {
    let state = Arc::new(ServerState { client, normalizer });

    let router = Router::new()
        .route("/preview/:project_id", get(preview_current))
        .route("/preview/:project_id/:version_id", get(preview_version))
        .with_state(state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(target = "server", addr = %local_addr, "preview server listening");
    let graceful =
        axum::serve(listener, router.into_make_service()).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

    let handle = tokio::spawn(async move {
        if let Err(err) = graceful.await {
            tracing::error!(target = "server", error = %err, "preview server error");
        }
    });

    Ok(PreviewServerHandle {
        addr: local_addr,
        shutdown_tx,
        server_handle: handle,
    })
}

async fn preview_current(
    State(state): State<Arc<ServerState>>,
    AxumPath(project_id): AxumPath<String>,
    headers: HeaderMap,
) -> Response {
    render_preview(&state, &project_id, None, &headers).await
}

async fn preview_version(
    State(state): State<Arc<ServerState>>,
    AxumPath((project_id, version_id)): AxumPath<(String, String)>,
    headers: HeaderMap,
) -> Response {
    render_preview(&state, &project_id, Some(&version_id), &headers).await
}

async fn render_preview(
    state: &ServerState,
    project_id: &str,
    version_id: Option<&str>,
    headers: &HeaderMap,
) -> Response {
    let session = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(Session::from_cookie_header);
    let Some(session) = session else {
        return error_page(StatusCode::UNAUTHORIZED, "sign in to view this preview");
    };

    let project = match state.client.fetch_preview(project_id, &session).await {
        Ok(project) => project,
        Err(err) => {
            warn!(target = "server", %project_id, error = %err, "preview fetch failed");
            return error_page(status_for(&err), &err.user_message());
        }
    };

    let document = state.normalizer.normalize(project.document_for(version_id));
    if document.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }
    Html(document).into_response()
}

fn status_for(err: &ApiError) -> StatusCode {
    match err {
        ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn error_page(status: StatusCode, message: &str) -> Response {
    (
        status,
        Html(format!(
            "<!DOCTYPE html><html><body><p>{}</p></body></html>",
            encode_text(message)
        )),
    )
        .into_response()
}
