//! HTTP request handlers for the supervisor API.
//!
//! Each handler validates the server id, calls one [`Supervisor`] operation
//! and wraps its result in a small JSON object. Errors are rendered by the
//! [`actix_web::ResponseError`] impl in `actix_error`.

use crate::Supervisor;
use crate::config::validate_path_component;
use crate::error::Result;

use actix_web::{
    HttpResponse,
    web::{Data, Json, Path, Query},
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Body of start and stop requests
#[derive(Debug, Deserialize)]
pub struct ServerRequest {
    pub server_id: String,
}

/// Body of create requests
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub server_id: String,
    #[serde(default)]
    pub template_name: Option<String>,
}

/// Query string of the logs endpoint
#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub lines: Option<usize>,
}

fn checked_id(id: &str) -> Result<&str> {
    validate_path_component("server id", id)?;
    Ok(id)
}

/// `POST /api/server/start`
pub async fn start_server(
    supervisor: Data<Supervisor>,
    body: Json<ServerRequest>,
) -> Result<HttpResponse> {
    let id = checked_id(&body.server_id)?;
    let outcome = supervisor.start_server(id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "started",
        "pid": outcome.pid,
        "startedAt": outcome.started_at,
    })))
}

/// `POST /api/server/stop`
pub async fn stop_server(
    supervisor: Data<Supervisor>,
    body: Json<ServerRequest>,
) -> Result<HttpResponse> {
    let id = checked_id(&body.server_id)?;
    let outcome = supervisor.stop_server(id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "stopped",
        "forced": outcome.forced,
    })))
}

/// `GET /api/server/{id}/status`
pub async fn server_status(
    supervisor: Data<Supervisor>,
    id: Path<String>,
) -> Result<HttpResponse> {
    let id = checked_id(&id)?;
    Ok(HttpResponse::Ok().json(supervisor.server_status(id).await))
}

/// `GET /api/server/{id}/logs?lines=N`
pub async fn server_logs(
    supervisor: Data<Supervisor>,
    id: Path<String>,
    query: Query<LogsQuery>,
) -> Result<HttpResponse> {
    let id = checked_id(&id)?;
    let logs = supervisor.server_logs(id, query.lines).await?;
    Ok(HttpResponse::Ok().json(json!({ "logs": logs })))
}

/// `POST /api/server/create`
pub async fn create_server(
    supervisor: Data<Supervisor>,
    body: Json<CreateRequest>,
) -> Result<HttpResponse> {
    let id = checked_id(&body.server_id)?;
    let outcome = supervisor
        .create_server(id, body.template_name.as_deref())
        .await?;
    Ok(HttpResponse::Created().json(json!({
        "status": "created",
        "path": outcome.path,
    })))
}

/// `DELETE /api/server/{id}`
pub async fn delete_server(
    supervisor: Data<Supervisor>,
    id: Path<String>,
) -> Result<HttpResponse> {
    let id = checked_id(&id)?;
    supervisor.delete_server(id).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "deleted" })))
}

/// `PUT /api/server/{id}/config`
pub async fn update_config(
    supervisor: Data<Supervisor>,
    id: Path<String>,
    body: Json<Value>,
) -> Result<HttpResponse> {
    let id = checked_id(&id)?;
    supervisor.update_server_config(id, &body).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "config_updated" })))
}

/// `GET /api/server/{id}/config`
pub async fn read_config(
    supervisor: Data<Supervisor>,
    id: Path<String>,
) -> Result<HttpResponse> {
    let id = checked_id(&id)?;
    let config = supervisor.read_server_config(id).await?;
    Ok(HttpResponse::Ok().json(json!({ "config": config })))
}

/// `GET /api/servers`
pub async fn list_servers(supervisor: Data<Supervisor>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "servers": supervisor.all_statuses().await }))
}

/// `GET /api/templates`
pub async fn list_templates(supervisor: Data<Supervisor>) -> Result<HttpResponse> {
    let templates = supervisor.list_templates().await?;
    Ok(HttpResponse::Ok().json(json!({ "templates": templates })))
}
