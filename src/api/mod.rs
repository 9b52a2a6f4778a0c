//! JSON HTTP API for the supervisor, built on Actix Web.
//!
//! The API is a thin transport: it parses requests, rejects server ids that
//! could escape the servers directory, calls the [`Supervisor`] and maps
//! error kinds to status codes. It performs no authentication and should be
//! bound to loopback or placed behind an authenticating proxy.
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | POST | `/api/server/start` | start |
//! | POST | `/api/server/stop` | stop |
//! | GET | `/api/server/{id}/status` | status |
//! | GET | `/api/server/{id}/logs` | logs |
//! | POST | `/api/server/create` | create |
//! | DELETE | `/api/server/{id}` | delete |
//! | GET, PUT | `/api/server/{id}/config` | read / update config |
//! | GET | `/api/servers` | status of all live servers |
//! | GET | `/api/templates` | available templates |

pub mod actix_error;
pub mod handlers;

use crate::Supervisor;
use crate::error::{Error, Result};
use actix_web::{App, HttpServer, middleware, web};
use std::sync::Arc;

/// Registers every API route. Expects `Data<Supervisor>` to be provided by the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/server/start", web::post().to(handlers::start_server))
            .route("/server/stop", web::post().to(handlers::stop_server))
            .route("/server/create", web::post().to(handlers::create_server))
            .route("/server/{id}/status", web::get().to(handlers::server_status))
            .route("/server/{id}/logs", web::get().to(handlers::server_logs))
            .route("/server/{id}/config", web::get().to(handlers::read_config))
            .route("/server/{id}/config", web::put().to(handlers::update_config))
            .route("/server/{id}", web::delete().to(handlers::delete_server))
            .route("/servers", web::get().to(handlers::list_servers))
            .route("/templates", web::get().to(handlers::list_templates)),
    );
}

/// Serves the API on the configured bind address until the server is shut down.
///
/// Actix installs its own SIGINT/SIGTERM handling; this future resolves once
/// it has stopped accepting requests.
pub async fn serve(supervisor: Arc<Supervisor>) -> Result<()> {
    let config = supervisor.config().clone();
    let data = web::Data::from(supervisor);

    let mut server_builder = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(data.clone())
            .configure(configure)
    });

    if let Some(workers) = config.workers {
        tracing::info!(workers, "Setting number of Actix Web workers");
        server_builder = server_builder.workers(workers);
    }

    tracing::info!(address = %config.bind_address, "Starting HTTP API");
    server_builder
        .bind(&config.bind_address)
        .map_err(|e| Error::Config(format!("Failed to bind {}: {}", config.bind_address, e)))?
        .run()
        .await
        .map_err(|e| Error::IoFailure(format!("HTTP server error: {}", e)))?;

    tracing::info!("HTTP API stopped");
    Ok(())
}
