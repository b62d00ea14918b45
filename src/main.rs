use actix_web::{get, web, App, Handler, HttpRequest, HttpResponse, HttpServer, Responder, Result};
use actix_web_opentelemetry::RequestTracing;
use serde::Serialize;

use crate::config::Settings;
use crate::repository::{RepositoryResult, TodoFilter};
use crate::services::AppState;

mod api;
mod config;
mod error;
mod models;
mod repository;
mod services;
mod telemetry;

#[derive(Serialize)]
pub struct Response {
    pub message: String,
}

#[get("/health")]
async fn healthcheck() -> impl Responder {
    let response = Response {
        message: "Everything is working fine".to_string(),
    };
    HttpResponse::Ok().json(response)
}

#[get("/metrics")]
async fn metrics(
    telemetry: web::Data<telemetry::OpenTelemetryStack>,
    state: web::Data<AppState>,
    request: HttpRequest,
) -> impl Responder {
    let repository = state.repository().clone();
    let counts = web::block(move || -> RepositoryResult<(i64, i64)> {
        Ok((repository.count_todos(&TodoFilter::visible())?, repository.count_items()?))
    })
    .await;
    match counts {
        Ok(Ok((todos, items))) => telemetry.observe_counts(todos, items),
        Ok(Err(err)) => tracing::warn!(error = %err, "failed to count todos for metrics"),
        Err(err) => tracing::warn!(error = %err, "failed to count todos for metrics"),
    }
    telemetry.metrics_handler().call(request).await
}

async fn not_found() -> Result<HttpResponse> {
    let response = Response {
        message: "Resource not found".to_string(),
    };
    Ok(HttpResponse::NotFound().json(response))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    let telemetry = telemetry::OpenTelemetryStack::install(&settings)?;
    let telemetry_data = web::Data::new(telemetry.clone());
    let shutdown_handle = telemetry.clone();

    let repository = repository::connect(&settings)?;
    let app_data = web::Data::new(AppState::new(repository));

    tracing::info!(host = %settings.host, port = settings.port, "starting server");
    HttpServer::new(move || {
        App::new()
            .app_data(app_data.clone())
            .app_data(telemetry_data.clone())
            .configure(api::api::config)
            .service(healthcheck)
            .service(metrics)
            .default_service(web::route().to(not_found))
            .wrap(actix_web::middleware::Logger::default())
            .wrap(RequestTracing::new())
            .wrap(telemetry.metrics())
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await?;

    shutdown_handle.shutdown();
    Ok(())
}
