use std::sync::Arc;

use actix_web_opentelemetry::{PrometheusMetricsHandler, RequestMetricsBuilder};
use opentelemetry::metrics::ObservableGauge;
use opentelemetry::sdk::export::metrics::aggregation;
use opentelemetry::sdk::metrics::{controllers, processors};
use opentelemetry::{global, sdk, Context};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::Settings;

#[derive(Clone)]
pub struct OpenTelemetryStack {
    request_metrics: actix_web_opentelemetry::RequestMetrics,
    metrics_handler: PrometheusMetricsHandler,
    todo_count: Arc<ObservableGauge<i64>>,
    item_count: Arc<ObservableGauge<i64>>,
}

impl OpenTelemetryStack {
    /// Installs the global tracing subscriber and the Jaeger and Prometheus exporters.
    pub fn install(settings: &Settings) -> anyhow::Result<Self> {
        let app_name = settings.app_name.clone();

        global::set_text_map_propagator(opentelemetry_jaeger::Propagator::new());
        let tracer = opentelemetry_jaeger::new_agent_pipeline()
            .with_endpoint(settings.jaeger_endpoint.clone())
            .with_service_name(app_name.clone())
            .install_batch(opentelemetry::runtime::TokioCurrentThread)?;

        let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("INFO"));
        let formatting_layer = BunyanFormattingLayer::new(app_name, std::io::stdout);
        let subscriber = Registry::default()
            .with(telemetry)
            .with(JsonStorageLayer)
            .with(formatting_layer)
            .with(env_filter);
        tracing::subscriber::set_global_default(subscriber)?;

        let controller = controllers::basic(processors::factory(
            sdk::metrics::selectors::simple::histogram([0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
            aggregation::cumulative_temporality_selector(),
        ))
        .build();
        let prometheus_exporter = opentelemetry_prometheus::exporter(controller).init();
        let request_metrics = RequestMetricsBuilder::new().build(global::meter("actix_web"));
        let meter = global::meter("global");
        let metrics_handler = PrometheusMetricsHandler::new(prometheus_exporter);
        let todo_count = meter
            .i64_observable_gauge("todo_count")
            .with_description("Number of todos that are not deleted")
            .init();
        let item_count = meter
            .i64_observable_gauge("item_count")
            .with_description("Number of items")
            .init();
        Ok(Self {
            request_metrics,
            metrics_handler,
            todo_count: Arc::new(todo_count),
            item_count: Arc::new(item_count),
        })
    }

    pub fn metrics(&self) -> actix_web_opentelemetry::RequestMetrics {
        self.request_metrics.clone()
    }

    pub fn metrics_handler(&self) -> PrometheusMetricsHandler {
        self.metrics_handler.clone()
    }

    pub fn observe_counts(&self, todos: i64, items: i64) {
        let cx = Context::current();
        self.todo_count.observe(&cx, todos, &[]);
        self.item_count.observe(&cx, items, &[]);
    }

    /// Flushes spans still queued for Jaeger.
    pub fn shutdown(&self) {
        global::shutdown_tracer_provider();
    }
}
