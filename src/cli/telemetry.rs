//! Tracing and metrics bootstrap.
//!
//! Logs always go to stderr through `tracing-subscriber`. Spans are exported
//! over OTLP only when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, so local runs
//! need no collector.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    runtime,
    trace::{Tracer, TracerProvider},
    Resource,
};
use std::time::Duration;
use tonic::transport::ClientTlsConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};
use url::Url;

static TRACER_PROVIDER: OnceCell<TracerProvider> = OnceCell::new();

/// Histogram buckets in seconds, 5ms to 2s.
const DURATION_SECONDS_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0];

/// Installs the global subscriber with the given default level.
pub fn init(verbosity_level: tracing::Level) -> Result<()> {
    // RUST_LOG overrides the CLI verbosity.
    let env_filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse().context("invalid directive")?)
        .add_directive("tonic=error".parse().context("invalid directive")?)
        .add_directive("tower=error".parse().context("invalid directive")?)
        .add_directive("opentelemetry_sdk=warn".parse().context("invalid directive")?);

    let fmt_layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .pretty();

    let subscriber = Registry::default().with(env_filter).with(fmt_layer);

    if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = init_tracer()?;
        let subscriber = subscriber.with(tracing_opentelemetry::layer().with_tracer(tracer));
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set global subscriber")?;
    } else {
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set global subscriber")?;
    }

    Ok(())
}

fn init_tracer() -> Result<Tracer> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .context("OTEL_EXPORTER_OTLP_ENDPOINT not set")?;

    let mut exporter_builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .with_timeout(Duration::from_secs(3));

    // https collectors get TLS with system roots.
    if let Ok(url) = Url::parse(&endpoint) {
        if url.scheme() == "https" {
            let mut tls = ClientTlsConfig::new().with_native_roots();
            if let Some(host) = url.host_str() {
                tls = tls.domain_name(host.to_string());
            }
            exporter_builder = exporter_builder.with_tls_config(tls);
        }
    }

    let exporter = exporter_builder
        .build()
        .context("failed to build OTLP exporter")?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![
            KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ]))
        .build();

    let tracer = provider.tracer(env!("CARGO_PKG_NAME"));

    global::set_text_map_propagator(TraceContextPropagator::new());
    global::set_tracer_provider(provider.clone());

    let _ = TRACER_PROVIDER.set(provider);

    Ok(tracer)
}

/// Flushes buffered spans, called once on shutdown.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(err) = provider.shutdown() {
            eprintln!("Failed to shutdown tracer provider: {err}");
        }
    }
}

/// Installs the Prometheus recorder. Once per process, the handle renders
/// the exposition text for `GET /metrics`.
pub fn install_metrics_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .set_buckets(DURATION_SECONDS_BUCKETS)
        .context("invalid histogram buckets")?
        .install_recorder()
        .context("failed to install metrics recorder")
}
