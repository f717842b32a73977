//! Prometheus metrics for the medical QA agent.
//!
//! Exposes:
//! - `medical_qa_command_duration_seconds` / `medical_qa_command_total` /
//!   `medical_qa_command_inflight` for CLI commands
//! - `medical_qa_dispatch_duration_seconds` (histogram by strategy)
//! - `medical_qa_dispatch_total` (counter by strategy and status)
//! - `medical_qa_tool_selection_total` (counter by outcome)
//! - `medical_qa_graph_candidates_total` (counter by status)
//! - `medical_qa_external_call_duration_seconds` (histogram by service)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter_vec, register_int_gauge_vec,
    Encoder, HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static COMMAND_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // Exponential buckets from 50ms up to ~3 minutes.
    let buckets =
        prometheus::exponential_buckets(0.05, 2.0, 14).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "medical_qa_command_duration_seconds",
        "CLI command duration in seconds",
        &["command"],
        buckets
    )
    .expect("failed to register command duration histogram")
});

static COMMAND_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "medical_qa_command_total",
        "Total command executions by status",
        &["command", "status"]
    )
    .expect("failed to register command counter")
});

static COMMAND_INFLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "medical_qa_command_inflight",
        "Number of in-flight commands",
        &["command"]
    )
    .expect("failed to register inflight gauge")
});

static DISPATCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets =
        prometheus::exponential_buckets(0.05, 2.0, 12).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "medical_qa_dispatch_duration_seconds",
        "End-to-end dispatch duration in seconds",
        &["strategy"],
        buckets
    )
    .expect("failed to register dispatch duration histogram")
});

static DISPATCH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "medical_qa_dispatch_total",
        "Dispatches by strategy and status",
        &["strategy", "status"]
    )
    .expect("failed to register dispatch counter")
});

static TOOL_SELECTION_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "medical_qa_tool_selection_total",
        "Tool selection outcomes (matched or fallback)",
        &["outcome"]
    )
    .expect("failed to register tool selection counter")
});

static GRAPH_CANDIDATES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "medical_qa_graph_candidates_total",
        "Executed graph template candidates by status",
        &["status"]
    )
    .expect("failed to register graph candidate counter")
});

static EXTERNAL_CALL_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // 10ms up to ~80s.
    let buckets =
        prometheus::exponential_buckets(0.01, 2.0, 14).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "medical_qa_external_call_duration_seconds",
        "Outbound call latency by service",
        &["service"],
        buckets
    )
    .expect("failed to register external call histogram")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&COMMAND_DURATION);
    Lazy::force(&COMMAND_TOTAL);
    Lazy::force(&COMMAND_INFLIGHT);
    Lazy::force(&DISPATCH_DURATION);
    Lazy::force(&DISPATCH_TOTAL);
    Lazy::force(&TOOL_SELECTION_TOTAL);
    Lazy::force(&GRAPH_CANDIDATES_TOTAL);
    Lazy::force(&EXTERNAL_CALL_DURATION);
}

/// Increment inflight gauge for a command.
pub fn record_command_start(command: &'static str) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).inc();
}

/// Record command completion with duration and status.
pub fn record_command_result(command: &'static str, duration: Duration, success: bool) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).dec();
    COMMAND_DURATION
        .with_label_values(&[command])
        .observe(duration.as_secs_f64());
    COMMAND_TOTAL
        .with_label_values(&[command, if success { "ok" } else { "error" }])
        .inc();
}

/// Record one finished dispatch.
pub fn record_dispatch(strategy: &str, duration: Duration, success: bool) {
    DISPATCH_DURATION
        .with_label_values(&[strategy])
        .observe(duration.as_secs_f64());
    DISPATCH_TOTAL
        .with_label_values(&[strategy, if success { "ok" } else { "error" }])
        .inc();
}

/// Record whether the selected tool name matched or fell back.
pub fn record_tool_selection(outcome: &'static str) {
    TOOL_SELECTION_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a graph candidate outcome: `used`, `empty` or `failed`.
pub fn record_graph_candidate(status: &'static str) {
    GRAPH_CANDIDATES_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_external_call(service: &str, duration: Duration) {
    EXTERNAL_CALL_DURATION
        .with_label_values(&[service])
        .observe(duration.as_secs_f64());
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        let mut response = Response::new(Full::from("encode error"));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        return Ok(response);
    }

    let mut response = Response::new(Full::from(buffer));
    if let Ok(content_type) = hyper::header::HeaderValue::from_str(encoder.format_type()) {
        response
            .headers_mut()
            .insert(hyper::header::CONTENT_TYPE, content_type);
    }
    Ok(response)
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    match req.uri().path() {
        "/metrics" => metrics_response().await,
        _ => {
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::NOT_FOUND;
            Ok(response)
        }
    }
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prometheus metrics endpoint started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service_fn(handle_request);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Metrics connection error: {}", err);
            }
        });
    }
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        if let Err(err) = serve(addr).await {
            error!(%addr, "Metrics server failed: {}", err);
        }
    });
}
