//! Document generation metrics, exposed at `/metrics/documents`.

use std::time::Duration;

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec, TextEncoder};

lazy_static! {
    pub static ref DOCUMENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "docgen_documents_total",
        "Documents requested, by kind and outcome",
        &["kind", "outcome"]
    )
    .expect("documents counter can be registered");
    pub static ref CONVERSION_SECONDS: HistogramVec = register_histogram_vec!(
        "docgen_conversion_seconds",
        "Time spent in the external converter",
        &["kind"],
        vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]
    )
    .expect("conversion histogram can be registered");
}

pub fn record_outcome(kind: &str, outcome: &str) {
    DOCUMENTS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

pub fn observe_conversion(kind: &str, elapsed: Duration) {
    CONVERSION_SECONDS
        .with_label_values(&[kind])
        .observe(elapsed.as_secs_f64());
}

pub async fn documents_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        log::error!("Failed to encode metrics: {}", e);
        return HttpResponse::InternalServerError().finish();
    }
    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
