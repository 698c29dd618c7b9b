//! Prometheus metrics for the API server
//!
//! - `podstudio_http_requests_total` (counter) by method and status
//! - `podstudio_http_request_duration_seconds` (histogram) by method
//! - `podstudio_submissions_total` (counter) by form, operation and result
//! - `podstudio_validation_failures_total` (counter) by form and field

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::collections::BTreeMap;

const NAMESPACE: &str = "podstudio";

pub struct ApiMetrics {
    registry: Registry,
    requests_total: CounterVec,
    request_duration_seconds: HistogramVec,
    submissions_total: CounterVec,
    validation_failures_total: CounterVec,
}

impl ApiMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
            &["method", "status"],
        )?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request duration in seconds")
                .namespace(NAMESPACE)
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["method"],
        )?;

        let submissions_total = CounterVec::new(
            Opts::new("submissions_total", "Form submissions handled by the API")
                .namespace(NAMESPACE),
            &["form", "operation", "result"],
        )?;

        let validation_failures_total = CounterVec::new(
            Opts::new(
                "validation_failures_total",
                "Fields rejected by server-side validation",
            )
            .namespace(NAMESPACE),
            &["form", "field"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(validation_failures_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration_seconds,
            submissions_total,
            validation_failures_total,
        })
    }

    pub fn record_request(&self, method: &str, status: u16, duration_secs: f64) {
        self.requests_total
            .with_label_values(&[method, &status.to_string()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[method])
            .observe(duration_secs);
    }

    pub fn record_submission(&self, form: &str, operation: &str, result: &str) {
        self.submissions_total
            .with_label_values(&[form, operation, result])
            .inc();
    }

    pub fn record_validation_failures(&self, form: &str, errors: &BTreeMap<String, String>) {
        for field in errors.keys() {
            self.validation_failures_total
                .with_label_values(&[form, field])
                .inc();
        }
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
