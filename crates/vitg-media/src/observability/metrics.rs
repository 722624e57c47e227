use super::GLOBAL_LABELS;
use crate::config::from_env_or_panic;
use crate::prelude::*;
use crate::util::units::{KB, MB};
use serde::Deserialize;
use std::net::SocketAddr;

/// Histogram buckets to measure the distribution of request durations in seconds
pub(crate) const DEFAULT_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

const KB_F: f64 = KB as f64;
const MB_F: f64 = MB as f64;

pub(crate) const DEFAULT_BLOB_SIZE_BUCKETS: &[f64] = &[
    KB_F * 4.,
    KB_F * 16.,
    KB_F * 64.,
    KB_F * 256.,
    MB_F * 1.,
    MB_F * 2.,
    MB_F * 4.,
    MB_F * 8.,
    MB_F * 16.,
    MB_F * 50.,
];

#[derive(Deserialize)]
struct MetricsConfig {
    /// The exporter isn't started when this is unset
    metrics_listen_addr: Option<SocketAddr>,
}

pub fn init_metrics() {
    let config: MetricsConfig = from_env_or_panic("");

    let Some(addr) = config.metrics_listen_addr else {
        debug!("Metrics listen address is not configured, metrics are disabled");
        return;
    };

    let mut builder = metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Suffix("_seconds".to_owned()),
            DEFAULT_DURATION_BUCKETS,
        )
        .and_then(|builder| {
            builder.set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Suffix("_bytes".to_owned()),
                DEFAULT_BLOB_SIZE_BUCKETS,
            )
        })
        .expect("BUG: invalid histogram buckets");

    for (key, value) in GLOBAL_LABELS {
        builder = builder.add_global_label(*key, *value);
    }

    builder
        .install()
        .expect("BUG: failed to initialize the metrics listener");

    info!(%addr, "Metrics exporter is listening");
}
