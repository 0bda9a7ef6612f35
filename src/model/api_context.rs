use hyper::Method;
use prometheus::proto::MetricFamily;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConfigurationError;
use crate::directory::{Directory, Registration};
use crate::store::StoreError;
use crate::utils::latency_buckets;

const KNOWN_PATHS: &[&str] = &["/", "/users", "/api/users", "/api/refresh", "/metrics"];

/// Shared by every request handler.
#[derive(Debug, Clone)]
pub struct ApiContext {
    directory: Result<Directory, Arc<ConfigurationError>>,
    metrics: Arc<Metrics>,
}

#[derive(Debug)]
struct Metrics {
    registry: Registry,
    req_duration: HistogramVec,
    users_created: IntCounter,
    users_renumbered: IntCounter,
    store_errors: IntCounterVec,
}

impl ApiContext {
    pub fn new(directory: Result<Directory, ConfigurationError>) -> prometheus::Result<Self> {
        Ok(Self {
            directory: directory.map_err(Arc::new),
            metrics: Arc::new(Metrics::new()?),
        })
    }

    /// `Err` when the store was never configured.
    pub fn directory(&self) -> Result<&Directory, &ConfigurationError> {
        self.directory.as_ref().map_err(|e| &**e)
    }

    pub fn observe_req_duration(&self, method: &Method, path: &str, elapsed: Duration) {
        let path = if KNOWN_PATHS.contains(&path) {
            path
        } else {
            "other"
        };
        self.metrics
            .req_duration
            .with_label_values(&[method.as_str(), path])
            .observe(elapsed.as_secs_f64());
    }

    pub fn observe_registration(&self, registration: &Registration) {
        self.metrics.users_created.inc();
        self.metrics
            .users_renumbered
            .inc_by(registration.renumbered as u64);
    }

    pub fn observe_store_error(&self, err: &StoreError) {
        self.metrics
            .store_errors
            .with_label_values(&[err.operation()])
            .inc();
    }

    pub fn gather_metrics(&self) -> Vec<MetricFamily> {
        self.metrics.registry.gather()
    }
}

impl Metrics {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("user_directory".into()), None)?;

        let buckets = latency_buckets(Duration::from_micros(100), Duration::from_secs(30));
        let req_duration = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "HTTP request latency")
                .buckets(buckets),
            &["method", "path"],
        )?;
        let users_created = IntCounter::new("users_created_total", "Users registered")?;
        let users_renumbered = IntCounter::new(
            "users_renumbered_total",
            "New users moved to another user id after a conflicting write",
        )?;
        let store_errors = IntCounterVec::new(
            Opts::new("store_errors_total", "Failed remote store operations"),
            &["operation"],
        )?;

        registry.register(Box::new(req_duration.clone()))?;
        registry.register(Box::new(users_created.clone()))?;
        registry.register(Box::new(users_renumbered.clone()))?;
        registry.register(Box::new(store_errors.clone()))?;

        Ok(Self {
            registry,
            req_duration,
            users_created,
            users_renumbered,
            store_errors,
        })
    }
}
