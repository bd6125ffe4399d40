//! Prometheus metrics.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Operation counters exposed on `/metrics`
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    operations: IntCounterVec,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let operations = IntCounterVec::new(
            Opts::new(
                "tenant_provisioner_operations_total",
                "Instance operations handled, by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations.clone()))?;
        Ok(Self { registry, operations })
    }

    /// Count one `operation` that ended with `outcome`
    pub fn record(&self, operation: &str, outcome: &str) {
        self.operations.with_label_values(&[operation, outcome]).inc();
    }

    /// Prometheus text exposition of all registered metrics
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
