//! Metrics collection for observability
//!
//! Prometheus metrics for monitoring certificate issuance.
//!
//! # Metrics
//!
//! - `certificates_issued_total` - Certificates appended to the ledger
//! - `certificates_rejected_total` - Appends or issues refused by validation
//! - `certificate_review_flags_total{kind}` - Review flags raised, by kind
//! - `certificate_amount_payable` - Histogram of net payable per certificate

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Certificates appended
    pub certificates_issued: IntCounter,

    /// Appends or issues refused
    pub certificates_rejected: IntCounter,

    /// Review flags raised, labelled by kind
    pub review_flags: IntCounterVec,

    /// Net payable histogram
    pub amount_payable: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let certificates_issued = IntCounter::new(
            "certificates_issued_total",
            "Certificates appended to the ledger",
        )?;
        registry.register(Box::new(certificates_issued.clone()))?;

        let certificates_rejected = IntCounter::new(
            "certificates_rejected_total",
            "Certificate appends or issues refused by validation",
        )?;
        registry.register(Box::new(certificates_rejected.clone()))?;

        let review_flags = IntCounterVec::new(
            Opts::new(
                "certificate_review_flags_total",
                "Review flags raised on issued certificates",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(review_flags.clone()))?;

        let amount_payable = Histogram::with_opts(
            HistogramOpts::new(
                "certificate_amount_payable",
                "Net amount payable per certificate",
            )
            .buckets(vec![0.0, 1_000.0, 10_000.0, 100_000.0, 1_000_000.0, 10_000_000.0]),
        )?;
        registry.register(Box::new(amount_payable.clone()))?;

        Ok(Self {
            certificates_issued,
            certificates_rejected,
            review_flags,
            amount_payable,
            registry,
        })
    }

    /// Record an appended certificate
    pub fn record_issued(&self, total_amount_payable: Decimal) {
        self.certificates_issued.inc();
        self.amount_payable
            .observe(total_amount_payable.to_f64().unwrap_or(0.0));
    }

    /// Record a refused append or issue
    pub fn record_rejected(&self) {
        self.certificates_rejected.inc();
    }

    /// Record a review flag
    pub fn record_review_flag(&self, kind: &str) {
        self.review_flags.with_label_values(&[kind]).inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("certificates_issued", &self.certificates_issued.get())
            .field("certificates_rejected", &self.certificates_rejected.get())
            .finish_non_exhaustive()
    }
}
