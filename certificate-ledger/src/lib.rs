//! Certificate Ledger
//!
//! Per-project ordered history of payment certificates and their
//! calculations.
//!
//! # Architecture
//!
//! - **Append-only**: certificates and calculations are never modified or
//!   deleted; corrections are new certificates
//! - **Single writer per project**: read-baseline → compute → append runs
//!   under the project's lock, so two certificates can never be computed
//!   against the same baseline
//! - **Parallel across projects**: projects are sharded in a `DashMap` and
//!   locked independently
//!
//! # Example
//!
//! ```
//! use certificate_ledger::CertificateLedger;
//! use certificate_engine::{CertificateDraft, CurrencyCode, ProjectDetails};
//! use rust_decimal::Decimal;
//!
//! let ledger = CertificateLedger::default();
//! let project = ledger.register_project(ProjectDetails::new(
//!     "Acme Builders",
//!     "CN-2024-001",
//!     "V-100",
//!     Decimal::from(1_000_000),
//! ))?;
//!
//! let issued = ledger.issue(CertificateDraft::new(
//!     project.id,
//!     CurrencyCode::USD,
//!     Decimal::from(100_000),
//! ))?;
//! assert_eq!(issued.entry.calculations.total_amount_payable, Decimal::from(105_000));
//! # Ok::<(), certificate_engine::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod ledger;
pub mod review;
pub mod summary;
pub mod metrics;

// Re-exports
pub use certificate_engine::{Error, Result};
pub use ledger::{CertificateLedger, IssuedCertificate, LedgerEntry};
pub use review::ReviewFlag;
pub use summary::ProjectSummary;
pub use metrics::Metrics;
