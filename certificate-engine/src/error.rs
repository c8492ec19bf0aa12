//! Error types for certificate calculation and ledger operations

use crate::types::{CertificateId, ProjectId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for certificate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Certificate errors
///
/// Every variant is raised before any state is mutated.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or out-of-range numeric claim input
    #[error("Invalid claim: {0}")]
    InvalidClaim(String),

    /// Project was never registered
    #[error("Unknown project: {0}")]
    UnknownProject(ProjectId),

    /// Certificate id already present in the ledger
    #[error("Duplicate certificate: {0}")]
    DuplicateCertificate(CertificateId),

    /// Certificate not found
    #[error("Unknown certificate: {0}")]
    UnknownCertificate(CertificateId),

    /// Project id already registered
    #[error("Duplicate project: {0}")]
    DuplicateProject(ProjectId),

    /// Contract number already used by another project
    #[error("Duplicate contract number: {0}")]
    DuplicateContractNumber(String),

    /// Invalid project details
    #[error("Invalid project: {0}")]
    InvalidProject(String),

    /// Currency code is not three uppercase ASCII letters
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),

    /// Calculations keyed to a different certificate
    #[error("Calculations for certificate {found} cannot be stored with certificate {expected}")]
    MismatchedCalculations {
        /// Certificate being appended
        expected: CertificateId,
        /// Certificate the calculations belong to
        found: CertificateId,
    },

    /// Certificate was computed against an out-of-date cumulative baseline
    #[error("Stale baseline: ledger has {expected} claimed before this certificate, certificate carries {actual}")]
    StaleBaseline {
        /// Cumulative claimed total held by the ledger
        expected: Decimal,
        /// previous_payment_excl_vat carried by the certificate
        actual: Decimal,
    },

    /// Stored figures disagree with the formulas
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
