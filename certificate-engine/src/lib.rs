//! Payment Certificate Engine
//!
//! Deterministic derivation of a payment certificate's financial summary
//! (VAT, cumulative work value, retention, net payable) from its claim inputs
//! and the project's cumulative baseline.
//!
//! # Invariants
//!
//! - `vat_value == round2(current_claim_excl_vat * vat_rate)`
//! - `total_value_of_workdone_excl_vat == previous_payment_excl_vat + current_claim_excl_vat`
//! - `retention == round2(total_value_of_workdone_excl_vat * retention_rate)`
//! - `value_of_workdone_incl_vat == total_excl + round2(total_excl * vat_rate)`
//! - `total_amount_payable == incl_vat - retention - previous_payment_excl_vat`
//!
//! # Example
//!
//! ```
//! use certificate_engine::{CalculationEngine, Certificate, CurrencyCode, ProjectId};
//! use rust_decimal::Decimal;
//!
//! let certificate = Certificate::new(
//!     ProjectId::new(),
//!     CurrencyCode::USD,
//!     Decimal::new(10000000, 2), // 100,000.00
//!     Decimal::new(15, 2),       // 15% VAT
//!     Decimal::ZERO,
//! );
//!
//! let calculations = CalculationEngine::default().compute(&certificate)?;
//! assert_eq!(calculations.total_amount_payable, Decimal::new(10500000, 2));
//! # Ok::<(), certificate_engine::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod engine;
pub mod error;
pub mod config;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    Calculations, Certificate, CertificateDraft, CertificateId, CurrencyCode, Project,
    ProjectDetails, ProjectId,
};
pub use engine::{format_amount, round2, validate_inputs, CalculationEngine};
pub use config::Config;
