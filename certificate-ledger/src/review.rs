//! Review flags raised on issued certificates
//!
//! Flags are advisory. The ledger records and reports them; deciding what to
//! do about a negative payable or a tender overrun is the caller's policy.

use certificate_engine::{Calculations, Certificate, CurrencyCode, Project};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition on a certificate that needs a human to look at it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewFlag {
    /// Net amount due this period is below zero
    NegativePayable {
        /// Net payable
        amount: Decimal,
    },

    /// Certificate currency differs from the project's currency of record
    CurrencyMismatch {
        /// Project currency of record
        project: CurrencyCode,
        /// Certificate currency
        certificate: CurrencyCode,
    },

    /// Cumulative claims exceed the tender sum
    TenderExceeded {
        /// Project tender sum
        tender_sum: Decimal,
        /// Cumulative work value excl. VAT
        claimed_to_date: Decimal,
    },
}

impl ReviewFlag {
    /// Stable label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ReviewFlag::NegativePayable { .. } => "negative_payable",
            ReviewFlag::CurrencyMismatch { .. } => "currency_mismatch",
            ReviewFlag::TenderExceeded { .. } => "tender_exceeded",
        }
    }
}

impl fmt::Display for ReviewFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewFlag::NegativePayable { amount } => {
                write!(f, "total amount payable is negative ({})", amount)
            }
            ReviewFlag::CurrencyMismatch {
                project,
                certificate,
            } => write!(
                f,
                "certificate currency {} differs from project currency {}",
                certificate, project
            ),
            ReviewFlag::TenderExceeded {
                tender_sum,
                claimed_to_date,
            } => write!(
                f,
                "claimed to date {} exceeds tender sum {}",
                claimed_to_date, tender_sum
            ),
        }
    }
}

/// Collect review flags for one certificate against its project
pub fn review(
    project: &Project,
    certificate: &Certificate,
    calculations: &Calculations,
) -> Vec<ReviewFlag> {
    let mut flags = Vec::new();

    if calculations.is_negative_payable() {
        flags.push(ReviewFlag::NegativePayable {
            amount: calculations.total_amount_payable,
        });
    }

    if let Some(project_currency) = project.details.currency {
        if project_currency != certificate.currency {
            flags.push(ReviewFlag::CurrencyMismatch {
                project: project_currency,
                certificate: certificate.currency,
            });
        }
    }

    if calculations.total_value_of_workdone_excl_vat > project.details.tender_sum {
        flags.push(ReviewFlag::TenderExceeded {
            tender_sum: project.details.tender_sum,
            claimed_to_date: calculations.total_value_of_workdone_excl_vat,
        });
    }

    flags
}
