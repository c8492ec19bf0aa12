//! Per-project totals derived from the certificate history

use crate::{ledger::LedgerEntry, review::ReviewFlag};
use certificate_engine::{round2, CurrencyCode, Project, ProjectId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Figures to date for one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    /// Project ID
    pub project_id: ProjectId,

    /// Contract number
    pub contract_number: String,

    /// Currency of record, if any
    pub currency: Option<CurrencyCode>,

    /// Number of certificates issued
    pub certificate_count: usize,

    /// Tender sum
    pub tender_sum: Decimal,

    /// Sum of current claims excl. VAT
    pub total_claimed_to_date: Decimal,

    /// Sum of net amounts payable
    pub total_paid_to_date: Decimal,

    /// Cumulative work value incl. VAT as of the latest certificate
    pub value_of_workdone_incl_vat: Decimal,

    /// Retention held as of the latest certificate
    pub retention_held: Decimal,

    /// Tender sum less claims to date; negative once the tender is overrun
    pub tender_remaining: Decimal,

    /// Claims to date as a percentage of the tender sum, `None` for a zero tender
    pub percent_of_tender_claimed: Option<Decimal>,

    /// Review flags across every certificate, in claim order
    pub review_flags: Vec<ReviewFlag>,
}

impl ProjectSummary {
    /// Build a summary from a project's history
    pub fn from_history(project: &Project, entries: &[LedgerEntry]) -> Self {
        let total_claimed_to_date: Decimal = entries
            .iter()
            .map(|e| e.certificate.current_claim_excl_vat)
            .sum();

        let total_paid_to_date: Decimal = entries
            .iter()
            .map(|e| e.calculations.total_amount_payable)
            .sum();

        let (value_of_workdone_incl_vat, retention_held) = entries
            .last()
            .map(|e| {
                (
                    e.calculations.value_of_workdone_incl_vat,
                    e.calculations.retention,
                )
            })
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));

        let tender_sum = project.details.tender_sum;
        let percent_of_tender_claimed = if tender_sum.is_zero() {
            None
        } else {
            total_claimed_to_date
                .checked_div(tender_sum)
                .map(|ratio| round2(ratio * Decimal::ONE_HUNDRED))
        };

        Self {
            project_id: project.id,
            contract_number: project.details.contract_number.clone(),
            currency: project.details.currency,
            certificate_count: entries.len(),
            tender_sum,
            total_claimed_to_date,
            total_paid_to_date,
            value_of_workdone_incl_vat,
            retention_held,
            tender_remaining: tender_sum - total_claimed_to_date,
            percent_of_tender_claimed,
            review_flags: entries.iter().flat_map(|e| e.review_flags.clone()).collect(),
        }
    }

    /// Any certificate on the project carries a review flag
    pub fn needs_review(&self) -> bool {
        !self.review_flags.is_empty()
    }
}
