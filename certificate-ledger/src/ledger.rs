//! Certificate ledger
//!
//! Owns the project registry and each project's ordered certificate history,
//! and computes the cumulative baseline every new certificate needs.
//!
//! # Concurrency
//!
//! ```text
//! DashMap<ProjectId, Arc<Mutex<ProjectBook>>>
//!            │
//!            ├── project A ── Mutex ── [cert 1, cert 2, ...]   (single writer)
//!            └── project B ── Mutex ── [cert 1, ...]           (independent)
//! ```
//!
//! `issue` and `append` hold the owning project's mutex from the baseline
//! read to the push, so the read-then-append is one atomic unit per project.
//! The map guard is always released before the mutex is taken.

use crate::{
    metrics::Metrics,
    review::{review, ReviewFlag},
    summary::ProjectSummary,
};
use certificate_engine::{
    config::{LedgerConfig, RatesConfig},
    CalculationEngine, Calculations, Certificate, CertificateDraft,
    CertificateId, Config, Error, Project, ProjectDetails, ProjectId, Result,
};
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One certificate with its calculations, at a position in the project's sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// 0-based claim sequence within the project
    pub sequence: usize,

    /// Certificate as issued
    pub certificate: Certificate,

    /// Derived figures
    pub calculations: Calculations,

    /// Advisory flags raised when the entry was appended
    #[serde(default)]
    pub review_flags: Vec<ReviewFlag>,
}

/// Result of issuing a certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCertificate {
    /// Entry appended to the ledger
    pub entry: LedgerEntry,
}

impl IssuedCertificate {
    /// Advisory flags raised on issuance
    pub fn review_flags(&self) -> &[ReviewFlag] {
        &self.entry.review_flags
    }
}

/// A project and its history
#[derive(Debug)]
struct ProjectBook {
    project: Project,
    entries: Vec<LedgerEntry>,
    /// Running sum of current claims, the baseline for the next certificate
    claimed_to_date: Decimal,
}

impl ProjectBook {
    fn new(project: Project) -> Self {
        Self {
            project,
            entries: Vec::new(),
            claimed_to_date: Decimal::ZERO,
        }
    }
}

/// Per-project ordered store of certificates
#[derive(Debug)]
pub struct CertificateLedger {
    /// Projects by ID
    projects: DashMap<ProjectId, Arc<Mutex<ProjectBook>>>,

    /// Contract number reservations
    contract_numbers: DashMap<String, ProjectId>,

    /// Owning project of every appended certificate
    certificates: DashMap<CertificateId, ProjectId>,

    /// Calculation engine used by `issue`
    engine: CalculationEngine,

    /// VAT rate and currency defaults for new drafts
    rates: RatesConfig,

    /// Review logging policy
    policy: LedgerConfig,

    /// Optional metrics sink
    metrics: Option<Metrics>,
}

impl Default for CertificateLedger {
    fn default() -> Self {
        Self::new(CalculationEngine::default())
    }
}

impl CertificateLedger {
    /// Create an empty ledger issuing with the given engine
    pub fn new(engine: CalculationEngine) -> Self {
        Self {
            projects: DashMap::new(),
            contract_numbers: DashMap::new(),
            certificates: DashMap::new(),
            engine,
            rates: RatesConfig::default(),
            policy: LedgerConfig::default(),
            metrics: None,
        }
    }

    /// Create an empty ledger from configuration
    pub fn from_config(config: &Config) -> Self {
        let mut ledger = Self::new(CalculationEngine::from_config(&config.rates));
        ledger.rates = config.rates.clone();
        ledger.policy = config.ledger.clone();
        ledger
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Engine used for issuance
    pub fn engine(&self) -> &CalculationEngine {
        &self.engine
    }

    /// Start a draft for a project with the configured VAT rate, in the
    /// project's currency of record or the configured default currency.
    pub fn draft(
        &self,
        project_id: ProjectId,
        current_claim_excl_vat: Decimal,
    ) -> Result<CertificateDraft> {
        let currency = self
            .project(project_id)?
            .details
            .currency
            .unwrap_or(self.rates.default_currency);

        Ok(CertificateDraft::new(project_id, currency, current_claim_excl_vat)
            .with_vat_rate(self.rates.vat_rate))
    }

    /// Register a new project with a generated ID
    pub fn register_project(&self, details: ProjectDetails) -> Result<Project> {
        let project = Project::new(details);
        self.insert_project(project.clone())?;
        Ok(project)
    }

    /// Register a fully formed project
    pub fn insert_project(&self, project: Project) -> Result<()> {
        project.details.validate()?;

        if self.projects.contains_key(&project.id) {
            return Err(Error::DuplicateProject(project.id));
        }

        let contract_key = contract_key(&project.details.contract_number);
        match self.contract_numbers.entry(contract_key.clone()) {
            Entry::Occupied(_) => return Err(Error::DuplicateContractNumber(contract_key)),
            Entry::Vacant(slot) => {
                slot.insert(project.id);
            }
        }

        let project_id = project.id;
        match self.projects.entry(project_id) {
            Entry::Occupied(_) => {
                // Lost a race on the ID; release the contract number again
                self.contract_numbers.remove(&contract_key);
                return Err(Error::DuplicateProject(project_id));
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(ProjectBook::new(project))));
            }
        }

        tracing::info!(%project_id, contract_number = %contract_key, "Registered project");
        Ok(())
    }

    /// Replace a project's details. The contract number stays unique.
    pub fn update_project_details(
        &self,
        project_id: ProjectId,
        details: ProjectDetails,
    ) -> Result<Project> {
        details.validate()?;

        let book = self.book(project_id)?;
        let mut book = book.lock();

        let old_key = contract_key(&book.project.details.contract_number);
        let new_key = contract_key(&details.contract_number);
        if old_key != new_key {
            match self.contract_numbers.entry(new_key.clone()) {
                Entry::Occupied(_) => return Err(Error::DuplicateContractNumber(new_key)),
                Entry::Vacant(slot) => {
                    slot.insert(project_id);
                }
            }
            self.contract_numbers.remove(&old_key);
        }

        book.project.details = details;
        book.project.updated_at = Utc::now();

        tracing::info!(%project_id, "Updated project details");
        Ok(book.project.clone())
    }

    /// Look up a project
    pub fn project(&self, project_id: ProjectId) -> Result<Project> {
        Ok(self.book(project_id)?.lock().project.clone())
    }

    /// All registered projects, oldest first
    pub fn projects(&self) -> Vec<Project> {
        let books: Vec<_> = self.projects.iter().map(|b| Arc::clone(b.value())).collect();
        let mut projects: Vec<Project> = books.iter().map(|b| b.lock().project.clone()).collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        projects
    }

    /// Sum of `current_claim_excl_vat` over the project's certificates at
    /// positions strictly before `as_of_sequence`.
    pub fn cumulative_claimed_before(
        &self,
        project_id: ProjectId,
        as_of_sequence: usize,
    ) -> Result<Decimal> {
        let book = self.book(project_id)?;
        let book = book.lock();

        Ok(book
            .entries
            .iter()
            .take(as_of_sequence)
            .map(|e| e.certificate.current_claim_excl_vat)
            .sum())
    }

    /// Append a computed certificate at the end of its project's sequence.
    ///
    /// All-or-nothing: on error the ledger is unchanged.
    pub fn append(
        &self,
        certificate: Certificate,
        calculations: Calculations,
    ) -> Result<LedgerEntry> {
        let result = self.append_checked(certificate, calculations);
        if result.is_err() {
            self.record_rejected();
        }
        result
    }

    fn append_checked(
        &self,
        certificate: Certificate,
        calculations: Calculations,
    ) -> Result<LedgerEntry> {
        if self.certificates.contains_key(&certificate.id) {
            return Err(Error::DuplicateCertificate(certificate.id));
        }

        let book = self.book(certificate.project_id)?;
        let mut book = book.lock();
        self.append_locked(&mut book, certificate, calculations)
    }

    /// Resolve the baseline, compute and append as one unit under the
    /// project's lock.
    pub fn issue(&self, draft: CertificateDraft) -> Result<IssuedCertificate> {
        let result = self.issue_checked(draft);
        if result.is_err() {
            self.record_rejected();
        }
        result
    }

    fn issue_checked(&self, draft: CertificateDraft) -> Result<IssuedCertificate> {
        if self.certificates.contains_key(&draft.id) {
            return Err(Error::DuplicateCertificate(draft.id));
        }

        let book = self.book(draft.project_id)?;
        let mut book = book.lock();

        let certificate = draft.into_certificate(book.claimed_to_date);
        let calculations = self.engine.compute(&certificate)?;
        let entry = self.append_locked(&mut book, certificate, calculations)?;

        Ok(IssuedCertificate { entry })
    }

    /// Entries for a project in claim order
    pub fn history(&self, project_id: ProjectId) -> Result<Vec<LedgerEntry>> {
        Ok(self.book(project_id)?.lock().entries.clone())
    }

    /// Look up a single entry by certificate ID
    pub fn entry(&self, certificate_id: CertificateId) -> Result<LedgerEntry> {
        let project_id = self
            .certificates
            .get(&certificate_id)
            .map(|p| *p.value())
            .ok_or(Error::UnknownCertificate(certificate_id))?;

        let book = self.book(project_id)?;
        let book = book.lock();
        book.entries
            .iter()
            .find(|e| e.certificate.id == certificate_id)
            .cloned()
            .ok_or(Error::UnknownCertificate(certificate_id))
    }

    /// Totals to date for a project
    pub fn summary(&self, project_id: ProjectId) -> Result<ProjectSummary> {
        let book = self.book(project_id)?;
        let book = book.lock();
        Ok(ProjectSummary::from_history(&book.project, &book.entries))
    }

    /// Number of certificates across all projects
    pub fn certificate_count(&self) -> usize {
        self.certificates.len()
    }

    fn book(&self, project_id: ProjectId) -> Result<Arc<Mutex<ProjectBook>>> {
        self.projects
            .get(&project_id)
            .map(|b| Arc::clone(b.value()))
            .ok_or(Error::UnknownProject(project_id))
    }

    /// Validate and push. Caller holds the project's lock.
    fn append_locked(
        &self,
        book: &mut ProjectBook,
        certificate: Certificate,
        calculations: Calculations,
    ) -> Result<LedgerEntry> {
        if calculations.certificate_id != certificate.id {
            return Err(Error::MismatchedCalculations {
                expected: certificate.id,
                found: calculations.certificate_id,
            });
        }

        if certificate.previous_payment_excl_vat != book.claimed_to_date {
            return Err(Error::StaleBaseline {
                expected: book.claimed_to_date,
                actual: certificate.previous_payment_excl_vat,
            });
        }

        calculations.verify(&certificate)?;

        let review_flags = review(&book.project, &certificate, &calculations);

        let claimed_to_date = book
            .claimed_to_date
            .checked_add(certificate.current_claim_excl_vat)
            .ok_or_else(|| {
                Error::InvalidClaim(format!(
                    "claimed to date {} + {} overflows",
                    book.claimed_to_date, certificate.current_claim_excl_vat
                ))
            })?;

        // Last fallible step: claim the certificate ID
        match self.certificates.entry(certificate.id) {
            Entry::Occupied(_) => return Err(Error::DuplicateCertificate(certificate.id)),
            Entry::Vacant(slot) => {
                slot.insert(certificate.project_id);
            }
        }

        let entry = LedgerEntry {
            sequence: book.entries.len(),
            certificate,
            calculations,
            review_flags,
        };
        book.claimed_to_date = claimed_to_date;
        book.entries.push(entry.clone());

        self.report(&entry);
        Ok(entry)
    }

    fn report(&self, entry: &LedgerEntry) {
        tracing::info!(
            certificate_id = %entry.certificate.id,
            project_id = %entry.certificate.project_id,
            sequence = entry.sequence,
            payable = %entry.calculations.total_amount_payable,
            "Certificate appended"
        );

        for flag in &entry.review_flags {
            let log = match flag {
                ReviewFlag::CurrencyMismatch { .. } => self.policy.warn_on_currency_mismatch,
                ReviewFlag::TenderExceeded { .. } => self.policy.warn_on_tender_overrun,
                ReviewFlag::NegativePayable { .. } => true,
            };
            if log {
                tracing::warn!(
                    certificate_id = %entry.certificate.id,
                    kind = flag.kind(),
                    "Certificate needs review: {}",
                    flag
                );
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_issued(entry.calculations.total_amount_payable);
            for flag in &entry.review_flags {
                metrics.record_review_flag(flag.kind());
            }
        }
    }

    fn record_rejected(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_rejected();
        }
    }
}

fn contract_key(contract_number: &str) -> String {
    contract_number.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use certificate_engine::CurrencyCode;
    use uuid::Uuid;

    fn details(contract: &str) -> ProjectDetails {
        ProjectDetails::new("Acme Builders", contract, "V-100", Decimal::from(1_000_000))
            .with_currency(CurrencyCode::USD)
    }

    fn computed(project_id: ProjectId, claim: Decimal, previous: Decimal) -> (Certificate, Calculations) {
        let certificate = Certificate::new(
            project_id,
            CurrencyCode::USD,
            claim,
            Decimal::new(15, 2),
            previous,
        );
        let calculations = CalculationEngine::default().compute(&certificate).unwrap();
        (certificate, calculations)
    }

    #[test]
    fn test_register_and_lookup_project() {
        let ledger = CertificateLedger::default();
        let project = ledger.register_project(details("CN-001")).unwrap();

        assert_eq!(ledger.project(project.id).unwrap(), project);
        assert_eq!(ledger.projects().len(), 1);
        assert!(ledger.history(project.id).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_contract_number_rejected() {
        let ledger = CertificateLedger::default();
        ledger.register_project(details("CN-001")).unwrap();

        let result = ledger.register_project(details(" CN-001 "));
        assert!(matches!(result, Err(Error::DuplicateContractNumber(_))));
        assert_eq!(ledger.projects().len(), 1);
    }

    #[test]
    fn test_duplicate_project_id_rejected_and_contract_released() {
        let ledger = CertificateLedger::default();
        let project = ledger.register_project(details("CN-001")).unwrap();

        let clash = Project::new(details("CN-002")).with_id(project.id);
        assert!(matches!(ledger.insert_project(clash), Err(Error::DuplicateProject(_))));

        // CN-002 was never taken
        assert!(ledger.register_project(details("CN-002")).is_ok());
    }

    #[test]
    fn test_update_project_details_moves_contract_number() {
        let ledger = CertificateLedger::default();
        let first = ledger.register_project(details("CN-001")).unwrap();
        ledger.register_project(details("CN-002")).unwrap();

        let taken = ledger.update_project_details(first.id, details("CN-002"));
        assert!(matches!(taken, Err(Error::DuplicateContractNumber(_))));

        let mut renamed = details("CN-003");
        renamed.tender_sum = Decimal::from(2_000_000);
        let updated = ledger.update_project_details(first.id, renamed).unwrap();
        assert_eq!(updated.id, first.id);
        assert_eq!(updated.details.tender_sum, Decimal::from(2_000_000));

        // CN-001 is free again
        assert!(ledger.register_project(details("CN-001")).is_ok());
    }

    #[test]
    fn test_unknown_project() {
        let ledger = CertificateLedger::default();
        let missing = ProjectId::new();

        assert!(matches!(ledger.history(missing), Err(Error::UnknownProject(_))));
        assert!(matches!(
            ledger.cumulative_claimed_before(missing, 0),
            Err(Error::UnknownProject(_))
        ));

        let (certificate, calculations) = computed(missing, Decimal::from(100), Decimal::ZERO);
        assert!(matches!(
            ledger.append(certificate, calculations),
            Err(Error::UnknownProject(_))
        ));
    }

    #[test]
    fn test_cumulative_claimed_before() {
        let ledger = CertificateLedger::default();
        let project = ledger.register_project(details("CN-001")).unwrap();

        assert_eq!(ledger.cumulative_claimed_before(project.id, 0).unwrap(), Decimal::ZERO);
        assert_eq!(ledger.cumulative_claimed_before(project.id, 5).unwrap(), Decimal::ZERO);

        for claim in [100_000, 50_000, 25_000] {
            ledger
                .issue(CertificateDraft::new(project.id, CurrencyCode::USD, Decimal::from(claim)))
                .unwrap();
        }

        assert_eq!(ledger.cumulative_claimed_before(project.id, 0).unwrap(), Decimal::ZERO);
        assert_eq!(ledger.cumulative_claimed_before(project.id, 1).unwrap(), Decimal::from(100_000));
        assert_eq!(ledger.cumulative_claimed_before(project.id, 2).unwrap(), Decimal::from(150_000));
        assert_eq!(ledger.cumulative_claimed_before(project.id, 3).unwrap(), Decimal::from(175_000));
        assert_eq!(ledger.cumulative_claimed_before(project.id, 99).unwrap(), Decimal::from(175_000));
    }

    #[test]
    fn test_issue_two_certificates() {
        let ledger = CertificateLedger::default();
        let project = ledger.register_project(details("CN-001")).unwrap();

        let first = ledger
            .issue(CertificateDraft::new(project.id, CurrencyCode::USD, Decimal::new(10000000, 2)))
            .unwrap();
        assert_eq!(first.entry.sequence, 0);
        assert_eq!(first.entry.calculations.total_amount_payable, Decimal::from(105_000));
        assert!(first.review_flags().is_empty());

        let second = ledger
            .issue(CertificateDraft::new(project.id, CurrencyCode::USD, Decimal::new(5000000, 2)))
            .unwrap();
        assert_eq!(second.entry.sequence, 1);
        assert_eq!(
            second.entry.certificate.previous_payment_excl_vat,
            Decimal::from(100_000)
        );
        assert_eq!(second.entry.calculations.value_of_workdone_incl_vat, Decimal::from(172_500));
        assert_eq!(second.entry.calculations.retention, Decimal::from(15_000));
        assert_eq!(second.entry.calculations.total_amount_payable, Decimal::from(57_500));
    }

    #[test]
    fn test_append_duplicate_certificate() {
        let ledger = CertificateLedger::default();
        let project = ledger.register_project(details("CN-001")).unwrap();

        let (certificate, calculations) = computed(project.id, Decimal::from(100), Decimal::ZERO);
        ledger.append(certificate.clone(), calculations.clone()).unwrap();

        let result = ledger.append(certificate, calculations);
        assert!(matches!(result, Err(Error::DuplicateCertificate(_))));
        assert_eq!(ledger.history(project.id).unwrap().len(), 1);
    }

    #[test]
    fn test_append_is_all_or_nothing() {
        let ledger = CertificateLedger::default();
        let project = ledger.register_project(details("CN-001")).unwrap();

        // Stale baseline: ledger has nothing claimed yet
        let (certificate, calculations) = computed(project.id, Decimal::from(100), Decimal::from(50));
        let id = certificate.id;
        assert!(matches!(
            ledger.append(certificate, calculations),
            Err(Error::StaleBaseline { .. })
        ));

        // Calculations keyed to another certificate
        let (certificate, _) = computed(project.id, Decimal::from(100), Decimal::ZERO);
        let (_, other) = computed(project.id, Decimal::from(100), Decimal::ZERO);
        assert!(matches!(
            ledger.append(certificate, other),
            Err(Error::MismatchedCalculations { .. })
        ));

        // Tampered figures
        let (certificate, mut calculations) = computed(project.id, Decimal::from(100), Decimal::ZERO);
        calculations.retention = Decimal::ZERO;
        assert!(matches!(
            ledger.append(certificate, calculations),
            Err(Error::InvariantViolation(_))
        ));

        assert!(ledger.history(project.id).unwrap().is_empty());
        assert_eq!(ledger.certificate_count(), 0);
        assert!(matches!(ledger.entry(id), Err(Error::UnknownCertificate(_))));
        assert_eq!(ledger.cumulative_claimed_before(project.id, 1).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_append_rejects_invalid_inputs() {
        let ledger = CertificateLedger::default();
        let project = ledger.register_project(details("CN-001")).unwrap();

        // Negative claim whose figures agree with the formulas
        let certificate = Certificate::new(
            project.id,
            CurrencyCode::USD,
            Decimal::from(-100),
            Decimal::new(15, 2),
            Decimal::ZERO,
        );
        let calculations = Calculations {
            certificate_id: certificate.id,
            vat_value: Decimal::from(-15),
            value_of_workdone_incl_vat: Decimal::from(-115),
            total_value_of_workdone_excl_vat: Decimal::from(-100),
            retention: Decimal::from(-10),
            total_amount_payable: Decimal::from(-105),
            retention_rate: Decimal::new(10, 2),
        };
        assert!(matches!(
            ledger.append(certificate, calculations),
            Err(Error::InvalidClaim(_))
        ));

        // Retention rate above one
        let (certificate, mut calculations) = computed(project.id, Decimal::from(100), Decimal::ZERO);
        calculations.retention_rate = Decimal::from(5);
        calculations.retention = Decimal::from(500);
        calculations.total_amount_payable = Decimal::from(-385);
        assert!(matches!(
            ledger.append(certificate, calculations),
            Err(Error::InvalidClaim(_))
        ));

        // Sub-cent claim
        let certificate = Certificate::new(
            project.id,
            CurrencyCode::USD,
            Decimal::new(5, 3),
            Decimal::new(15, 2),
            Decimal::ZERO,
        );
        let calculations = Calculations {
            certificate_id: certificate.id,
            vat_value: Decimal::ZERO,
            value_of_workdone_incl_vat: Decimal::new(1, 2),
            total_value_of_workdone_excl_vat: Decimal::new(5, 3),
            retention: Decimal::ZERO,
            total_amount_payable: Decimal::new(1, 2),
            retention_rate: Decimal::new(10, 2),
        };
        assert!(matches!(
            ledger.append(certificate, calculations),
            Err(Error::InvalidClaim(_))
        ));

        assert!(ledger.history(project.id).unwrap().is_empty());
        assert_eq!(ledger.cumulative_claimed_before(project.id, 1).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_issue_rejects_sub_cent_claims() {
        let ledger = CertificateLedger::default();
        let project = ledger.register_project(details("CN-001")).unwrap();

        for _ in 0..2 {
            let result = ledger.issue(CertificateDraft::new(
                project.id,
                CurrencyCode::USD,
                Decimal::new(5, 3),
            ));
            assert!(matches!(result, Err(Error::InvalidClaim(_))));
        }

        assert!(ledger.history(project.id).unwrap().is_empty());
    }

    #[test]
    fn test_issue_huge_claim_with_bad_vat_rate_is_rejected() {
        let ledger = CertificateLedger::default();
        let project = ledger.register_project(details("CN-001")).unwrap();

        let draft = CertificateDraft::new(project.id, CurrencyCode::USD, Decimal::MAX)
            .with_vat_rate(Decimal::from(2));
        assert!(matches!(ledger.issue(draft), Err(Error::InvalidClaim(_))));

        // The project lock was released and the book is intact
        let issued = ledger
            .issue(CertificateDraft::new(project.id, CurrencyCode::USD, Decimal::from(100)))
            .unwrap();
        assert_eq!(issued.entry.sequence, 0);
    }

    #[test]
    fn test_history_order_ignores_id_order() {
        let ledger = CertificateLedger::default();
        let project = ledger.register_project(details("CN-001")).unwrap();

        let high = CertificateId::from_uuid(Uuid::from_u128(u128::MAX));
        let low = CertificateId::from_uuid(Uuid::from_u128(1));

        ledger
            .issue(CertificateDraft::new(project.id, CurrencyCode::USD, Decimal::from(10)).with_id(high))
            .unwrap();
        ledger
            .issue(CertificateDraft::new(project.id, CurrencyCode::USD, Decimal::from(20)).with_id(low))
            .unwrap();

        let ids: Vec<_> = ledger
            .history(project.id)
            .unwrap()
            .iter()
            .map(|e| e.certificate.id)
            .collect();
        assert_eq!(ids, vec![high, low]);
    }

    #[test]
    fn test_issue_rejects_negative_claim_without_mutation() {
        let metrics = Metrics::new().unwrap();
        let ledger = CertificateLedger::default().with_metrics(metrics.clone());
        let project = ledger.register_project(details("CN-001")).unwrap();

        let result = ledger.issue(CertificateDraft::new(project.id, CurrencyCode::USD, Decimal::from(-1)));
        assert!(matches!(result, Err(Error::InvalidClaim(_))));
        assert!(ledger.history(project.id).unwrap().is_empty());
        assert_eq!(metrics.certificates_rejected.get(), 1);
        assert_eq!(metrics.certificates_issued.get(), 0);
    }

    #[test]
    fn test_entry_lookup() {
        let ledger = CertificateLedger::default();
        let project = ledger.register_project(details("CN-001")).unwrap();
        let issued = ledger
            .issue(CertificateDraft::new(project.id, CurrencyCode::USD, Decimal::from(1_000)))
            .unwrap();

        let entry = ledger.entry(issued.entry.certificate.id).unwrap();
        assert_eq!(entry, issued.entry);
    }

    #[test]
    fn test_currency_mismatch_is_advisory() {
        let metrics = Metrics::new().unwrap();
        let ledger = CertificateLedger::default().with_metrics(metrics.clone());
        let project = ledger.register_project(details("CN-001")).unwrap();

        let issued = ledger
            .issue(CertificateDraft::new(project.id, CurrencyCode::ZIG, Decimal::from(1_000)))
            .unwrap();

        assert_eq!(issued.review_flags().len(), 1);
        assert_eq!(issued.review_flags()[0].kind(), "currency_mismatch");
        assert_eq!(metrics.certificates_issued.get(), 1);
        assert_eq!(
            metrics.review_flags.with_label_values(&["currency_mismatch"]).get(),
            1
        );
    }

    #[test]
    fn test_summary() {
        let ledger = CertificateLedger::default();
        let project = ledger.register_project(details("CN-001")).unwrap();

        let empty = ledger.summary(project.id).unwrap();
        assert_eq!(empty.certificate_count, 0);
        assert_eq!(empty.total_claimed_to_date, Decimal::ZERO);
        assert_eq!(empty.percent_of_tender_claimed, Some(Decimal::ZERO));

        for claim in [100_000, 50_000] {
            ledger
                .issue(CertificateDraft::new(project.id, CurrencyCode::USD, Decimal::from(claim)))
                .unwrap();
        }

        let summary = ledger.summary(project.id).unwrap();
        assert_eq!(summary.certificate_count, 2);
        assert_eq!(summary.total_claimed_to_date, Decimal::from(150_000));
        assert_eq!(summary.total_paid_to_date, Decimal::from(162_500));
        assert_eq!(summary.value_of_workdone_incl_vat, Decimal::from(172_500));
        assert_eq!(summary.retention_held, Decimal::from(15_000));
        assert_eq!(summary.tender_remaining, Decimal::from(850_000));
        assert_eq!(summary.percent_of_tender_claimed, Some(Decimal::from(15)));
        assert!(!summary.needs_review());
    }

    #[test]
    fn test_summary_zero_tender() {
        let ledger = CertificateLedger::default();
        let mut zero = details("CN-001");
        zero.tender_sum = Decimal::ZERO;
        let project = ledger.register_project(zero).unwrap();

        ledger
            .issue(CertificateDraft::new(project.id, CurrencyCode::USD, Decimal::from(10)))
            .unwrap();

        let summary = ledger.summary(project.id).unwrap();
        assert_eq!(summary.percent_of_tender_claimed, None);
        assert_eq!(summary.tender_remaining, Decimal::from(-10));
        assert!(summary.needs_review());
        assert_eq!(summary.review_flags[0].kind(), "tender_exceeded");
    }

    #[test]
    fn test_from_config_uses_retention_rate() {
        let mut config = Config::default();
        config.rates.retention_rate = Decimal::new(5, 2);
        let ledger = CertificateLedger::from_config(&config);
        let project = ledger.register_project(details("CN-001")).unwrap();

        let issued = ledger
            .issue(CertificateDraft::new(project.id, CurrencyCode::USD, Decimal::from(100_000)))
            .unwrap();
        assert_eq!(issued.entry.calculations.retention, Decimal::from(5_000));
        assert_eq!(issued.entry.calculations.total_amount_payable, Decimal::from(110_000));
    }

    #[test]
    fn test_draft_uses_configured_rates() {
        let mut config = Config::default();
        config.rates.vat_rate = Decimal::new(145, 3);
        config.rates.default_currency = CurrencyCode::ZIG;
        let ledger = CertificateLedger::from_config(&config);

        let priced = ledger.register_project(details("CN-001")).unwrap();
        let draft = ledger.draft(priced.id, Decimal::from(1_000)).unwrap();
        assert_eq!(draft.currency, CurrencyCode::USD);
        assert_eq!(draft.vat_rate, Decimal::new(145, 3));

        let mut bare = details("CN-002");
        bare.currency = None;
        let bare = ledger.register_project(bare).unwrap();
        let draft = ledger.draft(bare.id, Decimal::from(1_000)).unwrap();
        assert_eq!(draft.currency, CurrencyCode::ZIG);

        let issued = ledger.issue(draft).unwrap();
        assert_eq!(issued.entry.calculations.vat_value, Decimal::from(145));

        assert!(matches!(
            ledger.draft(ProjectId::new(), Decimal::ONE),
            Err(Error::UnknownProject(_))
        ));
    }
}
