//! Core types for payment certificates
//!
//! All types are designed for:
//! - Exact arithmetic (Decimal for money, never floats)
//! - Serde round-tripping (amounts serialize as strings)
//! - Immutability after calculation (corrections are new certificates)

use crate::engine::{
    checked_add, checked_mul, checked_sub, round2, validate_inputs, DEFAULT_VAT_RATE,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Project identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(Uuid);

impl ProjectId {
    /// Generate a new time-ordered project ID
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Certificate identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateId(Uuid);

impl CertificateId {
    /// Generate a new time-ordered certificate ID
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CertificateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217-style currency code (three uppercase ASCII letters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// US Dollar
    pub const USD: Self = Self(*b"USD");
    /// Zimbabwe Gold
    pub const ZIG: Self = Self(*b"ZIG");
    /// Euro
    pub const EUR: Self = Self(*b"EUR");
    /// British Pound
    pub const GBP: Self = Self(*b"GBP");

    /// Parse a currency code. Surrounding whitespace is ignored, case is not.
    pub fn parse(code: &str) -> Result<Self> {
        let trimmed = code.trim();
        match trimmed.as_bytes() {
            &[a, b, c] if [a, b, c].iter().all(u8::is_ascii_uppercase) => Ok(Self([a, b, c])),
            _ => Err(Error::InvalidCurrency(code.to_string())),
        }
    }

    /// Code as a string slice
    pub fn as_str(&self) -> &str {
        // Only ASCII bytes are ever stored
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::USD
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}

/// Mutable project metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetails {
    /// Name of contractor
    pub contractor_name: String,

    /// Contract number (unique across projects)
    pub contract_number: String,

    /// Vote number (budget line)
    pub vote_number: String,

    /// Total contracted value; informational ceiling, never enforced
    pub tender_sum: Decimal,

    /// Currency of record, if the project fixes one
    #[serde(default)]
    pub currency: Option<CurrencyCode>,
}

impl ProjectDetails {
    /// Create project details without a currency of record
    pub fn new(
        contractor_name: impl Into<String>,
        contract_number: impl Into<String>,
        vote_number: impl Into<String>,
        tender_sum: Decimal,
    ) -> Self {
        Self {
            contractor_name: contractor_name.into(),
            contract_number: contract_number.into(),
            vote_number: vote_number.into(),
            tender_sum,
            currency: None,
        }
    }

    /// Fix the project's currency of record
    pub fn with_currency(mut self, currency: CurrencyCode) -> Self {
        self.currency = Some(currency);
        self
    }

    /// Validate details before registration or update
    pub fn validate(&self) -> Result<()> {
        if self.contractor_name.trim().is_empty() {
            return Err(Error::InvalidProject(
                "Contractor name must not be blank".to_string(),
            ));
        }

        if self.contract_number.trim().is_empty() {
            return Err(Error::InvalidProject(
                "Contract number must not be blank".to_string(),
            ));
        }

        if self.tender_sum < Decimal::ZERO {
            return Err(Error::InvalidProject(format!(
                "Tender sum must be non-negative, got {}",
                self.tender_sum
            )));
        }

        Ok(())
    }
}

/// Construction project owning an ordered sequence of certificates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project ID
    pub id: ProjectId,

    /// Project metadata
    pub details: ProjectDetails,

    /// Registration timestamp
    pub created_at: DateTime<Utc>,

    /// Last metadata update
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a project with a fresh ID
    pub fn new(details: ProjectDetails) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            details,
            created_at: now,
            updated_at: now,
        }
    }

    /// Override the generated ID
    pub fn with_id(mut self, id: ProjectId) -> Self {
        self.id = id;
        self
    }
}

/// Certificate inputs before the ledger resolves the cumulative baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateDraft {
    /// Certificate ID to issue under
    pub id: CertificateId,

    /// Owning project
    pub project_id: ProjectId,

    /// Claim currency
    pub currency: CurrencyCode,

    /// Value of work done this period, before tax
    pub current_claim_excl_vat: Decimal,

    /// VAT rate as a fraction
    pub vat_rate: Decimal,
}

impl CertificateDraft {
    /// Create a draft with the default VAT rate
    pub fn new(project_id: ProjectId, currency: CurrencyCode, current_claim_excl_vat: Decimal) -> Self {
        Self {
            id: CertificateId::new(),
            project_id,
            currency,
            current_claim_excl_vat,
            vat_rate: DEFAULT_VAT_RATE,
        }
    }

    /// Override the VAT rate
    pub fn with_vat_rate(mut self, vat_rate: Decimal) -> Self {
        self.vat_rate = vat_rate;
        self
    }

    /// Override the generated ID
    pub fn with_id(mut self, id: CertificateId) -> Self {
        self.id = id;
        self
    }

    /// Bind the draft to the cumulative amount already certified
    pub fn into_certificate(self, previous_payment_excl_vat: Decimal) -> Certificate {
        Certificate::new(
            self.project_id,
            self.currency,
            self.current_claim_excl_vat,
            self.vat_rate,
            previous_payment_excl_vat,
        )
        .with_id(self.id)
    }
}

/// One claim period for a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Certificate ID
    pub id: CertificateId,

    /// Owning project
    pub project_id: ProjectId,

    /// Claim currency
    pub currency: CurrencyCode,

    /// Value of work done this period, before tax
    pub current_claim_excl_vat: Decimal,

    /// VAT rate as a fraction
    pub vat_rate: Decimal,

    /// VAT on the current claim (derived)
    pub vat_value: Decimal,

    /// Cumulative excl.-VAT amount certified before this certificate
    pub previous_payment_excl_vat: Decimal,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Certificate {
    /// Create a certificate, deriving `vat_value` from the claim and rate.
    ///
    /// An overflowing product leaves `vat_value` at zero; the engine rejects
    /// such inputs when computing.
    pub fn new(
        project_id: ProjectId,
        currency: CurrencyCode,
        current_claim_excl_vat: Decimal,
        vat_rate: Decimal,
        previous_payment_excl_vat: Decimal,
    ) -> Self {
        Self {
            id: CertificateId::new(),
            project_id,
            currency,
            current_claim_excl_vat,
            vat_rate,
            vat_value: current_claim_excl_vat
                .checked_mul(vat_rate)
                .map(round2)
                .unwrap_or_default(),
            previous_payment_excl_vat,
            created_at: Utc::now(),
        }
    }

    /// Override the generated ID
    pub fn with_id(mut self, id: CertificateId) -> Self {
        self.id = id;
        self
    }
}

/// Derived figures for one certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calculations {
    /// Certificate these figures belong to
    pub certificate_id: CertificateId,

    /// VAT on the current claim
    pub vat_value: Decimal,

    /// Cumulative work value including VAT
    pub value_of_workdone_incl_vat: Decimal,

    /// Cumulative work value excluding VAT
    pub total_value_of_workdone_excl_vat: Decimal,

    /// Retention withheld on the cumulative work value
    pub retention: Decimal,

    /// Net amount due this period; may be negative
    pub total_amount_payable: Decimal,

    /// Retention rate as a fraction
    pub retention_rate: Decimal,
}

impl Calculations {
    /// Net payable went below zero and needs review
    pub fn is_negative_payable(&self) -> bool {
        self.total_amount_payable < Decimal::ZERO
    }

    /// Re-derive every figure from the certificate and the stored
    /// intermediates, failing on the first disagreement.
    ///
    /// Inputs are checked as [`crate::CalculationEngine::compute`] checks
    /// them, so figures for an invalid claim never verify.
    pub fn verify(&self, certificate: &Certificate) -> Result<()> {
        if self.certificate_id != certificate.id {
            return Err(Error::MismatchedCalculations {
                expected: certificate.id,
                found: self.certificate_id,
            });
        }

        validate_inputs(certificate, self.retention_rate)?;

        let claim = certificate.current_claim_excl_vat;
        let previous = certificate.previous_payment_excl_vat;
        let vat_rate = certificate.vat_rate;
        let total_excl = self.total_value_of_workdone_excl_vat;
        let vat_value = round2(checked_mul(claim, vat_rate)?);

        let checks = [
            ("certificate.vat_value", certificate.vat_value, vat_value),
            ("vat_value", self.vat_value, vat_value),
            (
                "total_value_of_workdone_excl_vat",
                total_excl,
                checked_add(previous, claim)?,
            ),
            (
                "value_of_workdone_incl_vat",
                self.value_of_workdone_incl_vat,
                round2(checked_add(total_excl, round2(checked_mul(total_excl, vat_rate)?))?),
            ),
            (
                "retention",
                self.retention,
                round2(checked_mul(total_excl, self.retention_rate)?),
            ),
            (
                "total_amount_payable",
                self.total_amount_payable,
                checked_sub(checked_sub(self.value_of_workdone_incl_vat, self.retention)?, previous)?,
            ),
        ];

        for (field, stored, derived) in checks {
            if stored != derived {
                return Err(Error::InvariantViolation(format!(
                    "{} for certificate {} is {} but formula gives {}",
                    field, certificate.id, stored, derived
                )));
            }
        }

        Ok(())
    }
}
