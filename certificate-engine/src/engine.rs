//! Certificate calculation engine
//!
//! Derives a certificate's [`Calculations`] from its claim inputs and the
//! cumulative baseline (`previous_payment_excl_vat`) resolved by the ledger.
//!
//! # Algorithm
//!
//! Formulas are applied in a fixed order. Products are rounded once to two
//! decimal places with round-half-to-even; amounts are accepted at cents
//! precision only, so sums are exact:
//!
//! 1. VAT on the current claim
//! 2. Cumulative work value excl. VAT (`previous + current`)
//! 3. VAT on the cumulative value
//! 4. Retention on the cumulative value
//! 5. Net payable (`incl. VAT - retention - previous`)
//!
//! # Example
//!
//! ```text
//! Certificate 1: claim 100,000.00, previous 0
//!   total excl. VAT   100,000.00
//!   incl. VAT         115,000.00
//!   retention (10%)    10,000.00
//!   payable           105,000.00
//!
//! Certificate 2: claim 50,000.00, previous 100,000.00
//!   total excl. VAT   150,000.00
//!   incl. VAT         172,500.00
//!   retention (10%)    15,000.00
//!   payable            57,500.00
//! ```

use crate::{
    config::RatesConfig,
    types::{Calculations, Certificate},
    Error, Result,
};
use rust_decimal::{Decimal, RoundingStrategy};

/// Default VAT rate (15%)
pub const DEFAULT_VAT_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// Default retention rate (10%)
pub const DEFAULT_RETENTION_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Round a monetary value to two decimal places, ties to even.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Format an amount for display: two decimals with thousands separators.
///
/// `1234567.891` becomes `"1,234,567.89"`.
pub fn format_amount(amount: Decimal) -> String {
    let rendered = format!("{:.2}", round2(amount).abs());
    let (whole, fraction) = rendered.split_once('.').unwrap_or((rendered.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if round2(amount) < Decimal::ZERO { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}

/// Pure calculation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculationEngine {
    /// Retention rate applied to the cumulative work value
    retention_rate: Decimal,
}

impl CalculationEngine {
    /// Create engine with a retention rate (fraction in `[0, 1]`)
    pub fn new(retention_rate: Decimal) -> Self {
        Self { retention_rate }
    }

    /// Create engine from configured rates
    pub fn from_config(rates: &RatesConfig) -> Self {
        Self::new(rates.retention_rate)
    }

    /// Retention rate in use
    pub fn retention_rate(&self) -> Decimal {
        self.retention_rate
    }

    /// Compute the financial breakdown for one certificate.
    ///
    /// Fails with [`Error::InvalidClaim`] for negative amounts, rates outside
    /// `[0, 1]`, or a stored `vat_value` that disagrees with the claim. A
    /// negative net payable is returned unchanged.
    pub fn compute(&self, certificate: &Certificate) -> Result<Calculations> {
        self.validate(certificate)?;

        let claim = certificate.current_claim_excl_vat;
        let previous = certificate.previous_payment_excl_vat;
        let vat_rate = certificate.vat_rate;

        // Step 1: VAT on current claim
        let vat_value = round2(checked_mul(claim, vat_rate)?);
        if vat_value != certificate.vat_value {
            return Err(Error::InvalidClaim(format!(
                "vat_value {} does not match {} x {} = {}",
                certificate.vat_value, claim, vat_rate, vat_value
            )));
        }

        // Step 2: cumulative work value excl. VAT
        let total_excl = checked_add(previous, claim)?;

        // Step 3: VAT applied to the cumulative value
        let vat_on_total = round2(checked_mul(total_excl, vat_rate)?);
        let incl_vat = round2(checked_add(total_excl, vat_on_total)?);

        // Step 4: retention on the cumulative value
        let retention = round2(checked_mul(total_excl, self.retention_rate)?);

        // Step 5: net new amount due
        let payable = checked_sub(checked_sub(incl_vat, retention)?, previous)?;

        tracing::debug!(
            certificate_id = %certificate.id,
            project_id = %certificate.project_id,
            %total_excl,
            %incl_vat,
            %retention,
            %payable,
            "Computed certificate"
        );

        Ok(Calculations {
            certificate_id: certificate.id,
            vat_value,
            value_of_workdone_incl_vat: incl_vat,
            total_value_of_workdone_excl_vat: total_excl,
            retention,
            total_amount_payable: payable,
            retention_rate: self.retention_rate,
        })
    }

    /// Validate claim inputs and rates
    fn validate(&self, certificate: &Certificate) -> Result<()> {
        validate_inputs(certificate, self.retention_rate)
    }
}

impl Default for CalculationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_RATE)
    }
}

/// Check a certificate's inputs before any figure is derived from them.
///
/// Amounts must be non-negative with at most two decimal places, and both
/// rates must lie in `[0, 1]`.
pub fn validate_inputs(certificate: &Certificate, retention_rate: Decimal) -> Result<()> {
    check_amount("current_claim_excl_vat", certificate.current_claim_excl_vat)?;
    check_amount("previous_payment_excl_vat", certificate.previous_payment_excl_vat)?;
    check_rate("vat_rate", certificate.vat_rate)?;
    check_rate("retention_rate", retention_rate)?;
    Ok(())
}

fn check_amount(name: &str, amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(Error::InvalidClaim(format!(
            "{} must be non-negative, got {}",
            name, amount
        )));
    }
    if amount.normalize().scale() > 2 {
        return Err(Error::InvalidClaim(format!(
            "{} must have at most two decimal places, got {}",
            name, amount
        )));
    }
    Ok(())
}

/// Check a fractional rate lies in `[0, 1]`
pub(crate) fn check_rate(name: &str, rate: Decimal) -> Result<()> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(Error::InvalidClaim(format!(
            "{} must be within [0, 1], got {}",
            name, rate
        )));
    }
    Ok(())
}

pub(crate) fn checked_mul(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| Error::InvalidClaim(format!("{} x {} overflows", a, b)))
}

pub(crate) fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| Error::InvalidClaim(format!("{} + {} overflows", a, b)))
}

pub(crate) fn checked_sub(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_sub(b)
        .ok_or_else(|| Error::InvalidClaim(format!("{} - {} overflows", a, b)))
}
