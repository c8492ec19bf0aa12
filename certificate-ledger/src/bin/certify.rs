//! Certificate batch binary
//!
//! Reads a TOML batch of projects and claims, issues every claim in file
//! order and prints the resulting ledger entries and project summaries as
//! JSON.
//!
//! ```text
//! certify <batch.toml> [config.toml]
//! ```
//!
//! Without a config file, settings come from `CERT_*` environment variables.

use anyhow::{bail, Context};
use certificate_engine::{Config, CurrencyCode, ProjectDetails, ProjectId};
use certificate_ledger::{CertificateLedger, LedgerEntry, Metrics, ProjectSummary};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Batch file layout
#[derive(Debug, Deserialize)]
struct Batch {
    #[serde(default)]
    projects: Vec<BatchProject>,

    #[serde(default)]
    claims: Vec<BatchClaim>,
}

#[derive(Debug, Deserialize)]
struct BatchProject {
    /// Name claims refer to
    key: String,

    #[serde(flatten)]
    details: ProjectDetails,
}

#[derive(Debug, Deserialize)]
struct BatchClaim {
    project: String,
    amount: Decimal,
    currency: Option<CurrencyCode>,
    vat_rate: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct Report {
    certificates: Vec<LedgerEntry>,
    summaries: Vec<ProjectSummary>,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing (stderr, so stdout stays valid JSON)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(batch_path) = args.next() else {
        bail!("usage: certify <batch.toml> [config.toml]");
    };

    // Load configuration
    let config = match args.next() {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => Config::from_env().context("loading config from environment")?,
    };

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        vat_rate = %config.rates.vat_rate,
        retention_rate = %config.rates.retention_rate,
        "Starting certificate batch"
    );

    let content = std::fs::read_to_string(&batch_path)
        .with_context(|| format!("reading batch {}", batch_path))?;
    let batch: Batch = toml::from_str(&content)
        .with_context(|| format!("parsing batch {}", batch_path))?;

    let metrics = Metrics::new().context("creating metrics")?;
    let ledger = CertificateLedger::from_config(&config).with_metrics(metrics.clone());

    let mut keys: HashMap<String, ProjectId> = HashMap::new();
    let mut order = Vec::new();
    for project in batch.projects {
        let registered = ledger
            .register_project(project.details)
            .with_context(|| format!("registering project {}", project.key))?;
        keys.insert(project.key, registered.id);
        order.push(registered.id);
    }

    let mut certificates = Vec::with_capacity(batch.claims.len());
    for (line, claim) in batch.claims.into_iter().enumerate() {
        let Some(&project_id) = keys.get(&claim.project) else {
            bail!("claim {} refers to unknown project {:?}", line + 1, claim.project);
        };

        let mut draft = ledger
            .draft(project_id, claim.amount)
            .with_context(|| format!("drafting claim {}", line + 1))?;
        if let Some(currency) = claim.currency {
            draft.currency = currency;
        }
        if let Some(vat_rate) = claim.vat_rate {
            draft = draft.with_vat_rate(vat_rate);
        }

        let issued = ledger
            .issue(draft)
            .with_context(|| format!("issuing claim {} for {}", line + 1, claim.project))?;
        certificates.push(issued.entry);
    }

    let summaries = order
        .into_iter()
        .map(|id| ledger.summary(id))
        .collect::<Result<Vec<_>, _>>()?;

    let report = Report {
        certificates,
        summaries,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    tracing::info!(
        issued = metrics.certificates_issued.get(),
        rejected = metrics.certificates_rejected.get(),
        "Certificate batch complete"
    );
    Ok(())
}
