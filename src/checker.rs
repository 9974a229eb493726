/*!
 * End-to-end eligibility checking
 *
 * Ties the pieces together: payer lookup, 270 construction, structural
 * validation, SOAP submission, and 271/999 interpretation. Requires the
 * `transport` feature; without it the checker returns a feature error.
 */

use crate::config::ClientConfig;
use crate::data_types::{EligibilityVerdict, PatientQuery};
use crate::error::{EdiError, Result};

#[cfg(feature = "transport")]
use crate::ack::{self, TransactionKind};
#[cfg(feature = "transport")]
use crate::builder::{self, InquiryBuilder};
#[cfg(feature = "transport")]
use crate::parser;
#[cfg(feature = "transport")]
use crate::payer;
#[cfg(feature = "transport")]
use crate::segment::Delimiters;
#[cfg(feature = "transport")]
use crate::transport::{SoapClient, TransportConfig};
#[cfg(feature = "transport")]
use chrono::Utc;
#[cfg(all(feature = "transport", feature = "progress"))]
use indicatif::{ProgressBar, ProgressStyle};

/// High-level client for real-time eligibility verification
#[cfg(feature = "transport")]
pub struct EligibilityChecker {
    config: ClientConfig,
}

#[cfg(feature = "transport")]
impl EligibilityChecker {
    /// Create a checker from a client configuration
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Access the underlying configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one eligibility inquiry end to end
    ///
    /// Builds a 270 for the named payer, submits it over CORE SOAP, and
    /// interprets the response. A 999 functional acknowledgment becomes a
    /// `BusinessRejection` error carrying the decoded syntax errors. When
    /// a snapshot directory is configured, the outbound 270, the raw
    /// response payload, and the parsed verdict are written there.
    pub async fn check(&self, payer_key: &str, query: &PatientQuery) -> Result<EligibilityVerdict> {
        let profile = payer::get_payer(payer_key)
            .ok_or_else(|| EdiError::unknown_payer(payer_key, payer::payer_keys()))?;
        profile.validate()?;

        if profile.requires_member_id && query.member_id.is_none() {
            tracing::warn!(
                payer = %profile.key,
                "payer expects a member ID, the match may fail without one"
            );
        }

        let context = self.config.context_for(profile)?;
        let interchange = InquiryBuilder::new(context.clone()).build(profile, query)?;

        let report = builder::validate(&interchange);
        for warning in &report.warnings {
            tracing::warn!(payer = %profile.key, "{}", warning);
        }
        report.into_result()?;

        let rendered = interchange.render(&Delimiters::default());
        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        self.write_snapshot(&format!("x12_270_{}.txt", stamp), &rendered)
            .await?;

        let transport_config = TransportConfig {
            endpoint: self.config.endpoint.clone(),
            timeout_seconds: self.config.timeout_seconds,
            ..TransportConfig::default()
        };
        let client = SoapClient::with_config(context, transport_config)?;

        tracing::info!(
            payer = %profile.key,
            patient = %query.full_name(),
            "submitting eligibility inquiry"
        );
        let payload = client.send_inquiry(&rendered).await?;
        self.write_snapshot(&format!("x12_271_{}.txt", stamp), &payload)
            .await?;

        if ack::detect_transaction_kind(&payload) == TransactionKind::FunctionalAck {
            let rejection = ack::parse_rejection(&payload);
            tracing::warn!(payer = %profile.key, "{}", rejection.summary());
            return Err(EdiError::business_rejection(rejection));
        }

        let verdict = parser::parse_response(&payload);
        let json = serde_json::to_string_pretty(&verdict)?;
        self.write_snapshot(&format!("eligibility_{}.json", stamp), &json)
            .await?;
        tracing::info!(payer = %profile.key, "{}", verdict.summary);

        Ok(verdict)
    }

    /// Check a batch of patients against one payer
    ///
    /// Inquiries run sequentially since clearinghouses rate-limit
    /// real-time traffic. Each patient gets an independent result, so one
    /// rejection does not abort the rest of the batch.
    pub async fn check_batch(
        &self,
        payer_key: &str,
        queries: &[PatientQuery],
    ) -> Vec<Result<EligibilityVerdict>> {
        #[cfg(feature = "progress")]
        let bar = {
            let bar = ProgressBar::new(queries.len() as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            bar
        };

        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            #[cfg(feature = "progress")]
            bar.set_message(query.full_name());

            results.push(self.check(payer_key, query).await);

            #[cfg(feature = "progress")]
            bar.inc(1);
        }

        #[cfg(feature = "progress")]
        bar.finish_with_message("eligibility batch complete");

        results
    }

    /// Check one patient against several payers in turn
    ///
    /// Useful when coverage could sit with any of a handful of payers and
    /// the caller wants every answer, not just the first hit.
    pub async fn check_payers(
        &self,
        payer_keys: &[&str],
        query: &PatientQuery,
    ) -> Vec<(String, Result<EligibilityVerdict>)> {
        let mut results = Vec::with_capacity(payer_keys.len());
        for key in payer_keys {
            results.push((key.to_string(), self.check(key, query).await));
        }
        results
    }

    async fn write_snapshot(&self, file_name: &str, contents: &str) -> Result<()> {
        let Some(dir) = &self.config.snapshot_dir else {
            return Ok(());
        };

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| EdiError::io_at(e, dir))?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| EdiError::io_at(e, &path))?;
        tracing::debug!(path = %path.display(), "wrote snapshot");

        Ok(())
    }
}

/// Stub checker available when the `transport` feature is disabled
#[cfg(not(feature = "transport"))]
pub struct EligibilityChecker {
    config: ClientConfig,
}

#[cfg(not(feature = "transport"))]
impl EligibilityChecker {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn check(
        &self,
        _payer_key: &str,
        _query: &PatientQuery,
    ) -> Result<EligibilityVerdict> {
        Err(EdiError::feature_required("transport"))
    }

    pub async fn check_batch(
        &self,
        _payer_key: &str,
        queries: &[PatientQuery],
    ) -> Vec<Result<EligibilityVerdict>> {
        queries
            .iter()
            .map(|_| Err(EdiError::feature_required("transport")))
            .collect()
    }

    pub async fn check_payers(
        &self,
        payer_keys: &[&str],
        _query: &PatientQuery,
    ) -> Vec<(String, Result<EligibilityVerdict>)> {
        payer_keys
            .iter()
            .map(|key| (key.to_string(), Err(EdiError::feature_required("transport"))))
            .collect()
    }
}
