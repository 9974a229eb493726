/*!
 * SOAP transport for CORE real-time eligibility exchanges
 *
 * This module provides the HTTP client that posts CORE request envelopes
 * to a clearinghouse and unwraps the response, with transport errors
 * classified into timeout, connection, HTTP, and SOAP fault cases.
 */

#[cfg(feature = "transport")]
use std::time::Duration;
#[cfg(feature = "transport")]
use reqwest;

#[cfg(feature = "transport")]
use crate::constants::{DEFAULT_ENDPOINT, SOAP_ACTION};
use crate::data_types::TransactionContext;
#[cfg(feature = "transport")]
use crate::envelope::{build_envelope, extract_fault, extract_payload};
use crate::error::{EdiError, Result};

/// Transport configuration
#[cfg(feature = "transport")]
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Clearinghouse endpoint URL
    pub endpoint: String,
    /// Timeout for HTTP requests in seconds
    pub timeout_seconds: u64,
    /// Custom user agent string
    pub user_agent: Option<String>,
    /// Whether to verify SSL certificates
    pub verify_ssl: bool,
}

#[cfg(feature = "transport")]
impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_seconds: 30,
            user_agent: Some(format!("edi270/{}", env!("CARGO_PKG_VERSION"))),
            verify_ssl: true,
        }
    }
}

/// SOAP client for real-time eligibility requests
#[cfg(feature = "transport")]
pub struct SoapClient {
    context: TransactionContext,
    config: TransportConfig,
    client: reqwest::Client,
}

#[cfg(feature = "transport")]
impl SoapClient {
    /// Create a client with the default transport configuration
    pub fn new(context: TransactionContext) -> Result<Self> {
        Self::with_config(context, TransportConfig::default())
    }

    /// Create a client with custom transport configuration
    pub fn with_config(context: TransactionContext, config: TransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .danger_accept_invalid_certs(!config.verify_ssl);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        let client = builder.build().map_err(|e| EdiError::Custom {
            message: format!("Failed to create HTTP client: {}", e),
            suggestion: Some("Check your network configuration".to_string()),
        })?;

        Ok(Self {
            context,
            config,
            client,
        })
    }

    /// Endpoint this client posts to
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Trading partner context the client authenticates with
    pub fn context(&self) -> &TransactionContext {
        &self.context
    }

    /// Send an X12 payload and return the raw response envelope body
    pub async fn send(&self, payload: &str) -> Result<String> {
        let envelope = build_envelope(&self.context, payload);

        tracing::info!(
            endpoint = %self.config.endpoint,
            payload_bytes = payload.len(),
            "sending CORE real-time request"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "application/soap+xml; charset=utf-8")
            .header("SOAPAction", SOAP_ACTION)
            .header("Accept", "application/soap+xml, text/xml")
            .body(envelope)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| EdiError::Custom {
            message: format!("Failed to read response body: {}", e),
            suggestion: Some("The connection may have dropped mid-response, try again".to_string()),
        })?;

        if !status.is_success() {
            tracing::error!(
                status = status.as_u16(),
                body_bytes = body.len(),
                "clearinghouse returned an HTTP error"
            );
            if let Some(fault) = extract_fault(&body) {
                return Err(EdiError::soap_fault(&fault.code, &fault.reason, fault.detail));
            }
            return Err(EdiError::TransportHttp {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(body_bytes = body.len(), "received response envelope");
        Ok(body)
    }

    /// Send an inquiry and return the extracted X12 response payload
    pub async fn send_inquiry(&self, payload: &str) -> Result<String> {
        let body = self.send(payload).await?;

        match extract_payload(&body) {
            Ok(x12) => Ok(x12),
            Err(err) => {
                // A 200 response with no payload usually carries a fault instead
                if let Some(fault) = extract_fault(&body) {
                    Err(EdiError::soap_fault(&fault.code, &fault.reason, fault.detail))
                } else {
                    Err(err)
                }
            }
        }
    }

    fn classify_send_error(&self, err: reqwest::Error) -> EdiError {
        if err.is_timeout() {
            EdiError::TransportTimeout {
                seconds: self.config.timeout_seconds,
                endpoint: self.config.endpoint.clone(),
            }
        } else if err.is_connect() {
            EdiError::TransportConnection {
                message: err.to_string(),
                endpoint: self.config.endpoint.clone(),
            }
        } else {
            EdiError::Custom {
                message: format!("Request failed: {}", err),
                suggestion: Some("Check the endpoint URL and your network connection".to_string()),
            }
        }
    }
}

// Stub types when the transport feature is not enabled, for better error messages
#[cfg(not(feature = "transport"))]
pub struct TransportConfig;

#[cfg(not(feature = "transport"))]
pub struct SoapClient;

#[cfg(not(feature = "transport"))]
impl SoapClient {
    pub fn new(_context: TransactionContext) -> Result<Self> {
        Ok(SoapClient)
    }

    pub async fn send(&self, _payload: &str) -> Result<String> {
        Err(EdiError::feature_required("transport"))
    }

    pub async fn send_inquiry(&self, _payload: &str) -> Result<String> {
        Err(EdiError::feature_required("transport"))
    }
}
