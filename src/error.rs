/*!
 * Enhanced error handling for eligibility transaction operations
 *
 * Provides detailed error types with context, suggestions, and recovery guidance.
 */

use std::path::PathBuf;
use thiserror::Error;

use crate::ack::RejectionReport;

/// Eligibility library result type
pub type Result<T> = std::result::Result<T, EdiError>;

/// Enhanced error types with context and suggestions
#[derive(Error, Debug)]
pub enum EdiError {
    /// File I/O errors with context
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    /// Date parsing errors with format hints
    #[error("Invalid date '{value}': {message}")]
    InvalidDateFormat {
        message: String,
        value: String,
        expected_formats: String,
    },

    /// Invalid NPI with format guidance
    #[error("Invalid NPI '{npi}': {reason}")]
    InvalidNpi {
        npi: String,
        reason: String,
        suggestion: String,
    },

    /// Unknown payer key with the registry's valid options
    #[error("Unknown payer '{key}'")]
    UnknownPayer {
        key: String,
        available: Vec<String>,
    },

    /// Structural problems found in a generated interchange
    #[error("Interchange validation failed: {message}")]
    StructuralValidation {
        message: String,
        errors: Vec<String>,
    },

    /// Request exceeded the configured timeout
    #[error("Request to {endpoint} timed out after {seconds} seconds")]
    TransportTimeout {
        seconds: u64,
        endpoint: String,
    },

    /// Connection-level transport failures
    #[error("Connection error: {message}")]
    TransportConnection {
        message: String,
        endpoint: String,
    },

    /// Non-success HTTP status with the raw body preserved
    #[error("HTTP {status} from clearinghouse")]
    TransportHttp {
        status: u16,
        body: String,
    },

    /// SOAP fault returned by the clearinghouse
    #[error("SOAP fault {code}: {reason}")]
    SoapFault {
        code: String,
        reason: String,
        detail: Option<String>,
    },

    /// Response envelope did not contain an X12 payload
    #[error("Payload extraction failed: {message}")]
    PayloadExtraction {
        message: String,
        response_snippet: String,
    },

    /// The clearinghouse returned a 999 rejection instead of a 271
    #[error("Inquiry rejected: {summary}")]
    BusinessRejection {
        summary: String,
        report: RejectionReport,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        suggestion: Option<String>,
    },

    /// Feature not enabled error
    #[error("Feature '{feature}' is not enabled")]
    FeatureNotEnabled {
        feature: String,
        enable_instruction: String,
    },

    /// Generic errors with custom message
    #[error("{message}")]
    Custom {
        message: String,
        suggestion: Option<String>,
    },
}

impl EdiError {
    /// Create a date parsing error with validation details
    pub fn invalid_date(value: &str) -> Self {
        let message = if value.is_empty() {
            "date cannot be empty".to_string()
        } else if value.chars().all(|c| c.is_ascii_digit()) && value.len() != 8 {
            format!("numeric dates must be 8 digits, found {}", value.len())
        } else {
            "not a recognized calendar date".to_string()
        };

        Self::InvalidDateFormat {
            message,
            value: value.to_string(),
            expected_formats: "YYYYMMDD, YYYY-MM-DD, or MM/DD/YYYY".to_string(),
        }
    }

    /// Create an invalid NPI error with validation details
    pub fn invalid_npi(npi: &str) -> Self {
        let (reason, suggestion) = if npi.is_empty() {
            ("NPI cannot be empty".to_string(),
             "Provide the billing provider's 10-digit NPI number".to_string())
        } else if npi.len() != 10 {
            (format!("NPI must be exactly 10 digits, found {}", npi.len()),
             "Ensure the NPI is exactly 10 digits without spaces or special characters".to_string())
        } else if !npi.chars().all(|c| c.is_ascii_digit()) {
            ("NPI must contain only digits".to_string(),
             "Remove any non-numeric characters from the NPI".to_string())
        } else {
            ("Invalid NPI format".to_string(),
             "Verify the NPI number is correct".to_string())
        };

        Self::InvalidNpi {
            npi: npi.to_string(),
            reason,
            suggestion,
        }
    }

    /// Create an unknown payer error listing the registry's keys
    pub fn unknown_payer(key: &str, available: Vec<String>) -> Self {
        Self::UnknownPayer {
            key: key.to_string(),
            available,
        }
    }

    /// Create a structural validation error from the validator's findings
    pub fn structural(errors: Vec<String>) -> Self {
        let message = match errors.len() {
            0 => "no details recorded".to_string(),
            1 => errors[0].clone(),
            n => format!("{} problems found", n),
        };

        Self::StructuralValidation { message, errors }
    }

    /// Create a SOAP fault error from extracted fault fields
    pub fn soap_fault(code: &str, reason: &str, detail: Option<String>) -> Self {
        Self::SoapFault {
            code: code.to_string(),
            reason: reason.to_string(),
            detail,
        }
    }

    /// Create a payload extraction error, keeping a snippet of the response
    pub fn payload_extraction(message: &str, response: &str) -> Self {
        let snippet: String = response.chars().take(200).collect();
        Self::PayloadExtraction {
            message: message.to_string(),
            response_snippet: snippet,
        }
    }

    /// Create a business rejection error from a decoded 999
    pub fn business_rejection(report: RejectionReport) -> Self {
        Self::BusinessRejection {
            summary: report.summary(),
            report,
        }
    }

    /// Create an I/O error tied to a specific path
    pub fn io_at(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            message: source.to_string(),
            source,
            path: Some(path.into()),
        }
    }

    /// Create a feature not enabled error
    pub fn feature_required(feature: &str) -> Self {
        let enable_instruction = match feature {
            "transport" => "Add 'edi270 = { version = \"0.1\", features = [\"transport\"] }' to your Cargo.toml",
            "progress" => "Add 'edi270 = { version = \"0.1\", features = [\"progress\"] }' to your Cargo.toml",
            _ => "Enable the required feature in your Cargo.toml",
        };

        Self::FeatureNotEnabled {
            feature: feature.to_string(),
            enable_instruction: enable_instruction.to_string(),
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidDateFormat { expected_formats, .. } => {
                format!("{}\n\nExpected formats: {}", self, expected_formats)
            }
            Self::InvalidNpi { suggestion, .. } => {
                format!("{}\n\nSuggestion: {}", self, suggestion)
            }
            Self::UnknownPayer { available, .. } => {
                format!("{}\n\nKnown payers: {}", self, available.join(", "))
            }
            Self::StructuralValidation { errors, .. } => {
                format!("{}\n\nProblems:\n  - {}", self, errors.join("\n  - "))
            }
            Self::SoapFault { detail: Some(detail), .. } => {
                format!("{}\n\nDetail: {}", self, detail)
            }
            Self::BusinessRejection { report, .. } => {
                format!("{}\n\n{}", self, report.format_report())
            }
            Self::Configuration { suggestion: Some(sug), .. } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            Self::FeatureNotEnabled { enable_instruction, .. } => {
                format!("{}\n\nTo enable: {}", self, enable_instruction)
            }
            Self::Custom { suggestion: Some(sug), .. } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            _ => self.to_string(),
        }
    }
}

// Convenience conversions
impl From<std::io::Error> for EdiError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
            path: None,
        }
    }
}

impl From<serde_json::Error> for EdiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Custom {
            message: format!("JSON serialization error: {}", err),
            suggestion: Some("Check if the data is serializable to JSON.".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_date_messages() {
        match EdiError::invalid_date("") {
            EdiError::InvalidDateFormat { message, .. } => {
                assert!(message.contains("empty"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        match EdiError::invalid_date("1984717") {
            EdiError::InvalidDateFormat { message, .. } => {
                assert!(message.contains("8 digits"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_npi_reasons() {
        match EdiError::invalid_npi("12345") {
            EdiError::InvalidNpi { reason, .. } => {
                assert!(reason.contains("10 digits"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        match EdiError::invalid_npi("12345abcde") {
            EdiError::InvalidNpi { reason, .. } => {
                assert!(reason.contains("only digits"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_structural_message_counts() {
        let single = EdiError::structural(vec!["Missing required segments: BHT".to_string()]);
        assert!(single.to_string().contains("Missing required segments"));

        let multiple = EdiError::structural(vec!["a".to_string(), "b".to_string()]);
        assert!(multiple.to_string().contains("2 problems"));
    }

    #[test]
    fn test_user_message_includes_suggestions() {
        let err = EdiError::unknown_payer("ACME", vec!["UTAH_MEDICAID".to_string()]);
        let msg = err.user_message();
        assert!(msg.contains("Known payers"));
        assert!(msg.contains("UTAH_MEDICAID"));
    }

    #[test]
    fn test_payload_extraction_snippet_is_bounded() {
        let long_response = "x".repeat(5000);
        match EdiError::payload_extraction("no payload element found", &long_response) {
            EdiError::PayloadExtraction { response_snippet, .. } => {
                assert_eq!(response_snippet.len(), 200);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
