/*!
 * # X12 270/271 Eligibility Verification Library
 *
 * A Rust library for real-time healthcare eligibility checking over the
 * CAQH CORE SOAP connection used by the UHIN clearinghouse.
 *
 * ## Features
 *
 * - 🏥 **Payer Registry**: Per-payer routing, qualifiers, and segment policies
 * - 📋 **270 Builder**: HIPAA 5010 (005010X279A1) inquiry construction with validation
 * - 🔐 **CORE Transport**: SOAP 1.2 + WS-Security UsernameToken over HTTPS
 * - 📖 **271 Parser**: Benefit extraction and fee-for-service coverage classification
 * - 🚨 **999 Decoding**: Human-readable syntax rejection reports
 * - ⚙️ **Flexible Config**: TOML file, environment variables, or builder
 * - 🛡️ **Typed Errors**: Every failure carries an actionable suggestion
 *
 * ## Quick Start
 *
 * ```no_run
 * use edi270::prelude::*;
 *
 * # async fn run() -> Result<()> {
 * // Credentials and provider identity from config file or environment
 * let config = ClientConfig::load();
 * let checker = EligibilityChecker::new(config);
 *
 * let patient = PatientQuery::new("JEREMY", "MONTOYA", "1984-07-17")
 *     .with_member_id("0900412827");
 *
 * // Build the 270, submit it, and classify the 271
 * let verdict = checker.check("UTAH_MEDICAID", &patient).await?;
 * println!("{}", verdict.format_report());
 *
 * if verdict.qualifies_for_program {
 *     println!("Coverage confirmed: {}", verdict.summary);
 * }
 * # Ok(())
 * # }
 * ```
 *
 * ## Building Inquiries Offline
 *
 * The builder and parser work without the `transport` feature, so 270s can
 * be generated for batch upload and stored 271s can be interpreted later.
 *
 * ```no_run
 * # use edi270::prelude::*;
 * # fn main() -> Result<()> {
 * let config = ConfigBuilder::new()
 *     .username("clinic_user")
 *     .password("secret")
 *     .trading_partner("HT009582-001")
 *     .provider_npi("1275348807")
 *     .provider_last_name("MONTOYA")
 *     .provider_first_name("JEREMY")
 *     .build();
 *
 * let profile = edi270::payer::get_payer("UTAH_MEDICAID")
 *     .ok_or_else(|| EdiError::unknown_payer("UTAH_MEDICAID", edi270::payer::payer_keys()))?;
 * let context = config.context_for(profile)?;
 *
 * let patient = PatientQuery::new("JEREMY", "MONTOYA", "1984-07-17");
 * let interchange = InquiryBuilder::new(context).build(profile, &patient)?;
 * println!("{}", interchange.render(&Delimiters::default()));
 * # Ok(())
 * # }
 * ```
 *
 * ## Interpreting Stored Responses
 *
 * ```no_run
 * # fn main() -> edi270::Result<()> {
 * use edi270::parser;
 *
 * let x12 = std::fs::read_to_string("x12_271_20240912.txt")?;
 * let verdict = parser::parse_response(&x12);
 *
 * println!("{}", verdict.summary);
 * for benefit in &verdict.benefits {
 *     println!("  {} ({} service types)", benefit.status, benefit.service_types.len());
 * }
 * # Ok(())
 * # }
 * ```
 *
 * ## Handling Rejections
 *
 * Clearinghouses answer malformed inquiries with a 999 functional
 * acknowledgment instead of a 271. The `ack` module decodes those into
 * readable reports.
 *
 * ```no_run
 * # fn main() {
 * use edi270::ack;
 *
 * let payload = std::fs::read_to_string("x12_999.txt").unwrap_or_default();
 * if ack::is_functional_ack(&payload) {
 *     let report = ack::parse_rejection(&payload);
 *     eprintln!("{}", report.format_report());
 * }
 * # }
 * ```
 *
 * ## Configuration
 *
 * ```no_run
 * # use edi270::prelude::*;
 * # fn main() -> Result<()> {
 * // Load from the default config file, then environment variables
 * let config = ClientConfig::load();
 *
 * // Or build one explicitly
 * let config = ConfigBuilder::new()
 *     .endpoint("https://ws.uhin.org/webservices/core/soaptype4.asmx")
 *     .username("clinic_user")
 *     .password("secret")
 *     .trading_partner("HT009582-001")
 *     .provider_npi("1275348807")
 *     .provider_last_name("MONTOYA")
 *     .environment(Environment::Test)
 *     .build();
 *
 * config.save("edi270.toml")?;
 * # Ok(())
 * # }
 * ```
 *
 * ## Supported Payers
 *
 * ```no_run
 * # fn main() {
 * for (key, name) in edi270::payer::list_payers() {
 *     println!("{:<16} {}", key, name);
 * }
 * # }
 * ```
 *
 * ## Feature Flags
 *
 * - `transport` (default): SOAP client built on `reqwest` and `tokio`
 * - `progress` (default): progress bars for batch checking via `indicatif`
 *
 * With both disabled the crate still builds 270s, validates them, and
 * parses 271/999 payloads, with no async runtime in the dependency tree.
 */

// Re-export error types from root
pub use error::{EdiError, Result};

// Public modules
pub mod ack;
pub mod builder;
pub mod checker;
pub mod codes;
pub mod config;
pub mod data_types;
pub mod envelope;
pub mod error;
pub mod parser;
pub mod payer;
pub mod segment;
pub mod transport;

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```
/// use edi270::prelude::*;
/// ```
pub mod prelude {
    pub use crate::ack::{AckStatus, RejectionReport, TransactionKind};
    pub use crate::builder::{validate, InquiryBuilder, ValidationReport};
    pub use crate::checker::EligibilityChecker;
    pub use crate::config::{ClientConfig, ConfigBuilder};
    pub use crate::data_types::*;
    pub use crate::error::{EdiError, Result};
    pub use crate::parser::parse_response;
    pub use crate::payer::{get_payer, get_payer_by_id, list_payers, PayerProfile};
    pub use crate::segment::{Delimiters, Interchange, Segment};
    pub use crate::transport::{SoapClient, TransportConfig};
}

/// Protocol constants for the 270/271 exchange
pub mod constants {
    /// HIPAA implementation guide version for eligibility (ST03/GS08)
    pub const IMPLEMENTATION_GUIDE_VERSION: &str = "005010X279A1";

    /// Transaction set identifier for an eligibility inquiry
    pub const TRANSACTION_TYPE_INQUIRY: &str = "270";

    /// Transaction set identifier for an eligibility response
    pub const TRANSACTION_TYPE_RESPONSE: &str = "271";

    /// Transaction set identifier for a functional acknowledgment
    pub const TRANSACTION_TYPE_ACK: &str = "999";

    /// CORE payload type for a real-time 270 request
    pub const PAYLOAD_TYPE_INQUIRY: &str = "X12_270_Request_005010X279A1";

    /// CAQH CORE connectivity rule version
    pub const CORE_RULE_VERSION: &str = "2.2.0";

    /// CORE processing mode for interactive inquiries
    pub const PROCESSING_MODE: &str = "RealTime";

    /// Production CORE endpoint for the UHIN clearinghouse
    pub const DEFAULT_ENDPOINT: &str = "https://ws.uhin.org/webservices/core/soaptype4.asmx";

    /// SOAPAction header value for a real-time request
    pub const SOAP_ACTION: &str =
        "http://www.caqh.org/SOAP/WSDL/CORERule2.2.0.xsd/COREEnvelopeRealTimeRequest";

    /// Required length of the CORE PayloadID
    pub const PAYLOAD_ID_LENGTH: usize = 36;

    /// Required length of the ISA13 interchange control number
    pub const CONTROL_NUMBER_LENGTH: usize = 9;

    /// Default X12 element separator
    pub const ELEMENT_SEPARATOR: char = '*';

    /// Default X12 segment terminator
    pub const SEGMENT_TERMINATOR: char = '~';

    /// Default X12 repetition separator (ISA11)
    pub const REPETITION_SEPARATOR: char = '^';

    /// Default X12 component element separator (ISA16)
    pub const COMPONENT_SEPARATOR: char = ':';

    /// Number of elements in a valid ISA segment
    pub const ISA_ELEMENT_COUNT: usize = 16;
}

/// Common recipes for working with verification results
pub mod cookbook {
    use std::collections::HashMap;

    use crate::data_types::{CoverageClass, EligibilityVerdict};

    /// Count verdicts by coverage classification
    ///
    /// # Example
    /// ```no_run
    /// # use edi270::cookbook::classification_counts;
    /// # use edi270::data_types::CoverageClass;
    /// # let verdicts = Vec::new();
    /// let counts = classification_counts(&verdicts);
    /// let qualifying = counts.get(&CoverageClass::QualifyingTraditional).unwrap_or(&0);
    /// println!("{} of {} patients qualify", qualifying, verdicts.len());
    /// ```
    pub fn classification_counts(
        verdicts: &[EligibilityVerdict],
    ) -> HashMap<CoverageClass, usize> {
        let mut counts = HashMap::new();
        for verdict in verdicts {
            *counts.entry(verdict.classification).or_insert(0) += 1;
        }
        counts
    }

    /// Verdicts with confirmed qualifying coverage
    pub fn qualifying(verdicts: &[EligibilityVerdict]) -> Vec<&EligibilityVerdict> {
        verdicts.iter().filter(|v| v.is_qualifying()).collect()
    }

    /// Verdicts that need a human decision before billing
    pub fn needing_review(verdicts: &[EligibilityVerdict]) -> Vec<&EligibilityVerdict> {
        verdicts.iter().filter(|v| v.needs_review()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::{CoverageClass, Gender, Npi};

    #[test]
    fn test_npi_validation() {
        assert!(Npi::new("1234567890".to_string()).is_ok());
        assert!(Npi::new("123".to_string()).is_err());
        assert!(Npi::new("12345678AB".to_string()).is_err());
    }

    #[test]
    fn test_gender_codes() {
        assert_eq!(Gender::from_code("f"), Some(Gender::Female));
        assert_eq!(Gender::from_code("M"), Some(Gender::Male));
        assert_eq!(Gender::from_code("X"), None);
    }

    #[test]
    fn test_delimiter_constants() {
        assert_eq!(constants::ELEMENT_SEPARATOR, '*');
        assert_eq!(constants::SEGMENT_TERMINATOR, '~');
        assert_eq!(constants::ISA_ELEMENT_COUNT, 16);
        assert_eq!(constants::PAYLOAD_ID_LENGTH, 36);
    }

    #[test]
    fn test_cookbook_partitions_verdicts() {
        let verdicts = vec![crate::parser::parse_response("")];

        let counts = cookbook::classification_counts(&verdicts);
        assert_eq!(counts.get(&CoverageClass::NotEligible), Some(&1));
        assert!(cookbook::qualifying(&verdicts).is_empty());
        assert!(cookbook::needing_review(&verdicts).is_empty());
    }
}
