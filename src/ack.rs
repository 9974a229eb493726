/*!
 * X12 999 functional acknowledgment decoding
 *
 * When a clearinghouse rejects a 270 on syntax, it answers with a 999
 * instead of a 271. This module detects which transaction came back and
 * decodes the IK3/IK4/IK5 error details into a report a human can act
 * on without reading raw X12.
 */

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::codes;
use crate::segment::split_segments;

/// Which transaction type a response payload carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// X12 271 eligibility response
    EligibilityResponse,
    /// X12 999 functional acknowledgment
    FunctionalAck,
    Unknown,
}

/// Identify the transaction type of a response payload from its ST segment
pub fn detect_transaction_kind(raw: &str) -> TransactionKind {
    for segment in split_segments(raw) {
        if segment.id == "ST" {
            return match segment.element(1) {
                Some("271") => TransactionKind::EligibilityResponse,
                Some("999") => TransactionKind::FunctionalAck,
                _ => TransactionKind::Unknown,
            };
        }
    }
    TransactionKind::Unknown
}

/// Whether a response payload is a 999 rather than a 271
pub fn is_functional_ack(raw: &str) -> bool {
    detect_transaction_kind(raw) == TransactionKind::FunctionalAck
}

/// Transaction set acknowledgment disposition from IK501
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckStatus {
    Accepted,
    AcceptedWithErrors,
    PartiallyAccepted,
    Rejected,
    /// Any other IK501 code, kept verbatim
    Other(String),
}

impl AckStatus {
    /// Decode an IK501/AK501 code
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "A" => AckStatus::Accepted,
            "E" => AckStatus::AcceptedWithErrors,
            "P" => AckStatus::PartiallyAccepted,
            "R" => AckStatus::Rejected,
            other => AckStatus::Other(other.to_string()),
        }
    }

    /// Whether the transaction set was rejected outright
    pub fn is_rejected(&self) -> bool {
        matches!(self, AckStatus::Rejected)
    }
}

impl fmt::Display for AckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckStatus::Accepted => write!(f, "Accepted"),
            AckStatus::AcceptedWithErrors => write!(f, "Accepted With Errors"),
            AckStatus::PartiallyAccepted => write!(f, "Partially Accepted"),
            AckStatus::Rejected => write!(f, "Rejected"),
            AckStatus::Other(code) => write!(f, "Status {}", code),
        }
    }
}

/// One IK3/AK3 segment-level error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentError {
    /// ID of the segment in error, such as `NM1`
    pub segment_id: String,
    /// Position of the segment within the transaction set
    pub position: Option<u32>,
    pub loop_id: Option<String>,
    /// Raw IK304 syntax error code
    pub code: String,
    pub description: String,
}

/// One IK4/AK4 element-level error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementError {
    /// Position of the element within the segment in error
    pub position: Option<u32>,
    /// X12 data element reference number, when reported
    pub reference_number: Option<String>,
    /// Raw IK403 syntax error code
    pub code: String,
    pub description: String,
    /// Copy of the offending data, when the payer echoes it back
    pub bad_value: Option<String>,
}

/// Decoded contents of a 999 functional acknowledgment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RejectionReport {
    /// Transaction disposition from the IK5 trailer, absent if none came back
    pub status: Option<AckStatus>,
    pub segment_errors: Vec<SegmentError>,
    pub element_errors: Vec<ElementError>,
    /// Raw CTX business context segments, joined with element separators
    pub contexts: Vec<String>,
    /// Control number of the 999 transaction set itself
    pub transaction_control: Option<String>,
}

impl RejectionReport {
    /// Whether the acknowledged transaction was rejected
    pub fn is_rejected(&self) -> bool {
        self.status.as_ref().map(AckStatus::is_rejected).unwrap_or(false)
    }

    /// Total number of decoded segment and element errors
    pub fn error_count(&self) -> usize {
        self.segment_errors.len() + self.element_errors.len()
    }

    /// One-line summary of the acknowledgment
    pub fn summary(&self) -> String {
        let disposition = match &self.status {
            Some(AckStatus::Accepted) => "accepted".to_string(),
            Some(AckStatus::AcceptedWithErrors) => "accepted with errors".to_string(),
            Some(AckStatus::PartiallyAccepted) => "partially accepted".to_string(),
            Some(AckStatus::Rejected) => "rejected".to_string(),
            Some(AckStatus::Other(code)) => format!("acknowledged with status '{}'", code),
            None => "acknowledged without a disposition".to_string(),
        };

        let mut parts = vec![format!("inquiry {} by the clearinghouse", disposition)];

        let count = self.error_count();
        if count > 0 {
            parts.push(format!(
                "{} syntax error{}",
                count,
                if count == 1 { "" } else { "s" }
            ));
        }
        if let Some(first) = self.first_error_description() {
            parts.push(first);
        }

        parts.join("; ")
    }

    fn first_error_description(&self) -> Option<String> {
        if let Some(err) = self.segment_errors.first() {
            return Some(format!("{} segment: {}", err.segment_id, err.description));
        }
        self.element_errors.first().map(|err| match err.position {
            Some(position) => format!("element {}: {}", position, err.description),
            None => err.description.clone(),
        })
    }

    /// Render a formatted report suitable for terminal display
    pub fn format_report(&self) -> String {
        let divider = "=".repeat(60);
        let mut lines = Vec::new();

        lines.push(divider.clone());
        lines.push("FUNCTIONAL ACKNOWLEDGMENT (999)".to_string());
        lines.push(divider.clone());

        lines.push(String::new());
        lines.push("STATUS:".to_string());
        match &self.status {
            Some(status) => lines.push(format!("  Disposition: {}", status)),
            None => lines.push("  Disposition: not reported".to_string()),
        }
        if let Some(control) = &self.transaction_control {
            lines.push(format!("  Transaction control number: {}", control));
        }

        if !self.segment_errors.is_empty() {
            lines.push(String::new());
            lines.push("SEGMENT ERRORS:".to_string());
            for err in &self.segment_errors {
                let mut location = err.segment_id.clone();
                if let Some(position) = err.position {
                    location.push_str(&format!(" at position {}", position));
                }
                if let Some(loop_id) = &err.loop_id {
                    location.push_str(&format!(" (loop {})", loop_id));
                }
                lines.push(format!("  - {}: {} [{}]", location, err.description, err.code));
            }
        }

        if !self.element_errors.is_empty() {
            lines.push(String::new());
            lines.push("ELEMENT ERRORS:".to_string());
            for err in &self.element_errors {
                let mut location = match err.position {
                    Some(position) => format!("element {}", position),
                    None => "element".to_string(),
                };
                if let Some(reference) = &err.reference_number {
                    location.push_str(&format!(" (ref {})", reference));
                }
                let mut line = format!("  - {}: {}", location, err.description);
                if let Some(value) = &err.bad_value {
                    line.push_str(&format!(", value '{}'", value));
                }
                line.push_str(&format!(" [{}]", err.code));
                lines.push(line);
            }
        }

        if !self.contexts.is_empty() {
            lines.push(String::new());
            lines.push("CONTEXT:".to_string());
            for context in &self.contexts {
                lines.push(format!("  - {}", context));
            }
        }

        lines.push(String::new());
        lines.push("SUMMARY:".to_string());
        lines.push(format!("  {}", self.summary()));
        lines.push(divider);

        lines.join("\n")
    }
}

/// Decode a 999 payload into a [`RejectionReport`]
///
/// Unrecognized error codes are carried through verbatim as their own
/// description, so nothing the payer reports is dropped.
pub fn parse_rejection(raw: &str) -> RejectionReport {
    let mut report = RejectionReport::default();

    for segment in split_segments(raw) {
        match segment.id.as_str() {
            "ST" => {
                if segment.element(1) == Some("999") {
                    report.transaction_control = segment
                        .element(2)
                        .map(String::from)
                        .filter(|s| !s.is_empty());
                }
            }
            "IK3" | "AK3" => {
                let code = segment.element(4).unwrap_or("").to_string();
                report.segment_errors.push(SegmentError {
                    segment_id: segment.element(1).unwrap_or("").to_string(),
                    position: segment.element(2).and_then(parse_position),
                    loop_id: segment.element(3).map(String::from).filter(|s| !s.is_empty()),
                    description: codes::segment_error_description(&code)
                        .map(String::from)
                        .unwrap_or_else(|| code.clone()),
                    code,
                });
            }
            "IK4" | "AK4" => {
                let code = segment.element(3).unwrap_or("").to_string();
                report.element_errors.push(ElementError {
                    position: segment.element(1).and_then(parse_position),
                    reference_number: segment.element(2).map(String::from).filter(|s| !s.is_empty()),
                    description: codes::element_error_description(&code)
                        .map(String::from)
                        .unwrap_or_else(|| code.clone()),
                    bad_value: segment.element(4).map(String::from).filter(|s| !s.is_empty()),
                    code,
                });
            }
            "IK5" | "AK5" => {
                if let Some(code) = segment.element(1).filter(|c| !c.is_empty()) {
                    report.status = Some(AckStatus::from_code(code));
                }
            }
            "CTX" => {
                if !segment.elements.is_empty() {
                    report.contexts.push(segment.elements.join("*"));
                }
            }
            _ => {}
        }
    }

    tracing::debug!(
        errors = report.error_count(),
        rejected = report.is_rejected(),
        "decoded functional acknowledgment"
    );

    report
}

/// IK401 can be a bare position or a `position:component` composite
fn parse_position(value: &str) -> Option<u32> {
    value.split(':').next().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REJECTED_999: &str = "\
ISA*00*          *00*          *ZZ*HT000004-003   *ZZ*HT009582-001   *240912*1430*^*00501*000001234*0*P*:~
GS*FA*HT000004-003*HT009582-001*20240912*1430*1234*X*005010X231A1~
ST*999*0001*005010X231A1~
AK1*HS*123456789*005010X279A1~
AK2*270*000000001*005010X279A1~
IK3*NM1*8*2100*I12~
CTX*SITUATIONAL TRIGGER*NM1*8*2100*9~
IK4*9*66*7*BADVALUE~
IK5*R*5~
AK9*R*1*1*0~
SE*8*0001~
GE*1*1234~
IEA*1*000001234~
";

    const ACCEPTED_999: &str =
        "ST*999*0002~AK1*HS*123456790~AK2*270*000000002~IK5*A~AK9*A*1*1*1~SE*6*0002~";

    #[test]
    fn test_detects_transaction_kinds() {
        assert_eq!(detect_transaction_kind(REJECTED_999), TransactionKind::FunctionalAck);
        assert_eq!(
            detect_transaction_kind("ST*271*0001*005010X279A1~SE*2*0001~"),
            TransactionKind::EligibilityResponse
        );
        assert_eq!(detect_transaction_kind("ST*837*0001~"), TransactionKind::Unknown);
        assert_eq!(detect_transaction_kind("not x12 at all"), TransactionKind::Unknown);
        assert!(is_functional_ack(REJECTED_999));
        assert!(!is_functional_ack("ST*271*0001~"));
    }

    #[test]
    fn test_parse_rejected_acknowledgment() {
        let report = parse_rejection(REJECTED_999);

        assert_eq!(report.status, Some(AckStatus::Rejected));
        assert!(report.is_rejected());
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.transaction_control.as_deref(), Some("0001"));

        let segment_error = &report.segment_errors[0];
        assert_eq!(segment_error.segment_id, "NM1");
        assert_eq!(segment_error.position, Some(8));
        assert_eq!(segment_error.loop_id.as_deref(), Some("2100"));
        assert_eq!(segment_error.code, "I12");
        assert_eq!(segment_error.description, "Implementation 'Not Used' element present");

        let element_error = &report.element_errors[0];
        assert_eq!(element_error.position, Some(9));
        assert_eq!(element_error.reference_number.as_deref(), Some("66"));
        assert_eq!(element_error.code, "7");
        assert_eq!(element_error.description, "Invalid code value");
        assert_eq!(element_error.bad_value.as_deref(), Some("BADVALUE"));

        assert_eq!(report.contexts, vec!["SITUATIONAL TRIGGER*NM1*8*2100*9".to_string()]);
    }

    #[test]
    fn test_accepted_acknowledgment() {
        let report = parse_rejection(ACCEPTED_999);

        assert_eq!(report.status, Some(AckStatus::Accepted));
        assert!(!report.is_rejected());
        assert_eq!(report.error_count(), 0);
        assert!(report.summary().contains("accepted"));
    }

    #[test]
    fn test_composite_element_position() {
        let report = parse_rejection("ST*999*0001~IK4*9:2*66*7~IK5*R~SE*4*0001~");
        assert_eq!(report.element_errors[0].position, Some(9));
    }

    #[test]
    fn test_unknown_codes_pass_through() {
        let report = parse_rejection("ST*999*0001~IK3*DMG*10**XYZ~IK4*2**Q9~IK5*R~SE*5*0001~");

        assert_eq!(report.segment_errors[0].code, "XYZ");
        assert_eq!(report.segment_errors[0].description, "XYZ");
        assert_eq!(report.segment_errors[0].loop_id, None);
        assert_eq!(report.element_errors[0].code, "Q9");
        assert_eq!(report.element_errors[0].description, "Q9");
    }

    #[test]
    fn test_missing_trailer_means_no_disposition() {
        let report = parse_rejection("ST*999*0001~IK3*NM1*8*2100*8~SE*3*0001~");

        assert_eq!(report.status, None);
        assert!(!report.is_rejected());
        assert!(report.summary().contains("without a disposition"));
    }

    #[test]
    fn test_other_status_codes_kept_verbatim() {
        let report = parse_rejection("ST*999*0001~IK5*M~SE*3*0001~");
        assert_eq!(report.status, Some(AckStatus::Other("M".to_string())));
        assert!(report.summary().contains("'M'"));
    }

    #[test]
    fn test_summary_names_first_error() {
        let report = parse_rejection(REJECTED_999);
        let summary = report.summary();

        assert!(summary.contains("rejected"));
        assert!(summary.contains("2 syntax errors"));
        assert!(summary.contains("NM1 segment"));
    }

    #[test]
    fn test_format_report_sections() {
        let report = parse_rejection(REJECTED_999);
        let rendered = report.format_report();

        println!("{}", rendered);
        assert!(rendered.contains("FUNCTIONAL ACKNOWLEDGMENT (999)"));
        assert!(rendered.contains("Disposition: Rejected"));
        assert!(rendered.contains("SEGMENT ERRORS:"));
        assert!(rendered.contains("NM1 at position 8 (loop 2100)"));
        assert!(rendered.contains("ELEMENT ERRORS:"));
        assert!(rendered.contains("value 'BADVALUE'"));
        assert!(rendered.contains("CONTEXT:"));
    }

    #[test]
    fn test_report_serializes() {
        let report = parse_rejection(REJECTED_999);
        let json = serde_json::to_string(&report).expect("report should serialize");
        let restored: RejectionReport = serde_json::from_str(&json).expect("report should deserialize");
        assert_eq!(report, restored);
    }
}
