/*!
 * CAQH CORE SOAP envelope handling
 *
 * Builds the Phase II CORE real-time request envelope around an X12
 * payload, with WS-Security UsernameToken authentication, and extracts
 * payloads and faults from response envelopes. Extraction parses the XML
 * strictly first and only falls back to pattern matching when the
 * response is not well formed, since clearinghouse error pages sometimes
 * are not.
 */

use chrono::Utc;
use lazy_static::lazy_static;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::constants::{CORE_RULE_VERSION, PAYLOAD_ID_LENGTH, PAYLOAD_TYPE_INQUIRY, PROCESSING_MODE};
use crate::data_types::TransactionContext;
use crate::error::{EdiError, Result};

/// SOAP 1.2 envelope namespace
pub const SOAP_NAMESPACE: &str = "http://www.w3.org/2003/05/soap-envelope";
/// CAQH CORE rule 2.2.0 schema namespace
pub const CORE_NAMESPACE: &str = "http://www.caqh.org/SOAP/WSDL/CORERule2.2.0.xsd";
/// WS-Security extension namespace
pub const WSSE_NAMESPACE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
/// WS-Security utility namespace
pub const WSU_NAMESPACE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
/// UsernameToken plain-text password profile
pub const PASSWORD_TEXT_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";

lazy_static! {
    static ref PAYLOAD_RE: Regex =
        Regex::new(r"(?s)<Payload[^>]*>(.*?)</Payload>").expect("payload pattern");
    static ref FAULT_RE: Regex =
        Regex::new(r"(?s)<(?:[A-Za-z0-9]+:)?Fault[^>]*>(.*?)</(?:[A-Za-z0-9]+:)?Fault>")
            .expect("fault pattern");
    static ref FAULT_CODE_RE: Regex =
        Regex::new(r"(?s)<(?:[A-Za-z0-9]+:)?Code[^>]*>(.*?)</(?:[A-Za-z0-9]+:)?Code>")
            .expect("fault code pattern");
    static ref FAULT_REASON_RE: Regex = Regex::new(
        r"(?s)<(?:[A-Za-z0-9]+:)?(?:Reason|String)[^>]*>(.*?)</(?:[A-Za-z0-9]+:)?(?:Reason|String)>"
    )
    .expect("fault reason pattern");
    static ref FAULT_DETAIL_RE: Regex =
        Regex::new(r"(?s)<(?:[A-Za-z0-9]+:)?Detail[^>]*>(.*?)</(?:[A-Za-z0-9]+:)?Detail>")
            .expect("fault detail pattern");
    static ref ERROR_CODE_RE: Regex =
        Regex::new(r"(?s)<ErrorCode>(.*?)</ErrorCode>").expect("error code pattern");
    static ref ERROR_MESSAGE_RE: Regex =
        Regex::new(r"(?s)<ErrorMessage>(.*?)</ErrorMessage>").expect("error message pattern");
}

/// Fault details extracted from a SOAP response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultInfo {
    pub code: String,
    pub reason: String,
    pub detail: Option<String>,
}

/// Escape text for embedding in XML
pub fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Reverse [`escape_xml`] on payload text recovered by pattern matching
pub fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

/// Fit a raw identifier to the exact CORE PayloadID length
///
/// CORE rule 2.2.0 requires PayloadID to be exactly 36 characters; short
/// values are right-padded with zeros and long ones truncated.
pub fn pad_payload_id(raw: &str) -> String {
    let mut id: String = raw.chars().take(PAYLOAD_ID_LENGTH).collect();
    while id.len() < PAYLOAD_ID_LENGTH {
        id.push('0');
    }
    id
}

/// Generate a fresh 36-character PayloadID
pub fn payload_id() -> String {
    pad_payload_id(&Uuid::new_v4().to_string())
}

/// Current UTC time in the CORE timestamp format with milliseconds
pub fn core_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn token_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("UsernameToken-{}", &hex[..8])
}

/// Build the complete SOAP request envelope around an X12 payload
pub fn build_envelope(context: &TransactionContext, payload: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="{soap_ns}" xmlns:cor="{core_ns}">
  <soap:Header>
    <wsse:Security xmlns:wsse="{wsse_ns}" xmlns:wsu="{wsu_ns}" soap:mustUnderstand="true">
      <wsse:UsernameToken wsu:Id="{token_id}">
        <wsse:Username>{username}</wsse:Username>
        <wsse:Password Type="{password_type}">{password}</wsse:Password>
      </wsse:UsernameToken>
    </wsse:Security>
  </soap:Header>
  <soap:Body>
    <cor:COREEnvelopeRealTimeRequest>
      <PayloadType>{payload_type}</PayloadType>
      <ProcessingMode>{processing_mode}</ProcessingMode>
      <PayloadID>{payload_id}</PayloadID>
      <TimeStamp>{timestamp}</TimeStamp>
      <SenderID>{sender_id}</SenderID>
      <ReceiverID>{receiver_id}</ReceiverID>
      <CORERuleVersion>{core_rule_version}</CORERuleVersion>
      <Payload>{payload}</Payload>
    </cor:COREEnvelopeRealTimeRequest>
  </soap:Body>
</soap:Envelope>"#,
        soap_ns = SOAP_NAMESPACE,
        core_ns = CORE_NAMESPACE,
        wsse_ns = WSSE_NAMESPACE,
        wsu_ns = WSU_NAMESPACE,
        token_id = token_id(),
        username = escape_xml(&context.credentials.username),
        password_type = PASSWORD_TEXT_TYPE,
        password = escape_xml(&context.credentials.password),
        payload_type = PAYLOAD_TYPE_INQUIRY,
        processing_mode = PROCESSING_MODE,
        payload_id = payload_id(),
        timestamp = core_timestamp(),
        sender_id = escape_xml(&context.trading_partner),
        receiver_id = escape_xml(&context.receiver_id),
        core_rule_version = CORE_RULE_VERSION,
        payload = escape_xml(payload),
    )
}

/// Extract the X12 payload from a SOAP response envelope
///
/// Parses the XML strictly first; when the response is not well formed,
/// falls back to pattern matching against the Payload element and
/// unescapes the recovered text.
pub fn extract_payload(response: &str) -> Result<String> {
    if let Some(payload) = extract_payload_strict(response) {
        tracing::debug!(bytes = payload.len(), "extracted payload from response envelope");
        return Ok(payload);
    }

    if let Some(captures) = PAYLOAD_RE.captures(response) {
        let raw = captures.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        if !raw.is_empty() {
            tracing::warn!("response was not well-formed XML, payload recovered by pattern match");
            return Ok(unescape_xml(raw));
        }
    }

    Err(EdiError::payload_extraction(
        "no Payload element found in response",
        response,
    ))
}

fn extract_payload_strict(response: &str) -> Option<String> {
    let mut reader = Reader::from_str(response);
    let mut inside_payload = false;
    let mut content = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"Payload" => {
                inside_payload = true;
            }
            Ok(Event::Text(ref t)) if inside_payload => match t.unescape() {
                Ok(text) => content.push_str(&text),
                Err(_) => return None,
            },
            Ok(Event::CData(ref c)) if inside_payload => {
                content.push_str(&String::from_utf8_lossy(c.as_ref()));
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"Payload" => break,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return None,
        }
    }

    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Extract SOAP fault or CORE error details from a response, if present
///
/// Handles both SOAP 1.2 Fault blocks and the ErrorCode/ErrorMessage
/// pairs CORE envelopes use. A CORE `ErrorCode` of `Success` is not a
/// fault.
pub fn extract_fault(response: &str) -> Option<FaultInfo> {
    if let Some(captures) = FAULT_RE.captures(response) {
        let content = captures.get(1).map(|m| m.as_str()).unwrap_or("");
        let code = capture_text(&FAULT_CODE_RE, content);
        let reason = capture_text(&FAULT_REASON_RE, content);
        let detail = capture_text(&FAULT_DETAIL_RE, content);

        if code.is_none() && reason.is_none() && detail.is_none() {
            return None;
        }
        return Some(FaultInfo {
            code: code.unwrap_or_else(|| "Unknown".to_string()),
            reason: reason.unwrap_or_else(|| "Unknown error".to_string()),
            detail,
        });
    }

    let code = capture_text(&ERROR_CODE_RE, response);
    let message = capture_text(&ERROR_MESSAGE_RE, response);
    if code.as_deref() == Some("Success") {
        return None;
    }
    if code.is_some() || message.is_some() {
        return Some(FaultInfo {
            code: code.unwrap_or_else(|| "Unknown".to_string()),
            reason: message.unwrap_or_else(|| "Unknown error".to_string()),
            detail: None,
        });
    }

    None
}

fn capture_text(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::{Credentials, Environment, Npi};

    fn test_context() -> TransactionContext {
        TransactionContext {
            trading_partner: "HT009582-001".to_string(),
            receiver_id: "HT000004-001".to_string(),
            provider_npi: Npi::new("1275348807".to_string()).unwrap(),
            provider_last_name: "MONTOYA".to_string(),
            provider_first_name: Some("JEREMY".to_string()),
            environment: Environment::Production,
            credentials: Credentials::new("clinic_user", "p<ss&word"),
        }
    }

    fn wrap_in_response(payload: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="{}">
  <soap:Body>
    <COREEnvelopeRealTimeResponse>
      <PayloadType>X12_271_Response_005010X279A1</PayloadType>
      <ErrorCode>Success</ErrorCode>
      <Payload>{}</Payload>
    </COREEnvelopeRealTimeResponse>
  </soap:Body>
</soap:Envelope>"#,
            SOAP_NAMESPACE,
            escape_xml(payload)
        )
    }

    #[test]
    fn test_escape_and_unescape() {
        let original = "AT&T <Dental> \"Plan\" 'B'";
        let escaped = escape_xml(original);
        assert!(!escaped.contains('<'));
        assert!(escaped.contains("&amp;"));
        assert_eq!(unescape_xml(&escaped), original);
    }

    #[test]
    fn test_unescape_does_not_double_unescape() {
        // A literal "&lt;" in the source escapes to "&amp;lt;" and must
        // come back as "&lt;", not "<"
        assert_eq!(unescape_xml("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_payload_id_is_exactly_36_chars() {
        let id = payload_id();
        assert_eq!(id.len(), PAYLOAD_ID_LENGTH);
        assert_ne!(payload_id(), payload_id());
    }

    #[test]
    fn test_pad_payload_id() {
        assert_eq!(pad_payload_id("short").len(), 36);
        assert!(pad_payload_id("short").ends_with('0'));
        let long = "x".repeat(50);
        assert_eq!(pad_payload_id(&long).len(), 36);
    }

    #[test]
    fn test_core_timestamp_shape() {
        let timestamp = core_timestamp();
        assert!(timestamp.ends_with('Z'));
        assert_eq!(timestamp.len(), "2024-09-12T14:30:00.000Z".len());
        assert!(timestamp.contains('T'));
    }

    #[test]
    fn test_build_envelope_structure() {
        let envelope = build_envelope(&test_context(), "ISA*00~ST*270~SE*2~IEA*1~");

        assert!(envelope.contains("soap:mustUnderstand=\"true\""));
        assert!(envelope.contains("<wsse:Username>clinic_user</wsse:Username>"));
        assert!(envelope.contains(PASSWORD_TEXT_TYPE));
        assert!(envelope.contains("<PayloadType>X12_270_Request_005010X279A1</PayloadType>"));
        assert!(envelope.contains("<ProcessingMode>RealTime</ProcessingMode>"));
        assert!(envelope.contains("<SenderID>HT009582-001</SenderID>"));
        assert!(envelope.contains("<ReceiverID>HT000004-001</ReceiverID>"));
        assert!(envelope.contains("<CORERuleVersion>2.2.0</CORERuleVersion>"));

        // Credentials with XML metacharacters must be escaped
        assert!(envelope.contains("p&lt;ss&amp;word"));
        assert!(!envelope.contains("p<ss&word"));
    }

    #[test]
    fn test_envelope_payload_id_has_core_length() {
        let envelope = build_envelope(&test_context(), "ISA~IEA~");
        let start = envelope.find("<PayloadID>").unwrap() + "<PayloadID>".len();
        let end = envelope.find("</PayloadID>").unwrap();
        assert_eq!(end - start, PAYLOAD_ID_LENGTH);
    }

    #[test]
    fn test_extract_payload_from_well_formed_response() {
        let x12 = "ISA*00*          *00~ST*271*0001~SE*2*0001~IEA*1*123456789~";
        let response = wrap_in_response(x12);
        assert_eq!(extract_payload(&response).unwrap(), x12);
    }

    #[test]
    fn test_extract_payload_falls_back_on_malformed_xml() {
        // Mismatched close tag ahead of the payload defeats the strict pass
        let response =
            "<Response><Status>ok</Wrong><Payload>ST*271*0001~SE*2*0001~</Payload></Response>";
        assert!(extract_payload_strict(response).is_none());
        assert_eq!(extract_payload(response).unwrap(), "ST*271*0001~SE*2*0001~");
    }

    #[test]
    fn test_extract_payload_unescapes_fallback_content() {
        let response = "<Response><Status>ok</Wrong><Payload>ISA*A&amp;B*00~</Payload></Response>";
        assert!(extract_payload_strict(response).is_none());
        assert_eq!(extract_payload(response).unwrap(), "ISA*A&B*00~");
    }

    #[test]
    fn test_extract_payload_missing_is_an_error() {
        let response = "<soap:Envelope><soap:Body></soap:Body></soap:Envelope>";
        match extract_payload(response) {
            Err(EdiError::PayloadExtraction { response_snippet, .. }) => {
                assert!(response_snippet.starts_with("<soap:Envelope>"));
            }
            other => panic!("expected PayloadExtraction, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_soap_fault() {
        let response = r#"<soap:Envelope><soap:Body><soap:Fault>
            <soap:Code><soap:Value>env:Receiver</soap:Value></soap:Code>
            <soap:Reason><soap:Text>Authentication failed</soap:Text></soap:Reason>
        </soap:Fault></soap:Body></soap:Envelope>"#;

        let fault = extract_fault(response).unwrap();
        assert!(fault.code.contains("Receiver"));
        assert!(fault.reason.contains("Authentication failed"));
        assert!(fault.detail.is_none());
    }

    #[test]
    fn test_extract_core_error_pair() {
        let response = "<CORE><ErrorCode>PayloadIDIllegal</ErrorCode><ErrorMessage>PayloadID must be 36 characters</ErrorMessage></CORE>";
        let fault = extract_fault(response).unwrap();
        assert_eq!(fault.code, "PayloadIDIllegal");
        assert!(fault.reason.contains("36 characters"));
    }

    #[test]
    fn test_success_error_code_is_not_a_fault() {
        let response = wrap_in_response("ST*271*0001~SE*2*0001~");
        assert!(extract_fault(&response).is_none());
    }

    #[test]
    fn test_no_fault_in_plain_response() {
        assert!(extract_fault("<html><body>gateway timeout</body></html>").is_none());
    }
}
