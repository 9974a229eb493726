/*!
 * X12 270 inquiry builder
 *
 * Assembles a complete 005010X279A1 interchange for one patient and one
 * payer. Envelope identifiers, the subscriber loop shape, and the trace
 * segment all come from the caller's [`TransactionContext`] and the
 * payer's [`FieldPolicy`](crate::payer::FieldPolicy); SE01 is always
 * computed from the segments actually emitted rather than hardcoded.
 */

use std::sync::atomic::{AtomicU64, Ordering};
use chrono::Utc;
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::constants::IMPLEMENTATION_GUIDE_VERSION;
use crate::data_types::{parse_flexible_date, Gender, PatientQuery, TransactionContext};
use crate::error::{EdiError, Result};
use crate::payer::{PayerProfile, ProviderForm, TraceForm};
use crate::segment::{Interchange, Segment};

/// Segment IDs every well-formed 270 must contain
pub const REQUIRED_SEGMENT_IDS: &[&str] = &[
    "ISA", "GS", "ST", "BHT", "HL", "NM1", "EQ", "SE", "GE", "IEA",
];

static CONTROL_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a 9-digit interchange control number
///
/// Combines the current time with a process-wide sequence counter so
/// concurrent builds never share a number.
fn next_control_number() -> String {
    let sequence = CONTROL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let seconds = Utc::now().timestamp() as u64;
    format!("{:06}{:03}", seconds % 1_000_000, sequence % 1_000)
}

/// Trace number for TRN02, unique per inquiry
fn trace_number(control_number: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(100..1000);
    format!("{}{}", control_number, suffix)
}

/// Pad or truncate to the fixed 15-character width ISA requires
fn isa_field(value: &str) -> String {
    format!("{:<15.15}", value)
}

/// Builds 270 inquiries for one submitter
pub struct InquiryBuilder {
    context: TransactionContext,
}

impl InquiryBuilder {
    pub fn new(context: TransactionContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &TransactionContext {
        &self.context
    }

    /// Build a complete 270 interchange for one patient
    ///
    /// Fails only on unusable input such as an unparseable birth date; an
    /// unrecognized gender code falls back to the payer profile's default.
    pub fn build(&self, profile: &PayerProfile, query: &PatientQuery) -> Result<Interchange> {
        let birth_date = parse_flexible_date(&query.date_of_birth)?;
        let gender = query
            .gender
            .as_deref()
            .and_then(Gender::from_code)
            .unwrap_or(profile.default_gender);

        let now = Utc::now();
        let control_number = next_control_number();
        let date_short = now.format("%y%m%d").to_string();
        let date_full = now.format("%Y%m%d").to_string();
        let time = now.format("%H%M").to_string();
        let service_date = query
            .service_date
            .unwrap_or_else(|| now.date_naive())
            .format("%Y%m%d")
            .to_string();

        let context = &self.context;
        let policy = &profile.policy;

        let mut segments = Vec::new();

        segments.push(Segment::new(
            "ISA",
            vec![
                "00".to_string(),
                " ".repeat(10),
                "00".to_string(),
                " ".repeat(10),
                "ZZ".to_string(),
                isa_field(&context.trading_partner),
                "ZZ".to_string(),
                isa_field(&context.receiver_id),
                date_short,
                time.clone(),
                "^".to_string(),
                "00501".to_string(),
                control_number.clone(),
                if policy.ack_requested { "1" } else { "0" }.to_string(),
                context.environment.usage_indicator().to_string(),
                ":".to_string(),
            ],
        ));

        segments.push(Segment::new(
            "GS",
            vec![
                "HS".to_string(),
                context.trading_partner.clone(),
                context.receiver_id.clone(),
                date_full.clone(),
                time.clone(),
                control_number.clone(),
                "X".to_string(),
                IMPLEMENTATION_GUIDE_VERSION.to_string(),
            ],
        ));

        // Transaction set collected separately so SE01 can be computed
        let mut transaction = Vec::new();

        transaction.push(Segment::new(
            "ST",
            vec![
                "270".to_string(),
                "0001".to_string(),
                IMPLEMENTATION_GUIDE_VERSION.to_string(),
            ],
        ));
        transaction.push(Segment::new(
            "BHT",
            vec![
                "0022".to_string(),
                "13".to_string(),
                String::new(),
                date_full,
                time,
            ],
        ));

        // 2000A information source: the payer
        transaction.push(Segment::new(
            "HL",
            vec![
                "1".to_string(),
                String::new(),
                "20".to_string(),
                "1".to_string(),
            ],
        ));
        transaction.push(Segment::new(
            "NM1",
            vec![
                "PR".to_string(),
                "2".to_string(),
                profile.payer_name.clone(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                "46".to_string(),
                context.receiver_id.clone(),
            ],
        ));

        // 2000B information receiver: the inquiring provider
        transaction.push(Segment::new(
            "HL",
            vec![
                "2".to_string(),
                "1".to_string(),
                "21".to_string(),
                "1".to_string(),
            ],
        ));
        transaction.push(self.provider_segment(policy.provider));

        // 2000C subscriber
        transaction.push(Segment::new(
            "HL",
            vec![
                "3".to_string(),
                "2".to_string(),
                "22".to_string(),
                "0".to_string(),
            ],
        ));

        match policy.trace {
            TraceForm::Full => {
                transaction.push(Segment::new(
                    "TRN",
                    vec![
                        "1".to_string(),
                        trace_number(&control_number),
                        context.provider_npi.as_str().to_string(),
                    ],
                ));
            }
            TraceForm::Minimal => {
                transaction.push(Segment::new(
                    "TRN",
                    vec!["1".to_string(), control_number.clone()],
                ));
            }
            TraceForm::Omitted => {}
        }

        transaction.push(subscriber_segment(profile, query));
        transaction.push(Segment::new(
            "DMG",
            vec![
                "D8".to_string(),
                birth_date.format("%Y%m%d").to_string(),
                gender.as_code().to_string(),
            ],
        ));
        transaction.push(Segment::new(
            "DTP",
            vec![
                "291".to_string(),
                "RD8".to_string(),
                format!("{}-{}", service_date, service_date),
            ],
        ));

        for code in &profile.benefit_codes {
            transaction.push(Segment::new("EQ", vec![code.clone()]));
        }

        // SE01 counts every segment from ST through SE inclusive
        let segment_count = transaction.len() + 1;
        transaction.push(Segment::new(
            "SE",
            vec![segment_count.to_string(), "0001".to_string()],
        ));

        segments.extend(transaction);
        segments.push(Segment::new(
            "GE",
            vec!["1".to_string(), control_number.clone()],
        ));
        segments.push(Segment::new(
            "IEA",
            vec!["1".to_string(), control_number.clone()],
        ));

        tracing::debug!(
            payer = %profile.key,
            control_number = %control_number,
            segments = segments.len(),
            "built 270 inquiry"
        );

        Ok(Interchange {
            segments,
            control_number,
        })
    }

    fn provider_segment(&self, form: ProviderForm) -> Segment {
        let context = &self.context;
        match form {
            ProviderForm::WithNpi => {
                if let Some(first) = &context.provider_first_name {
                    Segment::new(
                        "NM1",
                        vec![
                            "1P".to_string(),
                            "1".to_string(),
                            context.provider_last_name.clone(),
                            first.clone(),
                            String::new(),
                            String::new(),
                            String::new(),
                            "XX".to_string(),
                            context.provider_npi.as_str().to_string(),
                        ],
                    )
                } else {
                    Segment::new(
                        "NM1",
                        vec![
                            "1P".to_string(),
                            "2".to_string(),
                            context.provider_last_name.clone(),
                            String::new(),
                            String::new(),
                            String::new(),
                            String::new(),
                            "XX".to_string(),
                            context.provider_npi.as_str().to_string(),
                        ],
                    )
                }
            }
            ProviderForm::Bare => {
                let name = if context.provider_last_name.is_empty() {
                    "PROVIDER".to_string()
                } else {
                    context.provider_last_name.clone()
                };
                Segment::new("NM1", vec!["1P".to_string(), "2".to_string(), name])
            }
        }
    }
}

fn subscriber_segment(profile: &PayerProfile, query: &PatientQuery) -> Segment {
    let last = query.last_name.to_uppercase();
    let first = query.first_name.to_uppercase();

    match query.member_id.as_deref() {
        Some(member_id) if !member_id.is_empty() => Segment::new(
            "NM1",
            vec![
                "IL".to_string(),
                "1".to_string(),
                last,
                first,
                String::new(),
                String::new(),
                String::new(),
                profile.identifier_qualifier.clone(),
                member_id.to_string(),
            ],
        ),
        _ => Segment::new(
            "NM1",
            vec!["IL".to_string(), "1".to_string(), last, first],
        ),
    }
}

/// Findings from structural validation of a built interchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub segment_count: usize,
}

impl ValidationReport {
    /// Convert into a `Result`, surfacing the errors when invalid
    pub fn into_result(self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(EdiError::structural(self.errors))
        }
    }
}

/// Structurally validate a 270 interchange before transmission
///
/// Checks required segments, the ISA element count, control number
/// consistency across the envelope, and the declared SE01 count against
/// the segments actually present. Missing demographics and service dates
/// are warnings rather than errors since some payer routes omit them.
pub fn validate(interchange: &Interchange) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let present = interchange.segment_ids();
    let missing: Vec<&str> = REQUIRED_SEGMENT_IDS
        .iter()
        .filter(|id| !present.contains(*id))
        .copied()
        .collect();
    if !missing.is_empty() {
        errors.push(format!("Missing required segments: {}", missing.join(", ")));
    }

    if let Some(isa) = interchange.find("ISA") {
        if isa.elements.len() != 16 {
            errors.push(format!(
                "ISA has {} elements, expected 16",
                isa.elements.len()
            ));
        }
    }

    if let Some(control) = interchange.find("ISA").and_then(|s| s.element(13)) {
        let envelope_refs = [
            ("GS06", interchange.find("GS").and_then(|s| s.element(6))),
            ("GE02", interchange.find("GE").and_then(|s| s.element(2))),
            ("IEA02", interchange.find("IEA").and_then(|s| s.element(2))),
        ];
        for (position, value) in envelope_refs {
            if let Some(value) = value {
                if value != control {
                    errors.push(format!(
                        "Control number mismatch: ISA13 is {} but {} is {}",
                        control, position, value
                    ));
                }
            }
        }
    }

    let st_index = interchange.segments.iter().position(|s| s.id == "ST");
    let se_index = interchange.segments.iter().position(|s| s.id == "SE");
    if let (Some(st), Some(se)) = (st_index, se_index) {
        let actual = se - st + 1;
        if let Some(declared) = interchange.find("SE").and_then(|s| s.element(1)) {
            match declared.parse::<usize>() {
                Ok(count) if count == actual => {}
                Ok(count) => errors.push(format!(
                    "SE01 declares {} segments but the transaction set contains {}",
                    count, actual
                )),
                Err(_) => errors.push(format!("SE01 '{}' is not a number", declared)),
            }
        }
    }

    if interchange.find("DMG").is_none() {
        warnings.push("No DMG segment: subscriber demographics omitted".to_string());
    }
    if interchange.find("DTP").is_none() {
        warnings.push("No DTP segment: service date range omitted".to_string());
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
        segment_count: interchange.segments.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::{Credentials, Environment, Npi};
    use crate::payer;

    fn test_context() -> TransactionContext {
        TransactionContext {
            trading_partner: "HT009582-001".to_string(),
            receiver_id: "HT000004-001".to_string(),
            provider_npi: Npi::new("1275348807".to_string()).unwrap(),
            provider_last_name: "MONTOYA".to_string(),
            provider_first_name: Some("JEREMY".to_string()),
            environment: Environment::Production,
            credentials: Credentials::new("user", "pass"),
        }
    }

    fn montoya() -> PatientQuery {
        PatientQuery::new("Jeremy", "Montoya", "1984-07-17")
            .with_gender("M")
            .with_member_id("0900412827")
    }

    #[test]
    fn test_build_segment_order() {
        let builder = InquiryBuilder::new(test_context());
        let profile = payer::get_payer("UTAH_MEDICAID").unwrap();
        let interchange = builder.build(profile, &montoya()).unwrap();

        assert_eq!(
            interchange.segment_ids(),
            vec![
                "ISA", "GS", "ST", "BHT", "HL", "NM1", "HL", "NM1", "HL", "TRN", "NM1", "DMG",
                "DTP", "EQ", "SE", "GE", "IEA",
            ]
        );
    }

    #[test]
    fn test_declared_count_matches_emitted_segments() {
        let builder = InquiryBuilder::new(test_context());
        let profile = payer::get_payer("U_OF_U_HEALTH").unwrap();
        let interchange = builder.build(profile, &montoya()).unwrap();

        let st = interchange.segments.iter().position(|s| s.id == "ST").unwrap();
        let se = interchange.segments.iter().position(|s| s.id == "SE").unwrap();
        let declared: usize = interchange
            .find("SE")
            .unwrap()
            .element(1)
            .unwrap()
            .parse()
            .unwrap();

        assert_eq!(declared, se - st + 1);
        // Three EQ segments for this payer's benefit codes
        assert_eq!(interchange.find_all("EQ").len(), 3);
    }

    #[test]
    fn test_control_number_consistency_and_uniqueness() {
        let builder = InquiryBuilder::new(test_context());
        let profile = payer::get_payer("UTAH_MEDICAID").unwrap();

        let first = builder.build(profile, &montoya()).unwrap();
        let second = builder.build(profile, &montoya()).unwrap();

        for interchange in [&first, &second] {
            let control = interchange.control_number.as_str();
            assert_eq!(control.len(), 9);
            assert_eq!(interchange.find("ISA").unwrap().element(13), Some(control));
            assert_eq!(interchange.find("GS").unwrap().element(6), Some(control));
            assert_eq!(interchange.find("GE").unwrap().element(2), Some(control));
            assert_eq!(interchange.find("IEA").unwrap().element(2), Some(control));
        }

        assert_ne!(first.control_number, second.control_number);
    }

    #[test]
    fn test_isa_fixed_width_fields() {
        let builder = InquiryBuilder::new(test_context());
        let profile = payer::get_payer("UTAH_MEDICAID").unwrap();
        let interchange = builder.build(profile, &montoya()).unwrap();

        let isa = interchange.find("ISA").unwrap();
        assert_eq!(isa.elements.len(), 16);
        assert_eq!(isa.element(6).unwrap().len(), 15);
        assert_eq!(isa.element(8).unwrap().len(), 15);
        assert_eq!(isa.element(6), Some("HT009582-001   "));
        assert_eq!(isa.element(16), Some(":"));
    }

    #[test]
    fn test_subscriber_with_and_without_member_id() {
        let builder = InquiryBuilder::new(test_context());
        let profile = payer::get_payer("UTAH_MEDICAID").unwrap();

        let with_id = builder.build(profile, &montoya()).unwrap();
        let subscriber = with_id
            .find_all("NM1")
            .into_iter()
            .find(|s| s.element(1) == Some("IL"))
            .unwrap()
            .clone();
        assert_eq!(subscriber.element(3), Some("MONTOYA"));
        assert_eq!(subscriber.element(8), Some("MI"));
        assert_eq!(subscriber.element(9), Some("0900412827"));

        let query = PatientQuery::new("Jane", "Smith", "1985-05-15").with_gender("F");
        let without_id = builder.build(profile, &query).unwrap();
        let subscriber = without_id
            .find_all("NM1")
            .into_iter()
            .find(|s| s.element(1) == Some("IL"))
            .unwrap()
            .clone();
        assert_eq!(subscriber.elements.len(), 4);
        assert_eq!(subscriber.element(4), Some("JANE"));
    }

    #[test]
    fn test_trace_policies() {
        let builder = InquiryBuilder::new(test_context());

        let full = payer::get_payer("UTAH_MEDICAID").unwrap();
        let interchange = builder.build(full, &montoya()).unwrap();
        let trn = interchange.find("TRN").unwrap();
        assert_eq!(trn.element(3), Some("1275348807"));
        assert!(trn.element(2).unwrap().len() > 9);

        let minimal = payer::get_payer("SELECTHEALTH").unwrap();
        let interchange = builder.build(minimal, &montoya()).unwrap();
        let trn = interchange.find("TRN").unwrap();
        assert_eq!(trn.element(2), Some(interchange.control_number.as_str()));
        assert_eq!(trn.elements.len(), 2);

        let mut omitted = full.clone();
        omitted.policy.trace = TraceForm::Omitted;
        let interchange = builder.build(&omitted, &montoya()).unwrap();
        assert!(interchange.find("TRN").is_none());
        assert!(validate(&interchange).valid);
    }

    #[test]
    fn test_provider_forms() {
        let profile = payer::get_payer("UTAH_MEDICAID").unwrap();

        // Individual provider with NPI
        let builder = InquiryBuilder::new(test_context());
        let interchange = builder.build(profile, &montoya()).unwrap();
        let provider = interchange
            .find_all("NM1")
            .into_iter()
            .find(|s| s.element(1) == Some("1P"))
            .unwrap()
            .clone();
        assert_eq!(provider.element(2), Some("1"));
        assert_eq!(provider.element(8), Some("XX"));
        assert_eq!(provider.element(9), Some("1275348807"));

        // Organization without a first name
        let mut context = test_context();
        context.provider_first_name = None;
        context.provider_last_name = "WASATCH CLINIC".to_string();
        let builder = InquiryBuilder::new(context);
        let interchange = builder.build(profile, &montoya()).unwrap();
        let provider = interchange
            .find_all("NM1")
            .into_iter()
            .find(|s| s.element(1) == Some("1P"))
            .unwrap()
            .clone();
        assert_eq!(provider.element(2), Some("2"));
        assert_eq!(provider.element(3), Some("WASATCH CLINIC"));

        // Bare form carries the name only
        let mut bare = profile.clone();
        bare.policy.provider = ProviderForm::Bare;
        let builder = InquiryBuilder::new(test_context());
        let interchange = builder.build(&bare, &montoya()).unwrap();
        let provider = interchange
            .find_all("NM1")
            .into_iter()
            .find(|s| s.element(1) == Some("1P"))
            .unwrap()
            .clone();
        assert_eq!(provider.elements.len(), 3);
        assert_eq!(provider.element(3), Some("MONTOYA"));
    }

    #[test]
    fn test_ack_flag_and_usage_indicator() {
        let builder = InquiryBuilder::new(test_context());

        let utah = payer::get_payer("UTAH_MEDICAID").unwrap();
        let interchange = builder.build(utah, &montoya()).unwrap();
        let isa = interchange.find("ISA").unwrap();
        assert_eq!(isa.element(14), Some("1"));
        assert_eq!(isa.element(15), Some("P"));

        let selecthealth = payer::get_payer("SELECTHEALTH").unwrap();
        let interchange = builder.build(selecthealth, &montoya()).unwrap();
        assert_eq!(interchange.find("ISA").unwrap().element(14), Some("0"));

        let mut context = test_context();
        context.environment = Environment::Test;
        let builder = InquiryBuilder::new(context);
        let interchange = builder.build(utah, &montoya()).unwrap();
        assert_eq!(interchange.find("ISA").unwrap().element(15), Some("T"));
    }

    #[test]
    fn test_gender_fallback_to_profile_default() {
        let builder = InquiryBuilder::new(test_context());
        let profile = payer::get_payer("UTAH_MEDICAID").unwrap();

        let query = PatientQuery::new("Jane", "Smith", "19850515").with_gender("X");
        let interchange = builder.build(profile, &query).unwrap();
        assert_eq!(interchange.find("DMG").unwrap().element(3), Some("M"));

        let query = PatientQuery::new("Jane", "Smith", "19850515").with_gender("f");
        let interchange = builder.build(profile, &query).unwrap();
        assert_eq!(interchange.find("DMG").unwrap().element(3), Some("F"));
    }

    #[test]
    fn test_unparseable_birth_date_is_rejected() {
        let builder = InquiryBuilder::new(test_context());
        let profile = payer::get_payer("UTAH_MEDICAID").unwrap();

        let query = PatientQuery::new("Jane", "Smith", "05-15-1985");
        match builder.build(profile, &query) {
            Err(EdiError::InvalidDateFormat { value, .. }) => assert_eq!(value, "05-15-1985"),
            other => panic!("expected InvalidDateFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_dmg_uses_eight_digit_birth_date() {
        let builder = InquiryBuilder::new(test_context());
        let profile = payer::get_payer("UTAH_MEDICAID").unwrap();
        let interchange = builder.build(profile, &montoya()).unwrap();

        let dmg = interchange.find("DMG").unwrap();
        assert_eq!(dmg.element(1), Some("D8"));
        assert_eq!(dmg.element(2), Some("19840717"));
    }

    #[test]
    fn test_validate_passes_built_interchanges() {
        let builder = InquiryBuilder::new(test_context());
        for key in ["UTAH_MEDICAID", "U_OF_U_HEALTH", "SELECTHEALTH", "MOLINA", "ANTHEM_BCBS"] {
            let profile = payer::get_payer(key).unwrap();
            let interchange = builder.build(profile, &montoya()).unwrap();
            let report = validate(&interchange);
            assert!(report.valid, "{} failed validation: {:?}", key, report.errors);
            assert!(report.warnings.is_empty());
        }
    }

    #[test]
    fn test_validate_detects_tampering() {
        let builder = InquiryBuilder::new(test_context());
        let profile = payer::get_payer("UTAH_MEDICAID").unwrap();
        let mut interchange = builder.build(profile, &montoya()).unwrap();

        // Corrupt the declared SE01 count
        let se = interchange.segments.iter_mut().find(|s| s.id == "SE").unwrap();
        se.elements[0] = "99".to_string();
        let report = validate(&interchange);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("SE01")));

        // Corrupt the GE control number too
        let ge = interchange.segments.iter_mut().find(|s| s.id == "GE").unwrap();
        ge.elements[1] = "000000000".to_string();
        let report = validate(&interchange);
        assert!(report.errors.iter().any(|e| e.contains("GE02")));

        assert!(report.into_result().is_err());
    }

    #[test]
    fn test_validate_reports_missing_segments() {
        let interchange = Interchange {
            segments: vec![
                Segment::new("ISA", vec!["00".to_string(); 16]),
                Segment::new("ST", vec!["270".to_string(), "0001".to_string()]),
                Segment::new("SE", vec!["2".to_string(), "0001".to_string()]),
            ],
            control_number: "000000001".to_string(),
        };

        let report = validate(&interchange);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("GS")));
        assert!(report.errors.iter().any(|e| e.contains("EQ")));
    }
}
