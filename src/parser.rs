/*!
 * X12 271 eligibility response parsing and classification
 *
 * Walks the segments of a 271 response, collects patient, payer, plan,
 * and benefit details, and classifies the member's coverage. Parsing is
 * deliberately lenient: clearinghouse responses vary in which optional
 * segments they carry, so unknown segments are skipped and missing
 * elements become `None` rather than errors.
 */

use chrono::NaiveDate;

use crate::codes;
use crate::data_types::{
    AdvisoryError, BenefitDetail, CoverageClass, EligibilityVerdict, PlanDate, PlanReference,
};
use crate::segment::{split_segments, Segment};

/// Parse a 271 response payload into a classified verdict
///
/// Never fails: a response with no recognizable content classifies as
/// not eligible with an explanatory summary.
pub fn parse_response(raw: &str) -> EligibilityVerdict {
    let segments = split_segments(raw);
    let mut verdict = EligibilityVerdict::default();
    let mut managed_care = false;
    let mut payer_seen = false;

    for segment in &segments {
        match segment.id.as_str() {
            "ISA" => parse_isa(segment, &mut verdict),
            "ST" => parse_st(segment, &mut verdict),
            "BHT" => parse_bht(segment, &mut verdict),
            "NM1" => parse_nm1(segment, &mut verdict, &mut payer_seen),
            "EB" => parse_eb(segment, &mut verdict, &mut managed_care),
            "AAA" => parse_aaa(segment, &mut verdict),
            "DTP" => parse_dtp(segment, &mut verdict),
            "REF" => parse_ref(segment, &mut verdict),
            "MSG" => parse_msg(segment, &mut verdict),
            "N3" => parse_n3(segment, &mut verdict),
            "N4" => parse_n4(segment, &mut verdict),
            "PER" => parse_per(segment, &mut verdict),
            _ => {}
        }
    }

    classify(&mut verdict, managed_care);

    tracing::debug!(
        segments = segments.len(),
        benefits = verdict.benefits.len(),
        classification = %verdict.classification,
        "parsed eligibility response"
    );

    verdict
}

fn nonempty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn parse_isa(segment: &Segment, verdict: &mut EligibilityVerdict) {
    if segment.elements.len() < 16 {
        return;
    }
    verdict.interchange.sender_id = nonempty(segment.element(6));
    verdict.interchange.receiver_id = nonempty(segment.element(8));
    verdict.interchange.date = nonempty(segment.element(9));
    verdict.interchange.time = nonempty(segment.element(10));
    verdict.interchange.control_number = nonempty(segment.element(13));
}

fn parse_st(segment: &Segment, verdict: &mut EligibilityVerdict) {
    verdict.transaction.transaction_type = nonempty(segment.element(1));
    verdict.transaction.control_number = nonempty(segment.element(2));
    if segment.element(1) == Some("999") {
        verdict.warnings.push(
            "response is a 999 functional acknowledgment, not an eligibility response".to_string(),
        );
    }
}

fn parse_bht(segment: &Segment, verdict: &mut EligibilityVerdict) {
    verdict.transaction.purpose = nonempty(segment.element(2));
    verdict.transaction.reference = nonempty(segment.element(3));
    verdict.transaction.date = nonempty(segment.element(4));
    verdict.transaction.time = nonempty(segment.element(5));
}

fn parse_nm1(segment: &Segment, verdict: &mut EligibilityVerdict, payer_seen: &mut bool) {
    match segment.element(1).unwrap_or("") {
        "PR" => {
            let name = segment.element(3).unwrap_or("");

            // Transportation broker loops ride along in some responses
            // and must not displace the actual payer
            if codes::is_transportation_vendor(name) {
                return;
            }
            // The first payer loop is the information source; later PR
            // entries are carve-out vendors
            if *payer_seen {
                return;
            }
            *payer_seen = true;

            // The payer name decides primary-payer matching and, for the
            // primary payer, the program. Managed-care enrollment is an
            // EB-level fact: the information source being an MCO says
            // nothing about this member's plan
            verdict.payer.is_primary = codes::is_primary_payer_name(name);
            if verdict.payer.is_primary {
                if let Some(program) = codes::qualifying_program(name) {
                    verdict.plan.program = Some(program.to_string());
                }
            }

            verdict.payer.name = nonempty(segment.element(3));
            verdict.payer.id_qualifier = nonempty(segment.element(8));
            verdict.payer.payer_id = nonempty(segment.element(9));
        }
        "IL" => {
            verdict.patient.last_name = nonempty(segment.element(3));
            verdict.patient.first_name = nonempty(segment.element(4));
            verdict.patient.middle_name = nonempty(segment.element(5));
            verdict.patient.id_qualifier = nonempty(segment.element(8));
            if verdict.patient.member_id.is_none() {
                verdict.patient.member_id = nonempty(segment.element(9));
            }
        }
        "1P" => {
            verdict.provider.last_name = nonempty(segment.element(3));
            verdict.provider.first_name = nonempty(segment.element(4));
            verdict.provider.npi = nonempty(segment.element(9));
        }
        _ => {}
    }
}

fn parse_eb(segment: &Segment, verdict: &mut EligibilityVerdict, managed_care: &mut bool) {
    let status_code = segment.element(1).unwrap_or("").to_string();
    if status_code.is_empty() {
        return;
    }

    let status = codes::eligibility_status(&status_code)
        .map(String::from)
        .unwrap_or_else(|| format!("Unknown ({})", status_code));

    let service_types: Vec<String> = segment
        .element(3)
        .unwrap_or("")
        .split('^')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    let insurance_type = nonempty(segment.element(4));
    let plan_description = nonempty(segment.element(5));

    if let Some(insurance) = insurance_type.as_deref() {
        let insurance_upper = insurance.to_uppercase();
        if insurance_upper.contains("HM") {
            *managed_care = true;
            verdict.plan.plan_type = Some("HMO".to_string());
        } else if insurance_upper.contains("MC") {
            verdict.plan.plan_type = Some("Medicaid".to_string());
        }
    }

    // Plan text names the program or the administering organization,
    // except for transportation carve-outs which say nothing about the
    // member's medical plan
    if let Some(plan_text) = plan_description.as_deref() {
        if !codes::is_transportation_vendor(plan_text) {
            if let Some(program) = codes::qualifying_program(plan_text) {
                verdict.plan.program = Some(program.to_string());
            }
            if codes::is_targeted_program(plan_text) {
                verdict.targeted_program_member = true;
            }
            if let Some(org) = codes::managed_care_organization(plan_text) {
                *managed_care = true;
                verdict.plan.managed_care_organization = Some(org.to_string());
            }
        }
    }

    verdict.benefits.push(BenefitDetail {
        status_code,
        status,
        coverage_level: nonempty(segment.element(2)),
        service_types,
        insurance_type,
        plan_description,
    });
}

fn parse_aaa(segment: &Segment, verdict: &mut EligibilityVerdict) {
    if segment.elements.len() < 4 {
        return;
    }
    let code = segment.element(3).unwrap_or("").to_string();
    let description = codes::advisory_description(&code)
        .map(String::from)
        .unwrap_or_else(|| segment.element(4).unwrap_or("").to_string());
    verdict.errors.push(AdvisoryError { code, description });
}

fn parse_dtp(segment: &Segment, verdict: &mut EligibilityVerdict) {
    let qualifier = segment.element(1).unwrap_or("").to_string();
    let raw = match segment.element(3) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => return,
    };

    let (start, end) = parse_date_span(&raw);

    match qualifier.as_str() {
        "291" | "356" => {
            if verdict.plan.effective_date.is_none() {
                verdict.plan.effective_date = start;
            }
            // A 291 range carries the plan end as well
            if qualifier == "291" && verdict.plan.termination_date.is_none() {
                verdict.plan.termination_date = end;
            }
        }
        "292" | "036" | "357" => {
            if verdict.plan.termination_date.is_none() {
                verdict.plan.termination_date = end.or(start);
            }
        }
        _ => {}
    }

    verdict.plan.dates.push(PlanDate {
        meaning: codes::date_qualifier_meaning(&qualifier).map(String::from),
        qualifier,
        raw,
        start,
        end,
    });
}

fn parse_date_span(raw: &str) -> (Option<NaiveDate>, Option<NaiveDate>) {
    if raw.contains('-') {
        let mut parts = raw.splitn(2, '-');
        let start = parts.next().and_then(parse_x12_date);
        let end = parts.next().and_then(parse_x12_date);
        (start, end)
    } else {
        (parse_x12_date(raw), None)
    }
}

fn parse_x12_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y%m%d").ok()
}

fn parse_ref(segment: &Segment, verdict: &mut EligibilityVerdict) {
    let qualifier = segment.element(1).unwrap_or("").to_string();
    let value = match nonempty(segment.element(2)) {
        Some(value) => value,
        None => return,
    };

    // Some payers return the member ID only as a reference
    if (qualifier == "HJ" || qualifier == "3H") && verdict.patient.member_id.is_none() {
        verdict.patient.member_id = Some(value.clone());
    }

    if let Some(meaning) = codes::reference_qualifier_meaning(&qualifier) {
        verdict.plan.references.push(PlanReference {
            qualifier,
            meaning: meaning.to_string(),
            value,
        });
    }
}

fn parse_msg(segment: &Segment, verdict: &mut EligibilityVerdict) {
    if let Some(message) = nonempty(segment.element(1)) {
        verdict.warnings.push(message);
    }
}

fn parse_n3(segment: &Segment, verdict: &mut EligibilityVerdict) {
    let address = verdict.patient.address.get_or_insert_with(Default::default);
    address.address_line_1 = nonempty(segment.element(1));
    address.address_line_2 = nonempty(segment.element(2));
}

fn parse_n4(segment: &Segment, verdict: &mut EligibilityVerdict) {
    let address = verdict.patient.address.get_or_insert_with(Default::default);
    address.city = nonempty(segment.element(1));
    address.state = nonempty(segment.element(2));
    address.postal_code = nonempty(segment.element(3));
}

fn parse_per(segment: &Segment, verdict: &mut EligibilityVerdict) {
    for (index, value) in segment.elements.iter().enumerate() {
        if value == "TE" {
            if let Some(phone) = segment.elements.get(index + 1) {
                if !phone.is_empty() && verdict.payer.telephone.is_none() {
                    verdict.payer.telephone = Some(phone.clone());
                }
            }
        }
    }
}

fn classify(verdict: &mut EligibilityVerdict, managed_care: bool) {
    let has_active = verdict.benefits.iter().any(BenefitDetail::is_active);
    verdict.has_active_coverage = has_active;

    verdict.classification = if !has_active {
        CoverageClass::NotEligible
    } else if managed_care {
        CoverageClass::ManagedCare
    } else if verdict.payer.is_primary && verdict.plan.program.is_some() {
        CoverageClass::QualifyingTraditional
    } else if verdict.payer.is_primary {
        CoverageClass::NeedsReview
    } else {
        CoverageClass::WrongPayer
    };

    // Targeted adult membership is decisive: only fee-for-service members
    // are enrolled in it, so it qualifies even when the payer name alone
    // could not be matched
    verdict.qualifies_for_program = has_active
        && verdict.classification != CoverageClass::ManagedCare
        && (verdict.classification == CoverageClass::QualifyingTraditional
            || verdict.targeted_program_member);

    verdict.success = !verdict.benefits.is_empty() && verdict.errors.is_empty();
    verdict.summary = summarize(verdict);
}

fn summarize(verdict: &EligibilityVerdict) -> String {
    let name = match verdict.patient.display_name() {
        n if n.is_empty() => "Member".to_string(),
        n => n,
    };

    match verdict.classification {
        CoverageClass::QualifyingTraditional => {
            let program = verdict.plan.program.as_deref().unwrap_or("Utah Medicaid FFS");
            format!(
                "{} is enrolled in {} (traditional fee-for-service) and qualifies for the program",
                name, program
            )
        }
        CoverageClass::ManagedCare => format!(
            "{} is enrolled in managed care Medicaid and does not qualify for the program",
            name
        ),
        CoverageClass::NotEligible => {
            format!("{} is not currently eligible for Medicaid", name)
        }
        CoverageClass::WrongPayer => {
            format!("{} does not have Utah Medicaid fee-for-service coverage", name)
        }
        CoverageClass::NeedsReview => {
            format!("{} has Utah Medicaid but the program type needs manual review", name)
        }
    }
}
