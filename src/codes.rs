/*!
 * X12 code tables used across the 270/271/999 transaction set
 *
 * Central home for the EB eligibility status codes, AAA request validation
 * codes, DTP date qualifiers, REF reference qualifiers, and the IK3/IK4
 * error codes that appear in 999 acknowledgments. Lookups return `None`
 * for codes that are not in the tables so callers can decide how to
 * surface unknown values.
 */

use std::collections::HashMap;
use lazy_static::lazy_static;

/// EB01 codes that indicate some form of active coverage
pub const ACTIVE_STATUS_CODES: &[&str] = &["1", "2", "3", "4", "5"];

/// Managed care organization names that appear in 271 plan text
pub const MANAGED_CARE_ORGANIZATIONS: &[&str] = &["MOLINA", "SELECTHEALTH", "ANTHEM", "HEALTHY U"];

/// Tokens that identify the primary fee-for-service payer
pub const PRIMARY_PAYER_TOKENS: &[&str] = &["MEDICAID", "UTAH"];

/// Plan text marker for the targeted adult eligibility group
pub const TARGETED_PROGRAM_MARKER: &str = "TARGETED ADULT";

/// Plan text marker for transportation carve-out vendors
pub const TRANSPORTATION_MARKER: &str = "TRANSPORTATION";

lazy_static! {
    /// EB01 eligibility or benefit information codes
    pub static ref ELIGIBILITY_STATUS_CODES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("1", "Active Coverage");
        m.insert("2", "Active - Full Risk Capitation");
        m.insert("3", "Active - Services Capitated");
        m.insert("4", "Active - Services Capitated to Primary Care Physician");
        m.insert("5", "Active - Pending Investigation");
        m.insert("6", "Inactive");
        m.insert("7", "Inactive - Pending Eligibility Update");
        m.insert("8", "Inactive - Pending Investigation");
        m.insert("A", "Co-Insurance");
        m.insert("B", "Deductible");
        m.insert("C", "Coverage Basis");
        m.insert("D", "Benefit Description");
        m.insert("E", "Exclusions");
        m.insert("F", "Limitations");
        m.insert("G", "Out of Pocket (Stop Loss)");
        m.insert("H", "Unlimited");
        m.insert("I", "Non-Covered");
        m.insert("J", "Cost Containment");
        m.insert("K", "Reserve");
        m.insert("L", "Primary Care Provider");
        m.insert("M", "Pre-existing Condition");
        m.insert("N", "Services Restricted to Following Provider");
        m.insert("O", "Services Not Restricted to Following Provider");
        m.insert("P", "Benefit Disclaimer");
        m.insert("Q", "Second Surgical Opinion Required");
        m.insert("R", "Other or Additional Payor");
        m.insert("S", "Prior Year(s) History");
        m.insert("T", "Card(s) Reported Lost/Stolen");
        m.insert("U", "Contact Following Entity for Eligibility or Benefit Information");
        m.insert("V", "Cannot Process");
        m.insert("W", "Other Source of Data");
        m.insert("X", "Health Care Facility");
        m.insert("Y", "Spend Down");
        m
    };

    /// AAA03 request validation codes returned when an inquiry cannot be answered
    pub static ref ADVISORY_ERROR_CODES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("15", "Required application data missing");
        m.insert("41", "Authorization/Access Restrictions");
        m.insert("42", "Unable to Respond at Current Time");
        m.insert("43", "Invalid/Missing Provider Identification");
        m.insert("44", "Invalid/Missing Provider Name");
        m.insert("45", "Invalid/Missing Provider Specialty");
        m.insert("46", "Invalid/Missing Provider Phone Number");
        m.insert("47", "Invalid/Missing Provider State");
        m.insert("48", "Invalid/Missing Referring Provider Identification Number");
        m.insert("49", "Provider is Not Primary Care Physician");
        m.insert("50", "Provider Ineligible for Inquiries");
        m.insert("51", "Provider Not on File");
        m.insert("52", "Service Dates Not Within Provider Plan Enrollment");
        m.insert("53", "Inquired Coverage Inconsistent with Provider Type");
        m.insert("54", "Inappropriate Provider Role");
        m.insert("55", "Invalid/Missing Provider Address");
        m.insert("56", "Invalid/Missing NPI");
        m.insert("57", "Invalid/Missing Taxonomy Code");
        m.insert("58", "Invalid/Missing Provider ID Qualifier");
        m.insert("60", "Invalid/Missing Subscriber ID");
        m.insert("61", "Invalid/Missing Subscriber Name");
        m.insert("62", "Invalid/Missing Subscriber Gender");
        m.insert("63", "Invalid/Missing Subscriber Birth Date");
        m.insert("64", "Invalid/Missing Subscriber/Insured Indicator");
        m.insert("65", "Invalid/Missing Subscriber/Insured Name");
        m.insert("66", "Subscriber/Insured Not Found");
        m.insert("67", "Subscriber/Insured Not Eligible for Benefits");
        m.insert("68", "Duplicate Subscriber ID");
        m.insert("69", "Subscriber/Dependent Not Found");
        m.insert("70", "Invalid/Missing Subscriber/Dependent Name");
        m.insert("71", "Invalid/Missing Patient ID");
        m.insert("72", "Invalid/Missing Patient Name");
        m.insert("73", "Invalid/Missing Patient Gender");
        m.insert("74", "Invalid/Missing Patient Birth Date");
        m.insert("75", "Patient Not Found");
        m.insert("76", "Duplicate Patient ID/Name");
        m
    };

    /// DTP01 qualifiers seen in 271 plan and benefit date segments
    pub static ref DATE_QUALIFIERS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("036", "Coverage Expiration");
        m.insert("291", "Plan Begin");
        m.insert("292", "Plan End");
        m.insert("346", "Plan Period");
        m.insert("347", "Benefit Begin");
        m.insert("348", "Benefit End");
        m.insert("349", "Benefit Period");
        m.insert("356", "Eligibility Begin");
        m.insert("357", "Eligibility End");
        m
    };

    /// REF01 qualifiers for auxiliary plan identifiers
    pub static ref REFERENCE_QUALIFIERS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("18", "Plan Number");
        m.insert("1L", "Group Number");
        m.insert("3H", "Case Number");
        m.insert("49", "Family Unit Number");
        m.insert("6P", "Group ID");
        m.insert("HJ", "Identity Card Number");
        m.insert("IG", "Insurance Policy Number");
        m.insert("N6", "Plan Network ID");
        m.insert("SY", "Social Security Number");
        m.insert("ZZ", "Mutually Defined");
        m
    };

    /// IK304 segment syntax error codes from 999 acknowledgments
    pub static ref SEGMENT_ERROR_CODES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("1", "Unrecognized segment ID");
        m.insert("2", "Unexpected segment");
        m.insert("3", "Required segment missing");
        m.insert("4", "Loop occurs over maximum times");
        m.insert("5", "Segment exceeds maximum use");
        m.insert("6", "Segment not in defined transaction set");
        m.insert("7", "Segment not in proper sequence");
        m.insert("8", "Segment has data element errors");
        m.insert("I4", "Implementation 'Not Used' segment present");
        m.insert("I5", "Implementation segment not expected");
        m.insert("I6", "Implementation dependent segment missing");
        m.insert("I7", "Implementation loop occurs under minimum times");
        m.insert("I8", "Implementation segment below minimum use");
        m.insert("I12", "Implementation 'Not Used' element present");
        m.insert("509", "Implementation Not Used");
        m
    };

    /// IK403 element syntax error codes from 999 acknowledgments
    pub static ref ELEMENT_ERROR_CODES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("1", "Required data element missing");
        m.insert("2", "Conditional required data element missing");
        m.insert("3", "Too many data elements");
        m.insert("4", "Data element too short");
        m.insert("5", "Data element too long");
        m.insert("6", "Invalid character in data element");
        m.insert("7", "Invalid code value");
        m.insert("8", "Invalid date");
        m.insert("9", "Invalid time");
        m.insert("10", "Exclusion condition violated");
        m.insert("12", "Too many repetitions");
        m.insert("13", "Too many components");
        m.insert("66", "Invalid/Missing ID Qualifier");
        m.insert("67", "Invalid/Missing ID");
        m.insert("I10", "Implementation 'Not Used' data element present");
        m.insert("I12", "Implementation 'Not Used' element present");
        m.insert("509", "Implementation Not Used");
        m
    };
}

/// Look up the description for an EB01 eligibility status code
pub fn eligibility_status(code: &str) -> Option<&'static str> {
    ELIGIBILITY_STATUS_CODES.get(code).copied()
}

/// Look up the description for an AAA03 request validation code
pub fn advisory_description(code: &str) -> Option<&'static str> {
    ADVISORY_ERROR_CODES.get(code).copied()
}

/// Look up the meaning of a DTP01 date qualifier
pub fn date_qualifier_meaning(qualifier: &str) -> Option<&'static str> {
    DATE_QUALIFIERS.get(qualifier).copied()
}

/// Look up the meaning of a REF01 reference qualifier
pub fn reference_qualifier_meaning(qualifier: &str) -> Option<&'static str> {
    REFERENCE_QUALIFIERS.get(qualifier).copied()
}

/// Look up the description for an IK304 segment error code
pub fn segment_error_description(code: &str) -> Option<&'static str> {
    SEGMENT_ERROR_CODES.get(code).copied()
}

/// Look up the description for an IK403 element error code
pub fn element_error_description(code: &str) -> Option<&'static str> {
    ELEMENT_ERROR_CODES.get(code).copied()
}

/// Whether an EB01 code represents active coverage
pub fn is_active_status(code: &str) -> bool {
    ACTIVE_STATUS_CODES.contains(&code)
}

/// Whether free text names a known managed care organization
pub fn is_managed_care_text(text: &str) -> bool {
    managed_care_organization(text).is_some()
}

/// The managed care organization named in free text, if any
pub fn managed_care_organization(text: &str) -> Option<&'static str> {
    let upper = text.to_uppercase();
    MANAGED_CARE_ORGANIZATIONS
        .iter()
        .find(|org| upper.contains(*org))
        .copied()
}

/// Whether a payer name identifies the primary fee-for-service payer
pub fn is_primary_payer_name(name: &str) -> bool {
    let upper = name.to_uppercase();
    PRIMARY_PAYER_TOKENS.iter().any(|token| upper.contains(token))
}

/// Whether plan text names the targeted adult eligibility group
pub fn is_targeted_program(text: &str) -> bool {
    text.to_uppercase().contains(TARGETED_PROGRAM_MARKER)
}

/// Whether plan text belongs to a transportation carve-out vendor
///
/// Transportation brokers show up in 271 responses with their own plan
/// rows and must not be mistaken for the member's medical plan.
pub fn is_transportation_vendor(text: &str) -> bool {
    text.to_uppercase().contains(TRANSPORTATION_MARKER)
}

/// Map recognized plan text to the qualifying program it names
pub fn qualifying_program(text: &str) -> Option<&'static str> {
    let upper = text.to_uppercase();
    if upper.contains("TARGETED ADULT") {
        Some("Targeted Adult Medicaid")
    } else if upper.contains("TRADITIONAL") {
        Some("Traditional Medicaid")
    } else {
        None
    }
}
