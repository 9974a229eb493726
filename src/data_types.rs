/*!
 * Core data types for eligibility transactions
 *
 * Defines the domain types exchanged across the library: patient queries,
 * routing context, the parsed 271 verdict and its component identities,
 * plus validated wrappers like `Npi`.
 */

use std::fmt;
use chrono::NaiveDate;
use serde::{Serialize, Deserialize};

use crate::codes;
use crate::error::{EdiError, Result};

/// Date formats accepted for patient birth dates and service dates
pub const ACCEPTED_DATE_FORMATS: &[&str] = &["%Y%m%d", "%Y-%m-%d", "%m/%d/%Y"];

/// National Provider Identifier with validation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Npi(String);

impl Npi {
    /// Create a new NPI with validation
    pub fn new(npi: String) -> Result<Self> {
        if npi.len() == 10 && npi.chars().all(|c| c.is_ascii_digit()) {
            Ok(Npi(npi))
        } else {
            Err(EdiError::invalid_npi(&npi))
        }
    }

    /// Get the NPI as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Npi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscriber gender codes carried in the DMG segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Parse from an X12 gender code
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            _ => None,
        }
    }

    /// Convert to the X12 gender code
    pub fn as_code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
        }
    }
}

/// Which clearinghouse environment an inquiry is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Test,
}

impl Environment {
    /// ISA15 usage indicator for this environment
    pub fn usage_indicator(&self) -> &'static str {
        match self {
            Environment::Production => "P",
            Environment::Test => "T",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Test => write!(f, "test"),
        }
    }
}

/// Clearinghouse account credentials
///
/// The password never appears in `Debug` output, so contexts and configs
/// holding credentials can be logged safely.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Whether both fields are populated
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Patient fields for a single eligibility inquiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientQuery {
    pub first_name: String,
    pub last_name: String,
    /// Birth date in any of [`ACCEPTED_DATE_FORMATS`]
    pub date_of_birth: String,
    pub gender: Option<String>,
    pub member_id: Option<String>,
    /// Service date for the inquiry, defaults to today when absent
    pub service_date: Option<NaiveDate>,
}

impl PatientQuery {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        date_of_birth: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            date_of_birth: date_of_birth.into(),
            gender: None,
            member_id: None,
            service_date: None,
        }
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_member_id(mut self, member_id: impl Into<String>) -> Self {
        self.member_id = Some(member_id.into());
        self
    }

    pub fn with_service_date(mut self, service_date: NaiveDate) -> Self {
        self.service_date = Some(service_date);
        self
    }

    /// Patient name for logs and progress reporting
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Parse a date in any of the accepted formats
///
/// Rejects values that match a format's shape but are not real calendar
/// dates, such as `20240230`.
pub fn parse_flexible_date(value: &str) -> Result<NaiveDate> {
    for format in ACCEPTED_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date);
        }
    }
    Err(EdiError::invalid_date(value))
}

/// Routing and identification fields shared by every inquiry to one payer
///
/// Assembled from [`ClientConfig`](crate::config::ClientConfig) and a
/// [`PayerProfile`](crate::payer::PayerProfile) before building a 270.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionContext {
    /// Submitter's trading partner number (ISA06/GS02 sender)
    pub trading_partner: String,
    /// Destination receiver ID for the selected environment (ISA08/GS03)
    pub receiver_id: String,
    pub provider_npi: Npi,
    /// Provider last name, or organization name when no first name is set
    pub provider_last_name: String,
    pub provider_first_name: Option<String>,
    pub environment: Environment,
    pub credentials: Credentials,
}

impl TransactionContext {
    /// Whether the provider is submitted as an individual (entity type 1)
    pub fn provider_is_individual(&self) -> bool {
        self.provider_first_name.is_some()
    }
}

/// One EB benefit row from a 271 response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenefitDetail {
    /// Raw EB01 code
    pub status_code: String,
    /// Decoded status description
    pub status: String,
    pub coverage_level: Option<String>,
    /// Service type codes from EB03, split on the repetition separator
    pub service_types: Vec<String>,
    pub insurance_type: Option<String>,
    pub plan_description: Option<String>,
}

impl BenefitDetail {
    /// Whether this benefit row indicates active coverage
    pub fn is_active(&self) -> bool {
        codes::is_active_status(&self.status_code) || self.status.contains("Active")
    }
}

/// Outcome classification for a parsed 271 response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoverageClass {
    /// Active traditional fee-for-service coverage in a qualifying program
    QualifyingTraditional,
    /// Active coverage administered by a managed care organization
    ManagedCare,
    /// No active coverage found
    NotEligible,
    /// Active coverage with the primary payer, program undetermined
    #[default]
    NeedsReview,
    /// Active coverage with some other payer
    WrongPayer,
}

impl CoverageClass {
    /// One-line description of the classification
    pub fn description(&self) -> &'static str {
        match self {
            CoverageClass::QualifyingTraditional => {
                "Traditional fee-for-service coverage in a qualifying program"
            }
            CoverageClass::ManagedCare => "Coverage administered by a managed care organization",
            CoverageClass::NotEligible => "No active coverage",
            CoverageClass::NeedsReview => {
                "Primary payer coverage found but the program could not be identified"
            }
            CoverageClass::WrongPayer => "Coverage is not with the expected primary payer",
        }
    }
}

impl fmt::Display for CoverageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CoverageClass::QualifyingTraditional => "qualifying-traditional",
            CoverageClass::ManagedCare => "managed-care",
            CoverageClass::NotEligible => "not-eligible",
            CoverageClass::NeedsReview => "needs-review",
            CoverageClass::WrongPayer => "wrong-payer",
        };
        write!(f, "{}", label)
    }
}

/// Patient identity echoed back in a 271 response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientIdentity {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub id_qualifier: Option<String>,
    pub member_id: Option<String>,
    pub address: Option<MailingAddress>,
}

impl PatientIdentity {
    /// Patient name as "First Last", skipping missing parts
    pub fn display_name(&self) -> String {
        let mut parts = Vec::new();
        if let Some(first) = self.first_name.as_deref() {
            if !first.is_empty() {
                parts.push(first);
            }
        }
        if let Some(last) = self.last_name.as_deref() {
            if !last.is_empty() {
                parts.push(last);
            }
        }
        parts.join(" ")
    }
}

/// Mailing address from 271 N3/N4 segments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MailingAddress {
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

impl MailingAddress {
    /// Format as a single line
    pub fn format_single_line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(line_1) = &self.address_line_1 {
            parts.push(line_1.clone());
        }
        if let Some(line_2) = &self.address_line_2 {
            parts.push(line_2.clone());
        }
        let mut city_state_zip = Vec::new();
        if let Some(city) = &self.city {
            city_state_zip.push(city.clone());
        }
        if let Some(state) = &self.state {
            city_state_zip.push(state.clone());
        }
        if let Some(zip) = &self.postal_code {
            city_state_zip.push(zip.clone());
        }
        if !city_state_zip.is_empty() {
            parts.push(city_state_zip.join(", "));
        }
        parts.join(", ")
    }

    /// Whether no component is populated
    pub fn is_empty(&self) -> bool {
        self.address_line_1.is_none()
            && self.address_line_2.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
    }
}

/// Payer identity from the 271 information source loop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayerIdentity {
    pub name: Option<String>,
    pub id_qualifier: Option<String>,
    pub payer_id: Option<String>,
    /// Whether the name matched the expected primary fee-for-service payer
    pub is_primary: bool,
    pub telephone: Option<String>,
}

/// Provider identity echoed back in a 271 response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub npi: Option<String>,
}

/// A decoded DTP date from a 271 response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDate {
    /// Raw DTP01 qualifier
    pub qualifier: String,
    /// Decoded qualifier meaning, when the qualifier is recognized
    pub meaning: Option<String>,
    /// Raw DTP03 value as transmitted
    pub raw: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// An auxiliary plan identifier from a 271 REF segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReference {
    pub qualifier: String,
    pub meaning: String,
    pub value: String,
}

/// Plan-level facts accumulated while walking a 271 response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanInfo {
    /// Qualifying program named in plan text, when recognized
    pub program: Option<String>,
    /// Plan type derived from EB04 insurance type codes
    pub plan_type: Option<String>,
    /// Managed care organization named in plan or payer text
    pub managed_care_organization: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub termination_date: Option<NaiveDate>,
    pub dates: Vec<PlanDate>,
    pub references: Vec<PlanReference>,
}

/// One AAA request validation entry from a 271 response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryError {
    pub code: String,
    pub description: String,
}

/// Interchange envelope fields from the 271 ISA segment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterchangeInfo {
    pub sender_id: Option<String>,
    pub receiver_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub control_number: Option<String>,
}

/// Transaction set fields from the 271 ST and BHT segments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub transaction_type: Option<String>,
    pub control_number: Option<String>,
    pub purpose: Option<String>,
    pub reference: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

/// Complete classified result of one eligibility check
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    /// Whether the response carried benefit information and no AAA errors
    pub success: bool,
    pub has_active_coverage: bool,
    pub classification: CoverageClass,
    /// Whether plan text named the targeted adult eligibility group
    pub targeted_program_member: bool,
    /// Whether the member qualifies for program enrollment
    pub qualifies_for_program: bool,
    pub patient: PatientIdentity,
    pub payer: PayerIdentity,
    pub provider: ProviderIdentity,
    pub plan: PlanInfo,
    pub benefits: Vec<BenefitDetail>,
    pub errors: Vec<AdvisoryError>,
    pub warnings: Vec<String>,
    pub interchange: InterchangeInfo,
    pub transaction: TransactionInfo,
    /// Plain-language outcome sentence
    pub summary: String,
}

impl EligibilityVerdict {
    /// Whether a human should look at this response before acting on it
    pub fn needs_review(&self) -> bool {
        self.classification == CoverageClass::NeedsReview
    }

    /// Whether the member qualifies for program enrollment
    pub fn is_qualifying(&self) -> bool {
        self.qualifies_for_program
    }

    /// Render a formatted report suitable for terminal display
    pub fn format_report(&self) -> String {
        let divider = "=".repeat(60);
        let mut lines = Vec::new();

        lines.push(divider.clone());
        lines.push("ELIGIBILITY RESPONSE".to_string());
        lines.push(divider.clone());

        lines.push(String::new());
        lines.push("PATIENT:".to_string());
        let name = self.patient.display_name();
        if !name.is_empty() {
            lines.push(format!("  Name: {}", name));
        }
        if let Some(member_id) = &self.patient.member_id {
            lines.push(format!("  Member ID: {}", member_id));
        }
        if let Some(address) = &self.patient.address {
            if !address.is_empty() {
                lines.push(format!("  Address: {}", address.format_single_line()));
            }
        }

        if self.payer.name.is_some() || self.payer.payer_id.is_some() {
            lines.push(String::new());
            lines.push("PAYER:".to_string());
            if let Some(payer_name) = &self.payer.name {
                lines.push(format!("  Name: {}", payer_name));
            }
            if let Some(payer_id) = &self.payer.payer_id {
                lines.push(format!("  ID: {}", payer_id));
            }
            if let Some(phone) = &self.payer.telephone {
                lines.push(format!("  Phone: {}", phone));
            }
        }

        lines.push(String::new());
        lines.push("STATUS:".to_string());
        lines.push(format!(
            "  Active coverage: {}",
            if self.has_active_coverage { "yes" } else { "no" }
        ));
        lines.push(format!("  Classification: {}", self.classification));
        if let Some(program) = &self.plan.program {
            lines.push(format!("  Program: {}", program));
        }
        if let Some(mco) = &self.plan.managed_care_organization {
            lines.push(format!("  Managed care organization: {}", mco));
        }
        lines.push(format!(
            "  Qualifies for program: {}",
            if self.qualifies_for_program { "yes" } else { "no" }
        ));
        if let Some(effective) = &self.plan.effective_date {
            lines.push(format!("  Effective: {}", effective));
        }
        if let Some(termination) = &self.plan.termination_date {
            lines.push(format!("  Terminates: {}", termination));
        }

        if !self.benefits.is_empty() {
            lines.push(String::new());
            lines.push("BENEFITS:".to_string());
            for benefit in &self.benefits {
                lines.push(format!("  - {}", benefit.status));
                if let Some(plan) = &benefit.plan_description {
                    lines.push(format!("    Plan: {}", plan));
                }
                if !benefit.service_types.is_empty() {
                    lines.push(format!("    Services: {}", benefit.service_types.join(", ")));
                }
            }
        }

        if !self.errors.is_empty() {
            lines.push(String::new());
            lines.push("ERRORS:".to_string());
            for error in &self.errors {
                lines.push(format!("  - {}: {}", error.code, error.description));
            }
        }

        if !self.warnings.is_empty() {
            lines.push(String::new());
            lines.push("MESSAGES:".to_string());
            for warning in &self.warnings {
                lines.push(format!("  - {}", warning));
            }
        }

        lines.push(String::new());
        lines.push("SUMMARY:".to_string());
        lines.push(format!("  {}", self.summary));
        lines.push(divider);

        lines.join("\n")
    }
}
