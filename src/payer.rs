/*!
 * Payer profile registry
 *
 * Each profile captures everything payer-specific about building a 270:
 * routing identifiers for production and test, the payer name as it must
 * appear in NM1, the benefit service type codes to request, and the field
 * policy describing which optional segments this payer's front end
 * tolerates. Keeping payer quirks here as data means adding a payer never
 * touches the builder.
 */

use std::collections::HashMap;
use lazy_static::lazy_static;
use serde::{Serialize, Deserialize};

use crate::data_types::{Environment, Gender};
use crate::error::{EdiError, Result};

/// How the TRN trace segment is emitted for a payer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceForm {
    /// TRN with a generated trace number and the NPI as originator
    Full,
    /// TRN carrying only the interchange control number
    Minimal,
    /// No TRN segment at all
    Omitted,
}

/// How the information receiver NM1 is emitted for a payer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderForm {
    /// Name plus XX qualifier and NPI
    WithNpi,
    /// Organization name only, no identifier pair
    Bare,
}

/// Optional-segment policy for one payer's 270s
///
/// Some payer front ends reject inquiries carrying segments they consider
/// "not used", so the builder consults this instead of hardcoding one
/// transaction shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPolicy {
    pub trace: TraceForm,
    pub provider: ProviderForm,
    /// ISA14 acknowledgment requested flag
    pub ack_requested: bool,
}

impl Default for FieldPolicy {
    fn default() -> Self {
        Self {
            trace: TraceForm::Full,
            provider: ProviderForm::WithNpi,
            ack_requested: true,
        }
    }
}

/// Everything payer-specific needed to build and route a 270 inquiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayerProfile {
    /// Registry key, uppercase
    pub key: String,
    /// Human-readable payer name
    pub name: String,
    /// Payer's claim system identifier
    pub payer_id: String,
    /// Payer name as transmitted in NM1*PR
    pub payer_name: String,
    /// Short payer code used by some clearinghouse directories
    pub payer_code: String,
    /// Production receiver ID (ISA08/GS03 destination)
    pub receiver_id: String,
    /// Test environment receiver ID, when the payer has one
    pub test_receiver_id: Option<String>,
    /// EQ service type codes to request
    pub benefit_codes: Vec<String>,
    /// NM1*IL member identifier qualifier
    pub identifier_qualifier: String,
    /// Whether inquiries without a member ID usually fail for this payer
    pub requires_member_id: bool,
    /// Gender submitted when the query does not carry a usable code
    pub default_gender: Gender,
    pub policy: FieldPolicy,
}

impl PayerProfile {
    /// Receiver ID for the requested environment
    ///
    /// Falls back to the production receiver when the payer has no test
    /// route, logging the substitution.
    pub fn receiver_for(&self, environment: Environment) -> &str {
        match environment {
            Environment::Production => &self.receiver_id,
            Environment::Test => match &self.test_receiver_id {
                Some(test_id) => test_id,
                None => {
                    tracing::warn!(
                        payer = %self.key,
                        receiver = %self.receiver_id,
                        "no test receiver configured, using production receiver"
                    );
                    &self.receiver_id
                }
            },
        }
    }

    /// Check that the routing fields required to build a 270 are present
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.payer_id.is_empty() {
            missing.push("payer_id");
        }
        if self.payer_name.is_empty() {
            missing.push("payer_name");
        }
        if self.receiver_id.is_empty() {
            missing.push("receiver_id");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(EdiError::Configuration {
                message: format!(
                    "payer profile '{}' is missing required fields: {}",
                    self.key,
                    missing.join(", ")
                ),
                suggestion: Some(
                    "Populate the missing identifiers before sending inquiries to this payer"
                        .to_string(),
                ),
            })
        }
    }
}

lazy_static! {
    static ref REGISTRY: HashMap<&'static str, PayerProfile> = build_registry();
}

fn build_registry() -> HashMap<&'static str, PayerProfile> {
    let mut registry = HashMap::new();

    registry.insert(
        "UTAH_MEDICAID",
        PayerProfile {
            key: "UTAH_MEDICAID".to_string(),
            name: "Utah Medicaid FFS".to_string(),
            payer_id: "HT000004-001".to_string(),
            payer_name: "UTAH MEDICAID FFS".to_string(),
            payer_code: "UTMCD".to_string(),
            receiver_id: "HT000004-001".to_string(),
            test_receiver_id: Some("HT000004-003".to_string()),
            benefit_codes: vec!["30".to_string()],
            identifier_qualifier: "MI".to_string(),
            requires_member_id: false,
            default_gender: Gender::Male,
            policy: FieldPolicy::default(),
        },
    );

    registry.insert(
        "U_OF_U_HEALTH",
        PayerProfile {
            key: "U_OF_U_HEALTH".to_string(),
            name: "U of U Health Plans".to_string(),
            payer_id: "SX155".to_string(),
            payer_name: "U OF U HEALTH PLANS".to_string(),
            payer_code: "SX155".to_string(),
            receiver_id: "HT000179-002".to_string(),
            test_receiver_id: None,
            benefit_codes: vec!["30".to_string(), "48".to_string(), "AL".to_string()],
            identifier_qualifier: "MI".to_string(),
            requires_member_id: true,
            default_gender: Gender::Male,
            policy: FieldPolicy::default(),
        },
    );

    registry.insert(
        "SELECTHEALTH",
        PayerProfile {
            key: "SELECTHEALTH".to_string(),
            name: "SelectHealth".to_string(),
            payer_id: "SX062".to_string(),
            payer_name: "SELECTHEALTH".to_string(),
            payer_code: "SX062".to_string(),
            receiver_id: "SX062".to_string(),
            test_receiver_id: None,
            benefit_codes: vec!["30".to_string(), "48".to_string()],
            identifier_qualifier: "MI".to_string(),
            requires_member_id: true,
            default_gender: Gender::Male,
            // Commercial front end rejects inquiries with originator trace data
            policy: FieldPolicy {
                trace: TraceForm::Minimal,
                provider: ProviderForm::WithNpi,
                ack_requested: false,
            },
        },
    );

    registry.insert(
        "MOLINA",
        PayerProfile {
            key: "MOLINA".to_string(),
            name: "Molina Healthcare of Utah".to_string(),
            payer_id: "MOLNA".to_string(),
            payer_name: "MOLINA HEALTHCARE OF UTAH".to_string(),
            payer_code: "MOLNA".to_string(),
            receiver_id: "MOLNA".to_string(),
            test_receiver_id: None,
            benefit_codes: vec!["30".to_string()],
            identifier_qualifier: "MI".to_string(),
            requires_member_id: false,
            default_gender: Gender::Male,
            policy: FieldPolicy::default(),
        },
    );

    registry.insert(
        "ANTHEM_BCBS",
        PayerProfile {
            key: "ANTHEM_BCBS".to_string(),
            name: "Anthem BCBS".to_string(),
            payer_id: "SX107".to_string(),
            payer_name: "ANTHEM BCBS".to_string(),
            payer_code: "SX107".to_string(),
            receiver_id: "SX107".to_string(),
            test_receiver_id: None,
            benefit_codes: vec!["30".to_string(), "48".to_string()],
            identifier_qualifier: "MI".to_string(),
            requires_member_id: true,
            default_gender: Gender::Male,
            policy: FieldPolicy {
                trace: TraceForm::Minimal,
                provider: ProviderForm::WithNpi,
                ack_requested: false,
            },
        },
    );

    registry
}

/// Look up a payer profile by registry key, case-insensitive
pub fn get_payer(key: &str) -> Option<&'static PayerProfile> {
    REGISTRY.get(key.to_uppercase().as_str())
}

/// Look up a payer profile by payer ID or receiver ID
pub fn get_payer_by_id(id: &str) -> Option<&'static PayerProfile> {
    REGISTRY
        .values()
        .find(|p| p.payer_id == id || p.receiver_id == id)
}

/// All registry keys, sorted
pub fn payer_keys() -> Vec<String> {
    let mut keys: Vec<String> = REGISTRY.keys().map(|k| k.to_string()).collect();
    keys.sort();
    keys
}

/// (key, display name) pairs for every registered payer, sorted by key
pub fn list_payers() -> Vec<(String, String)> {
    let mut payers: Vec<(String, String)> = REGISTRY
        .values()
        .map(|p| (p.key.clone(), p.name.clone()))
        .collect();
    payers.sort();
    payers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contents() {
        assert_eq!(payer_keys().len(), 5);

        let utah = get_payer("UTAH_MEDICAID").unwrap();
        assert_eq!(utah.payer_id, "HT000004-001");
        assert_eq!(utah.payer_name, "UTAH MEDICAID FFS");
        assert_eq!(utah.benefit_codes, vec!["30"]);
        assert!(!utah.requires_member_id);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert!(get_payer("utah_medicaid").is_some());
        assert!(get_payer("SelectHealth").is_some());
        assert!(get_payer("AETNA").is_none());
    }

    #[test]
    fn test_lookup_by_id() {
        assert_eq!(get_payer_by_id("SX155").unwrap().key, "U_OF_U_HEALTH");
        assert_eq!(get_payer_by_id("HT000004-001").unwrap().key, "UTAH_MEDICAID");
        assert!(get_payer_by_id("XXXXX").is_none());
    }

    #[test]
    fn test_receiver_environment_routing() {
        let utah = get_payer("UTAH_MEDICAID").unwrap();
        assert_eq!(utah.receiver_for(Environment::Production), "HT000004-001");
        assert_eq!(utah.receiver_for(Environment::Test), "HT000004-003");

        // No test route configured: falls back to production
        let uofu = get_payer("U_OF_U_HEALTH").unwrap();
        assert_eq!(uofu.receiver_for(Environment::Test), "HT000179-002");
    }

    #[test]
    fn test_profile_validation() {
        let utah = get_payer("UTAH_MEDICAID").unwrap();
        assert!(utah.validate().is_ok());

        let mut broken = utah.clone();
        broken.payer_id.clear();
        broken.receiver_id.clear();
        let err = broken.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("payer_id"));
        assert!(message.contains("receiver_id"));
    }

    #[test]
    fn test_list_payers_sorted() {
        let payers = list_payers();
        assert_eq!(payers.len(), 5);
        assert_eq!(payers[0].0, "ANTHEM_BCBS");
        assert!(payers.iter().any(|(k, _)| k == "MOLINA"));
    }

    #[test]
    fn test_field_policy_defaults() {
        let policy = FieldPolicy::default();
        assert_eq!(policy.trace, TraceForm::Full);
        assert_eq!(policy.provider, ProviderForm::WithNpi);
        assert!(policy.ack_requested);

        let selecthealth = get_payer("SELECTHEALTH").unwrap();
        assert_eq!(selecthealth.policy.trace, TraceForm::Minimal);
        assert!(!selecthealth.policy.ack_requested);
    }
}
