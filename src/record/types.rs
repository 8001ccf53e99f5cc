use serde::{Deserialize, Serialize};

use super::lenient;

/// savRuleType: whether the matched rule set is an allowlist or a blocklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
    Allowlist,
    Blocklist,
}

impl RuleType {
    /// Maps a wire code to its variant. Unknown codes yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(RuleType::Allowlist),
            1 => Some(RuleType::Blocklist),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            RuleType::Allowlist => 0,
            RuleType::Blocklist => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RuleType::Allowlist => "Allowlist",
            RuleType::Blocklist => "Blocklist",
        }
    }
}

/// savTargetType: which dimension the validation was keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    InterfaceBased,
    PrefixBased,
}

impl TargetType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TargetType::InterfaceBased),
            1 => Some(TargetType::PrefixBased),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            TargetType::InterfaceBased => 0,
            TargetType::PrefixBased => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TargetType::InterfaceBased => "Interface-Based",
            TargetType::PrefixBased => "Prefix-Based",
        }
    }
}

/// savPolicyAction: what the router did with the offending traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyAction {
    Permit,
    Discard,
    RateLimit,
    Redirect,
}

impl PolicyAction {
    pub const ALL: [PolicyAction; 4] = [
        PolicyAction::Permit,
        PolicyAction::Discard,
        PolicyAction::RateLimit,
        PolicyAction::Redirect,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PolicyAction::Permit),
            1 => Some(PolicyAction::Discard),
            2 => Some(PolicyAction::RateLimit),
            3 => Some(PolicyAction::Redirect),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            PolicyAction::Permit => 0,
            PolicyAction::Discard => 1,
            PolicyAction::RateLimit => 2,
            PolicyAction::Redirect => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PolicyAction::Permit => "Permit",
            PolicyAction::Discard => "Discard",
            PolicyAction::RateLimit => "Rate-limit",
            PolicyAction::Redirect => "Redirect",
        }
    }
}

/// Aggregated (macro) records carry no rule detail; detailed (micro) records
/// list the matched interface/prefix mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Macro,
    Micro,
}

/// One matched rule of a micro record, binding an interface to a source prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    #[serde(alias = "interfaceId", deserialize_with = "lenient::identifier")]
    pub interface_id: u32,
    #[serde(alias = "sourcePrefix")]
    pub prefix: String,
    #[serde(alias = "prefixLength", deserialize_with = "lenient::identifier")]
    pub prefix_length: u8,
    #[serde(default, alias = "isIPv6", alias = "isIpv6")]
    pub is_ipv6: bool,
}

impl Mapping {
    /// Key used by the prefix ranking, e.g. `10.0.0.0/8`.
    pub fn prefix_key(&self) -> String {
        format!("{}/{}", self.prefix, self.prefix_length)
    }
}

/// A single SAV record as received from the backend.
///
/// Enumerated fields keep their raw wire code so that unknown codes survive
/// for display; use [`SavRecord::rule`], [`SavRecord::target`] and
/// [`SavRecord::action`] for the typed view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavRecord {
    #[serde(
        default,
        alias = "recordNumber",
        alias = "recordId",
        deserialize_with = "lenient::counter",
        skip_serializing_if = "Option::is_none"
    )]
    pub record_number: Option<u64>,
    #[serde(
        default,
        alias = "totalRecords",
        deserialize_with = "lenient::counter",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_records: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>,

    #[serde(
        default,
        alias = "ruleType",
        deserialize_with = "lenient::integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub rule_type: Option<i64>,
    #[serde(
        default,
        alias = "ruleTypeName",
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub rule_type_name: Option<String>,
    #[serde(
        default,
        alias = "targetType",
        deserialize_with = "lenient::integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_type: Option<i64>,
    #[serde(
        default,
        alias = "targetTypeName",
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_type_name: Option<String>,
    #[serde(
        default,
        alias = "policyAction",
        deserialize_with = "lenient::integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub policy_action: Option<i64>,
    #[serde(
        default,
        alias = "policyActionName",
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub policy_action_name: Option<String>,

    #[serde(default, alias = "rules", deserialize_with = "lenient::mappings")]
    pub mappings: Vec<Mapping>,

    #[serde(
        default,
        alias = "packetCount",
        deserialize_with = "lenient::counter",
        skip_serializing_if = "Option::is_none"
    )]
    pub packet_count: Option<u64>,
    #[serde(
        default,
        alias = "byteCount",
        deserialize_with = "lenient::counter",
        skip_serializing_if = "Option::is_none"
    )]
    pub byte_count: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub label: Option<String>,
    #[serde(
        default,
        alias = "scenarioName",
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub scenario_name: Option<String>,
}

impl SavRecord {
    pub fn rule(&self) -> Option<RuleType> {
        self.rule_type.and_then(RuleType::from_code)
    }

    pub fn target(&self) -> Option<TargetType> {
        self.target_type.and_then(TargetType::from_code)
    }

    pub fn action(&self) -> Option<PolicyAction> {
        self.policy_action.and_then(PolicyAction::from_code)
    }

    pub fn kind(&self) -> RecordKind {
        if self.mappings.is_empty() {
            RecordKind::Macro
        } else {
            RecordKind::Micro
        }
    }

    /// Display name of the rule type: the source's own string when present,
    /// otherwise derived from the code.
    pub fn rule_name(&self) -> &str {
        self.rule_type_name
            .as_deref()
            .or_else(|| self.rule().map(RuleType::name))
            .unwrap_or("Unknown")
    }

    pub fn action_name(&self) -> &str {
        self.policy_action_name
            .as_deref()
            .or_else(|| self.action().map(PolicyAction::name))
            .unwrap_or("Unknown")
    }
}
