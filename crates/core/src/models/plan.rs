//! Subscription plan tiers

use serde::{Deserialize, Serialize};

/// Subscription tier gating feature visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[default]
    Free,
    /// Paid plan for regular users
    Normal,
    /// Center owner plan, one center
    BusinessStandard,
    /// Center owner plan, featured listing
    BusinessPro,
    /// Time-limited free upgrade
    Trial,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Normal => "normal",
            Plan::BusinessStandard => "business_standard",
            Plan::BusinessPro => "business_pro",
            Plan::Trial => "trial",
        }
    }

    /// Parse a plan name, tolerating case and `-`/space separators.
    ///
    /// Returns `None` for names that are not a known plan.
    pub fn parse(raw: &str) -> Option<Plan> {
        match normalize_plan_name(raw).as_str() {
            "free" => Some(Plan::Free),
            "normal" => Some(Plan::Normal),
            "business_standard" => Some(Plan::BusinessStandard),
            "business_pro" => Some(Plan::BusinessPro),
            "trial" => Some(Plan::Trial),
            _ => None,
        }
    }

    /// Lenient parse used for stored values; unknown names read as free
    pub fn parse_or_free(raw: &str) -> Plan {
        Plan::parse(raw).unwrap_or_default()
    }

    pub fn is_paid(&self) -> bool {
        *self != Plan::Free
    }

    pub fn is_business(&self) -> bool {
        matches!(self, Plan::BusinessStandard | Plan::BusinessPro)
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase and collapse runs of `-`, `_` and whitespace into a single `_`
pub fn normalize_plan_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.trim().chars() {
        if ch == '-' || ch == '_' || ch.is_whitespace() {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.extend(ch.to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_separators() {
        assert_eq!(Plan::parse("Business Pro"), Some(Plan::BusinessPro));
        assert_eq!(Plan::parse("business-pro"), Some(Plan::BusinessPro));
        assert_eq!(Plan::parse("BUSINESS__STANDARD"), Some(Plan::BusinessStandard));
        assert_eq!(Plan::parse("gold"), None);
    }

    #[test]
    fn test_unknown_reads_as_free() {
        assert_eq!(Plan::parse_or_free(""), Plan::Free);
        assert_eq!(Plan::parse_or_free("platinum"), Plan::Free);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Plan::BusinessStandard).unwrap();
        assert_eq!(json, "\"business_standard\"");
    }
}
