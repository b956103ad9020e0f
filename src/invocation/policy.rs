//! Write policy: the write guard, the dangerous guard and the strict allow-list.
//!
//! ```text
//!   behaviorClass ∈ {read, unknown}      → allow
//!   allowWrite == false                  → blocked
//!   dangerous && !allow_dangerous        → blocked
//!   strict && name ∉ strict allow-list   → blocked
//! ```
//!
//! Every failing check contributes a reason; the decision lists all of them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capabilities::{BehaviorClass, CapabilitySymbol};
use crate::config::PolicyConfig;

/// How strictly write-capable symbols are gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    Permissive,
    #[default]
    Strict,
}

impl PolicyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::Strict => "strict",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "permissive" => Some(Self::Permissive),
            _ => None,
        }
    }

    /// Mode in effect when a caller requests `requested`: callers may
    /// tighten the configured mode, never loosen it.
    pub fn effective(self, requested: Option<PolicyMode>) -> PolicyMode {
        requested.map_or(self, |r| r.max(self))
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allow or blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Blocked,
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDecision {
    pub decision: Decision,
    pub reasons: Vec<String>,
    pub mode: PolicyMode,
    pub behavior_class: BehaviorClass,
    pub write_guarded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowlisted: Option<bool>,
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        self.decision == Decision::Allow
    }
}

/// Evaluates symbols against the configured write policy.
#[derive(Debug, Clone)]
pub struct WritePolicy {
    mode: PolicyMode,
    allow_dangerous: bool,
    strict_allowlist: Vec<Regex>,
}

impl WritePolicy {
    pub fn from_config(config: &PolicyConfig) -> Result<Self, regex::Error> {
        let strict_allowlist = config
            .strict_allowlist
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            mode: config.mode,
            allow_dangerous: config.allow_dangerous,
            strict_allowlist,
        })
    }

    /// Configured mode.
    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    pub fn is_allowlisted(&self, symbol_name: &str) -> bool {
        self.strict_allowlist.iter().any(|re| re.is_match(symbol_name))
    }

    /// Evaluate one call of `symbol`.
    pub fn evaluate(
        &self,
        symbol: &CapabilitySymbol,
        allow_write: bool,
        requested_mode: Option<PolicyMode>,
    ) -> PolicyDecision {
        let mode = self.mode.effective(requested_mode);
        let class = symbol.behavior_class;

        if !class.requires_write_guard() {
            return PolicyDecision {
                decision: Decision::Allow,
                reasons: Vec::new(),
                mode,
                behavior_class: class,
                write_guarded: false,
                allowlisted: None,
            };
        }

        let mut reasons = Vec::new();
        if !allow_write {
            reasons.push(format!(
                "'{}' is classified {}; set allowWrite=true to permit writes",
                symbol.name, class
            ));
        }
        if class == BehaviorClass::Dangerous && !self.allow_dangerous {
            reasons.push(format!(
                "'{}' is classified dangerous; enable DISCORD_MANAGE_ALLOW_DANGEROUS to permit it",
                symbol.name
            ));
        }
        let allowlisted = self.is_allowlisted(&symbol.name);
        if mode == PolicyMode::Strict && !allowlisted {
            reasons.push(format!(
                "strict policy mode: '{}' is not on the write allow-list",
                symbol.name
            ));
        }

        PolicyDecision {
            decision: if reasons.is_empty() {
                Decision::Allow
            } else {
                Decision::Blocked
            },
            reasons,
            mode,
            behavior_class: class,
            write_guarded: true,
            allowlisted: Some(allowlisted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{SymbolKind, SymbolOrigin};

    fn symbol(name: &str, class: BehaviorClass) -> CapabilitySymbol {
        CapabilitySymbol {
            name: name.to_string(),
            kind: SymbolKind::Function,
            package: "discord".to_string(),
            origin: SymbolOrigin::Runtime,
            behavior_class: class,
            invokable: true,
            operation_key: format!("discord::{}", name),
            docs_path: None,
            declared_on: None,
            alias_of: None,
            params: Vec::new(),
            description: None,
        }
    }

    fn policy(mode: PolicyMode, allow_dangerous: bool) -> WritePolicy {
        WritePolicy::from_config(&PolicyConfig {
            mode,
            allow_dangerous,
            ..PolicyConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_write_without_allow_write_blocked_in_every_mode() {
        let send = symbol("TextChannel#send", BehaviorClass::Write);
        for mode in [PolicyMode::Strict, PolicyMode::Permissive] {
            let decision = policy(mode, false).evaluate(&send, false, None);
            assert_eq!(decision.decision, Decision::Blocked);
            assert!(decision.reasons[0].contains("allowWrite"));
        }
    }

    #[test]
    fn test_strict_requires_allowlist_permissive_does_not() {
        let send = symbol("TextChannel#send", BehaviorClass::Write);
        let strict = policy(PolicyMode::Strict, false).evaluate(&send, true, None);
        assert!(!strict.is_allowed());
        assert_eq!(strict.reasons.len(), 1);
        assert!(strict.reasons[0].contains("allow-list"));

        let permissive = policy(PolicyMode::Permissive, false).evaluate(&send, true, None);
        assert!(permissive.is_allowed());
    }

    #[test]
    fn test_allowlisted_builder_allowed_in_strict() {
        let set_title = symbol("EmbedBuilder#setTitle", BehaviorClass::Write);
        let decision = policy(PolicyMode::Strict, false).evaluate(&set_title, true, None);
        assert!(decision.is_allowed());
        assert_eq!(decision.allowlisted, Some(true));
    }

    #[test]
    fn test_dangerous_needs_override() {
        let ban = symbol("GuildMember#ban", BehaviorClass::Dangerous);
        let blocked = policy(PolicyMode::Permissive, false).evaluate(&ban, true, None);
        assert!(blocked.reasons.iter().any(|r| r.contains("dangerous")));

        let allowed = policy(PolicyMode::Permissive, true).evaluate(&ban, true, None);
        assert!(allowed.is_allowed());
    }

    #[test]
    fn test_reasons_accumulate() {
        let ban = symbol("GuildMember#ban", BehaviorClass::Dangerous);
        let decision = policy(PolicyMode::Strict, false).evaluate(&ban, false, None);
        assert_eq!(decision.reasons.len(), 3);
    }

    #[test]
    fn test_callers_cannot_loosen_mode() {
        let send = symbol("TextChannel#send", BehaviorClass::Write);
        let strict = policy(PolicyMode::Strict, false);
        let decision = strict.evaluate(&send, true, Some(PolicyMode::Permissive));
        assert_eq!(decision.mode, PolicyMode::Strict);
        assert!(!decision.is_allowed());

        let permissive = policy(PolicyMode::Permissive, false);
        let tightened = permissive.evaluate(&send, true, Some(PolicyMode::Strict));
        assert_eq!(tightened.mode, PolicyMode::Strict);
        assert!(!tightened.is_allowed());
    }

    #[test]
    fn test_read_and_unknown_never_guarded() {
        let p = policy(PolicyMode::Strict, false);
        assert!(p.evaluate(&symbol("Guild#fetch", BehaviorClass::Read), false, None).is_allowed());
        assert!(p.evaluate(&symbol("bold", BehaviorClass::Unknown), false, None).is_allowed());
    }
}
