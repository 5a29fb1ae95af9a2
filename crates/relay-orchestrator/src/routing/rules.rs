//! The routing decision table.
//!
//! Routing is an explicit ordered list of (predicate, decision) pairs
//! evaluated top to bottom, first match wins - a data-driven table rather
//! than nested conditionals, so rules are independently testable and
//! reorderable without touching control flow.

use super::types::{Intent, PrivacyLevel, RouteOptions};
use relay_abstraction::{Complexity, ProviderKind, TaskType};

/// The routed model catalog: each family carries a light, default, and deep
/// shape the sub-selection helpers pick from.
pub mod catalog {
    use relay_abstraction::ProviderKind;

    /// OpenAI default capable model.
    pub const GPT_DEFAULT: &str = "gpt-4o";
    /// OpenAI lighter/cheaper model for summarization intents.
    pub const GPT_LIGHT: &str = "gpt-4o-mini";
    /// OpenAI deepest model for high complexity and analysis intents.
    pub const GPT_DEEP: &str = "o1";
    /// Gemini fast/economical model.
    pub const GEMINI_FAST: &str = "gemini-2.0-flash";
    /// Gemini general model.
    pub const GEMINI_PRO: &str = "gemini-1.5-pro";
    /// Perplexity web-grounded model.
    pub const SONAR: &str = "sonar";
    /// Perplexity most-capable web-grounded variant.
    pub const SONAR_PRO: &str = "sonar-pro";

    /// Every routable `(provider, model)` pair; registries are built from this.
    pub const ALL: &[(ProviderKind, &str)] = &[
        (ProviderKind::OpenAi, GPT_DEFAULT),
        (ProviderKind::OpenAi, GPT_LIGHT),
        (ProviderKind::OpenAi, GPT_DEEP),
        (ProviderKind::Gemini, GEMINI_FAST),
        (ProviderKind::Gemini, GEMINI_PRO),
        (ProviderKind::Perplexity, SONAR),
        (ProviderKind::Perplexity, SONAR_PRO),
    ];
}

use catalog::{GEMINI_FAST, GEMINI_PRO, GPT_DEEP, GPT_DEFAULT, GPT_LIGHT, SONAR, SONAR_PRO};

/// Flattened routing inputs a rule predicate inspects.
#[derive(Debug, Clone, Copy)]
pub struct RouteSignals {
    /// Task type resolved for the query.
    pub task_type: TaskType,
    /// Complexity resolved for the query.
    pub complexity: Complexity,
    /// Deep-capability pin.
    pub force_gpt: bool,
    /// Alternate-family pin (comparison mode).
    pub force_alternate: bool,
    /// Privacy posture.
    pub private: bool,
    /// Web-grounding requirement.
    pub requires_web_search: bool,
    /// Caller intent hint.
    pub intent: Option<Intent>,
    /// ICP-development depth flag.
    pub deep: bool,
}

impl RouteSignals {
    /// Builds signals from a query's resolved classification and options.
    #[must_use]
    pub fn new(task_type: TaskType, complexity: Complexity, options: &RouteOptions) -> Self {
        Self {
            task_type,
            complexity,
            force_gpt: options.force_gpt,
            force_alternate: options.force_alternate,
            private: options.privacy_level == PrivacyLevel::Private,
            requires_web_search: options.requires_web_search,
            intent: options.intent,
            deep: options.deep,
        }
    }
}

/// One (predicate, decision) pair in the priority table.
pub struct RoutingRule {
    /// Rule name, surfaced as the decision rationale.
    pub name: &'static str,
    /// Whether the rule fires for these signals.
    pub applies: fn(&RouteSignals) -> bool,
    /// Provider/model the rule selects.
    pub decide: fn(&RouteSignals) -> (ProviderKind, &'static str),
}

fn wants_summary(signals: &RouteSignals) -> bool {
    signals.task_type == TaskType::Summarization
        || signals.intent == Some(Intent::Summarization)
}

fn wants_depth(signals: &RouteSignals) -> bool {
    signals.complexity == Complexity::High
        || matches!(signals.intent, Some(Intent::Analysis | Intent::DeepInfo))
}

/// Sub-selection within the OpenAI family: summarization takes the lighter
/// model, depth takes the deepest, everything else the default capable model.
fn openai_pick(signals: &RouteSignals) -> &'static str {
    if wants_summary(signals) {
        GPT_LIGHT
    } else if wants_depth(signals) {
        GPT_DEEP
    } else {
        GPT_DEFAULT
    }
}

/// Sub-selection within the Gemini family, same shape as `openai_pick`.
fn gemini_pick(signals: &RouteSignals) -> &'static str {
    if wants_summary(signals) { GEMINI_FAST } else { GEMINI_PRO }
}

fn capable_task(signals: &RouteSignals) -> bool {
    matches!(
        signals.task_type,
        TaskType::Research
            | TaskType::CompanyAnalysis
            | TaskType::LeadGeneration
            | TaskType::IcpDevelopment
            | TaskType::Summarization
    ) || matches!(
        signals.intent,
        Some(Intent::Analysis | Intent::DeepInfo | Intent::CompanyInfo)
    ) || signals.complexity == Complexity::High
}

fn capable_decide(signals: &RouteSignals) -> (ProviderKind, &'static str) {
    // ICP development runs on the fast alternate unless flagged deep.
    if signals.task_type == TaskType::IcpDevelopment && !signals.deep {
        (ProviderKind::Gemini, GEMINI_FAST)
    } else {
        (ProviderKind::OpenAi, openai_pick(signals))
    }
}

fn fast_lane(signals: &RouteSignals) -> bool {
    matches!(signals.task_type, TaskType::SimpleChat | TaskType::FastResponse)
        || signals.intent == Some(Intent::Chat)
        || signals.complexity == Complexity::Low
}

/// The priority table. Order is the contract:
/// force-gpt > force-alternate > privacy > web-search > task rules > fast lane > default.
pub const DEFAULT_RULES: &[RoutingRule] = &[
    RoutingRule {
        name: "force-gpt",
        applies: |s| s.force_gpt,
        decide: |s| (ProviderKind::OpenAi, openai_pick(s)),
    },
    RoutingRule {
        name: "force-alternate",
        applies: |s| s.force_alternate,
        decide: |s| (ProviderKind::Gemini, gemini_pick(s)),
    },
    RoutingRule {
        name: "privacy",
        applies: |s| s.private,
        decide: |s| (ProviderKind::Gemini, gemini_pick(s)),
    },
    RoutingRule {
        name: "web-search",
        applies: |s| s.requires_web_search,
        decide: |s| {
            let escalate = s.complexity == Complexity::High
                || matches!(s.intent, Some(Intent::Research | Intent::Analysis));
            (ProviderKind::Perplexity, if escalate { SONAR_PRO } else { SONAR })
        },
    },
    RoutingRule { name: "capable-task", applies: capable_task, decide: capable_decide },
    RoutingRule {
        name: "fast-lane",
        applies: fast_lane,
        decide: |_| (ProviderKind::Gemini, GEMINI_FAST),
    },
    RoutingRule {
        name: "default",
        applies: |_| true,
        decide: |s| {
            if s.complexity == Complexity::Medium {
                (ProviderKind::Gemini, GEMINI_PRO)
            } else {
                (ProviderKind::OpenAi, GPT_DEFAULT)
            }
        },
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(task_type: TaskType, complexity: Complexity) -> RouteSignals {
        RouteSignals::new(task_type, complexity, &RouteOptions::default())
    }

    fn first_match(s: &RouteSignals) -> (&'static str, ProviderKind, &'static str) {
        let rule = DEFAULT_RULES.iter().find(|r| (r.applies)(s)).unwrap();
        let (provider, model) = (rule.decide)(s);
        (rule.name, provider, model)
    }

    #[test]
    fn test_force_gpt_sub_selection() {
        let mut s = signals(TaskType::SimpleChat, Complexity::Low);
        s.force_gpt = true;
        assert_eq!(first_match(&s), ("force-gpt", ProviderKind::OpenAi, GPT_DEFAULT));

        s.task_type = TaskType::Summarization;
        assert_eq!(first_match(&s).2, GPT_LIGHT);

        s.task_type = TaskType::SimpleChat;
        s.complexity = Complexity::High;
        assert_eq!(first_match(&s).2, GPT_DEEP);

        s.complexity = Complexity::Low;
        s.intent = Some(Intent::DeepInfo);
        assert_eq!(first_match(&s).2, GPT_DEEP);
    }

    #[test]
    fn test_privacy_routes_to_gemini_family() {
        let mut s = signals(TaskType::Research, Complexity::Medium);
        s.private = true;
        assert_eq!(first_match(&s), ("privacy", ProviderKind::Gemini, GEMINI_PRO));

        s.intent = Some(Intent::Summarization);
        assert_eq!(first_match(&s).2, GEMINI_FAST);
    }

    #[test]
    fn test_web_search_escalation() {
        let mut s = signals(TaskType::Research, Complexity::Medium);
        s.requires_web_search = true;
        assert_eq!(first_match(&s), ("web-search", ProviderKind::Perplexity, SONAR));

        s.complexity = Complexity::High;
        assert_eq!(first_match(&s).2, SONAR_PRO);

        s.complexity = Complexity::Medium;
        s.intent = Some(Intent::Research);
        assert_eq!(first_match(&s).2, SONAR_PRO);
    }

    #[test]
    fn test_priority_force_gpt_beats_everything() {
        let mut s = signals(TaskType::SimpleChat, Complexity::Low);
        s.force_gpt = true;
        s.force_alternate = true;
        s.private = true;
        s.requires_web_search = true;
        assert_eq!(first_match(&s).0, "force-gpt");
    }

    #[test]
    fn test_priority_privacy_beats_web_search() {
        let mut s = signals(TaskType::SimpleChat, Complexity::Low);
        s.private = true;
        s.requires_web_search = true;
        assert_eq!(first_match(&s).0, "privacy");
    }

    #[test]
    fn test_priority_web_search_beats_task_rules() {
        let mut s = signals(TaskType::Research, Complexity::High);
        s.requires_web_search = true;
        assert_eq!(first_match(&s).0, "web-search");
    }

    #[test]
    fn test_capable_task_research_default_model() {
        let s = signals(TaskType::Research, Complexity::Low);
        assert_eq!(first_match(&s), ("capable-task", ProviderKind::OpenAi, GPT_DEFAULT));
    }

    #[test]
    fn test_icp_development_prefers_fast_alternate_unless_deep() {
        let mut s = signals(TaskType::IcpDevelopment, Complexity::Medium);
        assert_eq!(first_match(&s), ("capable-task", ProviderKind::Gemini, GEMINI_FAST));

        s.deep = true;
        assert_eq!(first_match(&s), ("capable-task", ProviderKind::OpenAi, GPT_DEFAULT));
    }

    #[test]
    fn test_high_complexity_hits_capable_rule() {
        let s = signals(TaskType::FastResponse, Complexity::High);
        assert_eq!(first_match(&s), ("capable-task", ProviderKind::OpenAi, GPT_DEEP));
    }

    #[test]
    fn test_fast_lane_for_simple_chat() {
        let s = signals(TaskType::SimpleChat, Complexity::Low);
        assert_eq!(first_match(&s), ("fast-lane", ProviderKind::Gemini, GEMINI_FAST));
    }

    #[test]
    fn test_default_rule_medium_vs_other() {
        // Every task type is absorbed by an earlier rule, so the catch-all is
        // exercised directly: it must split medium to the alternate general
        // model and everything else to the capable general model.
        let default_rule = DEFAULT_RULES.last().unwrap();
        assert_eq!(default_rule.name, "default");

        let medium = signals(TaskType::SimpleChat, Complexity::Medium);
        assert!((default_rule.applies)(&medium));
        assert_eq!((default_rule.decide)(&medium), (ProviderKind::Gemini, GEMINI_PRO));

        let high = signals(TaskType::SimpleChat, Complexity::High);
        assert_eq!((default_rule.decide)(&high), (ProviderKind::OpenAi, GPT_DEFAULT));
    }

    #[test]
    fn test_table_always_matches() {
        for task_type in [
            TaskType::Research,
            TaskType::CompanyAnalysis,
            TaskType::LeadGeneration,
            TaskType::IcpDevelopment,
            TaskType::Summarization,
            TaskType::SimpleChat,
            TaskType::FastResponse,
        ] {
            for complexity in [Complexity::Low, Complexity::Medium, Complexity::High] {
                let s = signals(task_type, complexity);
                assert!(DEFAULT_RULES.iter().any(|r| (r.applies)(&s)));
            }
        }
    }
}
