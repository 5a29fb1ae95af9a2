//! Heuristic task classification for routing.
//!
//! Deterministic and explainable keyword/length heuristics, not a
//! model-backed classifier - easy to fool with adversarial phrasing, which
//! is an accepted trade-off. Classification never fails; when nothing
//! matches, the result is a best-effort default, not an error.

use relay_abstraction::{Complexity, TaskType};
use tracing::debug;

/// Keywords signalling open-ended information gathering.
const RESEARCH_KEYWORDS: &[&str] =
    &["research", "find information", "latest", "trends", "state of the art", "what is new"];

/// Keywords signalling company/market analysis.
const COMPANY_KEYWORDS: &[&str] =
    &["company", "competitor", "business model", "market position", "funding", "acquisition"];

/// Keywords signalling lead generation work.
const LEAD_KEYWORDS: &[&str] =
    &["lead", "prospect", "outreach", "contact list", "pipeline", "qualify"];

/// Keywords signalling ideal-customer-profile development.
const ICP_KEYWORDS: &[&str] =
    &["icp", "ideal customer", "customer profile", "persona", "target segment"];

/// Keywords signalling the caller wants depth regardless of query length.
const DEPTH_KEYWORDS: &[&str] =
    &["comprehensive", "detailed", "in-depth", "thorough", "deep dive", "exhaustive"];

/// Word-count ceiling below which a query is low complexity.
const LOW_WORD_COUNT: usize = 10;
/// Word-count floor above which a query is high complexity.
const HIGH_WORD_COUNT: usize = 30;

/// Inferred task type and complexity for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryProfile {
    /// Best-effort task type (defaults to simple-chat).
    pub task_type: TaskType,
    /// Best-effort complexity tier (defaults to medium).
    pub complexity: Complexity,
}

/// Keyword/length classifier for raw query text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskClassifier;

impl TaskClassifier {
    /// Creates a classifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Infers task type and complexity from raw query text.
    #[must_use]
    pub fn analyze(&self, query: &str) -> QueryProfile {
        let task_type = Self::classify_task(query);
        let complexity = Self::classify_complexity(query);

        debug!(
            task_type = %task_type,
            complexity = %complexity,
            word_count = query.split_whitespace().count(),
            "Classified query"
        );

        QueryProfile { task_type, complexity }
    }

    /// Priority-ordered keyword matching; first matching group wins.
    fn classify_task(query: &str) -> TaskType {
        let lower = query.to_lowercase();

        let groups: [(TaskType, &[&str]); 4] = [
            (TaskType::Research, RESEARCH_KEYWORDS),
            (TaskType::CompanyAnalysis, COMPANY_KEYWORDS),
            (TaskType::LeadGeneration, LEAD_KEYWORDS),
            (TaskType::IcpDevelopment, ICP_KEYWORDS),
        ];

        for (task_type, keywords) in groups {
            if keywords.iter().any(|keyword| lower.contains(keyword)) {
                return task_type;
            }
        }

        TaskType::SimpleChat
    }

    /// Length/punctuation/depth-keyword heuristic.
    fn classify_complexity(query: &str) -> Complexity {
        let lower = query.to_lowercase();
        let word_count = query.split_whitespace().count();
        let question_marks = query.matches('?').count();
        let has_depth_keyword = DEPTH_KEYWORDS.iter().any(|keyword| lower.contains(keyword));

        if word_count > HIGH_WORD_COUNT || question_marks > 1 || has_depth_keyword {
            Complexity::High
        } else if word_count < LOW_WORD_COUNT {
            Complexity::Low
        } else {
            Complexity::Medium
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_keywords_win_first() {
        let classifier = TaskClassifier::new();
        // "latest" (research) appears alongside "company"; research has priority.
        let profile = classifier.analyze("What is the latest news about this company?");
        assert_eq!(profile.task_type, TaskType::Research);
    }

    #[test]
    fn test_default_is_simple_chat() {
        let classifier = TaskClassifier::new();
        let profile = classifier.analyze("hello there");
        assert_eq!(profile.task_type, TaskType::SimpleChat);
        assert_eq!(profile.complexity, Complexity::Low);
    }

    #[test]
    fn test_icp_classification() {
        let classifier = TaskClassifier::new();
        let profile = classifier.analyze("Build an ideal customer persona for our product");
        assert_eq!(profile.task_type, TaskType::IcpDevelopment);
    }

    #[test]
    fn test_lead_generation_classification() {
        let classifier = TaskClassifier::new();
        let profile = classifier.analyze("Draft outreach for these prospects");
        assert_eq!(profile.task_type, TaskType::LeadGeneration);
    }

    #[test]
    fn test_complexity_word_count_boundaries() {
        let classifier = TaskClassifier::new();

        let nine_words = "one two three four five six seven eight nine";
        assert_eq!(classifier.analyze(nine_words).complexity, Complexity::Low);

        let ten_words = format!("{} ten", nine_words);
        assert_eq!(classifier.analyze(&ten_words).complexity, Complexity::Medium);

        let thirty_one_words =
            (0..31).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ");
        assert_eq!(classifier.analyze(&thirty_one_words).complexity, Complexity::High);
    }

    #[test]
    fn test_multiple_question_marks_force_high() {
        let classifier = TaskClassifier::new();
        let profile = classifier.analyze("Who buys this? And why now?");
        assert_eq!(profile.complexity, Complexity::High);
    }

    #[test]
    fn test_depth_keyword_forces_high_even_when_short() {
        let classifier = TaskClassifier::new();
        let profile = classifier.analyze("comprehensive market overview");
        assert_eq!(profile.complexity, Complexity::High);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let classifier = TaskClassifier::new();
        let query = "Research detailed funding history of our top competitor";
        let first = classifier.analyze(query);
        let second = classifier.analyze(query);
        assert_eq!(first, second);
    }

    #[test]
    fn test_latest_trends_scenario() {
        let classifier = TaskClassifier::new();
        let profile = classifier.analyze("What are the latest trends in AI?");
        assert_eq!(profile.task_type, TaskType::Research);
        // 7 words, one question mark, no depth keywords.
        assert_eq!(profile.complexity, Complexity::Low);
    }
}
