//! Stage prompts for the research pipeline.

/// Stage 1: ask for 3-5 structured research areas.
pub fn plan_prompt(query: &str) -> String {
    format!(
        "You are planning a research task. Break the question below into 3-5 \
         structured research areas. For each area give a short title and what \
         specifically to look for.\n\nQuestion: {query}"
    )
}

/// Stage 2: ask for detailed findings following the plan.
pub fn research_prompt(query: &str, plan: &str) -> String {
    format!(
        "Research the question below in detail, following the plan. Report \
         findings per area with specifics (numbers, names, dates) and note \
         where each finding came from.\n\nQuestion: {query}\n\nPlan:\n{plan}"
    )
}

/// Stage 3: ask for an executive-summary answer with sources.
pub fn synthesis_prompt(query: &str, findings: &str) -> String {
    format!(
        "Write an executive summary answering the question from the findings \
         below. Lead with the answer, support it with the key data points, \
         and end with a Sources section listing references.\n\n\
         Question: {query}\n\nFindings:\n{findings}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_embed_inputs() {
        let plan = plan_prompt("why is churn rising?");
        assert!(plan.contains("why is churn rising?"));
        assert!(plan.contains("3-5"));

        let research = research_prompt("why is churn rising?", "1. pricing\n2. support");
        assert!(research.contains("1. pricing"));
        assert!(research.contains("why is churn rising?"));

        let synthesis = synthesis_prompt("why is churn rising?", "support wait times doubled");
        assert!(synthesis.contains("support wait times doubled"));
        assert!(synthesis.contains("Sources"));
    }
}
