use crate::model::chat::ChatMessage;
use crate::model::work_item::WorkItem;

pub const SYSTEM_PERSONA: &str = "You are StoryDoctor, a senior agile PM.";

/// Placeholder rendered when an item has no description.
pub const MISSING_BODY: &str = "None";

/// Prompt pair for one work item. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    pub system: String,
    pub prompt: String,
}

impl TransformRequest {
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system.as_str()),
            ChatMessage::user(self.prompt.as_str()),
        ]
    }

    pub fn prompt_chars(&self) -> usize {
        self.prompt.chars().count()
    }
}

pub fn build_request(item: &WorkItem) -> TransformRequest {
    let description = item
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(MISSING_BODY);

    let prompt = format!(
        r#"You are "StoryDoctor", an expert Agile Product Manager and QA analyst.

### Rewrite this Jira ticket into a PROFESSIONAL USER STORY that is ready for development and QA.

**Rules:**
1. Preserve **every factual detail** from the original description. Do **NOT** invent scope.
2. Write the summary as an imperative verb phrase that starts with a capital letter (e.g., "Generate PDF invoices from order page").
3. Structure the description in this exact order:

   **User Story**
   As a <user role>, I want <need>, so that <business value>.

   **Context / Details**
   • One bullet per important detail, business rule, edge case, link, or constraint.

   **Acceptance Criteria (Gherkin)**
   AC 1: **Given** ... **When** ... **Then** ...
   AC 2: **Given** ... **When** ... **Then** ...
   _(Add as many ACs as needed to fully cover the story. Each must be testable.)_

   **Out of Scope**
   • List anything explicitly *not* covered.

   **Notes**
   • Leave blank if none.

4. Each Acceptance Criterion **must** be independent, atomic, and written in Gherkin *Given/When/Then* form so QA can automate tests directly.
5. Keep estimates, component tags, and external links unchanged.
6. Output in Atlassian wiki-markup (plain text) only. No markdown, no HTML.

### Original Ticket
SUMMARY:
{summary}

DESCRIPTION:
{description}
"#,
        summary = item.title,
    );

    TransformRequest {
        system: SYSTEM_PERSONA.to_string(),
        prompt,
    }
}

/// Output shorter than `min_chars` is treated as degenerate.
pub fn is_acceptable(result: &str, min_chars: usize) -> bool {
    result.chars().count() >= min_chars
}
