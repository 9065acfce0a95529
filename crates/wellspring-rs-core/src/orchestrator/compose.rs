//! Narrative text and disclaimers for the response envelope.

use std::collections::BTreeSet;
use wellspring_rs_protocol::KnowledgeBundle;

pub const DEFAULT_PROMPT: &str = "How can I help you with your health and fitness goals today?";

pub const EDUCATIONAL_DISCLAIMER: &str =
    "This information is for educational purposes and not a substitute for professional medical advice.";

pub const CONSULT_DISCLAIMER: &str =
    "Consult a healthcare provider before starting any new fitness or diet program.";

pub const WELLNESS_DISCLAIMER: &str = "This information is for educational purposes only. If you're \
experiencing severe stress or anxiety, please consult with a healthcare professional.";

const PROFILE_NOTED: &str = "Thanks, I've updated your profile with those details.";

const INTENT_PREFIXES: [&str; 8] = [
    "user is asking for ",
    "user is asking about ",
    "user is inquiring about ",
    "user wants to know about ",
    "user needs information on ",
    "user is requesting ",
    "advice on ",
    "information about ",
];

/// Follow-ups quoted inline in the chat text.
const INLINE_FOLLOW_UPS: usize = 2;

/// Inputs for the chat text, gathered after every subsystem settled.
#[derive(Debug, Default)]
pub(crate) struct Draft<'a> {
    pub intent_analysis: &'a str,
    pub immediate_response: Option<&'a str>,
    pub wellness: Option<&'a str>,
    pub knowledge: Option<&'a KnowledgeBundle>,
    pub has_plan: bool,
    pub profile_updated: bool,
    pub follow_ups: &'a [String],
}

/// Compose `chat_response`; never empty.
pub(crate) fn chat_response(draft: &Draft<'_>) -> String {
    if let Some(text) = draft.wellness.filter(|text| !text.trim().is_empty()) {
        return text.to_string();
    }
    if let Some(text) = draft.immediate_response.filter(|text| !text.trim().is_empty()) {
        return text.to_string();
    }
    if draft.has_plan {
        let intent = clean_intent(draft.intent_analysis);
        let subject = if intent.is_empty() { "you".to_string() } else { intent };
        let mut text = format!("Here's a personalized plan for {subject}.");
        if let Some(block) = follow_up_block(draft.follow_ups) {
            text.push_str(" \n\n");
            text.push_str(&block);
        }
        return text;
    }
    if let Some(lead) = draft.knowledge.and_then(knowledge_lead) {
        return match follow_up_block(draft.follow_ups) {
            Some(block) => format!("{lead}\n\n{block}"),
            None => lead,
        };
    }
    if draft.profile_updated {
        return format!("{PROFILE_NOTED} {DEFAULT_PROMPT}");
    }
    DEFAULT_PROMPT.to_string()
}

/// Envelope disclaimers, sorted and deduplicated.
pub(crate) fn disclaimers(
    knowledge: Option<&KnowledgeBundle>,
    has_plan: bool,
    has_wellness: bool,
) -> Vec<String> {
    let mut set = BTreeSet::new();
    if let Some(bundle) = knowledge {
        set.extend(bundle.disclaimers.iter().cloned());
    }
    if has_plan || knowledge.is_some_and(|bundle| !bundle.is_empty()) {
        set.insert(EDUCATIONAL_DISCLAIMER.to_string());
        set.insert(CONSULT_DISCLAIMER.to_string());
    }
    if has_wellness {
        set.insert(WELLNESS_DISCLAIMER.to_string());
    }
    set.into_iter().collect()
}

/// Strip the restatement boilerplate, keeping the casing of the rest.
pub(crate) fn clean_intent(intent: &str) -> String {
    let mut cleaned = intent.trim();
    for prefix in INTENT_PREFIXES {
        if let Some(head) = cleaned.get(..prefix.len())
            && head.eq_ignore_ascii_case(prefix)
        {
            cleaned = &cleaned[prefix.len()..];
        }
    }
    cleaned.trim().trim_end_matches('.').to_string()
}

fn follow_up_block(follow_ups: &[String]) -> Option<String> {
    let items = follow_ups
        .iter()
        .map(|question| question.trim().trim_end_matches('?').trim())
        .filter(|question| !question.is_empty())
        .take(INLINE_FOLLOW_UPS)
        .enumerate()
        .map(|(index, question)| format!("{}. {question}", index + 1))
        .collect::<Vec<_>>();
    if items.is_empty() {
        return None;
    }
    Some(format!("Would you like to know more about:\n{}", items.join("\n")))
}

/// Content of the first answer in domain order.
fn knowledge_lead(bundle: &KnowledgeBundle) -> Option<String> {
    bundle
        .answers
        .values()
        .map(|answer| answer.content.trim())
        .find(|content| !content.is_empty())
        .map(str::to_string)
}
