//! Request Composer
//!
//! Builds the outbound request for one user message. In continuation mode the
//! flattened transcript is embedded ahead of the new text, so the model sees
//! the whole conversation even though the API call is stateless.

use crate::config::ScenarioCatalog;
use crate::error::ChatError;
use crate::session::ConversationAccumulator;

/// Opening line of the continuation preamble
pub const HISTORY_INTRO: &str =
    "Please base your reply on our previous chat history, which is:";

/// Line before the embedded history
pub const HISTORY_START: &str = "--- Chat history ---";

/// Line after the embedded history
pub const HISTORY_END: &str = "--- End of chat history ---";

/// Everything needed to issue one request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundRequest {
    /// User text, prefixed by the history preamble in continuation mode
    pub final_prompt: String,
    /// System prompt of the selected scenario
    pub system_prompt: String,
    /// Model identifier
    pub model: String,
    /// Characters of history embedded, when continuation mode was on
    pub history_chars: Option<usize>,
}

/// Wrap a flattened transcript in the continuation preamble
#[must_use]
pub fn history_preamble(history: &str) -> String {
    format!("{HISTORY_INTRO}\n{HISTORY_START}\n{history}\n{HISTORY_END}\n")
}

/// Compose the request for `user_text`.
///
/// The accumulator is only read. The preamble is applied whenever
/// `continuation` is set, including for the very first message.
///
/// # Errors
///
/// Returns [`ChatError::Config`] if the text is blank, the model is empty, or
/// the scenario is not in `scenarios`.
pub fn compose(
    user_text: &str,
    scenario: &str,
    model: &str,
    continuation: bool,
    transcript: &ConversationAccumulator,
    scenarios: &ScenarioCatalog,
) -> Result<OutboundRequest, ChatError> {
    if user_text.trim().is_empty() {
        return Err(ChatError::Config("message is empty".to_string()));
    }
    if model.trim().is_empty() {
        return Err(ChatError::Config("no model selected".to_string()));
    }
    let system_prompt = scenarios
        .resolve(scenario)
        .ok_or_else(|| ChatError::Config(format!("unknown scenario '{scenario}'")))?;

    let (final_prompt, history_chars) = if continuation {
        let history = transcript.flatten_history();
        let chars = history.chars().count();
        (format!("{}{user_text}", history_preamble(&history)), Some(chars))
    } else {
        (user_text.to_string(), None)
    };

    Ok(OutboundRequest {
        final_prompt,
        system_prompt: system_prompt.to_string(),
        model: model.to_string(),
        history_chars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::TaggedSpan;
    use pretty_assertions::assert_eq;

    const SCENARIO: &str = "General assistant";

    fn transcript_with_one_turn() -> ConversationAccumulator {
        let mut acc = ConversationAccumulator::new();
        let handle = acc.begin_turn("What is Rust?", "gpt-5.1", SCENARIO).unwrap();
        acc.append_assistant_spans(&handle, &[TaggedSpan::plain("A language.")])
            .unwrap();
        acc.end_turn(&handle).unwrap();
        acc
    }

    #[test]
    fn test_plain_mode_sends_text_as_is() {
        let acc = transcript_with_one_turn();
        let request = compose(
            "And Go?",
            SCENARIO,
            "gpt-5.1",
            false,
            &acc,
            &ScenarioCatalog::builtin(),
        )
        .unwrap();

        assert_eq!(request.final_prompt, "And Go?");
        assert_eq!(request.system_prompt, "You are a helpful assistant.");
        assert_eq!(request.model, "gpt-5.1");
        assert_eq!(request.history_chars, None);
    }

    #[test]
    fn test_continuation_embeds_history() {
        let acc = transcript_with_one_turn();
        let request = compose(
            "And Go?",
            SCENARIO,
            "gpt-5.1",
            true,
            &acc,
            &ScenarioCatalog::builtin(),
        )
        .unwrap();

        let history = acc.flatten_history();
        assert_eq!(
            request.final_prompt,
            format!("{}And Go?", history_preamble(&history))
        );
        assert!(request
            .final_prompt
            .contains("--- Chat history ---\n--- User ---\nWhat is Rust?"));
        assert_eq!(request.history_chars, Some(history.chars().count()));

        // Composing never touches the transcript
        assert_eq!(acc.len(), 1);
        assert_eq!(acc.turns()[0].user_text, "What is Rust?");
    }

    #[test]
    fn test_continuation_with_empty_history_still_wraps() {
        let acc = ConversationAccumulator::new();
        let request = compose(
            "hi",
            SCENARIO,
            "gpt-5.1",
            true,
            &acc,
            &ScenarioCatalog::builtin(),
        )
        .unwrap();

        assert_eq!(
            request.final_prompt,
            format!("{HISTORY_INTRO}\n{HISTORY_START}\n\n{HISTORY_END}\nhi")
        );
        assert_eq!(request.history_chars, Some(0));
    }

    #[test]
    fn test_unknown_scenario_is_config_error() {
        let acc = ConversationAccumulator::new();
        let err = compose(
            "hi",
            "Poet",
            "gpt-5.1",
            false,
            &acc,
            &ScenarioCatalog::builtin(),
        )
        .unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
        assert!(acc.is_empty());
    }

    #[test]
    fn test_blank_text_is_config_error() {
        let acc = ConversationAccumulator::new();
        let err = compose(
            "  \n\t",
            SCENARIO,
            "gpt-5.1",
            false,
            &acc,
            &ScenarioCatalog::builtin(),
        )
        .unwrap_err();
        assert!(err.is_precondition());
    }
}
