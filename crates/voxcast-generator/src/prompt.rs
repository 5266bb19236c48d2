//! Prompt construction for the content model.

use voxcast_core::history::ConversationHistory;

use crate::persona::Character;

/// Instructions repeated in every prompt to keep the output speakable.
const SPEECH_RULES: &str = "\
Important instructions:
- Speak naturally as if on a live stream
- NO actions or descriptions (no sighs, winks, etc.)
- NO special characters or formatting
- NO stage directions or emotions in brackets
- Just natural speech as it would be spoken
- Don't end with conclusive statements unless told to wrap up";

/// Build the full prompt for the next segment.
///
/// Embeds the persona profile, any free-form modifications, the most
/// recent history for this character, and a wrap-up instruction once the
/// session nears its duration target.
pub fn build_prompt(
    character: Character,
    modifications: &str,
    history: &ConversationHistory,
    history_recent: usize,
    nearing_end: bool,
) -> String {
    let mut parts = Vec::new();

    parts.push(character.profile().to_string());

    if !modifications.trim().is_empty() {
        parts.push(format!("Topic and instructions from the operator:\n{modifications}"));
    }

    if nearing_end {
        parts.push(
            "The stream is nearing its end. Start concluding your thoughts naturally."
                .to_string(),
        );
    }

    parts.push(SPEECH_RULES.to_string());
    parts.push(format!("Personality traits:\n- {}", character.traits()));

    let recent = history.recent_for(character.label(), history_recent);
    if !recent.is_empty() {
        let lines: Vec<String> = recent.iter().map(|e| e.line()).collect();
        parts.push(format!("Your previous monologues:\n{}", lines.join("\n")));
    }

    parts.push("Your next monologue (continue naturally):".to_string());

    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_profile_and_rules() {
        let history = ConversationHistory::new(10_000);
        let prompt = build_prompt(Character::Emily, "", &history, 5, false);
        assert!(prompt.contains("You are Emily"));
        assert!(prompt.contains("NO stage directions"));
        assert!(!prompt.contains("nearing its end"));
    }

    #[test]
    fn test_nearing_end_adds_wrap_up() {
        let history = ConversationHistory::new(10_000);
        let prompt = build_prompt(Character::Emily, "", &history, 5, true);
        assert!(prompt.contains("nearing its end"));
    }

    #[test]
    fn test_history_filtered_to_own_character() {
        let mut history = ConversationHistory::new(10_000);
        history.push("Emily", "my first take");
        history.push("Nova", "an interjection");
        history.push("Emily", "my second take");

        let prompt = build_prompt(Character::Emily, "", &history, 5, false);
        assert!(prompt.contains("my first take"));
        assert!(prompt.contains("my second take"));
        assert!(!prompt.contains("an interjection"));
    }

    #[test]
    fn test_modifications_embedded() {
        let history = ConversationHistory::new(10_000);
        let prompt = build_prompt(Character::Nova, "talk about deep sea fish", &history, 5, false);
        assert!(prompt.contains("deep sea fish"));
    }
}
