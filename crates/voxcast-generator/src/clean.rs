//! Cleaning of raw model output into speakable text.

use std::sync::LazyLock;

use regex::Regex;

use voxcast_core::types::Emotion;

static CONSOLE_ARTIFACTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"failed to get console mode for std(out|err): The handle is invalid\.\s*")
        .expect("valid regex")
});

static ASTERISK_ACTIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*[^*]*\*").expect("valid regex"));

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));

static LEFTOVER_SPECIALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*\[\]()]").expect("valid regex"));

static ACTION_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(sighs|winks|smirks|rolls eyes|chuckles|smiles|leans|looks)\b")
        .expect("valid regex")
});

/// Strip stage directions, bracketed/asterisked action text, action verbs,
/// and console-error artifacts; collapse whitespace.
///
/// Returns `None` when nothing speakable survives — the caller retries
/// generation instead of enqueuing an empty unit.
pub fn clean_text(raw: &str) -> Option<String> {
    let text = CONSOLE_ARTIFACTS.replace_all(raw, "");
    let text = ASTERISK_ACTIONS.replace_all(&text, "");
    let text = BRACKETED.replace_all(&text, "");
    let text = ACTION_WORDS.replace_all(&text, "");
    let text = LEFTOVER_SPECIALS.replace_all(&text, "");

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Keyword heuristic mapping cleaned text to a voice-style emotion.
pub fn detect_emotion(text: &str) -> Emotion {
    let lower = text.to_lowercase();
    let count = |words: &[&str]| -> usize {
        words.iter().filter(|w| lower.contains(*w)).count()
    };

    let happy = count(&["love", "great", "amazing", "wonderful", "excited", "laugh"]);
    let sad = count(&["sad", "lonely", "miss", "lost", "cry", "sorry"]);
    let angry = count(&["angry", "hate", "furious", "rage", "annoyed"]);

    let max = happy.max(sad).max(angry);
    if max == 0 {
        Emotion::Neutral
    } else if max == angry {
        Emotion::Angry
    } else if max == sad {
        Emotion::Sad
    } else {
        Emotion::Happy
    }
}
