//! Conversation history — append-only, bounded, truncated whole entries at
//! a time.

/// One prior segment, namespaced by the character that spoke it.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub speaker: String,
    pub text: String,
}

impl HistoryEntry {
    pub fn line(&self) -> String {
        format!("{}: {}", self.speaker, self.text)
    }

    fn chars(&self) -> usize {
        // speaker + ": " + text + newline
        self.speaker.chars().count() + 2 + self.text.chars().count() + 1
    }
}

/// Ordered history of prior segments, bounded by a character budget.
///
/// Insertion order defines recency. When the budget is exceeded the oldest
/// whole entries are evicted — a truncated history never contains a
/// partial entry.
#[derive(Debug)]
pub struct ConversationHistory {
    entries: Vec<HistoryEntry>,
    max_chars: usize,
}

impl ConversationHistory {
    pub fn new(max_chars: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_chars: max_chars.max(1),
        }
    }

    /// Append a segment, then evict oldest entries until the budget holds.
    pub fn push(&mut self, speaker: impl Into<String>, text: impl Into<String>) {
        self.entries.push(HistoryEntry {
            speaker: speaker.into(),
            text: text.into(),
        });
        self.truncate_to_budget();
    }

    fn truncate_to_budget(&mut self) {
        let mut total: usize = self.entries.iter().map(HistoryEntry::chars).sum();
        let mut evict = 0;
        // Always keep the newest entry, even if it alone exceeds the budget.
        while total > self.max_chars && evict + 1 < self.entries.len() {
            total -= self.entries[evict].chars();
            evict += 1;
        }
        if evict > 0 {
            self.entries.drain(..evict);
        }
    }

    /// The most recent `n` entries for one speaker, oldest first.
    pub fn recent_for(&self, speaker: &str, n: usize) -> Vec<&HistoryEntry> {
        let mut recent: Vec<&HistoryEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|e| e.speaker == speaker)
            .take(n)
            .collect();
        recent.reverse();
        recent
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }
}
