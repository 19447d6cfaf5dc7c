/// The in-progress bot reply assembled from partial frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TypingBuffer {
    #[default]
    Absent,
    Accumulating(String),
}

/// Result of closing a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalized {
    pub text: String,
    /// Whether a draft bubble existed and is now being finalized in place.
    pub had_draft: bool,
}

impl TypingBuffer {
    pub fn new() -> Self {
        Self::Absent
    }

    pub fn is_accumulating(&self) -> bool {
        matches!(self, TypingBuffer::Accumulating(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            TypingBuffer::Absent => None,
            TypingBuffer::Accumulating(text) => Some(text),
        }
    }

    /// Appends a fragment, separated by a single space from non-empty content,
    /// and returns the whole draft.
    pub fn push(&mut self, delta: &str) -> &str {
        match self {
            TypingBuffer::Accumulating(text) => {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(delta);
                text
            }
            TypingBuffer::Absent => {
                *self = TypingBuffer::Accumulating(delta.to_string());
                self.text().unwrap_or_default()
            }
        }
    }

    /// Replaces the draft wholesale with `text` and closes it.
    pub fn finalize(&mut self, text: &str) -> Finalized {
        let had_draft = self.is_accumulating();
        *self = TypingBuffer::Absent;
        Finalized {
            text: text.to_string(),
            had_draft,
        }
    }

    pub fn cancel(&mut self) -> Finalized {
        self.finalize("")
    }
}
