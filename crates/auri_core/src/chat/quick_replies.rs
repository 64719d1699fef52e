//! Suggested quick replies owned by the active chat view.

pub const MAX_QUICK_REPLIES: usize = 4;

/// Quick-reply suggestions for the current assistant turn.
///
/// Choosing a suggestion consumes the whole set; a new assistant turn
/// replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuickReplies {
    replies: Vec<String>,
}

impl QuickReplies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the suggestions. Blank and duplicate entries are dropped and
    /// at most `MAX_QUICK_REPLIES` are kept.
    pub fn set<I, S>(&mut self, replies: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.replies.clear();
        for reply in replies {
            let reply = reply.as_ref().trim();
            if reply.is_empty()
                || self
                    .replies
                    .iter()
                    .any(|existing| existing.eq_ignore_ascii_case(reply))
            {
                continue;
            }
            self.replies.push(reply.to_string());
            if self.replies.len() == MAX_QUICK_REPLIES {
                break;
            }
        }
    }

    pub fn current(&self) -> &[String] {
        &self.replies
    }

    /// Takes the suggestion at `index`, clearing the rest.
    pub fn take(&mut self, index: usize) -> Option<String> {
        if index >= self.replies.len() {
            return None;
        }
        let chosen = self.replies.swap_remove(index);
        self.replies.clear();
        Some(chosen)
    }

    pub fn clear(&mut self) {
        self.replies.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }
}
