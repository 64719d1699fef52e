//! Repetition check for assistant replies.
//!
//! A candidate reply is repetitive when its word-set Jaccard similarity with
//! any recently accepted reply reaches the threshold.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashSet, VecDeque};

pub const DEFAULT_WINDOW: usize = 5;
pub const DEFAULT_THRESHOLD: f64 = 0.6;

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}']+").expect("valid word regex"));

/// Lowercased word set of `text`.
pub fn word_set(text: &str) -> HashSet<String> {
    WORD_RE
        .find_iter(text)
        .map(|word| word.as_str().to_lowercase())
        .collect()
}

/// Jaccard similarity of the word sets of `a` and `b`, in `0.0..=1.0`.
///
/// Two texts without words are identical (1.0); one empty side gives 0.0.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let left = word_set(a);
    let right = word_set(b);
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();
    intersection as f64 / union as f64
}

/// Sliding window of recently accepted replies.
#[derive(Debug, Clone)]
pub struct ReplyGuard {
    recent: VecDeque<String>,
    window: usize,
    threshold: f64,
}

impl Default for ReplyGuard {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_THRESHOLD)
    }
}

impl ReplyGuard {
    pub fn new(window: usize, threshold: f64) -> Self {
        Self {
            recent: VecDeque::with_capacity(window),
            window: window.max(1),
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn is_repetitive(&self, candidate: &str) -> bool {
        self.recent
            .iter()
            .any(|previous| jaccard_similarity(previous, candidate) >= self.threshold)
    }

    /// Records `reply` unless it is repetitive; returns whether it was kept.
    pub fn accept(&mut self, reply: &str) -> bool {
        if self.is_repetitive(reply) {
            return false;
        }
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(reply.to_string());
        true
    }

    pub fn clear(&mut self) {
        self.recent.clear();
    }
}
