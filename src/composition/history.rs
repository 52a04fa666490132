// Copyright (c) 2024 The tactus authors

//! A bounded ring of past generations for back/forward navigation.

use super::Voice;
use bounded_vec_deque::BoundedVecDeque;

/// How many generations the history keeps before evicting the oldest.
pub const HISTORY_LEN: usize = 32;

/// [GenerationHistory] remembers the most recent generations. Pushing a new
/// generation while the cursor points into the past truncates the newer
/// entries, like a browser history.
#[derive(Debug)]
pub struct GenerationHistory {
    entries: BoundedVecDeque<Vec<Voice>>,
    cursor: usize,
}
impl Default for GenerationHistory {
    fn default() -> Self {
        Self {
            entries: BoundedVecDeque::new(HISTORY_LEN),
            cursor: 0,
        }
    }
}
impl GenerationHistory {
    /// Records a new generation and moves the cursor to it.
    pub fn push(&mut self, voices: Vec<Voice>) {
        while self.entries.len() > self.cursor + 1 {
            self.entries.pop_back();
        }
        // The deque evicts the oldest entry once full.
        self.entries.push_back(voices);
        self.cursor = self.entries.len() - 1;
    }

    /// The generation the cursor points at.
    pub fn current(&self) -> Option<&Vec<Voice>> {
        self.entries.get(self.cursor)
    }

    /// Steps the cursor one generation back, if there is one.
    pub fn back(&mut self) -> Option<&Vec<Voice>> {
        if self.cursor == 0 || self.entries.is_empty() {
            None
        } else {
            self.cursor -= 1;
            self.current()
        }
    }

    /// Steps the cursor one generation forward, if there is one.
    pub fn forward(&mut self) -> Option<&Vec<Voice>> {
        if self.cursor + 1 >= self.entries.len() {
            None
        } else {
            self.cursor += 1;
            self.current()
        }
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::Measure;

    fn generation(tag: u8) -> Vec<Voice> {
        vec![Voice::new_with(tag, vec![Measure::default()])]
    }

    #[test]
    fn navigation_moves_the_cursor() {
        let mut h = GenerationHistory::default();
        assert!(h.current().is_none());
        assert!(h.back().is_none());

        h.push(generation(1));
        h.push(generation(2));
        h.push(generation(3));
        assert_eq!(h.current().unwrap()[0].number, 3);
        assert_eq!(h.back().unwrap()[0].number, 2);
        assert_eq!(h.back().unwrap()[0].number, 1);
        assert!(h.back().is_none(), "can't step past the oldest entry");
        assert_eq!(h.forward().unwrap()[0].number, 2);
        assert_eq!(h.forward().unwrap()[0].number, 3);
        assert!(h.forward().is_none());
    }

    #[test]
    fn pushing_from_the_past_truncates_newer_entries() {
        let mut h = GenerationHistory::default();
        h.push(generation(1));
        h.push(generation(2));
        h.push(generation(3));
        h.back();
        h.back();
        h.push(generation(4));
        assert_eq!(h.len(), 2);
        assert_eq!(h.current().unwrap()[0].number, 4);
        assert!(h.forward().is_none());
        assert_eq!(h.back().unwrap()[0].number, 1);
    }

    #[test]
    fn history_is_bounded() {
        let mut h = GenerationHistory::default();
        for i in 0..(HISTORY_LEN + 10) {
            h.push(generation(i as u8));
        }
        assert_eq!(h.len(), HISTORY_LEN, "oldest entries must be evicted");
        assert_eq!(
            h.current().unwrap()[0].number,
            (HISTORY_LEN + 9) as u8,
            "cursor stays on the newest entry"
        );
    }
}
