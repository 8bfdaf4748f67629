use std::{collections::HashMap, hash::Hash};

/// Append-only text buffers, one per key. Tokens for a key are concatenated
/// strictly in the order they are fed in.
#[derive(Debug, Clone)]
pub struct TokenAccumulator<K> {
    buffers: HashMap<K, String>,
}

impl<K> Default for TokenAccumulator<K> {
    fn default() -> Self {
        Self {
            buffers: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> TokenAccumulator<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `token` to the buffer for `key` and returns the whole buffer.
    pub fn on_token(&mut self, key: K, token: &str) -> &str {
        let buffer = self.buffers.entry(key).or_default();
        buffer.push_str(token);
        buffer
    }

    pub fn get(&self, key: &K) -> Option<&str> {
        self.buffers.get(key).map(String::as_str)
    }

    pub fn reset(&mut self) {
        self.buffers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_in_arrival_order() {
        let mut acc = TokenAccumulator::new();
        acc.on_token("x", "A");
        acc.on_token("x", "B");
        assert_eq!(acc.on_token("x", "C"), "ABC");
    }

    #[test]
    fn interleaved_keys_do_not_mix() {
        let mut acc = TokenAccumulator::new();
        acc.on_token("x", "A");
        acc.on_token("y", "1");
        acc.on_token("x", "B");
        acc.on_token("y", "2");
        acc.on_token("x", "C");

        assert_eq!(acc.get(&"x"), Some("ABC"));
        assert_eq!(acc.get(&"y"), Some("12"));
        assert_eq!(acc.get(&"z"), None);
    }

    #[test]
    fn reset_drops_every_buffer() {
        let mut acc = TokenAccumulator::new();
        acc.on_token(1, "hello");
        acc.reset();
        assert_eq!(acc.get(&1), None);
        assert_eq!(acc.on_token(1, "again"), "again");
    }
}
