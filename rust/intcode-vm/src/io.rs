//! Per-engine I/O channel: a FIFO input queue and an output sink.
//!
//! Each engine owns its channel exclusively. Moving values between engines
//! is the scheduler's job: it drains one engine's output and pushes into
//! another engine's input.

use crate::values::Word;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// What an `Input` instruction does when the queue is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    /// The caller guarantees input is queued; an empty queue is a fault.
    #[default]
    Blocking,
    /// An empty queue delivers `-1` and suspends the run.
    NonBlocking,
}

#[derive(Debug, Clone, Default)]
pub struct IoChannel {
    input: VecDeque<Word>,
    output: Vec<Word>,
    consumed: u64,
}

impl IoChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(&mut self, value: Word) {
        self.input.push_back(value);
    }

    pub fn extend_input<I: IntoIterator<Item = Word>>(&mut self, values: I) {
        self.input.extend(values);
    }

    /// Queue the bytes of `text` as individual inputs.
    pub fn push_ascii(&mut self, text: &str) {
        self.input.extend(text.bytes().map(Word::from));
    }

    pub(crate) fn pop_input(&mut self) -> Option<Word> {
        let value = self.input.pop_front()?;
        self.consumed += 1;
        Some(value)
    }

    pub(crate) fn push_output(&mut self, value: Word) {
        self.output.push(value);
    }

    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Total inputs consumed since the channel was created or cleared.
    pub fn inputs_consumed(&self) -> u64 {
        self.consumed
    }

    pub fn output(&self) -> &[Word] {
        &self.output
    }

    /// Drain everything produced since the last call.
    pub fn take_output(&mut self) -> Vec<Word> {
        std::mem::take(&mut self.output)
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
        self.consumed = 0;
    }
}

/// Output interpreted as text, as produced by programs that print ASCII.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AsciiOutput {
    pub text: String,
    /// Values outside the ASCII range, in output order.
    pub values: Vec<Word>,
}

impl AsciiOutput {
    pub fn from_words(words: &[Word]) -> Self {
        let mut out = AsciiOutput::default();
        for w in words {
            match w.to_u8().filter(u8::is_ascii) {
                Some(b) => out.text.push(char::from(b)),
                None => out.values.push(w.clone()),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::word;

    #[test]
    fn test_input_is_fifo_and_counted() {
        let mut io = IoChannel::new();
        io.push_input(word(1));
        io.extend_input([word(2), word(3)]);
        assert_eq!(io.pending_input(), 3);
        assert_eq!(io.pop_input(), Some(word(1)));
        assert_eq!(io.pop_input(), Some(word(2)));
        assert_eq!(io.inputs_consumed(), 2);
        assert_eq!(io.pending_input(), 1);
    }

    #[test]
    fn test_take_output_drains() {
        let mut io = IoChannel::new();
        io.push_output(word(7));
        io.push_output(word(8));
        assert_eq!(io.take_output(), vec![word(7), word(8)]);
        assert!(io.output().is_empty());
    }

    #[test]
    fn test_push_ascii_queues_bytes() {
        let mut io = IoChannel::new();
        io.push_ascii("NOT A J\n");
        assert_eq!(io.pending_input(), 8);
        assert_eq!(io.pop_input(), Some(word(78)));
    }

    #[test]
    fn test_ascii_output_splits_values() {
        let words = vec![word(72), word(105), word(10), word(19_358_262)];
        let out = AsciiOutput::from_words(&words);
        assert_eq!(out.text, "Hi\n");
        assert_eq!(out.values, vec![word(19_358_262)]);
    }

    #[test]
    fn test_input_mode_serde_names() {
        let mode: InputMode = serde_json::from_str("\"non-blocking\"").unwrap();
        assert_eq!(mode, InputMode::NonBlocking);
    }
}
