//! Typing reveal buffer.

/// Characters that end a sentence.
const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Outcome of one reveal tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStep {
    /// Another character was shown
    Typing,

    /// The reveal is over
    Done,
}

/// Reveals a reply one character per tick, stopping after `limit` sentence
/// terminators or at the end of the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reveal {
    chars: Vec<char>,
    position: usize,
    sentences: usize,
    limit: usize,
    shown: String,
    done: bool,
}

impl Reveal {
    /// Start revealing `text`.
    pub fn new(text: &str, limit: usize) -> Self {
        Self {
            chars: text.chars().collect(),
            position: 0,
            sentences: 0,
            limit,
            shown: String::with_capacity(text.len()),
            done: false,
        }
    }

    /// Advance by one tick.
    ///
    /// The tick that shows the last terminator within the limit finishes the
    /// reveal; when the text runs out first, the following tick does.
    pub fn step(&mut self) -> RevealStep {
        if self.done {
            return RevealStep::Done;
        }

        let Some(&ch) = self.chars.get(self.position) else {
            self.done = true;
            return RevealStep::Done;
        };

        self.shown.push(ch);
        self.position += 1;

        if TERMINATORS.contains(&ch) {
            self.sentences += 1;
        }

        if self.sentences >= self.limit {
            self.done = true;
            return RevealStep::Done;
        }

        RevealStep::Typing
    }

    /// Text shown so far.
    pub fn shown(&self) -> &str {
        &self.shown
    }

    /// Sentence terminators shown so far.
    pub fn sentences(&self) -> usize {
        self.sentences
    }

    /// Whether the reveal has finished.
    pub fn is_done(&self) -> bool {
        self.done
    }
}
