//! 🎣 StreamMatcher: Rabin-Karp over a byte stream, one chunk at a time.
//!
//! 🎬 *[a 400 MiB log file arrives in 64 MiB slices. the matcher has room for eight bytes.]*
//! *["that's fine," it says. "I only ever need the last eight."]*
//!
//! The matcher keeps a rolling hash of the last `m` bytes (m = pattern length)
//! plus a ring buffer of those same bytes. Every incoming byte rolls the
//! window forward in O(1). When the window hash equals the pattern hash we do
//! NOT take the hash's word for it: the ring is compared byte for byte against
//! the pattern, and only an exact match counts.
//!
//! 🧠 Knowledge graph:
//! - `Accumulating` → fewer than m bytes seen, no comparisons yet
//! - `Active` → window full, compare on every byte
//! - `Matched` → terminal, further input ignored
//! - `Exhausted` → terminal, reached via `finish()` when nothing matched
//! - chunk boundaries are invisible: state lives on the struct, not the call
//! - single-byte patterns skip the hashing and ask `memchr` instead 🔍

use crate::error::SearchError;

// 📐 one byte, one digit. base-256 keeps the recurrence honest.
const BASE: u64 = 256;
// 🔢 prime, and small enough that hash * BASE + 255 never leaves u64.
const MODULUS: u64 = 1_000_000_007;

/// 🚦 Where a matcher is in its short, focused life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    Accumulating,
    Active,
    Matched,
    Exhausted,
}

impl MatchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchState::Matched | MatchState::Exhausted)
    }
}

/// 🎣 Incremental substring matcher. One per object, never shared.
#[derive(Debug, Clone)]
pub struct StreamMatcher {
    pattern: Box<[u8]>,
    modulus: u64,
    target_hash: u64,
    // 🧮 BASE^(m-1) mod modulus, the weight of the byte about to fall off the window
    outgoing_weight: u64,
    window_hash: u64,
    // 🔄 ring of the last m bytes; `head` points at the oldest one once full
    window: Box<[u8]>,
    head: usize,
    seen: usize,
    state: MatchState,
}

impl StreamMatcher {
    /// 🚀 Build a matcher for `pattern`. Empty patterns are rejected.
    pub fn new(pattern: &[u8]) -> Result<Self, SearchError> {
        Self::with_modulus(pattern, MODULUS)
    }

    // 🧪 custom modulus so tests can manufacture hash collisions on demand
    pub(crate) fn with_modulus(pattern: &[u8], modulus: u64) -> Result<Self, SearchError> {
        if pattern.is_empty() {
            return Err(SearchError::Validation("pattern must not be empty".into()));
        }

        let m = pattern.len();
        let target_hash = hash_of(pattern, modulus);
        let outgoing_weight = (1..m).fold(1u64, |acc, _| acc * BASE % modulus);

        Ok(Self {
            pattern: pattern.into(),
            modulus,
            target_hash,
            outgoing_weight,
            window_hash: 0,
            window: vec![0u8; m].into_boxed_slice(),
            head: 0,
            seen: 0,
            state: MatchState::Accumulating,
        })
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn is_matched(&self) -> bool {
        self.state == MatchState::Matched
    }

    pub fn pattern_len(&self) -> usize {
        self.pattern.len()
    }

    /// 📥 Feed the next slice of the stream. Returns the state after consuming it.
    ///
    /// Stops reading the slice the moment a verified match lands. Calling this
    /// after a terminal state is a no-op that returns that state again.
    pub fn feed(&mut self, chunk: &[u8]) -> MatchState {
        if self.state.is_terminal() || chunk.is_empty() {
            return self.state;
        }

        if self.pattern.len() == 1 {
            // 🔍 one-byte needle: the window IS the byte, memchr finds it faster than we can hash it
            self.seen += chunk.len();
            self.state = if memchr::memchr(self.pattern[0], chunk).is_some() {
                MatchState::Matched
            } else {
                MatchState::Active
            };
            return self.state;
        }

        for &byte in chunk {
            self.push(byte);
            if self.seen >= self.pattern.len() {
                self.state = MatchState::Active;
                if self.window_hash == self.target_hash && self.window_equals_pattern() {
                    self.state = MatchState::Matched;
                    break;
                }
            }
        }
        self.state
    }

    /// 🏁 The stream is over. Anything not matched by now never will be.
    pub fn finish(&mut self) -> MatchState {
        if !self.state.is_terminal() {
            self.state = MatchState::Exhausted;
        }
        self.state
    }

    fn push(&mut self, byte: u8) {
        let m = self.pattern.len();
        if self.seen < m {
            // 📦 still filling up, no byte falls off yet
            self.window[self.seen] = byte;
            self.window_hash = (self.window_hash * BASE + byte as u64) % self.modulus;
        } else {
            let outgoing = self.window[self.head] as u64;
            let without_outgoing = (self.window_hash + self.modulus
                - outgoing * self.outgoing_weight % self.modulus)
                % self.modulus;
            self.window_hash = (without_outgoing * BASE + byte as u64) % self.modulus;
            self.window[self.head] = byte;
            self.head = (self.head + 1) % m;
        }
        self.seen += 1;
    }

    // ✅ the collision guard. a matching hash is a rumour, this is the fact check.
    fn window_equals_pattern(&self) -> bool {
        // 🔄 oldest bytes sit at window[head..], the wrapped-around newest ones at window[..head]
        let (wrapped, oldest) = self.window.split_at(self.head);
        let split = oldest.len();
        oldest == &self.pattern[..split] && wrapped == &self.pattern[split..]
    }
}

fn hash_of(bytes: &[u8], modulus: u64) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &b| (acc * BASE + b as u64) % modulus)
}
