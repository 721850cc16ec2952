//! Per-module output slot.
//!
//! An `OutputSlot` owns the `(text, visible)` pair of one module behind a
//! single mutex. The producer overwrites both fields in one critical section
//! and the aggregator copies both in one critical section, so a reader never
//! observes text from one publish combined with visibility from another.

use std::sync::{Mutex, MutexGuard};

/// Fixed-capacity text buffer holding a module's rendered text.
///
/// Writes are truncated to `capacity` bytes at a UTF-8 character boundary and
/// control characters are replaced by spaces, so the stored text is always a
/// valid JSON string body once escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCell {
    buf: String,
    capacity: usize,
}

impl TextCell {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
            capacity,
        }
    }

    /// Overwrites the contents. Returns `true` if the input was truncated.
    pub fn set(&mut self, text: &str) -> bool {
        self.buf.clear();

        let mut truncated = false;
        for c in text.chars() {
            let c = if c.is_control() { ' ' } else { c };
            if self.buf.len() + c.len_utf8() > self.capacity {
                truncated = true;
                break;
            }
            self.buf.push(c);
        }

        truncated
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A consistent copy of a slot taken under its lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub text: String,
    pub visible: bool,
}

#[derive(Debug)]
struct SlotState {
    text: TextCell,
    visible: bool,
}

/// Named, lockable `(text, visible)` pair owned by a single module.
#[derive(Debug)]
pub struct OutputSlot {
    name: String,
    state: Mutex<SlotState>,
}

impl OutputSlot {
    /// Creates an empty, hidden slot.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(SlotState {
                text: TextCell::with_capacity(capacity),
                visible: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.lock().text.capacity()
    }

    /// Overwrites text and visibility as one unit. Returns `true` if the text
    /// was truncated to fit.
    pub fn write(&self, text: &str, visible: bool) -> bool {
        let mut state = self.lock();
        let truncated = state.text.set(text);
        state.visible = visible;
        truncated
    }

    /// Runs `f` on the current text and visibility while holding the lock.
    pub fn read<R>(&self, f: impl FnOnce(&str, bool) -> R) -> R {
        let state = self.lock();
        f(state.text.as_str(), state.visible)
    }

    /// Copies the current text and visibility.
    pub fn snapshot(&self) -> SlotSnapshot {
        self.read(|text, visible| SlotSnapshot {
            text: text.to_owned(),
            visible,
        })
    }

    // A poisoned slot means a producer panicked mid-write; nothing sane can be
    // rendered from it.
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("output slot '{}' lock poisoned", self.name),
        }
    }
}
