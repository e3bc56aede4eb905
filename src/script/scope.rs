//! Variable scope for script evaluation.
//!
//! A scope is a stack of frames; lookups go from the innermost frame out.
//! The preamble fills the root frame once per pass. Every script node
//! works on its own clone with a fresh frame on top, so bindings never leak
//! between nodes.

use super::value::ScriptValue;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Scope {
    /// Stack of variable frames. Last element is the innermost scope.
    frames: Vec<HashMap<String, ScriptValue>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    /// Create a scope with one empty frame.
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Pop the innermost frame. The root frame is never popped.
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Set a variable in the innermost frame.
    pub fn set(&mut self, name: impl Into<String>, value: ScriptValue) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Look a variable up, innermost frame first.
    pub fn get(&self, name: &str) -> Option<&ScriptValue> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names visible from the innermost frame, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .frames
            .iter()
            .flat_map(|frame| frame.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
