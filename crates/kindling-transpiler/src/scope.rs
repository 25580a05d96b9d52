//! Lexically scoped variable bindings.
//!
//! [`ScopeStack`] maps each declared name to the storage scope it lives in
//! on the platform, and tracks which construct each level belongs to so
//! `break`/`continue` placement can be checked.

use std::collections::HashMap;

use kindling_ir::VariableScope;

// ══════════════════════════════════════════════════════════════════════════════
// Frame Kind
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Top of an event body.
    Event,
    /// Top of a function body; parameters live here.
    Function,
    /// Top of a process body.
    Process,
    /// `if` / `else` body.
    Block,
    /// Any repeat body.
    Loop,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    bindings: HashMap<String, VariableScope>,
}

// ══════════════════════════════════════════════════════════════════════════════
// ScopeStack
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: FrameKind) {
        self.frames.push(Frame {
            kind,
            bindings: HashMap::new(),
        });
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Bind `name` in the innermost frame, shadowing outer bindings.
    pub fn declare(&mut self, name: &str, scope: VariableScope) {
        if let Some(frame) = self.frames.last_mut() {
            frame.bindings.insert(name.to_string(), scope);
        }
    }

    /// Innermost binding of `name`.
    pub fn resolve(&self, name: &str) -> Option<VariableScope> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.bindings.get(name).copied())
    }

    pub fn in_loop(&self) -> bool {
        self.frames.iter().any(|f| f.kind == FrameKind::Loop)
    }

    /// Kind of the outermost frame, i.e. the unit being lowered.
    pub fn unit_kind(&self) -> Option<FrameKind> {
        self.frames.first().map(|f| f.kind)
    }
}
