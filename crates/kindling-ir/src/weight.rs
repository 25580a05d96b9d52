//! Slot accounting for plot lines.
//!
//! Every placed block takes one slot: headers, actions, calls, bracket heads,
//! each bracket marker and the `else` block. A bracket's weight is its setup
//! chain plus its shell plus everything nested inside it.

use crate::instruction::{Bracket, Instruction};
use crate::program::Template;

pub const HEADER: usize = 1;
pub const BLOCK: usize = 1;
pub const MARKER: usize = 1;
/// A linkage call inserted when a body is split.
pub const LINK: usize = BLOCK;

/// Weight of one node including everything it owns.
pub fn instruction(ins: &Instruction) -> usize {
    match ins {
        Instruction::Action(_) | Instruction::Call(_) => BLOCK,
        Instruction::Bracket(b) => shell(b) + sequence(&b.body) + b.else_body.as_deref().map_or(0, sequence),
    }
}

pub fn sequence(body: &[Instruction]) -> usize {
    body.iter().map(instruction).sum()
}

/// Weight of a bracket without its bodies: setup, head, open/close markers,
/// and the `else` block with its own markers when present.
pub fn shell(b: &Bracket) -> usize {
    let own = sequence(&b.setup) + BLOCK + 2 * MARKER;
    let else_shell = if b.else_body.is_some() {
        BLOCK + 2 * MARKER
    } else {
        0
    };
    own + else_shell
}

pub fn template(t: &Template) -> usize {
    HEADER + sequence(&t.body)
}
