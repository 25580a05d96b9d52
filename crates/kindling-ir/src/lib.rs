//! Kindling program IR.
//!
//! ```text
//! Script AST → Transpiler → Program (units of Instruction trees)
//!            → Optimizer  → Vec<Template>
//!            → Encoder    → wire documents
//! ```
//!
//! [`Value`] is the closed set of argument values a block can hold. Every
//! value turns into a self-describing wire record (`{"id": .., "data": ..}`)
//! through [`Value::to_wire`], independent of where it is used.
//!
//! [`Instruction`] trees are plain owned data: a [`Bracket`] owns its body
//! outright, so splitting a program never needs back-references.

mod instruction;
mod program;
mod value;
pub mod weight;
pub mod wire;

pub use instruction::{
    Action, BlockKind, Bracket, BracketKind, Call, CallKind, Condition, Instruction, Repeat,
    CHEST_SLOTS,
};
pub use program::{EventKind, Header, Program, Template, Unit};
pub use value::{
    GameValue, Item, Location, Particle, Potion, Selector, Sound, Tag, Value, ValueKind, Variable,
    VariableScope, Vector,
};
pub use wire::WireError;
