//! Instruction trees.

use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use crate::value::{Selector, Value};

/// Block category on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    PlayerEvent,
    EntityEvent,
    Function,
    Process,
    PlayerAction,
    EntityAction,
    GameAction,
    SetVar,
    Control,
    IfPlayer,
    IfEntity,
    IfGame,
    IfVar,
    Else,
    Repeat,
    CallFunction,
    StartProcess,
}

impl BlockKind {
    /// Category id used in wire records.
    pub fn id(self) -> &'static str {
        match self {
            Self::PlayerEvent => "event",
            Self::EntityEvent => "entity_event",
            Self::Function => "func",
            Self::Process => "process",
            Self::PlayerAction => "player_action",
            Self::EntityAction => "entity_action",
            Self::GameAction => "game_action",
            Self::SetVar => "set_var",
            Self::Control => "control",
            Self::IfPlayer => "if_player",
            Self::IfEntity => "if_entity",
            Self::IfGame => "if_game",
            Self::IfVar => "if_var",
            Self::Else => "else",
            Self::Repeat => "repeat",
            Self::CallFunction => "call_func",
            Self::StartProcess => "start_process",
        }
    }
}

/// Argument slots in a block's chest, numbered 0 to 26. Plain values fill
/// from the front and tags from the back.
pub const CHEST_SLOTS: usize = 27;

/// A plain action block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub block: BlockKind,
    pub name: String,
    pub args: Vec<Value>,
    pub target: Option<Selector>,
}

impl Action {
    pub fn new(block: BlockKind, name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            block,
            name: name.into(),
            args,
            target: None,
        }
    }
}

/// The head of an `if` bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub block: BlockKind,
    pub name: String,
    pub args: Vec<Value>,
    pub target: Option<Selector>,
    pub inverted: bool,
}

/// The head of a `repeat` bracket.
///
/// `sub_action` names the condition checked by `While` repeats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repeat {
    pub name: String,
    pub args: Vec<Value>,
    pub sub_action: Option<String>,
    pub inverted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketKind {
    If(Condition),
    Repeat(Repeat),
}

/// A paired open/close construct.
///
/// `setup` evaluates the head's operands and runs right before the head
/// block; it is never mixed into `body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub kind: BracketKind,
    pub setup: Vec<Instruction>,
    pub body: Vec<Instruction>,
    pub else_body: Option<Vec<Instruction>>,
}

impl Bracket {
    /// Short human name used in errors: `if_var >`, `repeat Multiple`.
    pub fn describe(&self) -> String {
        match &self.kind {
            BracketKind::If(c) => format!("{} {}", c.block.id(), c.name),
            BracketKind::Repeat(r) => format!("repeat {}", r.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Function,
    Process,
}

/// A call into a function or a process start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub kind: CallKind,
    pub name: String,
    pub args: Vec<Value>,
}

impl Call {
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            kind: CallKind::Function,
            name: name.into(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    Action(Action),
    Bracket(Bracket),
    Call(Call),
}

impl From<Action> for Instruction {
    fn from(action: Action) -> Self {
        Self::Action(action)
    }
}

impl From<Bracket> for Instruction {
    fn from(bracket: Bracket) -> Self {
        Self::Bracket(bracket)
    }
}

impl From<Call> for Instruction {
    fn from(call: Call) -> Self {
        Self::Call(call)
    }
}

impl Instruction {
    /// Visit every value in this node and everything nested under it.
    pub fn for_each_value(&self, f: &mut impl FnMut(&Value)) {
        match self {
            Instruction::Action(a) => a.args.iter().for_each(&mut *f),
            Instruction::Call(c) => c.args.iter().for_each(&mut *f),
            Instruction::Bracket(b) => {
                match &b.kind {
                    BracketKind::If(c) => c.args.iter().for_each(&mut *f),
                    BracketKind::Repeat(r) => r.args.iter().for_each(&mut *f),
                }
                let nested = b.setup.iter().chain(&b.body).chain(b.else_body.iter().flatten());
                for ins in nested {
                    ins.for_each_value(f);
                }
            }
        }
    }

    /// Mutable counterpart of [`Instruction::for_each_value`].
    pub fn for_each_value_mut(&mut self, f: &mut impl FnMut(&mut Value)) {
        match self {
            Instruction::Action(a) => a.args.iter_mut().for_each(&mut *f),
            Instruction::Call(c) => c.args.iter_mut().for_each(&mut *f),
            Instruction::Bracket(b) => {
                match &mut b.kind {
                    BracketKind::If(c) => c.args.iter_mut().for_each(&mut *f),
                    BracketKind::Repeat(r) => r.args.iter_mut().for_each(&mut *f),
                }
                let nested = b
                    .setup
                    .iter_mut()
                    .chain(&mut b.body)
                    .chain(b.else_body.iter_mut().flatten());
                for ins in nested {
                    ins.for_each_value_mut(f);
                }
            }
        }
    }

    /// Indented multi-line rendering for verbose output.
    pub fn render(&self, out: &mut String, depth: usize) {
        let pad = "    ".repeat(depth);
        match self {
            Instruction::Action(a) => {
                let _ = writeln!(
                    out,
                    "{pad}{} {}{}({})",
                    a.block.id(),
                    a.name,
                    target_suffix(a.target),
                    join(&a.args)
                );
            }
            Instruction::Call(c) => {
                let block = match c.kind {
                    CallKind::Function => "call_func",
                    CallKind::Process => "start_process",
                };
                let _ = writeln!(out, "{pad}{block} {}({})", c.name, join(&c.args));
            }
            Instruction::Bracket(b) => {
                for ins in &b.setup {
                    ins.render(out, depth);
                }
                match &b.kind {
                    BracketKind::If(c) => {
                        let not = if c.inverted { "not " } else { "" };
                        let _ = writeln!(
                            out,
                            "{pad}{} {not}{}{}({}) {{",
                            c.block.id(),
                            c.name,
                            target_suffix(c.target),
                            join(&c.args)
                        );
                    }
                    BracketKind::Repeat(r) => {
                        let sub = match &r.sub_action {
                            Some(sub) if r.inverted => format!(" while not {sub}"),
                            Some(sub) => format!(" while {sub}"),
                            None => String::new(),
                        };
                        let _ = writeln!(out, "{pad}repeat {}({}){sub} {{", r.name, join(&r.args));
                    }
                }
                for ins in &b.body {
                    ins.render(out, depth + 1);
                }
                if let Some(else_body) = &b.else_body {
                    let _ = writeln!(out, "{pad}}} else {{");
                    for ins in else_body {
                        ins.render(out, depth + 1);
                    }
                }
                let _ = writeln!(out, "{pad}}}");
            }
        }
    }
}

fn target_suffix(target: Option<Selector>) -> String {
    target.map(|t| format!("<{t}>")).unwrap_or_default()
}

fn join(values: &[Value]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out, 0);
        f.write_str(out.trim_end())
    }
}
