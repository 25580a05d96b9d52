//! Script AST, as handed over by the external parser.
//!
//! Every node that can be blamed for an error carries a [`Span`].
//! Source order is preserved everywhere; nothing here is sorted or keyed.
//! The whole tree is serde-serializable so a parser living in another
//! process can hand it over as JSON.

use serde::{Deserialize, Serialize};

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete script: event bindings, functions and processes in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub items: Vec<Item>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Item {
    Event(EventDecl),
    Function(FunctionDecl),
    Process(ProcessDecl),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Event(e) => e.span,
            Item::Function(f) => f.span,
            Item::Process(p) => p.span,
        }
    }
}

/// Who an event fires for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Player,
    Entity,
}

/// `on Join { ... }` / `on entity EntityDmg { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDecl {
    pub kind: EventKind,
    pub name: Ident,
    pub body: Block,
    #[serde(default)]
    pub span: Span,
}

/// `fn name(params) { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: Ident,
    #[serde(default)]
    pub params: Vec<Ident>,
    pub body: Block,
    #[serde(default)]
    pub span: Span,
}

/// `process name { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDecl {
    pub name: Ident,
    pub body: Block,
    #[serde(default)]
    pub span: Span,
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    #[serde(default)]
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Self::new(name, Span::default())
    }
}

/// `{ statements... }`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self {
            stmts,
            span: Span::default(),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    /// `player.SendMessage("hi") [Alignment Mode = Centered]`
    Action(ActionCall),
    /// `let x = expr`
    Let(LetStmt),
    /// `x = expr`, `x += expr`, ...
    Assign(AssignStmt),
    If(IfStmt),
    Repeat(RepeatStmt),
    /// `name(args)`
    Call(CallStmt),
    /// `start name`
    Start(StartStmt),
    Wait(WaitStmt),
    Return(Span),
    Break(Span),
    Continue(Span),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Action(a) => a.span,
            Stmt::Let(l) => l.span,
            Stmt::Assign(a) => a.span,
            Stmt::If(i) => i.span,
            Stmt::Repeat(r) => r.span,
            Stmt::Call(c) => c.span,
            Stmt::Start(s) => s.span,
            Stmt::Wait(w) => w.span,
            Stmt::Return(s) | Stmt::Break(s) | Stmt::Continue(s) => *s,
        }
    }
}

/// Which block family an action or condition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Player,
    Entity,
    Game,
    Var,
    Control,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Player => "player",
            Namespace::Entity => "entity",
            Namespace::Game => "game",
            Namespace::Var => "var",
            Namespace::Control => "control",
        }
    }
}

/// An explicit block tag choice: `[Tag Name = Option]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagArg {
    pub name: String,
    pub option: String,
    #[serde(default)]
    pub span: Span,
}

/// A call into the platform's action vocabulary.
///
/// Used both as a statement and as a condition predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCall {
    pub namespace: Namespace,
    pub name: Ident,
    #[serde(default)]
    pub args: Vec<Expr>,
    #[serde(default)]
    pub tags: Vec<TagArg>,
    /// Target selector name, e.g. `Killer` in `player(Killer).Heal()`.
    #[serde(default)]
    pub target: Option<Ident>,
    #[serde(default)]
    pub span: Span,
}

/// Scope annotation written in the script (`saved x`, `game x`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeAnnotation {
    Line,
    Local,
    Game,
    Saved,
}

/// A variable reference with its optional explicit scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarRef {
    pub name: Ident,
    #[serde(default)]
    pub scope: Option<ScopeAnnotation>,
}

impl VarRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Ident::from(name.into().as_str()),
            scope: None,
        }
    }

    pub fn scoped(name: impl Into<String>, scope: ScopeAnnotation) -> Self {
        Self {
            scope: Some(scope),
            ..Self::new(name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetStmt {
    pub var: VarRef,
    #[serde(default)]
    pub value: Option<Expr>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignStmt {
    pub target: VarRef,
    pub op: AssignOp,
    pub value: Expr,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub condition: Condition,
    pub then_block: Block,
    #[serde(default)]
    pub else_branch: Option<ElseBranch>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElseBranch {
    Block(Block),
    If(Box<IfStmt>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    NotEq,
    Greater,
    GreaterEq,
    Less,
    LessEq,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// `lhs <op> rhs`
    Compare {
        op: CompareOp,
        lhs: Expr,
        rhs: Expr,
        #[serde(default)]
        span: Span,
    },
    /// `player.IsSneaking()`
    Check(ActionCall),
    /// `not cond`
    Not(Box<Condition>),
}

impl Condition {
    pub fn span(&self) -> Span {
        match self {
            Condition::Compare { span, .. } => *span,
            Condition::Check(call) => call.span,
            Condition::Not(inner) => inner.span(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatStmt {
    pub kind: RepeatKind,
    pub body: Block,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatKind {
    /// `repeat n { }`
    Times(Expr),
    /// `forever { }`
    Forever,
    /// `while cond { }`
    While(Condition),
    /// `for x in list { }`
    ForEach { var: VarRef, list: Expr },
    /// `for i in start..end { }`
    Range { var: VarRef, start: Expr, end: Expr },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallStmt {
    pub name: Ident,
    #[serde(default)]
    pub args: Vec<Expr>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartStmt {
    pub name: Ident,
    #[serde(default)]
    pub span: Span,
}

/// `wait`, `wait(20)`, `wait(2) [Time Unit = Seconds]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitStmt {
    #[serde(default)]
    pub duration: Option<Expr>,
    #[serde(default)]
    pub tags: Vec<TagArg>,
    #[serde(default)]
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default)]
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ExprKind::Text(text.into()).into()
    }

    pub fn number(value: f64) -> Self {
        ExprKind::Number(value).into()
    }

    pub fn var(var: VarRef) -> Self {
        ExprKind::Var(var).into()
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
        .into()
    }
}

impl From<ExprKind> for Expr {
    fn from(kind: ExprKind) -> Self {
        Self::new(kind, Span::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// A `name = value` setting inside a particle literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleField {
    pub name: Ident,
    pub value: Literal,
}

/// Bare literal allowed inside compound literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    Text(String),
    Number(f64),
    /// `loc(x, y, z)` / `loc(x, y, z, pitch, yaw)`
    Location {
        x: f64,
        y: f64,
        z: f64,
        #[serde(default)]
        pitch: f64,
        #[serde(default)]
        yaw: f64,
    },
    /// `vec(x, y, z)`
    Vector { x: f64, y: f64, z: f64 },
    /// `sound("Pling", 1.0, 2.0)`
    Sound { name: String, pitch: f64, volume: f64 },
    /// `potion("Speed", 200, 1)`
    Potion { name: String, duration: f64, level: f64 },
    /// `particle("Cloud") { amount = 5, motion_x = 0.2 }`
    Particle {
        name: String,
        #[serde(default)]
        fields: Vec<ParticleField>,
    },
    /// `item(...)`; payload is opaque.
    Item(String),
    Var(VarRef),
    /// `%CurrentHealth` / `%CurrentHealth(Killer)`
    GameValue {
        name: Ident,
        #[serde(default)]
        target: Option<Ident>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}
