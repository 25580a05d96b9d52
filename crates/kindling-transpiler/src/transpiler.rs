//! Statement lowering: script items and statements to instruction trees.

use std::collections::{HashMap, HashSet};

use kindling_ir::{
    Action, BlockKind, Bracket, BracketKind, Call, CallKind, Condition, EventKind, Header,
    Instruction, Program, Repeat, Selector, Tag, Unit, Value, VariableScope, CHEST_SLOTS,
};
use kindling_types::ast::{self, Block, ElseBranch, Item, RepeatKind, Script, Stmt, TagArg};
use kindling_types::Span;
use tracing::{debug, trace};

use crate::catalog::Catalog;
use crate::error::{TranspileError, TranspileResult};
use crate::scope::{FrameKind, ScopeStack};

/// Lower a script against the built-in catalog.
pub fn transpile(script: &Script) -> TranspileResult<Program> {
    let catalog = Catalog::standard();
    Transpiler::new(&catalog).transpile(script)
}

/// Single-use lowering pass. Stops at the first error.
pub struct Transpiler<'c> {
    pub(crate) catalog: &'c Catalog,
    /// Function name → parameter count.
    functions: HashMap<String, usize>,
    processes: HashSet<String>,
    pub(crate) scopes: ScopeStack,
    /// Next temporary index; restarts for every unit.
    pub(crate) temps: usize,
}

impl<'c> Transpiler<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            functions: HashMap::new(),
            processes: HashSet::new(),
            scopes: ScopeStack::new(),
            temps: 0,
        }
    }

    pub fn transpile(mut self, script: &Script) -> TranspileResult<Program> {
        self.collect_definitions(script)?;
        let mut units = Vec::with_capacity(script.items.len());
        for item in &script.items {
            units.push(self.lower_item(item)?);
        }
        debug!(units = units.len(), "transpiled script");
        Ok(Program { units })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Top Level
    // ══════════════════════════════════════════════════════════════════════

    /// Record every callable up front so calls may precede definitions.
    fn collect_definitions(&mut self, script: &Script) -> TranspileResult<()> {
        let mut events = HashSet::new();
        for item in &script.items {
            match item {
                Item::Event(e) => {
                    let kind = event_kind(e.kind);
                    if !self.catalog.has_event(kind, &e.name.name) {
                        return Err(TranspileError::UnknownEvent {
                            name: e.name.name.clone(),
                            span: e.name.span,
                        });
                    }
                    if !events.insert((kind, e.name.name.as_str())) {
                        return Err(TranspileError::DuplicateDefinition {
                            name: e.name.name.clone(),
                            span: e.span,
                        });
                    }
                }
                Item::Function(f) => {
                    self.define(&f.name)?;
                    self.functions.insert(f.name.name.clone(), f.params.len());
                }
                Item::Process(p) => {
                    self.define(&p.name)?;
                    self.processes.insert(p.name.name.clone());
                }
            }
        }
        Ok(())
    }

    fn define(&self, name: &ast::Ident) -> TranspileResult<()> {
        if self.functions.contains_key(&name.name) || self.processes.contains(&name.name) {
            return Err(TranspileError::DuplicateDefinition {
                name: name.name.clone(),
                span: name.span,
            });
        }
        Ok(())
    }

    fn lower_item(&mut self, item: &Item) -> TranspileResult<Unit> {
        self.temps = 0;
        let (header, frame, block) = match item {
            Item::Event(e) => (
                Header::Event {
                    kind: event_kind(e.kind),
                    name: e.name.name.clone(),
                },
                FrameKind::Event,
                &e.body,
            ),
            Item::Function(f) => (
                Header::Function {
                    name: f.name.name.clone(),
                    params: f.params.iter().map(|p| p.name.clone()).collect(),
                    hidden: false,
                },
                FrameKind::Function,
                &f.body,
            ),
            Item::Process(p) => (
                Header::Process {
                    name: p.name.name.clone(),
                },
                FrameKind::Process,
                &p.body,
            ),
        };

        self.scopes.push(frame);
        if let Item::Function(f) = item {
            // Local storage follows the thread, so parameters survive
            // calls into continuation templates.
            for param in &f.params {
                self.scopes.declare(&param.name, VariableScope::Local);
            }
        }
        let body = self.lower_stmts(&block.stmts);
        self.scopes.pop();
        let body = body?;

        trace!(unit = %header.unit_name(), nodes = body.len(), "lowered unit");
        Ok(Unit { header, body })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn lower_stmts(&mut self, stmts: &[Stmt]) -> TranspileResult<Vec<Instruction>> {
        let mut out = Vec::new();
        for stmt in stmts {
            self.lower_stmt(stmt, &mut out)?;
        }
        Ok(out)
    }

    /// Lower `block` inside a fresh frame, optionally binding one name first.
    fn lower_nested(
        &mut self,
        kind: FrameKind,
        block: &Block,
        binding: Option<(&str, VariableScope)>,
    ) -> TranspileResult<Vec<Instruction>> {
        self.scopes.push(kind);
        if let Some((name, scope)) = binding {
            self.scopes.declare(name, scope);
        }
        let body = self.lower_stmts(&block.stmts);
        self.scopes.pop();
        body
    }

    fn lower_stmt(&mut self, stmt: &Stmt, out: &mut Vec<Instruction>) -> TranspileResult<()> {
        match stmt {
            Stmt::Action(call) => {
                let action = self.lower_action(call, out)?;
                out.push(action.into());
            }
            Stmt::Let(l) => {
                // The initializer sees the outer binding of the same name.
                let value = match &l.value {
                    Some(expr) => Some(self.lower_value(expr, out)?),
                    None => None,
                };
                let scope = l.var.scope.map_or(VariableScope::Line, scope_of);
                self.scopes.declare(&l.var.name.name, scope);
                if let Some(value) = value {
                    let var = Value::var(l.var.name.name.clone(), scope);
                    out.push(self.set_var("=", vec![var, value], l.span)?);
                }
            }
            Stmt::Assign(a) => {
                let target = self.resolve_var(&a.target)?;
                let value = self.lower_value(&a.value, out)?;
                let ins = match a.op {
                    ast::AssignOp::Set => self.set_var("=", vec![target, value], a.span)?,
                    ast::AssignOp::Add => self.set_var("+=", vec![target, value], a.span)?,
                    ast::AssignOp::Sub => self.set_var("-=", vec![target, value], a.span)?,
                    ast::AssignOp::Mul => {
                        self.set_var("x", vec![target.clone(), target, value], a.span)?
                    }
                    ast::AssignOp::Div => {
                        self.set_var("/", vec![target.clone(), target, value], a.span)?
                    }
                    ast::AssignOp::Mod => {
                        self.set_var("%", vec![target.clone(), target, value], a.span)?
                    }
                };
                out.push(ins);
            }
            Stmt::If(i) => out.push(self.lower_if(i)?.into()),
            Stmt::Repeat(r) => out.push(self.lower_repeat(r)?.into()),
            Stmt::Call(c) => {
                let Some(&arity) = self.functions.get(&c.name.name) else {
                    return Err(TranspileError::UnknownFunction {
                        name: c.name.name.clone(),
                        span: c.name.span,
                    });
                };
                if c.args.len() != arity {
                    return Err(TranspileError::ArgumentCount {
                        action: c.name.name.clone(),
                        expected: arity.to_string(),
                        found: c.args.len(),
                        span: c.span,
                    });
                }
                let mut args = Vec::with_capacity(arity);
                for expr in &c.args {
                    args.push(self.lower_value(expr, out)?);
                }
                out.push(
                    Call {
                        kind: CallKind::Function,
                        name: c.name.name.clone(),
                        args,
                    }
                    .into(),
                );
            }
            Stmt::Start(s) => {
                if !self.processes.contains(&s.name.name) {
                    return Err(TranspileError::UnknownFunction {
                        name: s.name.name.clone(),
                        span: s.name.span,
                    });
                }
                out.push(
                    Call {
                        kind: CallKind::Process,
                        name: s.name.name.clone(),
                        args: Vec::new(),
                    }
                    .into(),
                );
            }
            Stmt::Wait(w) => {
                let args = match &w.duration {
                    Some(expr) => vec![self.lower_value(expr, out)?],
                    None => Vec::new(),
                };
                out.push(self.control("Wait", args, &w.tags, w.span)?);
            }
            Stmt::Return(span) => {
                let name = match self.scopes.unit_kind() {
                    Some(FrameKind::Event) => "End",
                    _ => "Return",
                };
                out.push(self.control(name, Vec::new(), &[], *span)?);
            }
            Stmt::Break(span) => {
                self.require_loop("`break`", *span)?;
                out.push(self.control("StopRepeat", Vec::new(), &[], *span)?);
            }
            Stmt::Continue(span) => {
                self.require_loop("`continue`", *span)?;
                out.push(self.control("Skip", Vec::new(), &[], *span)?);
            }
        }
        Ok(())
    }

    fn require_loop(&self, what: &str, span: Span) -> TranspileResult<()> {
        if self.scopes.in_loop() {
            Ok(())
        } else {
            Err(TranspileError::Misplaced {
                what: format!("{what} outside a loop"),
                span,
            })
        }
    }

    pub(crate) fn lower_action(
        &mut self,
        call: &ast::ActionCall,
        out: &mut Vec<Instruction>,
    ) -> TranspileResult<Action> {
        let block = match call.namespace {
            ast::Namespace::Player => BlockKind::PlayerAction,
            ast::Namespace::Entity => BlockKind::EntityAction,
            ast::Namespace::Game => BlockKind::GameAction,
            ast::Namespace::Var => BlockKind::SetVar,
            ast::Namespace::Control => BlockKind::Control,
        };
        let target = self.lower_target(call.target.as_ref(), block)?;
        let mut args = Vec::with_capacity(call.args.len());
        for expr in &call.args {
            args.push(self.lower_value(expr, out)?);
        }
        let args = self.finish_args(block, &call.name.name, args, &call.tags, call.span)?;
        Ok(Action {
            block,
            name: call.name.name.clone(),
            args,
            target,
        })
    }

    fn lower_target(
        &self,
        target: Option<&ast::Ident>,
        block: BlockKind,
    ) -> TranspileResult<Option<Selector>> {
        let Some(target) = target else {
            return Ok(None);
        };
        let targeted = matches!(
            block,
            BlockKind::PlayerAction
                | BlockKind::EntityAction
                | BlockKind::IfPlayer
                | BlockKind::IfEntity
        );
        if !targeted {
            return Err(TranspileError::Misplaced {
                what: format!("a target selector on a {} block", block.id()),
                span: target.span,
            });
        }
        Selector::from_name(&target.name)
            .map(Some)
            .ok_or_else(|| TranspileError::UnknownSelector {
                name: target.name.clone(),
                span: target.span,
            })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Brackets
    // ══════════════════════════════════════════════════════════════════════

    fn lower_if(&mut self, stmt: &ast::IfStmt) -> TranspileResult<Bracket> {
        let mut setup = Vec::new();
        let condition = self.lower_condition(&stmt.condition, &mut setup)?;
        let body = self.lower_nested(FrameKind::Block, &stmt.then_block, None)?;
        let else_body = match &stmt.else_branch {
            None => None,
            Some(ElseBranch::Block(block)) => {
                Some(self.lower_nested(FrameKind::Block, block, None)?)
            }
            Some(ElseBranch::If(nested)) => Some(vec![self.lower_if(nested)?.into()]),
        };
        Ok(Bracket {
            kind: BracketKind::If(condition),
            setup,
            body,
            else_body,
        })
    }

    fn lower_condition(
        &mut self,
        cond: &ast::Condition,
        setup: &mut Vec<Instruction>,
    ) -> TranspileResult<Condition> {
        match cond {
            ast::Condition::Compare { op, lhs, rhs, span } => {
                let lhs = self.lower_value(lhs, setup)?;
                let rhs = self.lower_value(rhs, setup)?;
                let name = compare_name(*op);
                let args = self.finish_args(BlockKind::IfVar, name, vec![lhs, rhs], &[], *span)?;
                Ok(Condition {
                    block: BlockKind::IfVar,
                    name: name.to_string(),
                    args,
                    target: None,
                    inverted: false,
                })
            }
            ast::Condition::Check(call) => {
                let block = match call.namespace {
                    ast::Namespace::Player => BlockKind::IfPlayer,
                    ast::Namespace::Entity => BlockKind::IfEntity,
                    ast::Namespace::Game => BlockKind::IfGame,
                    ast::Namespace::Var => BlockKind::IfVar,
                    ast::Namespace::Control => {
                        return Err(TranspileError::Misplaced {
                            what: "a control action in a condition".into(),
                            span: call.span,
                        })
                    }
                };
                let target = self.lower_target(call.target.as_ref(), block)?;
                let mut args = Vec::with_capacity(call.args.len());
                for expr in &call.args {
                    args.push(self.lower_value(expr, setup)?);
                }
                let args = self.finish_args(block, &call.name.name, args, &call.tags, call.span)?;
                Ok(Condition {
                    block,
                    name: call.name.name.clone(),
                    args,
                    target,
                    inverted: false,
                })
            }
            ast::Condition::Not(inner) => {
                let mut condition = self.lower_condition(inner, setup)?;
                condition.inverted = !condition.inverted;
                Ok(condition)
            }
        }
    }

    fn lower_repeat(&mut self, stmt: &ast::RepeatStmt) -> TranspileResult<Bracket> {
        let mut setup = Vec::new();
        let (name, args, binding) = match &stmt.kind {
            RepeatKind::Times(count) => {
                let count = self.lower_value(count, &mut setup)?;
                ("Multiple", vec![count], None)
            }
            RepeatKind::Forever => ("Forever", Vec::new(), None),
            RepeatKind::While(cond) => return self.lower_while(cond, stmt),
            RepeatKind::ForEach { var, list } => {
                let list = self.lower_value(list, &mut setup)?;
                let scope = var.scope.map_or(VariableScope::Line, scope_of);
                let var_value = Value::var(var.name.name.clone(), scope);
                ("ForEach", vec![var_value, list], Some((var.name.name.as_str(), scope)))
            }
            RepeatKind::Range { var, start, end } => {
                let start = self.lower_value(start, &mut setup)?;
                let end = self.lower_value(end, &mut setup)?;
                let scope = var.scope.map_or(VariableScope::Line, scope_of);
                let var_value = Value::var(var.name.name.clone(), scope);
                ("Range", vec![var_value, start, end], Some((var.name.name.as_str(), scope)))
            }
        };
        let args = self.finish_args(BlockKind::Repeat, name, args, &[], stmt.span)?;
        let body = self.lower_nested(FrameKind::Loop, &stmt.body, binding)?;
        Ok(Bracket {
            kind: BracketKind::Repeat(Repeat {
                name: name.to_string(),
                args,
                sub_action: None,
                inverted: false,
            }),
            setup,
            body,
            else_body: None,
        })
    }

    /// A condition that evaluates without setup and without a target maps
    /// onto the platform's `While` repeat. Anything else becomes a
    /// `Forever` loop that re-evaluates the condition at the top of every
    /// iteration and stops once it fails.
    fn lower_while(
        &mut self,
        cond: &ast::Condition,
        stmt: &ast::RepeatStmt,
    ) -> TranspileResult<Bracket> {
        let mut cond_setup = Vec::new();
        let condition = self.lower_condition(cond, &mut cond_setup)?;
        let mut body = self.lower_nested(FrameKind::Loop, &stmt.body, None)?;

        if cond_setup.is_empty() && condition.target.is_none() {
            return Ok(Bracket {
                kind: BracketKind::Repeat(Repeat {
                    name: "While".into(),
                    args: condition.args,
                    sub_action: Some(condition.name),
                    inverted: condition.inverted,
                }),
                setup: Vec::new(),
                body,
                else_body: None,
            });
        }

        let exit = Bracket {
            kind: BracketKind::If(Condition {
                inverted: !condition.inverted,
                ..condition
            }),
            setup: cond_setup,
            body: vec![self.control("StopRepeat", Vec::new(), &[], stmt.span)?],
            else_body: None,
        };
        body.insert(0, exit.into());
        let args = self.finish_args(BlockKind::Repeat, "Forever", Vec::new(), &[], stmt.span)?;
        Ok(Bracket {
            kind: BracketKind::Repeat(Repeat {
                name: "Forever".into(),
                args,
                sub_action: None,
                inverted: false,
            }),
            setup: Vec::new(),
            body,
            else_body: None,
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Catalog Checks
    // ══════════════════════════════════════════════════════════════════════

    pub(crate) fn set_var(
        &self,
        name: &str,
        args: Vec<Value>,
        span: Span,
    ) -> TranspileResult<Instruction> {
        let args = self.finish_args(BlockKind::SetVar, name, args, &[], span)?;
        Ok(Action::new(BlockKind::SetVar, name, args).into())
    }

    fn control(
        &self,
        name: &str,
        args: Vec<Value>,
        tags: &[TagArg],
        span: Span,
    ) -> TranspileResult<Instruction> {
        let args = self.finish_args(BlockKind::Control, name, args, tags, span)?;
        Ok(Action::new(BlockKind::Control, name, args).into())
    }

    /// Check `args` against the catalog entry for `(block, name)` and append
    /// one tag value per catalog tag, explicit choice or default.
    pub(crate) fn finish_args(
        &self,
        block: BlockKind,
        name: &str,
        mut args: Vec<Value>,
        tags: &[TagArg],
        span: Span,
    ) -> TranspileResult<Vec<Value>> {
        let sig = self
            .catalog
            .get(block, name)
            .ok_or_else(|| TranspileError::UnknownInstruction {
                block: block.id(),
                name: name.to_string(),
                span,
            })?;

        let too_many = sig.max_args().is_some_and(|max| args.len() > max);
        if args.len() < sig.min_args() || too_many {
            return Err(TranspileError::ArgumentCount {
                action: name.to_string(),
                expected: sig.arity(),
                found: args.len(),
                span,
            });
        }
        // Plain values share the chest with one slot per tag.
        let room = CHEST_SLOTS.saturating_sub(sig.tags.len());
        if args.len() > room {
            return Err(TranspileError::ArgumentCount {
                action: name.to_string(),
                expected: format!("at most {room}"),
                found: args.len(),
                span,
            });
        }
        for (index, value) in args.iter().enumerate() {
            let Some(param) = sig.param_for(index) else {
                continue;
            };
            if !param.kind.accepts(value) {
                return Err(TranspileError::ArgumentKind {
                    action: name.to_string(),
                    position: index + 1,
                    param: param.name,
                    expected: param.kind.to_string(),
                    found: value.kind(),
                    span,
                });
            }
        }

        for given in tags {
            let Some(spec) = sig.tag(&given.name) else {
                return Err(TranspileError::UnknownTag {
                    action: name.to_string(),
                    tag: given.name.clone(),
                    span: given.span,
                });
            };
            if !spec.options.contains(&given.option.as_str()) {
                return Err(TranspileError::InvalidTagOption {
                    tag: given.name.clone(),
                    option: given.option.clone(),
                    allowed: spec.options.to_vec(),
                    span: given.span,
                });
            }
        }
        for spec in &sig.tags {
            let option = tags
                .iter()
                .rev()
                .find(|t| t.name == spec.name)
                .map_or(spec.default, |t| t.option.as_str());
            args.push(Value::Tag(Tag {
                action: name.to_string(),
                tag: spec.name.to_string(),
                option: option.to_string(),
                block: block.id().to_string(),
            }));
        }
        Ok(args)
    }
}

fn event_kind(kind: ast::EventKind) -> EventKind {
    match kind {
        ast::EventKind::Player => EventKind::Player,
        ast::EventKind::Entity => EventKind::Entity,
    }
}

pub(crate) fn scope_of(annotation: ast::ScopeAnnotation) -> VariableScope {
    match annotation {
        ast::ScopeAnnotation::Line => VariableScope::Line,
        ast::ScopeAnnotation::Local => VariableScope::Local,
        ast::ScopeAnnotation::Game => VariableScope::Game,
        ast::ScopeAnnotation::Saved => VariableScope::Saved,
    }
}

fn compare_name(op: ast::CompareOp) -> &'static str {
    match op {
        ast::CompareOp::Eq => "=",
        ast::CompareOp::NotEq => "!=",
        ast::CompareOp::Greater => ">",
        ast::CompareOp::GreaterEq => ">=",
        ast::CompareOp::Less => "<",
        ast::CompareOp::LessEq => "<=",
    }
}
