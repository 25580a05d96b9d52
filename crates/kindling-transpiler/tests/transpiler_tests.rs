//! Transpiler tests: statement lowering, catalog checks, scope resolution.

use kindling_ir::{
    BlockKind, BracketKind, CallKind, Header, Instruction, Program, Selector, Value,
};
use kindling_transpiler::{transpile, TranspileError};
use kindling_types::ast::*;
use kindling_types::{ErrorCode, Span};

// ══════════════════════════════════════════════════════════════════════════════
// AST builders
// ══════════════════════════════════════════════════════════════════════════════

fn call(namespace: Namespace, name: &str, args: Vec<Expr>) -> ActionCall {
    ActionCall {
        namespace,
        name: name.into(),
        args,
        tags: vec![],
        target: None,
        span: Span::point(2, 5),
    }
}

fn send(text: &str) -> Stmt {
    Stmt::Action(call(Namespace::Player, "SendMessage", vec![Expr::text(text)]))
}

fn on(name: &str, stmts: Vec<Stmt>) -> Item {
    Item::Event(EventDecl {
        kind: EventKind::Player,
        name: name.into(),
        body: Block::new(stmts),
        span: Span::point(1, 1),
    })
}

fn function(name: &str, params: &[&str], stmts: Vec<Stmt>) -> Item {
    Item::Function(FunctionDecl {
        name: name.into(),
        params: params.iter().map(|p| Ident::from(*p)).collect(),
        body: Block::new(stmts),
        span: Span::point(1, 1),
    })
}

fn process(name: &str, stmts: Vec<Stmt>) -> Item {
    Item::Process(ProcessDecl {
        name: name.into(),
        body: Block::new(stmts),
        span: Span::point(1, 1),
    })
}

fn var(name: &str) -> Expr {
    Expr::var(VarRef::new(name))
}

fn let_(name: &str, value: Expr) -> Stmt {
    Stmt::Let(LetStmt {
        var: VarRef::new(name),
        value: Some(value),
        span: Span::default(),
    })
}

fn compare(op: CompareOp, lhs: Expr, rhs: Expr) -> Condition {
    Condition::Compare {
        op,
        lhs,
        rhs,
        span: Span::point(3, 4),
    }
}

fn if_(condition: Condition, then: Vec<Stmt>, else_branch: Option<ElseBranch>) -> Stmt {
    Stmt::If(IfStmt {
        condition,
        then_block: Block::new(then),
        else_branch,
        span: Span::default(),
    })
}

fn repeat(kind: RepeatKind, body: Vec<Stmt>) -> Stmt {
    Stmt::Repeat(RepeatStmt {
        kind,
        body: Block::new(body),
        span: Span::default(),
    })
}

fn script(items: Vec<Item>) -> Script {
    Script {
        items,
        span: Span::default(),
    }
}

fn lower(items: Vec<Item>) -> Program {
    transpile(&script(items)).expect("script should transpile")
}

fn lower_err(items: Vec<Item>) -> TranspileError {
    transpile(&script(items)).expect_err("script should fail")
}

fn body(program: &Program, unit: usize) -> &[Instruction] {
    &program.units[unit].body
}

// ══════════════════════════════════════════════════════════════════════════════
// Units and statements
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn one_unit_per_item_in_source_order() {
    let program = lower(vec![
        on("Join", vec![send("hi")]),
        function("greet", &["who"], vec![]),
        process("ticker", vec![]),
    ]);
    let headers: Vec<String> = program.units.iter().map(|u| u.header.to_string()).collect();
    assert_eq!(headers, vec!["on Join", "fn greet(who)", "process ticker"]);
}

#[test]
fn action_gets_default_tags_appended() {
    let program = lower(vec![on("Join", vec![send("Welcome!")])]);
    let Instruction::Action(action) = &body(&program, 0)[0] else {
        panic!("expected an action");
    };
    assert_eq!(action.block, BlockKind::PlayerAction);
    assert_eq!(action.name, "SendMessage");
    assert_eq!(action.args.len(), 3);
    assert_eq!(action.args[0], Value::text("Welcome!"));
    let Value::Tag(alignment) = &action.args[1] else {
        panic!("expected a tag");
    };
    assert_eq!(alignment.tag, "Alignment Mode");
    assert_eq!(alignment.option, "Regular");
    assert_eq!(alignment.action, "SendMessage");
    assert_eq!(alignment.block, "player_action");
}

#[test]
fn explicit_tag_overrides_default() {
    let mut wait = WaitStmt {
        duration: Some(Expr::number(2.0)),
        tags: vec![TagArg {
            name: "Time Unit".into(),
            option: "Seconds".into(),
            span: Span::default(),
        }],
        span: Span::default(),
    };
    let program = lower(vec![on("Join", vec![Stmt::Wait(wait.clone())])]);
    assert_eq!(
        body(&program, 0)[0].to_string(),
        "control Wait(2, {Time Unit = Seconds})"
    );

    wait.tags[0].option = "Hours".into();
    let err = lower_err(vec![on("Join", vec![Stmt::Wait(wait)])]);
    assert_eq!(err.code(), ErrorCode::INVALID_TAG_OPTION);
}

#[test]
fn unknown_tag_is_rejected() {
    let mut action = call(Namespace::Player, "Heal", vec![]);
    action.tags.push(TagArg {
        name: "Alignment Mode".into(),
        option: "Centered".into(),
        span: Span::point(4, 9),
    });
    let err = lower_err(vec![on("Join", vec![Stmt::Action(action)])]);
    assert_eq!(err.code(), ErrorCode::UNKNOWN_TAG);
    assert_eq!(err.span(), Span::point(4, 9));
}

#[test]
fn target_selector_resolves() {
    let mut heal = call(Namespace::Player, "Heal", vec![]);
    heal.target = Some("Killer".into());
    let program = lower(vec![on("Death", vec![Stmt::Action(heal.clone())])]);
    let Instruction::Action(action) = &body(&program, 0)[0] else {
        panic!("expected an action");
    };
    assert_eq!(action.target, Some(Selector::Killer));

    heal.target = Some("Nobody".into());
    let err = lower_err(vec![on("Death", vec![Stmt::Action(heal)])]);
    assert_eq!(err.code(), ErrorCode::UNKNOWN_SELECTOR);
}

#[test]
fn calls_and_starts() {
    let program = lower(vec![
        on(
            "Join",
            vec![
                Stmt::Call(CallStmt {
                    name: "greet".into(),
                    args: vec![Expr::text("friend")],
                    span: Span::default(),
                }),
                Stmt::Start(StartStmt {
                    name: "ticker".into(),
                    span: Span::default(),
                }),
            ],
        ),
        function("greet", &["who"], vec![]),
        process("ticker", vec![]),
    ]);
    let Instruction::Call(greet) = &body(&program, 0)[0] else {
        panic!("expected a call");
    };
    assert_eq!(greet.kind, CallKind::Function);
    assert_eq!(greet.args, vec![Value::text("friend")]);
    let Instruction::Call(start) = &body(&program, 0)[1] else {
        panic!("expected a call");
    };
    assert_eq!(start.kind, CallKind::Process);
    assert_eq!(start.name, "ticker");
}

#[test]
fn return_ends_events_and_returns_from_functions() {
    let program = lower(vec![
        on("Join", vec![Stmt::Return(Span::default())]),
        function("f", &[], vec![Stmt::Return(Span::default())]),
    ]);
    assert_eq!(body(&program, 0)[0].to_string(), "control End()");
    assert_eq!(body(&program, 1)[0].to_string(), "control Return()");
}

// ══════════════════════════════════════════════════════════════════════════════
// Variables and arithmetic
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn let_defaults_to_line_scope() {
    let program = lower(vec![on("Join", vec![let_("x", Expr::number(1.0)), send("ok")])]);
    assert_eq!(body(&program, 0)[0].to_string(), "set_var =(line[x], 1)");
}

#[test]
fn parameters_resolve_to_local_scope() {
    let program = lower(vec![function(
        "greet",
        &["who"],
        vec![Stmt::Action(call(Namespace::Player, "SendMessage", vec![var("who")]))],
    )]);
    assert!(body(&program, 0)[0].to_string().contains("local[who]"));
}

#[test]
fn annotation_wins_and_needs_no_declaration() {
    let saved = Expr::var(VarRef::scoped("coins", ScopeAnnotation::Saved));
    let program = lower(vec![on(
        "Join",
        vec![Stmt::Action(call(Namespace::Player, "SendMessage", vec![saved]))],
    )]);
    assert!(body(&program, 0)[0].to_string().contains("saved[coins]"));
}

#[test]
fn undeclared_variable_is_unresolved() {
    let err = lower_err(vec![on(
        "Join",
        vec![Stmt::Action(call(Namespace::Player, "SendMessage", vec![var("ghost")]))],
    )]);
    assert!(matches!(err, TranspileError::UnresolvedVariable { ref name, .. } if name == "ghost"));
    assert_eq!(err.code(), ErrorCode::UNRESOLVED_VARIABLE);
}

#[test]
fn block_bindings_do_not_leak() {
    let err = lower_err(vec![on(
        "Join",
        vec![
            if_(
                compare(CompareOp::Eq, Expr::number(1.0), Expr::number(1.0)),
                vec![let_("inner", Expr::number(2.0))],
                None,
            ),
            Stmt::Action(call(Namespace::Player, "SendMessage", vec![var("inner")])),
        ],
    )]);
    assert_eq!(err.code(), ErrorCode::UNRESOLVED_VARIABLE);
}

#[test]
fn arithmetic_flattens_into_temporaries() {
    // send((a + 2) * 3)
    let expr = Expr::binary(
        BinaryOp::Mul,
        Expr::binary(BinaryOp::Add, var("a"), Expr::number(2.0)),
        Expr::number(3.0),
    );
    let program = lower(vec![on(
        "Join",
        vec![
            let_("a", Expr::number(1.0)),
            Stmt::Action(call(Namespace::Player, "SendMessage", vec![expr])),
        ],
    )]);
    let lines: Vec<String> = body(&program, 0).iter().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "set_var =(line[a], 1)",
            "set_var +(line[__tmp0], line[a], 2)",
            "set_var x(line[__tmp1], line[__tmp0], 3)",
            "player_action SendMessage(line[__tmp1], {Alignment Mode = Regular}, {Text Value Merging = Add spaces})",
        ]
    );
}

#[test]
fn temporaries_restart_per_unit() {
    let sum = || Expr::binary(BinaryOp::Add, Expr::number(1.0), Expr::number(2.0));
    let program = lower(vec![
        on("Join", vec![let_("x", sum())]),
        on("Leave", vec![let_("y", sum())]),
    ]);
    assert!(body(&program, 0)[0].to_string().contains("__tmp0"));
    assert!(body(&program, 1)[0].to_string().contains("__tmp0"));
}

#[test]
fn compound_assignment_forms() {
    let assign = |op| {
        Stmt::Assign(AssignStmt {
            target: VarRef::scoped("n", ScopeAnnotation::Game),
            op,
            value: Expr::number(2.0),
            span: Span::default(),
        })
    };
    let program = lower(vec![on(
        "Join",
        vec![assign(AssignOp::Add), assign(AssignOp::Mul)],
    )]);
    assert_eq!(body(&program, 0)[0].to_string(), "set_var +=(game[n], 2)");
    assert_eq!(body(&program, 0)[1].to_string(), "set_var x(game[n], game[n], 2)");
}

// ══════════════════════════════════════════════════════════════════════════════
// Brackets
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn if_else_if_nests_in_else_body() {
    let inner = IfStmt {
        condition: compare(CompareOp::Less, var("hp"), Expr::number(5.0)),
        then_block: Block::new(vec![send("low")]),
        else_branch: None,
        span: Span::default(),
    };
    let program = lower(vec![function(
        "check",
        &["hp"],
        vec![if_(
            compare(CompareOp::Greater, var("hp"), Expr::number(15.0)),
            vec![send("high")],
            Some(ElseBranch::If(Box::new(inner))),
        )],
    )]);
    let Instruction::Bracket(outer) = &body(&program, 0)[0] else {
        panic!("expected a bracket");
    };
    assert_eq!(outer.describe(), "if_var >");
    let else_body = outer.else_body.as_ref().expect("else body");
    let Instruction::Bracket(nested) = &else_body[0] else {
        panic!("expected a nested bracket");
    };
    assert_eq!(nested.describe(), "if_var <");
}

#[test]
fn condition_operands_go_into_setup() {
    let program = lower(vec![function(
        "f",
        &["a"],
        vec![if_(
            compare(
                CompareOp::GreaterEq,
                Expr::binary(BinaryOp::Add, var("a"), Expr::number(1.0)),
                Expr::number(3.0),
            ),
            vec![],
            None,
        )],
    )]);
    assert_eq!(body(&program, 0).len(), 1);
    let Instruction::Bracket(b) = &body(&program, 0)[0] else {
        panic!("expected a bracket");
    };
    assert_eq!(b.setup.len(), 1);
    assert_eq!(b.setup[0].to_string(), "set_var +(line[__tmp0], local[a], 1)");
}

#[test]
fn not_inverts_predicates() {
    let program = lower(vec![on(
        "Sneak",
        vec![if_(
            Condition::Not(Box::new(Condition::Check(call(Namespace::Player, "IsFlying", vec![])))),
            vec![],
            None,
        )],
    )]);
    let Instruction::Bracket(b) = &body(&program, 0)[0] else {
        panic!("expected a bracket");
    };
    let BracketKind::If(c) = &b.kind else {
        panic!("expected an if");
    };
    assert_eq!(c.block, BlockKind::IfPlayer);
    assert!(c.inverted);
}

#[test]
fn simple_while_uses_native_repeat() {
    let program = lower(vec![on(
        "Sneak",
        vec![repeat(
            RepeatKind::While(Condition::Check(call(Namespace::Player, "IsSneaking", vec![]))),
            vec![Stmt::Wait(WaitStmt {
                duration: None,
                tags: vec![],
                span: Span::default(),
            })],
        )],
    )]);
    assert!(body(&program, 0)[0]
        .to_string()
        .starts_with("repeat While() while IsSneaking {"));
}

#[test]
fn while_with_setup_lowers_to_guarded_forever() {
    let cond = compare(
        CompareOp::Less,
        Expr::binary(BinaryOp::Mul, var("n"), Expr::number(2.0)),
        Expr::number(100.0),
    );
    let program = lower(vec![function("f", &["n"], vec![repeat(RepeatKind::While(cond), vec![send("tick")])])]);
    let Instruction::Bracket(b) = &body(&program, 0)[0] else {
        panic!("expected a bracket");
    };
    let BracketKind::Repeat(head) = &b.kind else {
        panic!("expected a repeat");
    };
    assert_eq!(head.name, "Forever");
    let Instruction::Bracket(guard) = &b.body[0] else {
        panic!("expected the loop guard first");
    };
    let BracketKind::If(c) = &guard.kind else {
        panic!("expected an if");
    };
    assert!(c.inverted);
    assert_eq!(guard.setup.len(), 1);
    assert_eq!(guard.body[0].to_string(), "control StopRepeat()");
    assert_eq!(b.body.len(), 2);
}

#[test]
fn loop_variables_are_bound_in_the_body_only() {
    let range = RepeatKind::Range {
        var: VarRef::new("i"),
        start: Expr::number(1.0),
        end: Expr::number(10.0),
    };
    let program = lower(vec![on(
        "Join",
        vec![repeat(
            range.clone(),
            vec![Stmt::Action(call(Namespace::Player, "SendMessage", vec![var("i")]))],
        )],
    )]);
    let text = body(&program, 0)[0].to_string();
    assert!(text.starts_with("repeat Range(line[i], 1, 10) {"));

    let err = lower_err(vec![on(
        "Join",
        vec![
            repeat(range, vec![]),
            Stmt::Action(call(Namespace::Player, "SendMessage", vec![var("i")])),
        ],
    )]);
    assert_eq!(err.code(), ErrorCode::UNRESOLVED_VARIABLE);
}

#[test]
fn break_outside_loop_is_misplaced() {
    let err = lower_err(vec![on("Join", vec![Stmt::Break(Span::point(6, 2))])]);
    assert_eq!(err.code(), ErrorCode::MISPLACED_STATEMENT);
    let program = lower(vec![on(
        "Join",
        vec![repeat(RepeatKind::Forever, vec![Stmt::Break(Span::default())])],
    )]);
    let Instruction::Bracket(b) = &body(&program, 0)[0] else {
        panic!("expected a bracket");
    };
    assert_eq!(b.body[0].to_string(), "control StopRepeat()");
}

// ══════════════════════════════════════════════════════════════════════════════
// Catalog errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn unknown_instruction() {
    let err = lower_err(vec![on(
        "Join",
        vec![Stmt::Action(call(Namespace::Player, "Fly", vec![]))],
    )]);
    assert_eq!(err.code(), ErrorCode::UNKNOWN_INSTRUCTION);
    assert_eq!(err.to_string(), "2:5: unknown player_action action `Fly`");
}

#[test]
fn argument_count_and_kind() {
    let err = lower_err(vec![on(
        "Join",
        vec![Stmt::Action(call(Namespace::Player, "Teleport", vec![]))],
    )]);
    assert_eq!(err.code(), ErrorCode::ARGUMENT_COUNT);

    let err = lower_err(vec![on(
        "Join",
        vec![Stmt::Action(call(Namespace::Player, "Damage", vec![Expr::text("lots")]))],
    )]);
    assert_eq!(err.code(), ErrorCode::ARGUMENT_KIND);
    assert!(err.to_string().contains("must be a number, found text"));
}

#[test]
fn plural_arguments_must_fit_the_chest() {
    let message = |n: usize| {
        let args = (0..n).map(|i| Expr::text(format!("part {i}"))).collect();
        Stmt::Action(call(Namespace::Player, "SendMessage", args))
    };
    // Two tags leave 25 slots for message parts.
    let program = lower(vec![on("Join", vec![message(25)])]);
    match &body(&program, 0)[0] {
        Instruction::Action(a) => assert_eq!(a.args.len(), 27),
        other => panic!("expected action, got {other:?}"),
    }

    let err = lower_err(vec![on("Join", vec![message(26)])]);
    assert_eq!(err.code(), ErrorCode::ARGUMENT_COUNT);
    assert!(err.to_string().contains("takes at most 25 argument(s), found 26"), "{err}");
}

#[test]
fn arithmetic_on_text_is_an_argument_kind_error() {
    let err = lower_err(vec![on(
        "Join",
        vec![let_("x", Expr::binary(BinaryOp::Add, Expr::text("a"), Expr::number(1.0)))],
    )]);
    assert_eq!(err.code(), ErrorCode::ARGUMENT_KIND);
}

#[test]
fn function_arity_must_match() {
    let err = lower_err(vec![
        on(
            "Join",
            vec![Stmt::Call(CallStmt {
                name: "greet".into(),
                args: vec![],
                span: Span::default(),
            })],
        ),
        function("greet", &["who"], vec![]),
    ]);
    assert_eq!(err.code(), ErrorCode::ARGUMENT_COUNT);
}

#[test]
fn undefined_call_targets() {
    let err = lower_err(vec![on(
        "Join",
        vec![Stmt::Start(StartStmt {
            name: "nowhere".into(),
            span: Span::default(),
        })],
    )]);
    assert_eq!(err.code(), ErrorCode::UNKNOWN_FUNCTION);
}

#[test]
fn definition_errors() {
    let err = lower_err(vec![function("a", &[], vec![]), process("a", vec![])]);
    assert_eq!(err.code(), ErrorCode::DUPLICATE_DEFINITION);
    let err = lower_err(vec![on("Join", vec![]), on("Join", vec![])]);
    assert_eq!(err.code(), ErrorCode::DUPLICATE_DEFINITION);
    let err = lower_err(vec![on("Jmup", vec![])]);
    assert_eq!(err.code(), ErrorCode::UNKNOWN_EVENT);
}

#[test]
fn invalid_literals() {
    let potion = Expr::from(ExprKind::Potion {
        name: "Speed".into(),
        duration: 12.5,
        level: 1.0,
    });
    let err = lower_err(vec![on(
        "Join",
        vec![Stmt::Action(call(Namespace::Player, "GivePotion", vec![potion]))],
    )]);
    assert_eq!(err.code(), ErrorCode::INVALID_LITERAL);
}

// ══════════════════════════════════════════════════════════════════════════════
// JSON input and determinism
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn transpiles_json_ast() {
    let json = r#"{
        "items": [{
            "event": {
                "kind": "player",
                "name": {"name": "Join"},
                "body": {"stmts": [
                    {"action": {
                        "namespace": "player",
                        "name": {"name": "SendMessage"},
                        "args": [{"kind": {"text": "Welcome!"}}],
                        "tags": [{"name": "Alignment Mode", "option": "Centered"}]
                    }}
                ]}
            }
        }]
    }"#;
    let script: Script = serde_json::from_str(json).unwrap();
    let program = transpile(&script).unwrap();
    assert_eq!(
        program.units[0].header,
        Header::Event {
            kind: kindling_ir::EventKind::Player,
            name: "Join".into()
        }
    );
    assert!(program.units[0].body[0]
        .to_string()
        .contains("{Alignment Mode = Centered}"));
}

#[test]
fn transpile_is_deterministic() {
    let items = || {
        vec![
            on(
                "Join",
                vec![
                    let_("x", Expr::binary(BinaryOp::Add, Expr::number(1.0), Expr::number(2.0))),
                    if_(
                        compare(CompareOp::Eq, var("x"), Expr::number(3.0)),
                        vec![send("three")],
                        Some(ElseBranch::Block(Block::new(vec![send("other")]))),
                    ),
                ],
            ),
            function("f", &["a", "b"], vec![repeat(RepeatKind::Forever, vec![])]),
        ]
    };
    let first = lower(items());
    for i in 0..100 {
        assert_eq!(lower(items()), first, "iteration {i} diverged");
    }
}
