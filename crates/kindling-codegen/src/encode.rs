//! Template → wire document.
//!
//! A document is `{"blocks": [...]}`: the header block first, then every
//! body node flattened in order. Brackets expand to their setup chain, the
//! head block, an open marker, the body, and a close marker; an `else`
//! adds its own block and marker pair.

use kindling_ir::{
    BlockKind, Bracket, BracketKind, Call, CallKind, EventKind, Header, Instruction, Selector,
    Tag, Template, Value, CHEST_SLOTS,
};
use serde_json::{json, Map, Value as Json};

use crate::error::{CodegenError, CodegenResult};

/// Version of the template document layout.
pub const WIRE_VERSION: u32 = 1;

/// Slot of the last tag; tags fill downward from here.
const LAST_SLOT: usize = CHEST_SLOTS - 1;
const HIDDEN_SLOT: usize = 25;

/// Fails with [`CodegenError::SlotOverflow`] when a block holds more values
/// than its chest has slots.
pub fn encode_template(template: &Template) -> CodegenResult<Json> {
    let mut blocks = vec![header_block(&template.header)?];
    for ins in &template.body {
        push_instruction(&mut blocks, ins)?;
    }
    Ok(json!({ "blocks": blocks }))
}

fn header_block(header: &Header) -> CodegenResult<Json> {
    Ok(match header {
        Header::Event { kind, name } => {
            let block = match kind {
                EventKind::Player => BlockKind::PlayerEvent,
                EventKind::Entity => BlockKind::EntityEvent,
            };
            json!({ "id": "block", "block": block.id(), "action": name })
        }
        Header::Function {
            name,
            params,
            hidden,
        } => {
            // Parameters sit below the hidden tag.
            if params.len() > HIDDEN_SLOT {
                return Err(CodegenError::SlotOverflow {
                    block: name.clone(),
                    count: params.len() + 1,
                });
            }
            let mut items: Vec<Json> = params
                .iter()
                .enumerate()
                .map(|(slot, param)| {
                    json!({
                        "item": {
                            "id": "pn_el",
                            "data": { "name": param, "type": "any", "plural": false, "optional": false }
                        },
                        "slot": slot
                    })
                })
                .collect();
            items.push(hidden_tag(*hidden));
            json!({
                "id": "block",
                "block": BlockKind::Function.id(),
                "data": name,
                "args": { "items": items }
            })
        }
        Header::Process { name } => json!({
            "id": "block",
            "block": BlockKind::Process.id(),
            "data": name,
            "args": { "items": [hidden_tag(false)] }
        }),
    })
}

fn hidden_tag(hidden: bool) -> Json {
    let tag = Value::Tag(Tag {
        action: "dynamic".into(),
        tag: "Is Hidden".into(),
        option: if hidden { "True" } else { "False" }.into(),
        block: BlockKind::Function.id().into(),
    });
    json!({ "item": tag.to_wire(), "slot": HIDDEN_SLOT })
}

/// Plain values take slots from 0 upward, tags from 26 downward.
fn args(owner: &str, values: &[Value]) -> CodegenResult<Json> {
    if values.len() > CHEST_SLOTS {
        return Err(CodegenError::SlotOverflow {
            block: owner.to_string(),
            count: values.len(),
        });
    }
    let mut items = Vec::with_capacity(values.len());
    let mut next = 0;
    let mut next_tag = LAST_SLOT;
    for value in values {
        let slot = if matches!(value, Value::Tag(_)) {
            let slot = next_tag;
            next_tag = next_tag.saturating_sub(1);
            slot
        } else {
            let slot = next;
            next += 1;
            slot
        };
        items.push(json!({ "item": value.to_wire(), "slot": slot }));
    }
    Ok(json!({ "items": items }))
}

fn block(
    category: BlockKind,
    action: &str,
    values: &[Value],
    target: Option<Selector>,
) -> CodegenResult<Map<String, Json>> {
    let mut record = Map::new();
    record.insert("id".into(), json!("block"));
    record.insert("block".into(), json!(category.id()));
    record.insert("action".into(), json!(action));
    record.insert("args".into(), args(action, values)?);
    if let Some(target) = target {
        record.insert("target".into(), json!(target.name()));
    }
    Ok(record)
}

fn marker(direct: &str, kind: &str) -> Json {
    json!({ "id": "bracket", "direct": direct, "type": kind })
}

fn push_instruction(blocks: &mut Vec<Json>, ins: &Instruction) -> CodegenResult<()> {
    match ins {
        Instruction::Action(a) => {
            blocks.push(Json::Object(block(a.block, &a.name, &a.args, a.target)?));
        }
        Instruction::Call(call) => blocks.push(call_block(call)?),
        Instruction::Bracket(b) => push_bracket(blocks, b)?,
    }
    Ok(())
}

fn call_block(call: &Call) -> CodegenResult<Json> {
    let category = match call.kind {
        CallKind::Function => BlockKind::CallFunction,
        CallKind::Process => BlockKind::StartProcess,
    };
    Ok(json!({
        "id": "block",
        "block": category.id(),
        "data": call.name,
        "args": args(&call.name, &call.args)?
    }))
}

fn push_bracket(blocks: &mut Vec<Json>, b: &Bracket) -> CodegenResult<()> {
    for ins in &b.setup {
        push_instruction(blocks, ins)?;
    }
    let kind = match &b.kind {
        BracketKind::If(c) => {
            let mut head = block(c.block, &c.name, &c.args, c.target)?;
            if c.inverted {
                head.insert("inverted".into(), json!("NOT"));
            }
            blocks.push(Json::Object(head));
            "norm"
        }
        BracketKind::Repeat(r) => {
            let mut head = block(BlockKind::Repeat, &r.name, &r.args, None)?;
            if let Some(sub) = &r.sub_action {
                head.insert("subAction".into(), json!(sub));
            }
            if r.inverted {
                head.insert("inverted".into(), json!("NOT"));
            }
            blocks.push(Json::Object(head));
            "repeat"
        }
    };
    blocks.push(marker("open", kind));
    for ins in &b.body {
        push_instruction(blocks, ins)?;
    }
    blocks.push(marker("close", kind));

    if let Some(else_body) = &b.else_body {
        blocks.push(json!({ "id": "block", "block": BlockKind::Else.id() }));
        blocks.push(marker("open", "norm"));
        for ins in else_body {
            push_instruction(blocks, ins)?;
        }
        blocks.push(marker("close", "norm"));
    }
    Ok(())
}
