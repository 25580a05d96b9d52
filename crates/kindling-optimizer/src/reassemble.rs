//! Inverse of packing: inline every continuation back into its call site.

use std::collections::HashMap;

use kindling_ir::{Bracket, CallKind, Header, Instruction, Program, Template, Unit};

/// Rebuild the unsplit program from `templates`.
///
/// Templates with a continuation header are treated as linkage targets and
/// disappear; every other template becomes one unit, in order. Scope
/// promotions are not undone.
pub fn reassemble(templates: &[Template]) -> Program {
    let continuations: HashMap<&str, &[Instruction]> = templates
        .iter()
        .filter(|t| t.header.is_continuation())
        .filter_map(|t| match &t.header {
            Header::Function { name, .. } => Some((name.as_str(), t.body.as_slice())),
            _ => None,
        })
        .collect();

    let units = templates
        .iter()
        .filter(|t| !t.header.is_continuation())
        .map(|t| Unit {
            header: t.header.clone(),
            body: inline(&t.body, &continuations),
        })
        .collect();
    Program { units }
}

fn inline(body: &[Instruction], continuations: &HashMap<&str, &[Instruction]>) -> Vec<Instruction> {
    let mut out = Vec::with_capacity(body.len());
    for ins in body {
        match ins {
            Instruction::Call(call) if call.kind == CallKind::Function => {
                match continuations.get(call.name.as_str()) {
                    Some(target) => out.extend(inline(target, continuations)),
                    None => out.push(ins.clone()),
                }
            }
            Instruction::Bracket(b) => out.push(
                Bracket {
                    kind: b.kind.clone(),
                    setup: inline(&b.setup, continuations),
                    body: inline(&b.body, continuations),
                    else_body: b.else_body.as_deref().map(|e| inline(e, continuations)),
                }
                .into(),
            ),
            _ => out.push(ins.clone()),
        }
    }
    out
}
