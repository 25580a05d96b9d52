//! Scope promotion across template boundaries.
//!
//! Line variables only live as long as one template's execution. A line
//! variable that one unit reads or writes from two or more of its
//! templates is rewritten to game scope in every template of that unit.

use std::collections::{BTreeSet, HashSet};

use kindling_ir::{Instruction, Template, Value, VariableScope};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One variable moved to a wider scope so it survives a template boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopePromotion {
    pub unit: String,
    pub variable: String,
    pub from: VariableScope,
    pub to: VariableScope,
}

/// Names of every variable already stored in game scope anywhere in the
/// program, for collision warnings.
pub(crate) fn game_names(templates: &[Template]) -> HashSet<String> {
    let mut names = HashSet::new();
    for ins in templates.iter().flat_map(|t| &t.body) {
        ins.for_each_value(&mut |v| {
            if let Value::Variable(var) = v {
                if var.scope == VariableScope::Game {
                    names.insert(var.name.clone());
                }
            }
        });
    }
    names
}

fn line_names(body: &[Instruction]) -> Vec<String> {
    let mut seen = Vec::new();
    for ins in body {
        ins.for_each_value(&mut |v| {
            if let Value::Variable(var) = v {
                if var.scope == VariableScope::Line && !seen.contains(&var.name) {
                    seen.push(var.name.clone());
                }
            }
        });
    }
    seen
}

/// Promote the shared line variables of one unit's templates in place.
///
/// `taken` holds game-scope names already in use; promoted names are added
/// to it. Promotions are reported in order of first appearance.
pub(crate) fn promote_unit(
    unit: &str,
    templates: &mut [Template],
    taken: &mut HashSet<String>,
) -> Vec<ScopePromotion> {
    if templates.len() < 2 {
        return Vec::new();
    }

    let per_template: Vec<Vec<String>> = templates.iter().map(|t| line_names(&t.body)).collect();
    let mut order = Vec::new();
    let mut shared = BTreeSet::new();
    for (i, names) in per_template.iter().enumerate() {
        for name in names {
            let elsewhere = per_template
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && other.contains(name));
            if elsewhere && shared.insert(name.clone()) {
                order.push(name.clone());
            }
        }
    }
    if order.is_empty() {
        return Vec::new();
    }

    for template in templates.iter_mut() {
        for ins in &mut template.body {
            ins.for_each_value_mut(&mut |v| {
                if let Value::Variable(var) = v {
                    if var.scope == VariableScope::Line && shared.contains(&var.name) {
                        var.scope = var.scope.promoted();
                    }
                }
            });
        }
    }

    let promotions: Vec<ScopePromotion> = order
        .into_iter()
        .map(|variable| {
            if !taken.insert(variable.clone()) {
                warn!(unit, variable = %variable, "promoted variable shares a name with an existing game variable");
            }
            ScopePromotion {
                unit: unit.to_string(),
                variable,
                from: VariableScope::Line,
                to: VariableScope::Line.promoted(),
            }
        })
        .collect();
    debug!(unit, promoted = promotions.len(), "promoted line variables");
    promotions
}
