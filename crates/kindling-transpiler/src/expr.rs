//! Expression lowering: literals, variable references and arithmetic.
//!
//! Arithmetic never survives into the IR. Each binary node becomes one
//! `set_var` action writing a fresh line-scoped temporary, emitted ahead of
//! the consumer; the temporary is what the consumer sees.

use kindling_ir::{
    GameValue, Instruction, Item, Location, Particle, Potion, Selector, Sound, Value,
    Vector, VariableScope,
};
use kindling_types::ast::{BinaryOp, Expr, ExprKind, Literal, ParticleField, VarRef};
use kindling_types::Span;

use crate::error::{TranspileError, TranspileResult};
use crate::transpiler::{scope_of, Transpiler};

/// Prefix of compiler-generated temporaries.
pub const TEMP_PREFIX: &str = "__tmp";

impl Transpiler<'_> {
    /// Lower `expr` to a single value, appending any evaluation chain to `out`.
    pub(crate) fn lower_value(
        &mut self,
        expr: &Expr,
        out: &mut Vec<Instruction>,
    ) -> TranspileResult<Value> {
        let span = expr.span;
        let value = match &expr.kind {
            ExprKind::Text(text) => Value::Text(text.clone()),
            ExprKind::Number(n) => Value::Number(float(*n, span)?),
            ExprKind::Location {
                x,
                y,
                z,
                pitch,
                yaw,
            } => Value::Location(Location {
                x: float(*x, span)?,
                y: float(*y, span)?,
                z: float(*z, span)?,
                pitch: float(*pitch, span)?,
                yaw: float(*yaw, span)?,
            }),
            ExprKind::Vector { x, y, z } => Value::Vector(Vector {
                x: float(*x, span)?,
                y: float(*y, span)?,
                z: float(*z, span)?,
            }),
            ExprKind::Sound {
                name,
                pitch,
                volume,
            } => Value::Sound(Sound {
                name: name.clone(),
                pitch: float(*pitch, span)?,
                volume: float(*volume, span)?,
            }),
            ExprKind::Potion {
                name,
                duration,
                level,
            } => Value::Potion(Potion {
                name: name.clone(),
                duration: whole(*duration, "potion duration", span)?,
                level: whole(*level, "potion level", span)?,
            }),
            ExprKind::Particle { name, fields } => Value::Particle(particle(name, fields)?),
            ExprKind::Item(payload) => Value::Item(Item {
                payload: payload.clone(),
            }),
            ExprKind::Var(var) => self.resolve_var(var)?,
            ExprKind::GameValue { name, target } => {
                let target = match target {
                    Some(t) => Selector::from_name(&t.name).ok_or_else(|| {
                        TranspileError::UnknownSelector {
                            name: t.name.clone(),
                            span: t.span,
                        }
                    })?,
                    None => Selector::Default,
                };
                Value::GameValue(GameValue {
                    kind: name.name.clone(),
                    target,
                })
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.lower_value(lhs, out)?;
                let rhs = self.lower_value(rhs, out)?;
                let temp = self.temp();
                out.push(self.set_var(arith_name(*op), vec![temp.clone(), lhs, rhs], span)?);
                temp
            }
        };
        Ok(value)
    }

    pub(crate) fn resolve_var(&self, var: &VarRef) -> TranspileResult<Value> {
        let scope = match var.scope {
            Some(annotation) => scope_of(annotation),
            None => self.scopes.resolve(&var.name.name).ok_or_else(|| {
                TranspileError::UnresolvedVariable {
                    name: var.name.name.clone(),
                    span: var.name.span,
                }
            })?,
        };
        Ok(Value::var(var.name.name.clone(), scope))
    }

    fn temp(&mut self) -> Value {
        let n = self.temps;
        self.temps += 1;
        Value::var(format!("{TEMP_PREFIX}{n}"), VariableScope::Line)
    }
}

fn arith_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "x",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Literals
// ══════════════════════════════════════════════════════════════════════════════

fn float(n: f64, span: Span) -> TranspileResult<f32> {
    if !n.is_finite() || n.abs() > f64::from(f32::MAX) {
        return Err(TranspileError::InvalidLiteral {
            reason: format!("{n} is not a representable number"),
            span,
        });
    }
    Ok(n as f32)
}

fn whole(n: f64, what: &str, span: Span) -> TranspileResult<i32> {
    let in_range = n >= f64::from(i32::MIN) && n <= f64::from(i32::MAX);
    if !n.is_finite() || n.fract() != 0.0 || !in_range {
        return Err(TranspileError::InvalidLiteral {
            reason: format!("{what} must be a whole number, found {n}"),
            span,
        });
    }
    Ok(n as i32)
}

fn percent(n: f64, what: &str, span: Span) -> TranspileResult<i32> {
    let v = whole(n, what, span)?;
    if !(0..=100).contains(&v) {
        return Err(TranspileError::InvalidLiteral {
            reason: format!("{what} must be between 0 and 100, found {v}"),
            span,
        });
    }
    Ok(v)
}

/// `#RRGGBB` or a packed integer.
fn color(value: &Literal, span: Span) -> TranspileResult<i32> {
    let invalid = || TranspileError::InvalidLiteral {
        reason: "particle color must be `#RRGGBB` or a packed RGB number".into(),
        span,
    };
    let packed = match value {
        Literal::Number(n) => whole(*n, "particle color", span)?,
        Literal::Text(hex) => {
            let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
            if digits.len() != 6 {
                return Err(invalid());
            }
            i32::from_str_radix(digits, 16).map_err(|_| invalid())?
        }
    };
    if !(0..=0xFF_FFFF).contains(&packed) {
        return Err(invalid());
    }
    Ok(packed)
}

fn particle(name: &str, fields: &[ParticleField]) -> TranspileResult<Particle> {
    let mut p = Particle::new(name);
    for field in fields {
        let span = field.name.span;
        let key = field.name.name.as_str();
        if key == "material" {
            match &field.value {
                Literal::Text(material) => p.material = Some(material.clone()),
                Literal::Number(_) => return Err(expects(key, "text", span)),
            }
            continue;
        }
        if key == "color" {
            p.color = Some(color(&field.value, span)?);
            continue;
        }
        let &Literal::Number(n) = &field.value else {
            return Err(expects(key, "a number", span));
        };
        match key {
            "amount" => p.amount = whole(n, "particle amount", span)?,
            "spread_x" => p.spread_x = float(n, span)?,
            "spread_y" => p.spread_y = float(n, span)?,
            "motion_x" => p.motion_x = Some(float(n, span)?),
            "motion_y" => p.motion_y = Some(float(n, span)?),
            "motion_z" => p.motion_z = Some(float(n, span)?),
            "size" => p.size = Some(float(n, span)?),
            "roll" => p.roll = Some(float(n, span)?),
            "size_variation" => p.size_variation = Some(percent(n, "size variation", span)?),
            "color_variation" => p.color_variation = Some(percent(n, "color variation", span)?),
            "motion_variation" => {
                p.motion_variation = Some(percent(n, "motion variation", span)?)
            }
            _ => {
                return Err(TranspileError::InvalidLiteral {
                    reason: format!("unknown particle field `{key}`"),
                    span,
                })
            }
        }
    }
    Ok(p)
}

fn expects(field: &str, what: &str, span: Span) -> TranspileError {
    TranspileError::InvalidLiteral {
        reason: format!("particle field `{field}` expects {what}"),
        span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, value: Literal) -> ParticleField {
        ParticleField {
            name: name.into(),
            value,
        }
    }

    #[test]
    fn every_variation_knob_sets_its_own_field() {
        let p = particle(
            "Dust",
            &[
                field("size_variation", Literal::Number(10.0)),
                field("color_variation", Literal::Number(20.0)),
                field("motion_variation", Literal::Number(30.0)),
            ],
        )
        .unwrap();
        assert_eq!(p.size_variation, Some(10));
        assert_eq!(p.color_variation, Some(20));
        assert_eq!(p.motion_variation, Some(30));
    }

    #[test]
    fn particle_color_forms() {
        let hex = particle("Dust", &[field("color", Literal::Text("#FF8000".into()))]).unwrap();
        assert_eq!(hex.color, Some(0xFF8000));
        let packed = particle("Dust", &[field("color", Literal::Number(255.0))]).unwrap();
        assert_eq!(packed.color, Some(255));
        assert!(particle("Dust", &[field("color", Literal::Text("red".into()))]).is_err());
    }

    #[test]
    fn particle_field_errors() {
        let err = particle("Cloud", &[field("speed", Literal::Number(1.0))]).unwrap_err();
        assert!(err.to_string().contains("unknown particle field `speed`"));
        let err = particle("Cloud", &[field("amount", Literal::Number(1.5))]).unwrap_err();
        assert!(err.to_string().contains("whole number"));
        let err = particle("Cloud", &[field("size_variation", Literal::Number(150.0))]).unwrap_err();
        assert!(err.to_string().contains("between 0 and 100"));
    }

    #[test]
    fn number_range() {
        assert_eq!(float(2.5, Span::default()).unwrap(), 2.5);
        assert!(float(f64::INFINITY, Span::default()).is_err());
        assert!(float(1e300, Span::default()).is_err());
        assert_eq!(whole(-3.0, "n", Span::default()).unwrap(), -3);
        assert!(whole(3e10, "n", Span::default()).is_err());
    }
}
