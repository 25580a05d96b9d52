use std::fmt;

use serde::{Deserialize, Serialize};

use crate::instruction::Instruction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Player,
    Entity,
}

/// The block that starts a template: an event binding or a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Header {
    Event {
        kind: EventKind,
        name: String,
    },
    Function {
        name: String,
        params: Vec<String>,
        /// Hidden functions are continuations created by the optimizer.
        hidden: bool,
    },
    Process {
        name: String,
    },
}

impl Header {
    /// Header of a continuation template; no visible parameters.
    pub fn continuation(name: impl Into<String>) -> Self {
        Header::Function {
            name: name.into(),
            params: Vec::new(),
            hidden: true,
        }
    }

    pub fn is_continuation(&self) -> bool {
        matches!(self, Header::Function { hidden: true, .. })
    }

    /// Stable name of the unit this header starts, used to derive
    /// continuation names.
    pub fn unit_name(&self) -> String {
        match self {
            Header::Event {
                kind: EventKind::Player,
                name,
            } => format!("event.{name}"),
            Header::Event {
                kind: EventKind::Entity,
                name,
            } => format!("entity_event.{name}"),
            Header::Function { name, .. } | Header::Process { name } => name.clone(),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Header::Event { kind: EventKind::Player, name } => write!(f, "on {name}"),
            Header::Event { kind: EventKind::Entity, name } => write!(f, "on entity {name}"),
            Header::Function { name, params, hidden } => {
                let hidden = if *hidden { "hidden " } else { "" };
                write!(f, "{hidden}fn {name}({})", params.join(", "))
            }
            Header::Process { name } => write!(f, "process {name}"),
        }
    }
}

/// One top-level definition before packing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub header: Header,
    pub body: Vec<Instruction>,
}

/// A compiled program: one unit per top-level definition, in source order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub units: Vec<Unit>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for unit in &self.units {
            write_block(f, &unit.header, &unit.body)?;
        }
        Ok(())
    }
}

/// A physical unit of delivery: a header and a body that fits one plot line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub header: Header,
    pub body: Vec<Instruction>,
}

impl Template {
    pub fn new(header: Header) -> Self {
        Self {
            header,
            body: Vec::new(),
        }
    }

    pub fn weight(&self) -> usize {
        crate::weight::template(self)
    }

    /// Name of the continuation this template hands off to, if its last
    /// node is a call into a hidden function.
    pub fn linked_to<'a>(&'a self, continuations: &[&str]) -> Option<&'a str> {
        match self.body.last() {
            Some(Instruction::Call(call)) if continuations.contains(&call.name.as_str()) => {
                Some(call.name.as_str())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_block(f, &self.header, &self.body)
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, header: &Header, body: &[Instruction]) -> fmt::Result {
    let mut out = String::new();
    for ins in body {
        ins.render(&mut out, 1);
    }
    writeln!(f, "{header} {{")?;
    f.write_str(&out)?;
    writeln!(f, "}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Action, BlockKind, Call};
    use crate::value::Value;

    #[test]
    fn unit_names() {
        let join = Header::Event { kind: EventKind::Player, name: "Join".into() };
        assert_eq!(join.unit_name(), "event.Join");
        let hurt = Header::Event { kind: EventKind::Entity, name: "EntityDmg".into() };
        assert_eq!(hurt.unit_name(), "entity_event.EntityDmg");
        assert_eq!(Header::Process { name: "ticker".into() }.unit_name(), "ticker");
    }

    #[test]
    fn continuation_headers_are_hidden_functions() {
        let h = Header::continuation("event.Join~1");
        assert!(h.is_continuation());
        assert_eq!(h.to_string(), "hidden fn event.Join~1()");
        let visible = Header::Function { name: "greet".into(), params: vec!["who".into()], hidden: false };
        assert!(!visible.is_continuation());
        assert_eq!(visible.to_string(), "fn greet(who)");
    }

    #[test]
    fn linked_to_only_matches_known_continuations() {
        let mut t = Template::new(Header::Event { kind: EventKind::Player, name: "Join".into() });
        t.body.push(Action::new(BlockKind::PlayerAction, "SendMessage", vec![Value::text("a")]).into());
        assert_eq!(t.linked_to(&["event.Join~1"]), None);
        t.body.push(Call::function("event.Join~1").into());
        assert_eq!(t.linked_to(&["event.Join~1"]), Some("event.Join~1"));
        assert_eq!(t.linked_to(&[]), None);
    }

    #[test]
    fn template_render() {
        let mut t = Template::new(Header::Process { name: "ticker".into() });
        t.body.push(Action::new(BlockKind::Control, "Wait", vec![Value::Number(20.0)]).into());
        assert_eq!(t.to_string(), "process ticker {\n    control Wait(20)\n}\n");
    }
}
