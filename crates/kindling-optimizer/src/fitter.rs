//! Greedy packing of one unit into capacity-bounded templates.
//!
//! Nodes are taken strictly in order and never reordered. A template keeps
//! one slot free for a linkage call while more nodes follow, so it can
//! always be closed with `call <unit>~<n>` when the next node does not fit.
//!
//! A bracket that does not fit moves to a fresh template. If it still does
//! not fit there, the leading part of its body stays inside the bracket and
//! the rest moves to a continuation called as the bracket's last body node.
//! The bracket's head and markers never leave the template they start in.
//! A body tail holding a `Return`, or a `StopRepeat`/`Skip` outside any loop
//! of its own, is never moved: inside a continuation it would exit the
//! continuation instead.

use kindling_ir::{weight, BlockKind, Bracket, BracketKind, Call, Header, Instruction, Template};
use tracing::trace;

use crate::error::{OptimizeError, OptimizeResult};

pub(crate) struct Fitter {
    capacity: usize,
    unit: String,
    /// Last continuation index handed out for this unit.
    next_id: usize,
    /// Slots are reserved when a template is opened so the output keeps
    /// creation order even when continuations finish first.
    templates: Vec<Option<Template>>,
}

impl Fitter {
    pub(crate) fn new(unit: String, capacity: usize) -> Self {
        Self {
            capacity,
            unit,
            next_id: 0,
            templates: Vec::new(),
        }
    }

    /// Pack a whole unit. Returns its templates in creation order; the first
    /// one carries `header`.
    pub(crate) fn fit(mut self, header: Header, body: Vec<Instruction>) -> OptimizeResult<Vec<Template>> {
        self.templates.push(None);
        self.pack(0, header, body)?;
        Ok(self.templates.into_iter().flatten().collect())
    }

    fn open_continuation(&mut self) -> (usize, String) {
        self.next_id += 1;
        let name = format!("{}~{}", self.unit, self.next_id);
        self.templates.push(None);
        (self.templates.len() - 1, name)
    }

    fn unsplittable(&self, construct: String) -> OptimizeError {
        OptimizeError::UnsplittableUnit {
            unit: self.unit.clone(),
            construct,
            capacity: self.capacity,
        }
    }

    /// Fill the template in `slot`, spilling into as many continuations as
    /// `nodes` needs.
    fn pack(&mut self, mut slot: usize, header: Header, nodes: Vec<Instruction>) -> OptimizeResult<()> {
        let mut current = Template::new(header);
        let mut used = weight::HEADER;
        let mut nodes = nodes.into_iter().peekable();

        while let Some(node) = nodes.next() {
            let reserve = if nodes.peek().is_some() { weight::LINK } else { 0 };
            let w = weight::instruction(&node);
            if used + w + reserve <= self.capacity {
                used += w;
                current.body.push(node);
                continue;
            }

            if !current.body.is_empty() {
                let (next_slot, name) = self.open_continuation();
                trace!(unit = %self.unit, from = %current.header, to = %name, used, "template full");
                current.body.push(Call::function(name.clone()).into());
                self.templates[slot] = Some(current);
                slot = next_slot;
                current = Template::new(Header::continuation(name));
                used = weight::HEADER;
                if used + w + reserve <= self.capacity {
                    used += w;
                    current.body.push(node);
                    continue;
                }
            }

            // `current` is empty here and the node still does not fit.
            match node {
                Instruction::Bracket(bracket) => {
                    let available = self.capacity.saturating_sub(used + reserve);
                    let node: Instruction = self.split_bracket(bracket, available)?.into();
                    used += weight::instruction(&node);
                    current.body.push(node);
                }
                other => return Err(self.unsplittable(describe(&other))),
            }
        }

        self.templates[slot] = Some(current);
        Ok(())
    }

    /// Shrink `bracket` to at most `available` slots by moving body tails
    /// into continuations.
    fn split_bracket(&mut self, bracket: Bracket, available: usize) -> OptimizeResult<Bracket> {
        let shell = weight::shell(&bracket);
        let links = if bracket.else_body.is_some() {
            2 * weight::LINK
        } else {
            weight::LINK
        };
        let construct = bracket.describe();
        if available < shell + links {
            return Err(self.unsplittable(construct));
        }
        let budget = available - shell;
        trace!(unit = %self.unit, bracket = %construct, budget, "splitting bracket body");

        let Bracket {
            kind,
            setup,
            body,
            else_body,
        } = bracket;
        let (body, else_body) = match else_body {
            None => (self.split_body(&construct, body, budget)?.0, None),
            Some(else_body) => {
                let (body, then_weight) =
                    self.split_body(&construct, body, budget - weight::LINK)?;
                let (else_body, _) = self.split_body(&construct, else_body, budget - then_weight)?;
                (body, Some(else_body))
            }
        };
        Ok(Bracket {
            kind,
            setup,
            body,
            else_body,
        })
    }

    /// Keep the longest prefix of `body` that fits `budget` together with a
    /// linkage call; pack the rest into a new continuation. Returns the new
    /// body and its weight. `budget` must be at least one link.
    fn split_body(
        &mut self,
        construct: &str,
        body: Vec<Instruction>,
        budget: usize,
    ) -> OptimizeResult<(Vec<Instruction>, usize)> {
        let total = weight::sequence(&body);
        if total <= budget {
            return Ok((body, total));
        }

        let mut kept = Vec::new();
        let mut rest = Vec::new();
        let mut used = 0;
        for node in body {
            let w = weight::instruction(&node);
            if rest.is_empty() && used + w + weight::LINK <= budget {
                used += w;
                kept.push(node);
            } else {
                rest.push(node);
            }
        }

        if let Some(exit) = escaping_exit(&rest, false) {
            return Err(OptimizeError::SplitExit {
                unit: self.unit.clone(),
                construct: construct.to_string(),
                exit,
            });
        }

        let (slot, name) = self.open_continuation();
        self.pack(slot, Header::continuation(name.clone()), rest)?;
        kept.push(Call::function(name).into());
        Ok((kept, used + weight::LINK))
    }
}

/// First exit in `nodes` that targets a loop or function outside them.
fn escaping_exit(nodes: &[Instruction], in_loop: bool) -> Option<&'static str> {
    nodes.iter().find_map(|node| match node {
        Instruction::Action(a) if a.block == BlockKind::Control => match a.name.as_str() {
            "Return" => Some("Return"),
            "StopRepeat" if !in_loop => Some("StopRepeat"),
            "Skip" if !in_loop => Some("Skip"),
            _ => None,
        },
        Instruction::Bracket(b) => {
            let in_loop = in_loop || matches!(b.kind, BracketKind::Repeat(_));
            escaping_exit(&b.body, in_loop)
                .or_else(|| b.else_body.as_deref().and_then(|e| escaping_exit(e, in_loop)))
        }
        _ => None,
    })
}

fn describe(node: &Instruction) -> String {
    match node {
        Instruction::Action(a) => format!("{} {}", a.block.id(), a.name),
        Instruction::Call(c) => format!("call {}", c.name),
        Instruction::Bracket(b) => b.describe(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindling_ir::{Action, Condition, EventKind, Repeat};

    fn act() -> Instruction {
        Action::new(BlockKind::GameAction, "CancelEvent", vec![]).into()
    }

    fn join() -> Header {
        Header::Event {
            kind: EventKind::Player,
            name: "Join".into(),
        }
    }

    fn forever(body: Vec<Instruction>) -> Instruction {
        Bracket {
            kind: BracketKind::Repeat(Repeat {
                name: "Forever".into(),
                args: vec![],
                sub_action: None,
                inverted: false,
            }),
            setup: vec![],
            body,
            else_body: None,
        }
        .into()
    }

    #[test]
    fn exact_fit_needs_no_reserve_for_the_last_node() {
        let templates = Fitter::new("event.Join".into(), 5)
            .fit(join(), vec![act(), act(), act(), act()])
            .unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].weight(), 5);
    }

    #[test]
    fn spill_reserves_room_for_the_link() {
        let templates = Fitter::new("event.Join".into(), 5)
            .fit(join(), vec![act(), act(), act(), act(), act()])
            .unwrap();
        // 1 header + 3 actions + link, then 1 header + 2 actions.
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].body.len(), 4);
        assert_eq!(templates[1].header, Header::continuation("event.Join~1"));
        assert_eq!(templates[1].body.len(), 2);
    }

    #[test]
    fn oversized_bracket_keeps_a_prefix_and_links_the_rest() {
        // Shell 3, so a fresh 8-slot template leaves 4 body slots: 3 kept + link.
        let templates = Fitter::new("event.Join".into(), 8)
            .fit(join(), vec![forever(vec![act(); 6])])
            .unwrap();
        assert_eq!(templates.len(), 2);
        let Instruction::Bracket(b) = &templates[0].body[0] else {
            panic!("expected the bracket to stay in the first template");
        };
        assert_eq!(b.body.len(), 4);
        assert_eq!(b.body[3], Call::function("event.Join~1").into());
        assert_eq!(templates[1].body.len(), 3);
        assert!(templates.iter().all(|t| t.weight() <= 8));
    }

    #[test]
    fn bracket_moves_to_a_fresh_template_before_splitting() {
        let templates = Fitter::new("event.Join".into(), 10)
            .fit(join(), vec![act(), act(), forever(vec![act(); 5])])
            .unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].body.len(), 3);
        assert!(matches!(templates[1].body[0], Instruction::Bracket(_)));
    }

    #[test]
    fn non_bracket_that_never_fits_is_unsplittable() {
        let err = Fitter::new("event.Join".into(), 2)
            .fit(join(), vec![act(), act()])
            .unwrap_err();
        assert_eq!(
            err,
            OptimizeError::UnsplittableUnit {
                unit: "event.Join".into(),
                construct: "game_action CancelEvent".into(),
                capacity: 2,
            }
        );
    }

    fn control(name: &str) -> Instruction {
        Action::new(BlockKind::Control, name, vec![]).into()
    }

    #[test]
    fn exits_inside_their_own_loop_stay_put() {
        let nested = vec![act(), forever(vec![act(), control("StopRepeat"), control("Skip")])];
        assert_eq!(escaping_exit(&nested, false), None);
        assert_eq!(escaping_exit(&[act(), control("StopRepeat")], false), Some("StopRepeat"));
        assert_eq!(escaping_exit(&[control("Skip")], true), None);
        assert_eq!(escaping_exit(&[forever(vec![control("Return")])], false), Some("Return"));

        let guard: Instruction = Bracket {
            kind: BracketKind::If(Condition {
                block: BlockKind::IfPlayer,
                name: "IsSneaking".into(),
                args: vec![],
                target: None,
                inverted: false,
            }),
            setup: vec![],
            body: vec![],
            else_body: Some(vec![control("Skip")]),
        }
        .into();
        assert_eq!(escaping_exit(&[guard], false), Some("Skip"));
    }

    #[test]
    fn break_in_a_split_tail_is_rejected() {
        let mut body = vec![act(); 6];
        body.push(control("StopRepeat"));
        let err = Fitter::new("event.Join".into(), 8)
            .fit(join(), vec![forever(body)])
            .unwrap_err();
        assert_eq!(
            err,
            OptimizeError::SplitExit {
                unit: "event.Join".into(),
                construct: "repeat Forever".into(),
                exit: "StopRepeat",
            }
        );
    }

    #[test]
    fn break_in_the_kept_prefix_is_fine() {
        let mut body = vec![control("StopRepeat")];
        body.extend(vec![act(); 6]);
        let templates = Fitter::new("event.Join".into(), 8)
            .fit(join(), vec![forever(body)])
            .unwrap();
        assert_eq!(templates.len(), 2);
    }

    #[test]
    fn describe_names_nodes() {
        assert_eq!(describe(&act()), "game_action CancelEvent");
        assert_eq!(describe(&Call::function("f").into()), "call f");
    }
}
