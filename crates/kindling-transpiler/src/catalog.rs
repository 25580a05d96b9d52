//! Action catalog: the platform vocabulary the transpiler checks against.
//!
//! Maps `(block, action)` to a [`Signature`] (ordered parameters plus the
//! block's tags) and lists the events scripts may bind to.

use std::collections::{HashMap, HashSet};
use std::fmt;

use kindling_ir::{BlockKind, EventKind, Value, ValueKind};

// ══════════════════════════════════════════════════════════════════════════════
// Signatures
// ══════════════════════════════════════════════════════════════════════════════

/// What a parameter slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Anything except a tag.
    Any,
    Text,
    Number,
    Location,
    Vector,
    Sound,
    Potion,
    Particle,
    Item,
    /// Must be a variable reference (the slot is written to).
    Variable,
}

impl ArgKind {
    /// Variables and game values are typed at runtime, so they are accepted
    /// for every kind except [`ArgKind::Variable`].
    pub fn accepts(self, value: &Value) -> bool {
        let kind = value.kind();
        match (self, kind) {
            (_, ValueKind::Tag) => false,
            (ArgKind::Variable, k) => k == ValueKind::Variable,
            (ArgKind::Any, _) => true,
            (_, ValueKind::Variable | ValueKind::GameValue) => true,
            (ArgKind::Text, k) => k == ValueKind::Text,
            (ArgKind::Number, k) => k == ValueKind::Number,
            (ArgKind::Location, k) => k == ValueKind::Location,
            (ArgKind::Vector, k) => k == ValueKind::Vector,
            (ArgKind::Sound, k) => k == ValueKind::Sound,
            (ArgKind::Potion, k) => k == ValueKind::Potion,
            (ArgKind::Particle, k) => k == ValueKind::Particle,
            (ArgKind::Item, k) => k == ValueKind::Item,
        }
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArgKind::Any => "any value",
            ArgKind::Text => "text",
            ArgKind::Number => "a number",
            ArgKind::Location => "a location",
            ArgKind::Vector => "a vector",
            ArgKind::Sound => "a sound",
            ArgKind::Potion => "a potion",
            ArgKind::Particle => "a particle",
            ArgKind::Item => "an item",
            ArgKind::Variable => "a variable",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub kind: ArgKind,
    pub optional: bool,
    /// Takes every remaining argument. Only valid as the last parameter.
    pub plural: bool,
}

const fn req(name: &'static str, kind: ArgKind) -> Param {
    Param { name, kind, optional: false, plural: false }
}

const fn opt(name: &'static str, kind: ArgKind) -> Param {
    Param { name, kind, optional: true, plural: false }
}

/// One or more.
const fn many(name: &'static str, kind: ArgKind) -> Param {
    Param { name, kind, optional: false, plural: true }
}

/// Zero or more.
const fn any_many(name: &'static str, kind: ArgKind) -> Param {
    Param { name, kind, optional: true, plural: true }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSpec {
    pub name: &'static str,
    pub options: &'static [&'static str],
    pub default: &'static str,
}

const fn tag(name: &'static str, options: &'static [&'static str]) -> TagSpec {
    // First option is the platform default.
    TagSpec { name, options, default: options[0] }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Param>,
    pub tags: Vec<TagSpec>,
}

impl Signature {
    pub fn min_args(&self) -> usize {
        self.params.iter().filter(|p| !p.optional).count()
    }

    /// `None` when the last parameter is plural.
    pub fn max_args(&self) -> Option<usize> {
        match self.params.last() {
            Some(p) if p.plural => None,
            _ => Some(self.params.len()),
        }
    }

    /// Parameter that argument `index` binds to.
    pub fn param_for(&self, index: usize) -> Option<&Param> {
        self.params.get(index).or_else(|| self.params.last().filter(|p| p.plural))
    }

    /// `"2"`, `"1 to 3"`, `"at least 1"`.
    pub fn arity(&self) -> String {
        let min = self.min_args();
        match self.max_args() {
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{min} to {max}"),
            None => format!("at least {min}"),
        }
    }

    pub fn tag(&self, name: &str) -> Option<&TagSpec> {
        self.tags.iter().find(|t| t.name == name)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Catalog
// ══════════════════════════════════════════════════════════════════════════════

/// The known vocabulary.
#[derive(Debug)]
pub struct Catalog {
    actions: HashMap<BlockKind, HashMap<&'static str, Signature>>,
    player_events: HashSet<&'static str>,
    entity_events: HashSet<&'static str>,
}

const MERGING: TagSpec = tag("Text Value Merging", &["Add spaces", "No spaces"]);
const ALIGNMENT: TagSpec = tag("Alignment Mode", &["Regular", "Centered"]);
const TIME_UNIT: TagSpec = tag("Time Unit", &["Ticks", "Seconds", "Minutes"]);

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// The built-in vocabulary.
    pub fn standard() -> Self {
        let mut catalog = Self {
            actions: HashMap::new(),
            player_events: HashSet::new(),
            entity_events: HashSet::new(),
        };
        catalog.register_player_actions();
        catalog.register_entity_actions();
        catalog.register_game_actions();
        catalog.register_set_var();
        catalog.register_control();
        catalog.register_conditions();
        catalog.register_repeats();
        catalog.register_events();
        catalog
    }

    pub fn get(&self, block: BlockKind, name: &str) -> Option<&Signature> {
        self.actions.get(&block)?.get(name)
    }

    pub fn has_event(&self, kind: EventKind, name: &str) -> bool {
        match kind {
            EventKind::Player => self.player_events.contains(name),
            EventKind::Entity => self.entity_events.contains(name),
        }
    }

    fn add(
        &mut self,
        block: BlockKind,
        name: &'static str,
        params: &[Param],
        tags: &[TagSpec],
    ) {
        let sig = Signature {
            params: params.to_vec(),
            tags: tags.to_vec(),
        };
        self.actions.entry(block).or_default().insert(name, sig);
    }

    fn register_player_actions(&mut self) {
        use ArgKind::*;
        use BlockKind::PlayerAction as P;
        self.add(P, "SendMessage", &[any_many("message", Any)], &[ALIGNMENT, MERGING]);
        self.add(P, "ActionBar", &[any_many("message", Any)], &[MERGING]);
        self.add(
            P,
            "SendTitle",
            &[
                req("title", Any),
                opt("subtitle", Any),
                opt("duration", Number),
                opt("fade_in", Number),
                opt("fade_out", Number),
            ],
            &[],
        );
        self.add(P, "GiveItems", &[many("items", Item)], &[]);
        self.add(P, "SetHotbar", &[many("items", Item)], &[]);
        self.add(
            P,
            "ClearInv",
            &[],
            &[tag("Clear Crafting and Cursor", &["True", "False"])],
        );
        self.add(
            P,
            "Teleport",
            &[req("location", Location)],
            &[tag("Keep Current Rotation", &["False", "True"])],
        );
        self.add(P, "PlaySound", &[many("sounds", Sound)], &[]);
        self.add(
            P,
            "GivePotion",
            &[many("effects", Potion)],
            &[tag("Overwrite Effect", &["False", "True"])],
        );
        self.add(P, "Heal", &[opt("amount", Number)], &[]);
        self.add(P, "Damage", &[req("amount", Number)], &[]);
        self.add(P, "SetHealth", &[req("health", Number)], &[]);
        self.add(P, "LaunchUp", &[req("power", Number)], &[]);
        self.add(P, "SetVelocity", &[req("velocity", Vector)], &[]);
        self.add(
            P,
            "SetGameMode",
            &[],
            &[tag("Game Mode", &["Survival", "Creative", "Adventure", "Spectator"])],
        );
        self.add(P, "Particle", &[req("effect", Particle)], &[]);
        self.add(P, "Kick", &[], &[]);
    }

    fn register_entity_actions(&mut self) {
        use ArgKind::*;
        use BlockKind::EntityAction as E;
        self.add(E, "Teleport", &[req("location", Location)], &[]);
        self.add(E, "Damage", &[req("amount", Number)], &[]);
        self.add(E, "Heal", &[opt("amount", Number)], &[]);
        self.add(E, "SetName", &[req("name", Any)], &[]);
        self.add(E, "SetVelocity", &[req("velocity", Vector)], &[]);
        self.add(E, "Remove", &[], &[]);
    }

    fn register_game_actions(&mut self) {
        use ArgKind::*;
        use BlockKind::GameAction as G;
        self.add(G, "Particle", &[req("effect", Particle), many("locations", Location)], &[]);
        self.add(G, "Explosion", &[req("location", Location), opt("power", Number)], &[]);
        self.add(G, "CancelEvent", &[], &[]);
        self.add(G, "PlaySound", &[req("sound", Sound), many("locations", Location)], &[]);
    }

    fn register_set_var(&mut self) {
        use ArgKind::*;
        use BlockKind::SetVar as V;
        self.add(V, "=", &[req("variable", Variable), req("value", Any)], &[]);
        for op in ["+", "-", "x", "/", "%"] {
            self.add(V, op, &[req("result", Variable), many("operands", Number)], &[]);
        }
        self.add(V, "+=", &[req("variable", Variable), opt("amount", Number)], &[]);
        self.add(V, "-=", &[req("variable", Variable), opt("amount", Number)], &[]);
        self.add(
            V,
            "RandomNumber",
            &[req("result", Variable), req("min", Number), req("max", Number)],
            &[tag("Rounding Mode", &["Whole number", "Decimal number"])],
        );
        self.add(V, "String", &[req("result", Variable), any_many("values", Any)], &[MERGING]);
        self.add(V, "CreateList", &[req("list", Variable), any_many("values", Any)], &[]);
        self.add(V, "AppendValue", &[req("list", Variable), many("values", Any)], &[]);
    }

    fn register_control(&mut self) {
        use ArgKind::*;
        use BlockKind::Control as C;
        self.add(C, "Wait", &[opt("duration", Number)], &[TIME_UNIT]);
        self.add(C, "Return", &[], &[]);
        self.add(C, "End", &[], &[]);
        self.add(C, "Skip", &[], &[]);
        self.add(C, "StopRepeat", &[], &[]);
    }

    fn register_conditions(&mut self) {
        use ArgKind::*;
        use BlockKind::{IfEntity, IfGame, IfPlayer, IfVar};
        self.add(IfVar, "=", &[req("value", Any), many("compare", Any)], &[]);
        self.add(IfVar, "!=", &[req("value", Any), many("compare", Any)], &[]);
        for op in [">", ">=", "<", "<="] {
            self.add(IfVar, op, &[req("value", Number), req("compare", Number)], &[]);
        }
        self.add(IfVar, "VarExists", &[req("variable", Variable)], &[]);
        self.add(IfVar, "ListContains", &[req("list", Variable), many("values", Any)], &[]);

        for check in ["IsSneaking", "IsSprinting", "IsFlying", "IsGrounded"] {
            self.add(IfPlayer, check, &[], &[]);
        }
        self.add(IfPlayer, "HasItem", &[many("items", Item)], &[]);
        self.add(IfPlayer, "NameEquals", &[many("names", Text)], &[]);
        self.add(IfPlayer, "IsNear", &[req("location", Location), opt("radius", Number)], &[]);

        self.add(IfEntity, "IsNear", &[req("location", Location), opt("radius", Number)], &[]);
        self.add(IfEntity, "IsMob", &[], &[]);

        self.add(IfGame, "HasPlayer", &[req("name", Text)], &[]);
        self.add(IfGame, "CommandEquals", &[many("commands", Text)], &[]);
        self.add(IfGame, "EventCancelled", &[], &[]);
    }

    fn register_repeats(&mut self) {
        use ArgKind::*;
        use BlockKind::Repeat as R;
        self.add(R, "Multiple", &[req("times", Number)], &[]);
        self.add(R, "Forever", &[], &[]);
        self.add(R, "ForEach", &[req("variable", Variable), req("list", Any)], &[]);
        self.add(
            R,
            "Range",
            &[req("variable", Variable), req("start", Number), req("end", Number)],
            &[],
        );
    }

    fn register_events(&mut self) {
        self.player_events.extend([
            "Join",
            "Leave",
            "Command",
            "RightClick",
            "LeftClick",
            "Sneak",
            "Unsneak",
            "Jump",
            "Walk",
            "Death",
            "Respawn",
            "KillPlayer",
            "PlayerDmgPlayer",
            "PlayerTakeDmg",
            "BreakBlock",
            "PlaceBlock",
            "Loop",
        ]);
        self.entity_events.extend([
            "EntityDmgEntity",
            "EntityDeath",
            "PlayerDmgEntity",
            "EntityExplode",
            "ProjHit",
        ]);
    }
}
