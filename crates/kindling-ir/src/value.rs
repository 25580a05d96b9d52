//! Argument values placed into block slots.

use std::fmt;

use serde::{Deserialize, Serialize};

// ══════════════════════════════════════════════════════════════════════════════
// Scopes & Selectors
// ══════════════════════════════════════════════════════════════════════════════

/// Lifetime/visibility class of a variable on the platform.
///
/// The compiler passes this through untouched, except that the optimizer
/// promotes [`VariableScope::Line`] variables shared between split templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableScope {
    /// Lives for one run of one template.
    Line,
    /// Lives for the executing thread, across function calls.
    Local,
    /// Global to the plot until it restarts.
    Game,
    /// Persisted across plot restarts.
    Saved,
}

impl VariableScope {
    pub const ALL: [VariableScope; 4] = [Self::Line, Self::Local, Self::Game, Self::Saved];

    /// Name used in wire records.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Local => "local",
            Self::Game => "unsaved",
            Self::Saved => "saved",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.wire_name() == name)
    }

    /// The scope a variable is moved to when it must outlive its template.
    pub fn promoted(self) -> Self {
        match self {
            Self::Line => Self::Game,
            other => other,
        }
    }
}

impl fmt::Display for VariableScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Line => "line",
            Self::Local => "local",
            Self::Game => "game",
            Self::Saved => "saved",
        })
    }
}

/// Contextual entity target of a game value or an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    Default,
    Selection,
    Killer,
    Damager,
    Victim,
    Shooter,
    Projectile,
    LastEntity,
    AllPlayers,
    AllEntities,
}

impl Selector {
    pub const ALL: [Selector; 10] = [
        Self::Default,
        Self::Selection,
        Self::Killer,
        Self::Damager,
        Self::Victim,
        Self::Shooter,
        Self::Projectile,
        Self::LastEntity,
        Self::AllPlayers,
        Self::AllEntities,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Selection => "Selection",
            Self::Killer => "Killer",
            Self::Damager => "Damager",
            Self::Victim => "Victim",
            Self::Shooter => "Shooter",
            Self::Projectile => "Projectile",
            Self::LastEntity => "LastEntity",
            Self::AllPlayers => "AllPlayers",
            Self::AllEntities => "AllEntities",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Value
// ══════════════════════════════════════════════════════════════════════════════

/// A block argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Number(f32),
    Location(Location),
    Vector(Vector),
    Sound(Sound),
    Potion(Potion),
    Variable(Variable),
    GameValue(GameValue),
    Particle(Particle),
    Tag(Tag),
    Item(Item),
}

/// Discriminant of a [`Value`], used for argument checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Number,
    Location,
    Vector,
    Sound,
    Potion,
    Variable,
    GameValue,
    Particle,
    Tag,
    Item,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Location => "location",
            Self::Vector => "vector",
            Self::Sound => "sound",
            Self::Potion => "potion",
            Self::Variable => "variable",
            Self::GameValue => "game value",
            Self::Particle => "particle",
            Self::Tag => "tag",
            Self::Item => "item",
        })
    }
}

impl Value {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn var(name: impl Into<String>, scope: VariableScope) -> Self {
        Self::Variable(Variable::new(name, scope))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Number(_) => ValueKind::Number,
            Self::Location(_) => ValueKind::Location,
            Self::Vector(_) => ValueKind::Vector,
            Self::Sound(_) => ValueKind::Sound,
            Self::Potion(_) => ValueKind::Potion,
            Self::Variable(_) => ValueKind::Variable,
            Self::GameValue(_) => ValueKind::GameValue,
            Self::Particle(_) => ValueKind::Particle,
            Self::Tag(_) => ValueKind::Tag,
            Self::Item(_) => ValueKind::Item,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub pitch: f32,
    pub yaw: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sound {
    pub name: String,
    pub pitch: f32,
    pub volume: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Potion {
    pub name: String,
    /// Ticks.
    pub duration: i32,
    pub level: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub scope: VariableScope,
}

impl Variable {
    pub fn new(name: impl Into<String>, scope: VariableScope) -> Self {
        Self {
            name: name.into(),
            scope,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameValue {
    pub kind: String,
    pub target: Selector,
}

/// A particle effect with its cluster settings and optional tuning fields.
///
/// Unset optional fields are left out of the wire record entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub name: String,
    pub amount: i32,
    pub spread_x: f32,
    pub spread_y: f32,
    pub motion_x: Option<f32>,
    pub motion_y: Option<f32>,
    pub motion_z: Option<f32>,
    pub size: Option<f32>,
    pub roll: Option<f32>,
    pub size_variation: Option<i32>,
    pub color_variation: Option<i32>,
    pub motion_variation: Option<i32>,
    pub material: Option<String>,
    /// Packed RGB: `r << 16 | g << 8 | b`.
    pub color: Option<i32>,
}

impl Particle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount: 1,
            spread_x: 0.0,
            spread_y: 0.0,
            motion_x: None,
            motion_y: None,
            motion_z: None,
            size: None,
            roll: None,
            size_variation: None,
            color_variation: None,
            motion_variation: None,
            material: None,
            color: None,
        }
    }
}

/// A block tag selection, stamped with the block it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Owning action name (`dynamic` for function headers).
    pub action: String,
    pub tag: String,
    pub option: String,
    /// Owning block category id.
    pub block: String,
}

/// Opaque item payload. The schema is not modeled yet; an empty payload is
/// the placeholder and round-trips as such.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Item {
    pub payload: String,
}

// ══════════════════════════════════════════════════════════════════════════════
// Rendering
// ══════════════════════════════════════════════════════════════════════════════

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => write!(f, "{text:?}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Location(l) => write!(f, "Loc[{}, {}, {}, {}, {}]", l.x, l.y, l.z, l.pitch, l.yaw),
            Value::Vector(v) => write!(f, "<{}, {}, {}>", v.x, v.y, v.z),
            Value::Sound(s) => write!(f, "Snd[{}, {}, {}]", s.name, s.pitch, s.volume),
            Value::Potion(p) => write!(f, "Pot[{}, {}, {}]", p.name, p.duration, p.level),
            Value::Variable(v) => write!(f, "{}[{}]", v.scope, v.name),
            Value::GameValue(g) => write!(f, "Val[{}, {}]", g.kind, g.target),
            Value::Particle(p) => write!(f, "{p}"),
            Value::Tag(t) => write!(f, "{{{} = {}}}", t.tag, t.option),
            Value::Item(_) => f.write_str("{ITEM}"),
        }
    }
}

impl fmt::Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut settings = vec![
            format!("amount = {}", self.amount),
            format!("spread_x = {}", self.spread_x),
            format!("spread_y = {}", self.spread_y),
        ];
        let floats = [
            ("motion_x", self.motion_x),
            ("motion_y", self.motion_y),
            ("motion_z", self.motion_z),
            ("size", self.size),
            ("roll", self.roll),
        ];
        settings.extend(
            floats
                .iter()
                .filter_map(|(name, v)| v.map(|v| format!("{name} = {v}"))),
        );
        let ints = [
            ("size_variation", self.size_variation),
            ("color_variation", self.color_variation),
            ("motion_variation", self.motion_variation),
        ];
        settings.extend(
            ints.iter()
                .filter_map(|(name, v)| v.map(|v| format!("{name} = {v}"))),
        );
        if let Some(material) = &self.material {
            settings.push(format!("material = {material}"));
        }
        if let Some(color) = self.color {
            settings.push(format!("color = #{color:06X}"));
        }
        write!(f, "Par[{}: {}]", self.name, settings.join(", "))
    }
}
