//! Value wire records.
//!
//! Every value becomes `{"id": <discriminator>, "data": {...}}`. The record
//! depends only on the value itself. String escaping is left to the JSON
//! writer, which escapes quotes, backslashes and control characters and
//! nothing else.
//!
//! | Variant   | id      | data                                             |
//! |-----------|---------|--------------------------------------------------|
//! | Text      | `txt`   | `name`                                           |
//! | Number    | `num`   | `name` (decimal string)                          |
//! | Location  | `loc`   | `isBlock`, `loc: {x, y, z, pitch, yaw}`          |
//! | Vector    | `vec`   | `x`, `y`, `z`                                    |
//! | Sound     | `snd`   | `sound`, `pitch`, `vol`                          |
//! | Potion    | `pot`   | `pot`, `dur`, `amp`                              |
//! | Variable  | `var`   | `name`, `scope`                                  |
//! | GameValue | `g_val` | `type`, `target`                                 |
//! | Particle  | `part`  | `particle`, `cluster`, `data` (set fields only)  |
//! | Tag       | `bl_tag`| `option`, `tag`, `action`, `block`               |
//! | Item      | `item`  | `item` (opaque payload)                          |

use serde_json::{json, Map, Value as Json};
use thiserror::Error;

use crate::value::*;

/// A wire record that does not describe a valid [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("record is not an object with `id` and `data`")]
    Malformed,
    #[error("unknown value id `{0}`")]
    UnknownId(String),
    #[error("`{id}` record is missing field `{field}`")]
    MissingField { id: &'static str, field: &'static str },
    #[error("`{id}` record has an invalid `{field}`")]
    InvalidField { id: &'static str, field: &'static str },
}

/// JSON number for an `f32`, printed the way `f32` prints (`0.1`, not
/// `0.10000000149011612`).
fn float(value: f32) -> Json {
    value
        .to_string()
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map_or(Json::Null, Json::Number)
}

impl Value {
    /// The self-describing wire record for this value.
    pub fn to_wire(&self) -> Json {
        let (id, data) = match self {
            Value::Text(text) => ("txt", json!({ "name": text })),
            Value::Number(n) => ("num", json!({ "name": n.to_string() })),
            Value::Location(l) => (
                "loc",
                json!({
                    "isBlock": false,
                    "loc": {
                        "x": float(l.x),
                        "y": float(l.y),
                        "z": float(l.z),
                        "pitch": float(l.pitch),
                        "yaw": float(l.yaw),
                    }
                }),
            ),
            Value::Vector(v) => (
                "vec",
                json!({ "x": float(v.x), "y": float(v.y), "z": float(v.z) }),
            ),
            Value::Sound(s) => (
                "snd",
                json!({ "sound": s.name, "pitch": float(s.pitch), "vol": float(s.volume) }),
            ),
            Value::Potion(p) => (
                "pot",
                json!({ "pot": p.name, "dur": p.duration, "amp": p.level }),
            ),
            Value::Variable(v) => (
                "var",
                json!({ "name": v.name, "scope": v.scope.wire_name() }),
            ),
            Value::GameValue(g) => (
                "g_val",
                json!({ "type": g.kind, "target": g.target.name() }),
            ),
            Value::Particle(p) => ("part", particle_data(p)),
            Value::Tag(t) => (
                "bl_tag",
                json!({
                    "option": t.option,
                    "tag": t.tag,
                    "action": t.action,
                    "block": t.block,
                }),
            ),
            Value::Item(item) => ("item", json!({ "item": item.payload })),
        };
        json!({ "id": id, "data": data })
    }

    /// Decode a record produced by [`Value::to_wire`].
    pub fn from_wire(record: &Json) -> Result<Value, WireError> {
        let id = record
            .get("id")
            .and_then(Json::as_str)
            .ok_or(WireError::Malformed)?;
        let data = record
            .get("data")
            .and_then(Json::as_object)
            .ok_or(WireError::Malformed)?;

        let value = match id {
            "txt" => Value::Text(Fields::new("txt", data).string("name")?),
            "num" => {
                let raw = Fields::new("num", data).string("name")?;
                let n = raw.parse::<f32>().map_err(|_| WireError::InvalidField {
                    id: "num",
                    field: "name",
                })?;
                Value::Number(n)
            }
            "loc" => {
                let loc = data
                    .get("loc")
                    .and_then(Json::as_object)
                    .ok_or(WireError::MissingField { id: "loc", field: "loc" })?;
                let f = Fields::new("loc", loc);
                Value::Location(Location {
                    x: f.float("x")?,
                    y: f.float("y")?,
                    z: f.float("z")?,
                    pitch: f.float("pitch")?,
                    yaw: f.float("yaw")?,
                })
            }
            "vec" => {
                let f = Fields::new("vec", data);
                Value::Vector(Vector {
                    x: f.float("x")?,
                    y: f.float("y")?,
                    z: f.float("z")?,
                })
            }
            "snd" => {
                let f = Fields::new("snd", data);
                Value::Sound(Sound {
                    name: f.string("sound")?,
                    pitch: f.float("pitch")?,
                    volume: f.float("vol")?,
                })
            }
            "pot" => {
                let f = Fields::new("pot", data);
                Value::Potion(Potion {
                    name: f.string("pot")?,
                    duration: f.int("dur")?,
                    level: f.int("amp")?,
                })
            }
            "var" => {
                let f = Fields::new("var", data);
                let scope = VariableScope::from_wire_name(&f.string("scope")?).ok_or(
                    WireError::InvalidField {
                        id: "var",
                        field: "scope",
                    },
                )?;
                Value::Variable(Variable::new(f.string("name")?, scope))
            }
            "g_val" => {
                let f = Fields::new("g_val", data);
                let target = Selector::from_name(&f.string("target")?).ok_or(
                    WireError::InvalidField {
                        id: "g_val",
                        field: "target",
                    },
                )?;
                Value::GameValue(GameValue {
                    kind: f.string("type")?,
                    target,
                })
            }
            "part" => Value::Particle(particle_from(data)?),
            "bl_tag" => {
                let f = Fields::new("bl_tag", data);
                Value::Tag(Tag {
                    action: f.string("action")?,
                    tag: f.string("tag")?,
                    option: f.string("option")?,
                    block: f.string("block")?,
                })
            }
            "item" => Value::Item(Item {
                payload: Fields::new("item", data).string("item")?,
            }),
            other => return Err(WireError::UnknownId(other.to_string())),
        };
        Ok(value)
    }
}

fn particle_data(p: &Particle) -> Json {
    let mut settings = Map::new();
    let floats = [
        ("x", p.motion_x),
        ("y", p.motion_y),
        ("z", p.motion_z),
        ("size", p.size),
        ("roll", p.roll),
    ];
    for (key, value) in floats {
        if let Some(v) = value {
            settings.insert(key.into(), float(v));
        }
    }
    let ints = [
        ("sizeVariation", p.size_variation),
        ("colorVariation", p.color_variation),
        ("motionVariation", p.motion_variation),
    ];
    for (key, value) in ints {
        if let Some(v) = value {
            settings.insert(key.into(), json!(v));
        }
    }
    if let Some(material) = &p.material {
        settings.insert("material".into(), json!(material));
    }
    if let Some(rgb) = p.color {
        settings.insert("rgb".into(), json!(rgb));
    }
    json!({
        "particle": p.name,
        "cluster": {
            "amount": p.amount,
            "horizontal": float(p.spread_x),
            "vertical": float(p.spread_y),
        },
        "data": settings,
    })
}

fn particle_from(data: &Map<String, Json>) -> Result<Particle, WireError> {
    const ID: &str = "part";
    let top = Fields::new(ID, data);
    let cluster = data
        .get("cluster")
        .and_then(Json::as_object)
        .ok_or(WireError::MissingField { id: ID, field: "cluster" })?;
    let cluster = Fields::new(ID, cluster);
    let settings = data
        .get("data")
        .and_then(Json::as_object)
        .ok_or(WireError::MissingField { id: ID, field: "data" })?;
    let settings = Fields::new(ID, settings);

    Ok(Particle {
        name: top.string("particle")?,
        amount: cluster.int("amount")?,
        spread_x: cluster.float("horizontal")?,
        spread_y: cluster.float("vertical")?,
        motion_x: settings.opt_float("x")?,
        motion_y: settings.opt_float("y")?,
        motion_z: settings.opt_float("z")?,
        size: settings.opt_float("size")?,
        roll: settings.opt_float("roll")?,
        size_variation: settings.opt_int("sizeVariation")?,
        color_variation: settings.opt_int("colorVariation")?,
        motion_variation: settings.opt_int("motionVariation")?,
        material: settings.opt_string("material")?,
        color: settings.opt_int("rgb")?,
    })
}

/// Typed field access over one record's `data` object.
struct Fields<'a> {
    id: &'static str,
    map: &'a Map<String, Json>,
}

impl<'a> Fields<'a> {
    fn new(id: &'static str, map: &'a Map<String, Json>) -> Self {
        Self { id, map }
    }

    fn get(&self, field: &'static str) -> Result<&'a Json, WireError> {
        self.map
            .get(field)
            .ok_or(WireError::MissingField { id: self.id, field })
    }

    fn invalid(&self, field: &'static str) -> WireError {
        WireError::InvalidField { id: self.id, field }
    }

    fn string(&self, field: &'static str) -> Result<String, WireError> {
        self.get(field)?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| self.invalid(field))
    }

    fn float(&self, field: &'static str) -> Result<f32, WireError> {
        self.get(field)?
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| self.invalid(field))
    }

    fn int(&self, field: &'static str) -> Result<i32, WireError> {
        self.get(field)?
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| self.invalid(field))
    }

    fn opt_float(&self, field: &'static str) -> Result<Option<f32>, WireError> {
        match self.map.get(field) {
            None => Ok(None),
            Some(_) => self.float(field).map(Some),
        }
    }

    fn opt_int(&self, field: &'static str) -> Result<Option<i32>, WireError> {
        match self.map.get(field) {
            None => Ok(None),
            Some(_) => self.int(field).map(Some),
        }
    }

    fn opt_string(&self, field: &'static str) -> Result<Option<String>, WireError> {
        match self.map.get(field) {
            None => Ok(None),
            Some(_) => self.string(field).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: Value) {
        let record = value.to_wire();
        let back = Value::from_wire(&record).unwrap();
        assert_eq!(back, value, "record was {record}");
    }

    #[test]
    fn text_record_shape() {
        let record = Value::text("Hello").to_wire();
        assert_eq!(record.to_string(), r#"{"data":{"name":"Hello"},"id":"txt"}"#);
    }

    #[test]
    fn text_escapes_quotes_and_control_characters_only() {
        let record = Value::text("say \"hi\"\n\tñ").to_wire();
        let encoded = record.to_string();
        assert!(encoded.contains(r#"say \"hi\"\n\tñ"#), "{encoded}");
    }

    #[test]
    fn number_is_a_decimal_string() {
        let record = Value::Number(0.1).to_wire();
        assert_eq!(record["data"]["name"], "0.1");
        let record = Value::Number(3.0).to_wire();
        assert_eq!(record["data"]["name"], "3");
    }

    #[test]
    fn location_floats_print_as_f32() {
        let record = Value::Location(Location {
            x: 0.1,
            y: 64.0,
            z: -2.5,
            pitch: 0.0,
            yaw: 90.0,
        })
        .to_wire();
        assert_eq!(record["data"]["isBlock"], false);
        assert_eq!(record["data"]["loc"]["x"].to_string(), "0.1");
    }

    #[test]
    fn particle_omits_unset_fields() {
        let record = Value::Particle(Particle::new("Flame")).to_wire();
        assert_eq!(record["data"]["data"], json!({}));
        assert_eq!(record["data"]["cluster"]["amount"], 1);
    }

    #[test]
    fn particle_variations_keep_their_own_values() {
        let mut p = Particle::new("Dust");
        p.size_variation = Some(10);
        p.color_variation = Some(20);
        p.motion_variation = Some(30);
        let record = Value::Particle(p).to_wire();
        let data = &record["data"]["data"];
        assert_eq!(data["sizeVariation"], 10);
        assert_eq!(data["colorVariation"], 20);
        assert_eq!(data["motionVariation"], 30);
        assert!(data.get("rgb").is_none());
    }

    #[test]
    fn every_variant_round_trips() {
        let mut particle = Particle::new("Dust");
        particle.amount = 7;
        particle.spread_x = 0.5;
        particle.motion_z = Some(-0.25);
        particle.roll = Some(1.5);
        particle.material = Some("STONE".into());
        particle.color = Some(0x00FF00);

        let values = vec![
            Value::text("multi\nline \"quoted\""),
            Value::Number(-12.75),
            Value::Location(Location { x: 1.5, y: 2.0, z: 3.25, pitch: 10.0, yaw: -45.0 }),
            Value::Vector(Vector { x: 0.1, y: 0.2, z: 0.3 }),
            Value::Sound(Sound { name: "Pling".into(), pitch: 2.0, volume: 0.5 }),
            Value::Potion(Potion { name: "Speed".into(), duration: 200, level: 1 }),
            Value::var("score", VariableScope::Saved),
            Value::var("tmp", VariableScope::Line),
            Value::GameValue(GameValue { kind: "Location".into(), target: Selector::Victim }),
            Value::Particle(particle),
            Value::Tag(Tag {
                action: "SendMessage".into(),
                tag: "Alignment Mode".into(),
                option: "Centered".into(),
                block: "player_action".into(),
            }),
            Value::Item(Item::default()),
        ];
        for value in values {
            round_trip(value);
        }
    }

    #[test]
    fn decode_rejects_bad_records() {
        assert_eq!(Value::from_wire(&json!("txt")), Err(WireError::Malformed));
        assert_eq!(
            Value::from_wire(&json!({"id": "zzz", "data": {}})),
            Err(WireError::UnknownId("zzz".into()))
        );
        assert_eq!(
            Value::from_wire(&json!({"id": "var", "data": {"name": "x", "scope": "global"}})),
            Err(WireError::InvalidField { id: "var", field: "scope" })
        );
        assert_eq!(
            Value::from_wire(&json!({"id": "snd", "data": {"sound": "Pling", "pitch": 1.0}})),
            Err(WireError::MissingField { id: "snd", field: "vol" })
        );
    }
}
