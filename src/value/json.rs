//! Extended JSON mapping for [`Value`]
//!
//! Types without a JSON counterpart use single-key marker objects:
//! - `{"$date": "<rfc3339>"}`
//! - `{"$binary": "<base64>"}`
//! - `{"$uuid": "<uuid>"}`
//! - `{"$long": "<i64>"}`
//!
//! Plain JSON integers within 32 bits decode as `Int`, wider ones as `Long`.
//! A marker object whose payload does not parse is kept as a document.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value as Json};
use uuid::Uuid;

use super::types::{Document, Value};

/// Converts a JSON value into a document value.
pub fn from_json(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => number_value(&n),
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::Array(items.into_iter().map(from_json).collect()),
        Json::Object(map) => {
            if let Some(value) = marker_value(&map) {
                return value;
            }
            Value::Document(
                map.into_iter()
                    .map(|(key, value)| (key, from_json(value)))
                    .collect::<Document>(),
            )
        }
    }
}

/// Converts a document value into extended JSON.
///
/// Non-finite floats have no JSON form and become `null`.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Long(l) => {
            if i32::try_from(*l).is_ok() {
                marker("$long", l.to_string())
            } else {
                Json::from(*l)
            }
        }
        Value::Float(x) => Number::from_f64(*x).map(Json::Number).unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.clone()),
        Value::DateTime(dt) => marker("$date", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Binary(bytes) => marker("$binary", STANDARD.encode(bytes)),
        Value::Identifier(id) => marker("$uuid", id.to_string()),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Document(doc) => Json::Object(
            doc.iter()
                .map(|(key, value)| (key.clone(), to_json(value)))
                .collect::<Map<String, Json>>(),
        ),
    }
}

fn number_value(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        return match i32::try_from(i) {
            Ok(small) => Value::Int(small),
            Err(_) => Value::Long(i),
        };
    }
    // u64 beyond i64 range and real numbers both land here.
    Value::Float(n.as_f64().unwrap_or(f64::NAN))
}

fn marker(key: &str, payload: String) -> Json {
    let mut map = Map::new();
    map.insert(key.to_string(), Json::String(payload));
    Json::Object(map)
}

fn marker_value(map: &Map<String, Json>) -> Option<Value> {
    if map.len() != 1 {
        return None;
    }
    let (key, payload) = map.iter().next()?;
    let payload = payload.as_str()?;
    match key.as_str() {
        "$date" => DateTime::parse_from_rfc3339(payload)
            .ok()
            .map(|dt| Value::DateTime(dt.with_timezone(&Utc))),
        "$binary" => STANDARD.decode(payload).ok().map(Value::Binary),
        "$uuid" => Uuid::parse_str(payload).ok().map(Value::Identifier),
        "$long" => payload.parse::<i64>().ok().map(Value::Long),
        _ => None,
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        from_json(json)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        to_json(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Json::deserialize(deserializer).map(from_json)
    }
}
