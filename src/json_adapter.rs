//! JSON bridge: converts JSON text to `Value` and back.
//!
//! Type mapping (JSON → Value):
//!   object  → Map    (source order, duplicate keys kept)
//!   array   → Array
//!   string  → Text
//!   boolean → Bool
//!   integer → Int    (no '.', 'e' or 'E' in the token)
//!   float   → F64
//!   null    → Nil
//!
//! Integer/float detection works on the raw number token.  With serde_json's
//! `arbitrary_precision` feature, numbers arrive through the deserializer as
//! a single-entry map keyed "$serde_json::private::Number" whose value is
//! the exact source token.
//!
//! serde_json's own `Value` collapses duplicate object keys, so parsing goes
//! through a small custom tree that keeps every pair.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use std::fmt;

use crate::errors::{Error, Result};
use crate::value::Value;

// serde_json's internal key for raw number tokens under arbitrary_precision.
const SERDE_JSON_NUMBER_KEY: &str = "$serde_json::private::Number";

/// JSON parse tree with objects as pair lists.  A mashpack map may repeat a
/// key, so a JSON document describing one has to come through with every
/// pair intact and in order.
#[derive(Debug)]
enum ParsedJson {
    Null,
    Bool(bool),
    /// Exact source token, e.g. "42", "3.14", "1e5".
    Number(String),
    String(String),
    Array(Vec<ParsedJson>),
    Object(Vec<(String, ParsedJson)>),
}

struct ParsedJsonVisitor;

impl<'de> Visitor<'de> for ParsedJsonVisitor {
    type Value = ParsedJson;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<ParsedJson, E> {
        Ok(ParsedJson::Bool(v))
    }

    // Only reached without arbitrary_precision.
    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ParsedJson, E> {
        Ok(ParsedJson::Number(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ParsedJson, E> {
        Ok(ParsedJson::Number(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<ParsedJson, E> {
        Ok(ParsedJson::Number(format!("{:e}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ParsedJson, E> {
        Ok(ParsedJson::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<ParsedJson, E> {
        Ok(ParsedJson::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<ParsedJson, E> {
        Ok(ParsedJson::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ParsedJson, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<ParsedJson>()? {
            items.push(item);
        }
        Ok(ParsedJson::Array(items))
    }

    // A number token arrives as a one-entry map; anything else is an object.
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ParsedJson, A::Error> {
        let first_key: Option<String> = map.next_key()?;

        match first_key {
            Some(ref key) if key == SERDE_JSON_NUMBER_KEY => {
                let raw: String = map.next_value()?;
                Ok(ParsedJson::Number(raw))
            }
            Some(first_key) => {
                let mut pairs = Vec::new();
                let first_value: ParsedJson = map.next_value()?;
                pairs.push((first_key, first_value));

                while let Some(key) = map.next_key::<String>()? {
                    let value: ParsedJson = map.next_value()?;
                    pairs.push((key, value));
                }
                Ok(ParsedJson::Object(pairs))
            }
            None => Ok(ParsedJson::Object(Vec::new())),
        }
    }
}

impl<'de> Deserialize<'de> for ParsedJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ParsedJsonVisitor)
    }
}

// ── JSON → Value ─────────────────────────────────────────────

fn parsed_to_value(x: ParsedJson) -> Result<Value> {
    Ok(match x {
        ParsedJson::Null => Value::Nil,
        ParsedJson::Bool(b) => Value::Bool(b),
        ParsedJson::String(s) => Value::Text(s),
        ParsedJson::Number(token) => number_to_value(&token)?,
        ParsedJson::Array(items) => Value::Array(
            items
                .into_iter()
                .map(parsed_to_value)
                .collect::<Result<_>>()?,
        ),
        ParsedJson::Object(pairs) => Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| Ok((Value::Text(k), parsed_to_value(v)?)))
                .collect::<Result<_>>()?,
        ),
    })
}

fn number_to_value(token: &str) -> Result<Value> {
    if token.contains('.') || token.contains('e') || token.contains('E') {
        let x: f64 = token
            .parse()
            .map_err(|_| Error::format(format!("invalid JSON number: {}", token)))?;
        return Ok(Value::F64(x));
    }
    // i128 holds every integer the wire format can carry; wider tokens are
    // rejected here rather than at encode time.
    let i: i128 = token
        .parse()
        .map_err(|_| Error::range(format!("integer {} too large to represent", token)))?;
    Ok(Value::Int(i))
}

/// Parse JSON text into a `Value`.
pub fn from_json_slice(raw: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| Error::format(format!("invalid UTF-8 in JSON input: {}", e)))?;
    let parsed: ParsedJson = serde_json::from_str(text)
        .map_err(|e| Error::format(format!("JSON parse error: {}", e)))?;
    parsed_to_value(parsed)
}

// ── Value → JSON ─────────────────────────────────────────────

/// Convert a `Value` to JSON.  Map keys must be text; with duplicate keys the
/// last pair wins.
pub fn to_json(value: &Value) -> Result<serde_json::Value> {
    use serde_json::Value as Json;

    Ok(match value {
        Value::Nil => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number(
            i.to_string()
                .parse()
                .map_err(|_| Error::Unserializable(value.to_string()))?,
        ),
        Value::F32(x) => float_to_json(*x as f64, value)?,
        Value::F64(x) => float_to_json(*x, value)?,
        Value::Text(s) => Json::String(s.clone()),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect::<Result<_>>()?),
        Value::Map(pairs) => {
            let mut object = serde_json::Map::with_capacity(pairs.len());
            for (k, v) in pairs {
                let Value::Text(key) = k else {
                    return Err(Error::Unserializable(format!("{} as JSON object key", k.kind())));
                };
                object.insert(key.clone(), to_json(v)?);
            }
            Json::Object(object)
        }
        Value::Bytes(_) | Value::Ext(_) | Value::Opaque(_) => {
            return Err(Error::Unserializable(value.to_string()));
        }
    })
}

fn float_to_json(x: f64, original: &Value) -> Result<serde_json::Value> {
    serde_json::Number::from_f64(x)
        .map(serde_json::Value::Number)
        .ok_or_else(|| Error::Unserializable(original.to_string()))
}
