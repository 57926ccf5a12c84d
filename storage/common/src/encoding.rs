//! The kind-prefix codec used for entities at rest.
//!
//! Every scalar is stored as a string carrying a two character kind prefix (`s:`, `n:`, `r:`, ...).
//! Booleans and nulls stay native JSON, lists and dicts become JSON arrays and objects of encoded
//! values. The store compilers rely on this layout to strip prefixes and cast.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Timelike};
use hsfilter::{Coord, Dict, Number, Ref, Value, ValueKind, XStr, ZonedDateTime};
use serde_json::{Map, Value as Json};

use crate::error::CodecError;

/// The prefix a scalar kind is stored under, `None` for kinds kept as native JSON.
pub fn kind_prefix(kind: ValueKind) -> Option<&'static str> {
    Some(match kind {
        ValueKind::Str => "s:",
        ValueKind::Number => "n:",
        ValueKind::Marker => "m:",
        ValueKind::Na => "z:",
        ValueKind::Date => "d:",
        ValueKind::Time => "h:",
        ValueKind::DateTime => "t:",
        ValueKind::Ref => "r:",
        ValueKind::Uri => "u:",
        ValueKind::Coord => "c:",
        ValueKind::XStr => "x:",
        ValueKind::Bool | ValueKind::Null | ValueKind::List | ValueKind::Dict => return None,
    })
}

pub fn encode_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "INF".to_string() } else { "-INF".to_string() }
    } else {
        format!("{:.6}", value)
    }
}

pub fn encode_time(time: &NaiveTime) -> String {
    if time.nanosecond() == 0 { time.format("%H:%M:%S").to_string() } else { time.format("%H:%M:%S%.6f").to_string() }
}

/// ISO text with a numeric offset, as stored after the `t:` prefix.
pub fn encode_instant(datetime: &ZonedDateTime) -> String { datetime.instant.to_rfc3339_opts(SecondsFormat::AutoSi, false) }

/// The prefixed string for a scalar, `None` for bool, null, list and dict.
pub fn encode_scalar(value: &Value) -> Option<String> {
    let prefix = kind_prefix(value.kind())?;
    let body = match value {
        Value::Str(s) | Value::Uri(s) => s.clone(),
        Value::Number(Number { value, unit }) => match unit {
            Some(unit) if value.is_finite() => format!("{} {}", encode_number(*value), unit),
            _ => encode_number(*value),
        },
        Value::Marker | Value::Na => String::new(),
        Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        Value::Time(t) => encode_time(t),
        Value::DateTime(dt) => format!("{} {}", encode_instant(dt), dt.tz),
        Value::Ref(Ref { id, dis }) => match dis {
            Some(dis) => format!("{} {}", id, dis),
            None => id.clone(),
        },
        Value::Coord(Coord { lat, lng }) => format!("{:.6},{:.6}", lat, lng),
        Value::XStr(XStr { kind, payload }) => format!("{}:{}", kind, payload),
        Value::Bool(_) | Value::Null | Value::List(_) | Value::Dict(_) => return None,
    };
    Some(format!("{}{}", prefix, body))
}

pub fn encode_value(value: &Value) -> Json {
    match value {
        Value::Bool(b) => Json::Bool(*b),
        Value::Null => Json::Null,
        Value::List(items) => Json::Array(items.iter().map(encode_value).collect()),
        Value::Dict(dict) => Json::Object(encode_dict(dict)),
        scalar => encode_scalar(scalar).map(Json::String).unwrap_or(Json::Null),
    }
}

fn encode_dict(dict: &Dict) -> Map<String, Json> { dict.iter().map(|(name, value)| (name.clone(), encode_value(value))).collect() }

/// Encode a whole entity as the JSON document stored in the entity column.
pub fn encode_entity(entity: &Dict) -> Json { Json::Object(encode_dict(entity)) }

pub fn decode_value(json: &Json) -> Result<Value, CodecError> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => Ok(Value::number(n.as_f64().unwrap_or(f64::NAN))),
        Json::String(s) => decode_scalar(s),
        Json::Array(items) => Ok(Value::List(items.iter().map(decode_value).collect::<Result<_, _>>()?)),
        Json::Object(map) => Ok(Value::Dict(decode_map(map)?)),
    }
}

pub fn decode_entity(json: &Json) -> Result<Dict, CodecError> {
    match json {
        Json::Object(map) => decode_map(map),
        _ => Err(CodecError::NotAnObject),
    }
}

fn decode_map(map: &Map<String, Json>) -> Result<Dict, CodecError> {
    map.iter().map(|(name, value)| Ok((name.clone(), decode_value(value)?))).collect()
}

fn invalid(kind: ValueKind, text: &str) -> CodecError { CodecError::InvalidScalar { kind, text: text.to_string() } }

pub fn decode_scalar(text: &str) -> Result<Value, CodecError> {
    let (Some(prefix), Some(body)) = (text.get(..2), text.get(2..)) else {
        return Err(CodecError::UnknownPrefix(text.to_string()));
    };
    match prefix {
        "s:" => Ok(Value::Str(body.to_string())),
        "u:" => Ok(Value::Uri(body.to_string())),
        "m:" => Ok(Value::Marker),
        "z:" => Ok(Value::Na),
        "n:" => {
            let (magnitude, unit) = match body.split_once(' ') {
                Some((magnitude, unit)) => (magnitude, Some(unit.to_string())),
                None => (body, None),
            };
            let value = match magnitude {
                "INF" => f64::INFINITY,
                "-INF" => f64::NEG_INFINITY,
                "NaN" => f64::NAN,
                _ => magnitude.parse().map_err(|_| invalid(ValueKind::Number, text))?,
            };
            Ok(Value::Number(Number { value, unit }))
        }
        "d:" => NaiveDate::parse_from_str(body, "%Y-%m-%d").map(Value::Date).map_err(|_| invalid(ValueKind::Date, text)),
        "h:" => NaiveTime::parse_from_str(body, "%H:%M:%S%.f").map(Value::Time).map_err(|_| invalid(ValueKind::Time, text)),
        "t:" => {
            let (iso, tz) = body.split_once(' ').unwrap_or((body, "UTC"));
            let instant = DateTime::parse_from_rfc3339(iso).map_err(|_| invalid(ValueKind::DateTime, text))?;
            Ok(Value::DateTime(ZonedDateTime::new(instant, tz)))
        }
        "r:" => Ok(Value::Ref(match body.split_once(' ') {
            Some((id, dis)) => Ref::with_dis(id, dis),
            None => Ref::new(body),
        })),
        "c:" => {
            let (lat, lng) = body.split_once(',').ok_or_else(|| invalid(ValueKind::Coord, text))?;
            let lat = lat.parse().map_err(|_| invalid(ValueKind::Coord, text))?;
            let lng = lng.parse().map_err(|_| invalid(ValueKind::Coord, text))?;
            Ok(Value::Coord(Coord { lat, lng }))
        }
        "x:" => {
            let (kind, payload) = body.split_once(':').ok_or_else(|| invalid(ValueKind::XStr, text))?;
            Ok(Value::XStr(XStr::new(kind, payload)))
        }
        _ => Err(CodecError::UnknownPrefix(text.to_string())),
    }
}
