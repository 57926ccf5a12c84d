//! Haystack values: the literals a filter compares against and the tag values held by entities.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A Haystack dict: tag name to value, in insertion order.
pub type Dict = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Marker,
    Na,
    Null,
    Bool(bool),
    Number(Number),
    Str(String),
    Uri(String),
    Ref(Ref),
    Coord(Coord),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(ZonedDateTime),
    XStr(XStr),
    List(Vec<Value>),
    Dict(Dict),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Number {
    pub value: f64,
    pub unit: Option<String>,
}

impl Number {
    pub fn new(value: f64) -> Self { Self { value, unit: None } }
    pub fn with_unit(value: f64, unit: impl Into<String>) -> Self { Self { value, unit: Some(unit.into()) } }
}

/// A reference to another entity. Equality between refs only looks at the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ref {
    pub id: String,
    pub dis: Option<String>,
}

impl Ref {
    pub fn new(id: impl Into<String>) -> Self { Self { id: id.into(), dis: None } }
    pub fn with_dis(id: impl Into<String>, dis: impl Into<String>) -> Self { Self { id: id.into(), dis: Some(dis.into()) } }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lng: f64,
}

/// A timestamp with its Haystack timezone name (`UTC`, `Paris`, `GMT+5`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonedDateTime {
    pub instant: DateTime<FixedOffset>,
    pub tz: String,
}

impl ZonedDateTime {
    pub fn new(instant: DateTime<FixedOffset>, tz: impl Into<String>) -> Self { Self { instant, tz: tz.into() } }

    /// Uses the conventional Haystack name for a bare offset: `UTC` for zero, otherwise `GMT±h`
    /// with the inverted POSIX sign (`-05:00` is `GMT+5`).
    pub fn from_offset(instant: DateTime<FixedOffset>) -> Self {
        let seconds = instant.offset().local_minus_utc();
        let tz = if seconds == 0 {
            "UTC".to_string()
        } else if seconds % 3600 == 0 {
            format!("GMT{:+}", -seconds / 3600)
        } else {
            let minutes = seconds.abs() / 60;
            format!("GMT{}{:02}:{:02}", if seconds < 0 { '+' } else { '-' }, minutes / 60, minutes % 60)
        };
        Self { instant, tz }
    }

    /// ISO 8601 text with an explicit numeric offset, e.g. `1977-04-22T01:00:00+00:00`.
    pub fn iso(&self) -> String { self.instant.to_rfc3339_opts(SecondsFormat::AutoSi, false) }
}

/// An extended string such as `hex("deadbeef")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XStr {
    pub kind: String,
    pub payload: String,
}

impl XStr {
    pub fn new(kind: impl Into<String>, payload: impl Into<String>) -> Self { Self { kind: kind.into(), payload: payload.into() } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Marker,
    Na,
    Null,
    Bool,
    Number,
    Str,
    Uri,
    Ref,
    Coord,
    Date,
    Time,
    DateTime,
    XStr,
    List,
    Dict,
}

impl ValueKind {
    /// Kinds that support `<`, `<=`, `>` and `>=`.
    pub fn is_ordered(&self) -> bool {
        matches!(self, ValueKind::Number | ValueKind::Str | ValueKind::Date | ValueKind::Time | ValueKind::DateTime)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Marker => "marker",
            ValueKind::Na => "na",
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::Str => "str",
            ValueKind::Uri => "uri",
            ValueKind::Ref => "ref",
            ValueKind::Coord => "coord",
            ValueKind::Date => "date",
            ValueKind::Time => "time",
            ValueKind::DateTime => "dateTime",
            ValueKind::XStr => "xstr",
            ValueKind::List => "list",
            ValueKind::Dict => "dict",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Marker => ValueKind::Marker,
            Value::Na => ValueKind::Na,
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::Str(_) => ValueKind::Str,
            Value::Uri(_) => ValueKind::Uri,
            Value::Ref(_) => ValueKind::Ref,
            Value::Coord(_) => ValueKind::Coord,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::XStr(_) => ValueKind::XStr,
            Value::List(_) => ValueKind::List,
            Value::Dict(_) => ValueKind::Dict,
        }
    }

    pub fn number(value: f64) -> Self { Value::Number(Number::new(value)) }

    pub fn quantity(value: f64, unit: impl Into<String>) -> Self { Value::Number(Number::with_unit(value, unit)) }

    pub fn reference(id: impl Into<String>) -> Self { Value::Ref(Ref::new(id)) }

    pub fn as_reference(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self { Value::number(n) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Str(s.to_string()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::Str(s) }
}

impl From<Ref> for Value {
    fn from(r: Ref) -> Self { Value::Ref(r) }
}

/// Writes `s` as a quoted literal, escaping `quote`, backslash and control characters.
pub(crate) fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str, quote: char) -> fmt::Result {
    write!(f, "{}", quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\u{8}' => f.write_str("\\b")?,
            '\u{c}' => f.write_str("\\f")?,
            c if c == quote => write!(f, "\\{}", c)?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "{}", quote)
}

fn write_number(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        f.write_str("NaN")
    } else if value.is_infinite() {
        f.write_str(if value > 0.0 { "INF" } else { "-INF" })
    } else {
        write!(f, "{}", value)
    }
}

/// Renders the value in filter literal syntax, so that it parses back to an equal value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Marker => f.write_str("M"),
            Value::Na => f.write_str("NA"),
            Value::Null => f.write_str("N"),
            Value::Bool(b) => f.write_str(if *b { "T" } else { "F" }),
            Value::Number(n) => {
                write_number(f, n.value)?;
                match &n.unit {
                    Some(unit) if n.value.is_finite() => f.write_str(unit),
                    _ => Ok(()),
                }
            }
            Value::Str(s) => write_quoted(f, s, '"'),
            Value::Uri(u) => write_quoted(f, u, '`'),
            Value::Ref(r) => {
                write!(f, "@{}", r.id)?;
                if let Some(dis) = &r.dis {
                    f.write_str(" ")?;
                    write_quoted(f, dis, '"')?;
                }
                Ok(())
            }
            Value::Coord(c) => write!(f, "C({},{})", c.lat, c.lng),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Value::DateTime(dt) => write!(f, "{} {}", dt.instant.to_rfc3339_opts(SecondsFormat::AutoSi, true), dt.tz),
            Value::XStr(x) => {
                f.write_str(&x.kind)?;
                f.write_str("(")?;
                write_quoted(f, &x.payload, '"')?;
                f.write_str(")")
            }
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Dict(dict) => {
                f.write_str("{")?;
                for (i, (name, value)) in dict.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    match value {
                        Value::Marker => f.write_str(name)?,
                        value => write!(f, "{}:{}", name, value)?,
                    }
                }
                f.write_str("}")
            }
        }
    }
}
