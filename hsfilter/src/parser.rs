use base64::Engine;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use tracing::trace;

use crate::ast::{ComparisonOperator, FilterNode, Path};
use crate::error::ParseError;
use crate::grammar::{FilterParser, Rule};
use crate::value::{Coord, Dict, Number, Ref, Value, XStr, ZonedDateTime};

type Result<T> = std::result::Result<T, ParseError>;

/// Render a parse tree node and its children, one line per node.
fn render_tree(pair: &Pair<Rule>, indent: usize, out: &mut String) {
    if matches!(pair.as_rule(), Rule::EOI) {
        return;
    }
    out.push_str(&format!("{:indent$}{:?}: '{}'\n", "", pair.as_rule(), pair.as_str().trim(), indent = indent));
    for inner in pair.clone().into_inner() {
        render_tree(&inner, indent + 2, out);
    }
}

fn trace_pairs(pairs: &Pairs<Rule>) {
    if tracing::enabled!(tracing::Level::TRACE) {
        let mut out = String::new();
        for pair in pairs.clone() {
            render_tree(&pair, 0, &mut out);
        }
        trace!("Parse tree:\n{}", out);
    }
}

fn unexpected(expected: &'static str, pair: &Pair<Rule>) -> ParseError { ParseError::UnexpectedRule { expected, got: pair.as_rule() } }

/// Parse Haystack filter text into a [`FilterNode`] tree.
pub fn parse_filter(input: &str) -> Result<FilterNode> {
    if input.trim().is_empty() {
        return Err(ParseError::EmptyExpression);
    }
    let pairs = FilterParser::parse(Rule::Filter, input)?;
    trace_pairs(&pairs);

    let filter = pairs.into_iter().next().ok_or(ParseError::EmptyExpression)?;
    let expr = filter.into_inner().next().ok_or(ParseError::EmptyExpression)?;
    if expr.as_rule() != Rule::OrExpr {
        return Err(unexpected("OrExpr", &expr));
    }
    build_or(expr)
}

/// Parse a single literal, e.g. `42kW` or `@p:demo:r:1`, into a [`Value`].
pub fn parse_value(input: &str) -> Result<Value> {
    if input.trim().is_empty() {
        return Err(ParseError::EmptyExpression);
    }
    let pairs = FilterParser::parse(Rule::ScalarValue, input)?;
    let root = pairs.into_iter().next().ok_or(ParseError::EmptyExpression)?;
    let scalar = root.into_inner().next().ok_or(ParseError::EmptyExpression)?;
    build_value(scalar)
}

fn build_or(pair: Pair<Rule>) -> Result<FilterNode> {
    let mut inner = pair.into_inner().filter(|p| p.as_rule() != Rule::Or);
    let first = inner.next().ok_or(ParseError::EmptyExpression)?;
    let mut node = build_and(first)?;
    for next in inner {
        node = node.or(build_and(next)?);
    }
    Ok(node)
}

fn build_and(pair: Pair<Rule>) -> Result<FilterNode> {
    if pair.as_rule() != Rule::AndExpr {
        return Err(unexpected("AndExpr", &pair));
    }
    let mut inner = pair.into_inner().filter(|p| p.as_rule() != Rule::And);
    let first = inner.next().ok_or(ParseError::EmptyExpression)?;
    let mut node = build_term(first)?;
    for next in inner {
        node = node.and(build_term(next)?);
    }
    Ok(node)
}

fn build_term(pair: Pair<Rule>) -> Result<FilterNode> {
    match pair.as_rule() {
        Rule::Parens => {
            let inner = pair.into_inner().next().ok_or(ParseError::EmptyExpression)?;
            build_or(inner)
        }
        Rule::HasPath => {
            let path = pair.into_inner().next().ok_or(ParseError::EmptyExpression)?;
            Ok(FilterNode::has(build_path(path)?))
        }
        Rule::Missing => {
            // Not keyword, then the path
            let path = pair.into_inner().find(|p| p.as_rule() == Rule::Path).ok_or(ParseError::EmptyExpression)?;
            Ok(FilterNode::missing(build_path(path)?))
        }
        Rule::Comparison => {
            let mut inner = pair.into_inner();
            let path = inner.next().ok_or(ParseError::EmptyExpression)?;
            let op = inner.next().ok_or(ParseError::EmptyExpression)?;
            let value = inner.next().ok_or(ParseError::EmptyExpression)?;
            let operator = match op.as_rule() {
                Rule::Eq => ComparisonOperator::Equal,
                Rule::Ne => ComparisonOperator::NotEqual,
                Rule::Lt => ComparisonOperator::LessThan,
                Rule::Le => ComparisonOperator::LessThanOrEqual,
                Rule::Gt => ComparisonOperator::GreaterThan,
                Rule::Ge => ComparisonOperator::GreaterThanOrEqual,
                _ => return Err(unexpected("comparison operator", &op)),
            };
            Ok(FilterNode::Comparison { path: build_path(path)?, operator, value: build_value(value)? })
        }
        _ => Err(unexpected("term", &pair)),
    }
}

fn build_path(pair: Pair<Rule>) -> Result<Path> {
    if pair.as_rule() != Rule::Path {
        return Err(unexpected("Path", &pair));
    }
    let segments: Vec<String> = pair.into_inner().map(|id| id.as_str().to_string()).collect();
    Path::try_from(segments).map_err(|_| ParseError::EmptyExpression)
}

fn build_value(pair: Pair<Rule>) -> Result<Value> {
    let offset = pair.as_span().start();
    match pair.as_rule() {
        Rule::Marker => Ok(Value::Marker),
        Rule::NA => Ok(Value::Na),
        Rule::Null => Ok(Value::Null),
        Rule::Bool => Ok(Value::Bool(matches!(pair.as_str(), "true" | "T"))),
        Rule::Number => build_number(pair),
        Rule::Str => Ok(Value::Str(quoted_text(pair)?)),
        Rule::Uri => Ok(Value::Uri(quoted_text(pair)?)),
        Rule::Ref => {
            let mut inner = pair.into_inner();
            let id = inner.next().ok_or(ParseError::EmptyExpression)?.as_str().to_string();
            let dis = inner.next().map(quoted_text).transpose()?;
            Ok(Value::Ref(Ref { id, dis }))
        }
        Rule::Coord => {
            let mut degrees = pair.into_inner().map(|p| p.as_str().parse::<f64>().map_err(|e| ParseError::invalid_literal(offset, e.to_string())));
            let lat = degrees.next().ok_or(ParseError::EmptyExpression)??;
            let lng = degrees.next().ok_or(ParseError::EmptyExpression)??;
            Ok(Value::Coord(Coord { lat, lng }))
        }
        Rule::XStr => {
            let mut inner = pair.into_inner();
            let kind = inner.next().ok_or(ParseError::EmptyExpression)?.as_str().to_string();
            let payload = quoted_text(inner.next().ok_or(ParseError::EmptyExpression)?)?;
            build_xstr(kind, payload, offset)
        }
        Rule::Date => Ok(Value::Date(parse_date(pair.as_str(), offset)?)),
        Rule::Time => Ok(Value::Time(parse_time(pair.as_str(), offset)?)),
        Rule::DateTime => build_datetime(pair),
        Rule::List => Ok(Value::List(pair.into_inner().map(build_value).collect::<Result<Vec<_>>>()?)),
        Rule::Dict => {
            let mut dict = Dict::new();
            for entry in pair.into_inner() {
                let mut inner = entry.into_inner();
                let name = inner.next().ok_or(ParseError::EmptyExpression)?.as_str().to_string();
                let value = match inner.next() {
                    Some(value) => build_value(value)?,
                    None => Value::Marker,
                };
                dict.insert(name, value);
            }
            Ok(Value::Dict(dict))
        }
        _ => Err(unexpected("literal", &pair)),
    }
}

fn build_number(pair: Pair<Rule>) -> Result<Value> {
    let offset = pair.as_span().start();
    let mut inner = pair.into_inner();
    let digits = inner.next().ok_or(ParseError::EmptyExpression)?;
    let value = match digits.as_rule() {
        Rule::Special => match digits.as_str() {
            "INF" => f64::INFINITY,
            "-INF" => f64::NEG_INFINITY,
            _ => f64::NAN,
        },
        _ => digits.as_str().replace('_', "").parse::<f64>().map_err(|e| ParseError::invalid_literal(offset, e.to_string()))?,
    };
    let unit = inner.next().map(|u| u.as_str().to_string());
    Ok(Value::Number(Number { value, unit }))
}

fn build_xstr(kind: String, payload: String, offset: usize) -> Result<Value> {
    match kind.as_str() {
        "hex" => {
            if payload.len() % 2 != 0 || !payload.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ParseError::invalid_literal(offset, format!("invalid hex payload {:?}", payload)));
            }
            Ok(Value::XStr(XStr::new("hex", payload.to_ascii_lowercase())))
        }
        "b64" => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(payload.as_bytes())
                .map_err(|e| ParseError::invalid_literal(offset, format!("invalid b64 payload: {}", e)))?;
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            Ok(Value::XStr(XStr::new("hex", hex)))
        }
        _ => Ok(Value::XStr(XStr { kind, payload })),
    }
}

fn parse_date(text: &str, offset: usize) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| ParseError::invalid_literal(offset, format!("invalid date {}: {}", text, e)))
}

fn parse_time(text: &str, offset: usize) -> Result<NaiveTime> {
    let format = if text.len() == 5 { "%H:%M" } else { "%H:%M:%S%.f" };
    NaiveTime::parse_from_str(text, format).map_err(|e| ParseError::invalid_literal(offset, format!("invalid time {}: {}", text, e)))
}

fn build_datetime(pair: Pair<Rule>) -> Result<Value> {
    let offset = pair.as_span().start();
    let (mut date, mut time, mut utc_offset, mut tz) = (None, None, 0i32, None);
    for part in pair.into_inner() {
        let text = part.as_str();
        match part.as_rule() {
            Rule::Date => date = Some(parse_date(text, offset)?),
            Rule::Time => time = Some(parse_time(text, offset)?),
            Rule::TzOffset if text.eq_ignore_ascii_case("z") => utc_offset = 0,
            Rule::TzOffset => {
                let hours: i32 = text[1..3].parse().map_err(|_| ParseError::invalid_literal(offset, "invalid offset"))?;
                let minutes: i32 = text[4..6].parse().map_err(|_| ParseError::invalid_literal(offset, "invalid offset"))?;
                let seconds = hours * 3600 + minutes * 60;
                utc_offset = if text.starts_with('-') { -seconds } else { seconds };
            }
            Rule::TzName => tz = Some(text.to_string()),
            _ => return Err(unexpected("datetime part", &part)),
        }
    }
    let (Some(date), Some(time)) = (date, time) else {
        return Err(ParseError::invalid_literal(offset, "incomplete datetime"));
    };
    let fixed = FixedOffset::east_opt(utc_offset).ok_or_else(|| ParseError::invalid_literal(offset, "offset out of range"))?;
    let instant = fixed
        .from_local_datetime(&NaiveDateTime::new(date, time))
        .single()
        .ok_or_else(|| ParseError::invalid_literal(offset, "ambiguous datetime"))?;
    Ok(Value::DateTime(match tz {
        Some(tz) => ZonedDateTime::new(instant, tz),
        None => ZonedDateTime::from_offset(instant),
    }))
}

/// Decode the inner text of a `Str` or `Uri` pair.
fn quoted_text(pair: Pair<Rule>) -> Result<String> {
    let offset = pair.as_span().start();
    let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
    unescape(raw, offset)
}

fn unescape(raw: &str, offset: usize) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = chars.next().ok_or_else(|| ParseError::invalid_literal(offset, "dangling escape"))?;
        match escaped {
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '"' | '\\' | '$' | '`' => out.push(escaped),
            'u' => {
                let code: String = chars.by_ref().take(4).collect();
                let point = u32::from_str_radix(&code, 16)
                    .ok()
                    .filter(|_| code.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| ParseError::invalid_literal(offset, format!("invalid \\u escape {:?}", code)))?;
                out.push(point);
            }
            other => return Err(ParseError::invalid_literal(offset, format!("unknown escape \\{}", other))),
        }
    }
    Ok(out)
}
