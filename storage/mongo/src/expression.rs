use hsfilter::{ComparisonOperator, FilterNode, Path, UnaryOperator, Value};
use hsfilter_storage_common::encoding::{encode_instant, encode_time};
use hsfilter_storage_common::{encode_value, presence_run, CompileError};
use serde_json::{json, Map, Value as Json};

pub(crate) const NUMBER_REGEX: &str = r"n:([-+]?([0-9]*[.])?[0-9]+([eE][-+]?\d+)?)";
pub(crate) const REF_REGEX: &str = "r:([:.~a-zA-Z0-9_-]+)";
const STR_REGEX: &str = r"^s:([\s\S]*)";
const DATE_REGEX: &str = "^d:(.*)";
const TIME_REGEX: &str = "^h:(.*)";
const DATETIME_REGEX: &str = "^t:([^ ]+)";

/// `{key: value}`
pub(crate) fn single(key: &str, value: Json) -> Json {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Json::Object(map)
}

/// Field name prefix under which the entities of `hops` were looked up: `a_entity_.b_entity_.`
pub(crate) fn lookup_prefix(hops: &[String]) -> String { hops.iter().map(|hop| format!("{}_entity_.", hop)).collect() }

/// `$`-path of the final tag of `path`, once its hops are looked up.
pub(crate) fn field(path: &Path) -> String { format!("${}{}", lookup_prefix(path.hops()), path.last()) }

/// The bare id captured from an encoded ref, without prefix or display name.
pub(crate) fn ref_id(field: &str) -> Json {
    json!({
        "$let": {
            "vars": {"id_regex_": {"$regexFind": {"input": field, "regex": REF_REGEX}}},
            "in": {"$arrayElemAt": ["$$id_regex_.captures", 0]}
        }
    })
}

fn presence(field: &str, operator: UnaryOperator) -> Json {
    let op = match operator {
        UnaryOperator::Has => "$ne",
        UnaryOperator::Not => "$eq",
    };
    single(op, json!([{"$type": field}, "missing"]))
}

fn date_from_string(date_string: Json) -> Json { json!({"$dateFromString": {"dateString": date_string}}) }

/// Lowers the boolean tree of a filter into one `$expr`.
pub(crate) struct ExpressionBuilder {
    pub flatten_has_tests: bool,
}

impl ExpressionBuilder {
    pub(crate) fn build(&self, node: &FilterNode) -> Result<Json, CompileError> {
        match node {
            FilterNode::And(left, right) | FilterNode::Or(left, right) => {
                let op = if matches!(node, FilterNode::And(..)) { "$and" } else { "$or" };
                if self.flatten_has_tests {
                    if let Some(run) = presence_run(node) {
                        let tests = run.tags.iter().map(|tag| presence(&format!("${}", tag), run.operator)).collect();
                        return Ok(single(op, Json::Array(tests)));
                    }
                }
                Ok(single(op, json!([self.build(left)?, self.build(right)?])))
            }
            FilterNode::Unary { operator, path } => Ok(presence(&field(path), *operator)),
            FilterNode::Comparison { path, operator, value } => comparison(path, *operator, value),
        }
    }
}

fn comparison(path: &Path, operator: ComparisonOperator, value: &Value) -> Result<Json, CompileError> {
    let field = field(path);
    let op = match operator {
        ComparisonOperator::Equal => "$eq",
        ComparisonOperator::NotEqual => "$ne",
        ComparisonOperator::LessThan => "$lt",
        ComparisonOperator::LessThanOrEqual => "$lte",
        ComparisonOperator::GreaterThan => "$gt",
        ComparisonOperator::GreaterThanOrEqual => "$gte",
    };
    if !operator.is_ordering() {
        return Ok(match value {
            Value::Ref(reference) => single(op, json!([ref_id(&field), reference.id])),
            other => single(op, json!([field, encode_value(other)])),
        });
    }

    let (regex, bound) = match value {
        Value::Number(number) if !number.value.is_finite() => {
            return Err(CompileError::UnsupportedShape(format!("ordering against {} has no pipeline form", value)));
        }
        Value::Number(number) => (NUMBER_REGEX, json!(number.value)),
        Value::Str(text) => (STR_REGEX, json!(text)),
        Value::Date(date) => (DATE_REGEX, json!(date.format("%Y-%m-%d").to_string())),
        Value::Time(time) => (TIME_REGEX, json!(encode_time(time))),
        Value::DateTime(datetime) => (DATETIME_REGEX, date_from_string(json!(encode_instant(datetime)))),
        _ => return Err(CompileError::UnsupportedComparison { operator, kind: value.kind() }),
    };

    // $regexFind fails the aggregation on a non-string input such as a stored bool or list
    let variable = format!("{}_regex_", path.first());
    let captured = json!({"$arrayElemAt": [format!("$${}.captures", variable), 0]});
    let unwrapped = match value {
        Value::Number(_) => json!({"$toDouble": captured}),
        Value::DateTime(_) => date_from_string(captured),
        _ => captured,
    };
    let actual = json!({
        "$let": {
            "vars": single(&variable, json!({"$regexFind": {"input": field, "regex": regex}})),
            "in": unwrapped
        }
    });

    Ok(match operator {
        // null sorts below everything, so a tag of another kind would pass `<`
        ComparisonOperator::LessThan | ComparisonOperator::LessThanOrEqual => {
            json!({"$and": [{"$ne": [actual, null]}, single(op, json!([actual, bound]))]})
        }
        _ => single(op, json!([actual, bound])),
    })
}
