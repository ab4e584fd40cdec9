//! Declarative request-body validation.

use std::fmt;

use itertools::Itertools;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone)]
pub enum Rule {
    Str {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    /// Inclusive bounds.
    Int { ge: Option<i64>, le: Option<i64> },
    Bool,
    Object(Schema),
    List(Box<Rule>),
    /// JSON object with arbitrary keys; every value follows the inner rule.
    Map(Box<Rule>),
}

impl Rule {
    pub fn string() -> Rule {
        Rule::Str {
            min_length: None,
            max_length: None,
        }
    }

    pub fn string_len(min_length: Option<usize>, max_length: Option<usize>) -> Rule {
        Rule::Str {
            min_length,
            max_length,
        }
    }

    pub fn int_range(ge: Option<i64>, le: Option<i64>) -> Rule {
        Rule::Int { ge, le }
    }
}

#[derive(Debug, Clone)]
pub enum Presence {
    Required,
    /// May be absent or `null`.
    Optional,
    /// Filled in when absent. An explicit `null` is still checked against the rule.
    Default(Value),
}

#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    rule: Rule,
    presence: Presence,
}

impl Field {
    pub fn required(name: &'static str, rule: Rule) -> Field {
        Field {
            name,
            rule,
            presence: Presence::Required,
        }
    }

    pub fn optional(name: &'static str, rule: Rule) -> Field {
        Field {
            name,
            rule,
            presence: Presence::Optional,
        }
    }

    pub fn with_default(name: &'static str, rule: Rule, default: impl Into<Value>) -> Field {
        Field {
            name,
            rule,
            presence: Presence::Default(default.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Schema {
        Schema { fields }
    }

    /// Returns `input` with defaults filled in and unknown members dropped.
    pub fn check(&self, input: &Value, loc: &[Value]) -> Result<Value, Vec<Violation>> {
        let mut violations = Vec::new();
        match check_object(self, input, loc, &mut violations) {
            Some(value) if violations.is_empty() => Ok(value),
            _ => Err(violations),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub loc: Vec<Value>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx: Option<Value>,
}

impl Violation {
    fn new(loc: &[Value], kind: &'static str, msg: impl Into<String>, input: &Value) -> Violation {
        Violation {
            loc: loc.to_vec(),
            kind,
            msg: msg.into(),
            input: Some(input.clone()),
            ctx: None,
        }
    }

    fn ctx(mut self, ctx: Value) -> Violation {
        self.ctx = Some(ctx);
        self
    }

    /// Dotted path such as `body.users.0.age`.
    pub fn path(&self) -> String {
        self.loc
            .iter()
            .map(|part| match part {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .join(".")
    }
}

/// A request body that failed schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    violations: Vec<Violation>,
}

impl SchemaError {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Names of the offending fields, without the leading `body` segment.
    #[cfg(test)]
    pub(crate) fn fields(&self) -> Vec<String> {
        self.violations
            .iter()
            .filter_map(|v| v.loc.last())
            .map(|part| match part {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unique()
            .collect()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} validation error(s): {}",
            self.violations.len(),
            self.violations.iter().map(|v| v.path()).join(", ")
        )
    }
}

impl std::error::Error for SchemaError {}

pub trait Payload: DeserializeOwned {
    fn schema() -> Schema;
}

/// Validate a raw body and build the typed payload from it.
pub fn validate<T: Payload>(body: Option<&[u8]>) -> Result<T, SchemaError> {
    let root = [Value::from("body")];

    let input: Value = match body.filter(|b| !b.is_empty()) {
        None => {
            return Err(SchemaError {
                violations: vec![Violation::new(&root, "missing", "Field required", &Value::Null)],
            });
        }
        Some(bytes) => serde_json::from_slice(bytes).map_err(|err| SchemaError {
            violations: vec![
                Violation::new(&root, "json_invalid", "JSON decode error", &json!({}))
                    .ctx(json!({ "error": err.to_string() })),
            ],
        })?,
    };

    let normalized = T::schema()
        .check(&input, &root)
        .map_err(|violations| SchemaError { violations })?;

    serde_json::from_value(normalized).map_err(|err| SchemaError {
        violations: vec![Violation::new(&root, "value_error", err.to_string(), &input)],
    })
}

fn child(loc: &[Value], part: impl Into<Value>) -> Vec<Value> {
    let mut loc = loc.to_vec();
    loc.push(part.into());
    loc
}

fn check_object(
    schema: &Schema,
    input: &Value,
    loc: &[Value],
    violations: &mut Vec<Violation>,
) -> Option<Value> {
    let Some(object) = input.as_object() else {
        violations.push(Violation::new(
            loc,
            "model_attributes_type",
            "Input should be a valid dictionary or object to extract fields from",
            input,
        ));
        return None;
    };

    let mut normalized = Map::new();
    let mut valid = true;

    for field in &schema.fields {
        let field_loc = child(loc, field.name);
        match (object.get(field.name), &field.presence) {
            (None, Presence::Required) => {
                violations.push(Violation::new(&field_loc, "missing", "Field required", input));
                valid = false;
            }
            (None, Presence::Optional) => {}
            (None, Presence::Default(default)) => {
                normalized.insert(field.name.to_string(), default.clone());
            }
            (Some(Value::Null), Presence::Optional) => {
                normalized.insert(field.name.to_string(), Value::Null);
            }
            (Some(value), _) => match check_rule(&field.rule, value, &field_loc, violations) {
                Some(value) => {
                    normalized.insert(field.name.to_string(), value);
                }
                None => valid = false,
            },
        }
    }

    valid.then_some(Value::Object(normalized))
}

fn check_rule(
    rule: &Rule,
    input: &Value,
    loc: &[Value],
    violations: &mut Vec<Violation>,
) -> Option<Value> {
    match rule {
        Rule::Str {
            min_length,
            max_length,
        } => {
            let Some(s) = input.as_str() else {
                violations.push(Violation::new(
                    loc,
                    "string_type",
                    "Input should be a valid string",
                    input,
                ));
                return None;
            };
            let len = s.chars().count();
            if let Some(min) = min_length.filter(|&min| len < min) {
                violations.push(
                    Violation::new(
                        loc,
                        "string_too_short",
                        format!("String should have at least {min} {}", characters(min)),
                        input,
                    )
                    .ctx(json!({ "min_length": min })),
                );
                return None;
            }
            if let Some(max) = max_length.filter(|&max| len > max) {
                violations.push(
                    Violation::new(
                        loc,
                        "string_too_long",
                        format!("String should have at most {max} {}", characters(max)),
                        input,
                    )
                    .ctx(json!({ "max_length": max })),
                );
                return None;
            }
            Some(input.clone())
        }
        Rule::Int { ge, le } => {
            let n = integer(input, loc, violations)?;
            let ge = ge.unwrap_or(i64::MIN);
            let le = le.unwrap_or(i64::MAX);
            if n < i128::from(ge) {
                violations.push(
                    Violation::new(
                        loc,
                        "greater_than_equal",
                        format!("Input should be greater than or equal to {ge}"),
                        input,
                    )
                    .ctx(json!({ "ge": ge })),
                );
                return None;
            }
            if n > i128::from(le) {
                violations.push(
                    Violation::new(
                        loc,
                        "less_than_equal",
                        format!("Input should be less than or equal to {le}"),
                        input,
                    )
                    .ctx(json!({ "le": le })),
                );
                return None;
            }
            i64::try_from(n).ok().map(Value::from)
        }
        Rule::Bool => match input {
            Value::Bool(_) => Some(input.clone()),
            _ => {
                violations.push(Violation::new(
                    loc,
                    "bool_type",
                    "Input should be a valid boolean",
                    input,
                ));
                None
            }
        },
        Rule::Object(schema) => check_object(schema, input, loc, violations),
        Rule::List(item) => {
            let Some(items) = input.as_array() else {
                violations.push(Violation::new(
                    loc,
                    "list_type",
                    "Input should be a valid list",
                    input,
                ));
                return None;
            };
            let checked: Vec<Option<Value>> = items
                .iter()
                .enumerate()
                .map(|(i, value)| check_rule(item, value, &child(loc, i), violations))
                .collect();
            checked.into_iter().collect::<Option<Vec<_>>>().map(Value::Array)
        }
        Rule::Map(value_rule) => {
            let Some(entries) = input.as_object() else {
                violations.push(Violation::new(
                    loc,
                    "dict_type",
                    "Input should be a valid dictionary",
                    input,
                ));
                return None;
            };
            let checked: Vec<Option<(String, Value)>> = entries
                .iter()
                .map(|(key, value)| {
                    check_rule(value_rule, value, &child(loc, key.as_str()), violations)
                        .map(|value| (key.clone(), value))
                })
                .collect();
            checked
                .into_iter()
                .collect::<Option<Map<_, _>>>()
                .map(Value::Object)
        }
    }
}

/// Whole numbers are widened so that values past the `i64` range still
/// reach the bound checks. Float casts saturate, which keeps the ordering.
fn integer(input: &Value, loc: &[Value], violations: &mut Vec<Violation>) -> Option<i128> {
    if let Some(n) = input.as_i64() {
        return Some(n.into());
    }
    if let Some(n) = input.as_u64() {
        return Some(n.into());
    }
    match input.as_f64() {
        Some(f) if f.fract() == 0.0 => Some(f as i128),
        Some(_) => {
            violations.push(Violation::new(
                loc,
                "int_from_float",
                "Input should be a valid integer, got a number with a fractional part",
                input,
            ));
            None
        }
        None => {
            violations.push(Violation::new(
                loc,
                "int_type",
                "Input should be a valid integer",
                input,
            ));
            None
        }
    }
}

fn characters(n: usize) -> &'static str {
    if n == 1 { "character" } else { "characters" }
}
