//! Built-in functions callable from expressions.

use serde_json::Value as JsonValue;

use super::interpreter::{Number, as_number, is_truthy, number_to_json, type_name};
use super::{EvaluationError, EvaluationScope};

/// Dispatches a call by function name. Arguments are already evaluated.
pub(super) fn call(function: &str, arguments: Vec<JsonValue>, scope: &EvaluationScope<'_>) -> Result<JsonValue, EvaluationError> {
    match function {
        "str" => {
            let [value] = exact::<1>(function, arguments)?;
            Ok(JsonValue::String(to_display_string(&value)))
        }
        "int" => {
            let [value] = exact::<1>(function, arguments)?;
            to_int(&value)
        }
        "float" => {
            let [value] = exact::<1>(function, arguments)?;
            to_float(&value)
        }
        "bool" => {
            let [value] = exact::<1>(function, arguments)?;
            Ok(JsonValue::Bool(is_truthy(&value)))
        }
        "len" => {
            let [value] = exact::<1>(function, arguments)?;
            length(&value)
        }
        "get" => {
            let (name, default) = name_with_default(function, arguments)?;
            Ok(present_or(scope.lookup(&name), default))
        }
        "get_sp" => {
            let (name, default) = name_with_default(function, arguments)?;
            Ok(present_or(scope.system_property(&name), default))
        }
        "check_empty" => {
            let [value, default] = exact::<2>(function, arguments)?;
            let empty = value.is_null() || value.as_str().is_some_and(str::is_empty);
            Ok(if empty { default } else { value })
        }
        "lower" | "upper" | "strip" => {
            let [value] = exact::<1>(function, arguments)?;
            let JsonValue::String(text) = &value else {
                return Err(EvaluationError::runtime(format!(
                    "{function}() argument must be str, not {}",
                    type_name(&value)
                )));
            };
            Ok(JsonValue::String(match function {
                "lower" => text.to_lowercase(),
                "upper" => text.to_uppercase(),
                _ => text.trim().to_string(),
            }))
        }
        _ => Err(EvaluationError::UnknownFunction {
            name: function.to_string(),
        }),
    }
}

fn exact<const N: usize>(function: &str, arguments: Vec<JsonValue>) -> Result<[JsonValue; N], EvaluationError> {
    let count = arguments.len();
    arguments.try_into().map_err(|_| {
        EvaluationError::runtime(format!("{function}() takes exactly {N} argument(s) ({count} given)"))
    })
}

/// Splits `(name)` or `(name, default)`; the default is null when omitted.
fn name_with_default(function: &str, arguments: Vec<JsonValue>) -> Result<(String, JsonValue), EvaluationError> {
    let count = arguments.len();
    let mut arguments = arguments.into_iter();
    let (Some(name), default, None) = (arguments.next(), arguments.next(), arguments.next()) else {
        return Err(EvaluationError::runtime(format!(
            "{function}() takes 1 or 2 arguments ({count} given)"
        )));
    };
    match name {
        JsonValue::String(name) => Ok((name, default.unwrap_or(JsonValue::Null))),
        other => Err(EvaluationError::runtime(format!(
            "{function}() name must be str, not {}",
            type_name(&other)
        ))),
    }
}

fn present_or(found: Option<&JsonValue>, default: JsonValue) -> JsonValue {
    match found {
        Some(value) if !value.is_null() => value.clone(),
        _ => default,
    }
}

/// Python `str()` rendering: `None`, `True`, floats that always carry a fraction, and
/// `[1, 'a']` / `{'k': 1}` for containers.
pub(super) fn to_display_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.clone(),
        other => to_repr(other),
    }
}

/// Python `repr()` rendering, used for container elements.
fn to_repr(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "None".to_string(),
        JsonValue::Bool(true) => "True".to_string(),
        JsonValue::Bool(false) => "False".to_string(),
        JsonValue::String(text) => quote(text),
        JsonValue::Number(number) => match number.as_i64() {
            Some(integer) => integer.to_string(),
            None => {
                let float = number.as_f64().unwrap_or_default();
                if float.fract() == 0.0 && float.abs() < 1e16 {
                    format!("{float:.1}")
                } else {
                    float.to_string()
                }
            }
        },
        JsonValue::Array(items) => {
            let rendered: Vec<String> = items.iter().map(to_repr).collect();
            format!("[{}]", rendered.join(", "))
        }
        JsonValue::Object(entries) => {
            let rendered: Vec<String> = entries
                .iter()
                .map(|(key, item)| format!("{}: {}", quote(key), to_repr(item)))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
    }
}

/// Single-quoted like Python, switching to double quotes when only `'` appears inside.
fn quote(text: &str) -> String {
    let delimiter = if text.contains('\'') && !text.contains('"') { '"' } else { '\'' };
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push(delimiter);
    for character in text.chars() {
        match character {
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            other if other == delimiter => {
                quoted.push('\\');
                quoted.push(other);
            }
            other => quoted.push(other),
        }
    }
    quoted.push(delimiter);
    quoted
}

fn to_int(value: &JsonValue) -> Result<JsonValue, EvaluationError> {
    match value {
        JsonValue::String(text) => text
            .trim()
            .parse::<i64>()
            .map(JsonValue::from)
            .map_err(|_| EvaluationError::runtime(format!("invalid literal for int(): '{text}'"))),
        other => match as_number(other) {
            Some(Number::Int(integer)) => Ok(JsonValue::from(integer)),
            Some(Number::Float(float)) => {
                let truncated = float.trunc();
                if truncated.abs() >= 9.2e18 {
                    return Err(EvaluationError::runtime("float is too large to convert to int"));
                }
                Ok(JsonValue::from(truncated as i64))
            }
            None => Err(EvaluationError::runtime(format!(
                "int() argument must be a string or a number, not '{}'",
                type_name(other)
            ))),
        },
    }
}

fn to_float(value: &JsonValue) -> Result<JsonValue, EvaluationError> {
    let float = match value {
        JsonValue::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| EvaluationError::runtime(format!("could not convert string to float: '{text}'")))?,
        other => match as_number(other) {
            Some(Number::Int(integer)) => integer as f64,
            Some(Number::Float(float)) => float,
            None => {
                return Err(EvaluationError::runtime(format!(
                    "float() argument must be a string or a number, not '{}'",
                    type_name(other)
                )));
            }
        },
    };
    number_to_json(Number::Float(float))
}

fn length(value: &JsonValue) -> Result<JsonValue, EvaluationError> {
    let count = match value {
        JsonValue::String(text) => text.chars().count(),
        JsonValue::Array(items) => items.len(),
        JsonValue::Object(entries) => entries.len(),
        other => {
            return Err(EvaluationError::runtime(format!(
                "object of type '{}' has no len()",
                type_name(other)
            )));
        }
    };
    Ok(JsonValue::from(count))
}
