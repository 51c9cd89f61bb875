//! Tree-walking interpreter over `serde_json::Value`.
//!
//! Semantics follow Python where the two differ from JSON: `and`/`or` return an operand rather
//! than a boolean, `/` is true division, `//` and `%` floor toward negative infinity, and `1 ==
//! 1.0` holds. Nothing here performs I/O or loops over user-controlled counts beyond the
//! configured value limit.

use std::cmp::Ordering;

use serde_json::{Number as JsonNumber, Value as JsonValue};
use tracing::trace;

use super::functions;
use super::parser::{BinaryOperator, CompareOperator, Expr, parse};
use super::{EvaluationError, EvaluationScope, EvaluatorConfig, ExpressionEvaluator};

/// Built-in sandboxed evaluator for `${ ... }` expressions.
#[derive(Debug, Clone, Default)]
pub struct ScriptEvaluator {
    config: EvaluatorConfig,
}

impl ScriptEvaluator {
    pub fn with_config(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }
}

impl ExpressionEvaluator for ScriptEvaluator {
    fn evaluate(&self, expression: &str, scope: &EvaluationScope<'_>) -> Result<JsonValue, EvaluationError> {
        let length = expression.chars().count();
        if length > self.config.max_expression_length {
            return Err(EvaluationError::limit(format!(
                "expression is {length} characters, limit is {}",
                self.config.max_expression_length
            )));
        }

        let tree = parse(expression, self.config.max_depth)?;
        trace!(expression, "evaluating expression");
        Interpreter {
            scope,
            config: &self.config,
        }
        .eval(&tree)
    }
}

struct Interpreter<'s, 'a> {
    scope: &'s EvaluationScope<'a>,
    config: &'s EvaluatorConfig,
}

impl Interpreter<'_, '_> {
    fn eval(&self, expression: &Expr) -> Result<JsonValue, EvaluationError> {
        match expression {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::List(items) => items.iter().map(|item| self.eval(item)).collect::<Result<Vec<_>, _>>().map(JsonValue::Array),
            Expr::Name(name) => self
                .scope
                .lookup(name)
                .cloned()
                .ok_or_else(|| EvaluationError::UndefinedName { name: name.clone() }),
            Expr::Negate(operand) => {
                let value = self.eval(operand)?;
                match as_number(&value) {
                    Some(Number::Int(number)) => number
                        .checked_neg()
                        .map(JsonValue::from)
                        .ok_or_else(|| EvaluationError::runtime("integer overflow")),
                    Some(Number::Float(number)) => number_to_json(Number::Float(-number)),
                    None => Err(EvaluationError::runtime(format!(
                        "bad operand type for unary -: '{}'",
                        type_name(&value)
                    ))),
                }
            }
            Expr::Not(operand) => Ok(JsonValue::Bool(!is_truthy(&self.eval(operand)?))),
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if is_truthy(&left) { self.eval(right) } else { Ok(left) }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if is_truthy(&left) { Ok(left) } else { self.eval(right) }
            }
            Expr::Binary { operator, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.binary(*operator, &left, &right)
            }
            Expr::Compare { first, rest } => {
                let mut left = self.eval(first)?;
                for (operator, operand) in rest {
                    let right = self.eval(operand)?;
                    if !compare(*operator, &left, &right)? {
                        return Ok(JsonValue::Bool(false));
                    }
                    left = right;
                }
                Ok(JsonValue::Bool(true))
            }
            Expr::Conditional {
                then,
                condition,
                otherwise,
            } => {
                if is_truthy(&self.eval(condition)?) {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Call { function, arguments } => {
                let arguments = arguments.iter().map(|argument| self.eval(argument)).collect::<Result<Vec<_>, _>>()?;
                functions::call(function, arguments, self.scope)
            }
            Expr::Index { target, index } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                subscript(&target, &index)
            }
        }
    }

    fn binary(&self, operator: BinaryOperator, left: &JsonValue, right: &JsonValue) -> Result<JsonValue, EvaluationError> {
        match (operator, left, right) {
            (BinaryOperator::Add, JsonValue::String(left), JsonValue::String(right)) => {
                self.check_length(left.len() + right.len())?;
                Ok(JsonValue::String(format!("{left}{right}")))
            }
            (BinaryOperator::Add, JsonValue::Array(left), JsonValue::Array(right)) => {
                self.check_length(left.len() + right.len())?;
                Ok(JsonValue::Array(left.iter().chain(right).cloned().collect()))
            }
            (BinaryOperator::Multiply, JsonValue::String(text), count) | (BinaryOperator::Multiply, count, JsonValue::String(text))
                if is_integer(count) =>
            {
                let times = repeat_count(count);
                self.check_length(text.len().saturating_mul(times))?;
                Ok(JsonValue::String(text.repeat(times)))
            }
            (BinaryOperator::Multiply, JsonValue::Array(items), count) | (BinaryOperator::Multiply, count, JsonValue::Array(items))
                if is_integer(count) =>
            {
                let times = repeat_count(count);
                self.check_length(items.len().saturating_mul(times))?;
                Ok(JsonValue::Array(
                    std::iter::repeat_n(items, times).flatten().cloned().collect(),
                ))
            }
            _ => arithmetic(operator, left, right),
        }
    }

    fn check_length(&self, length: usize) -> Result<(), EvaluationError> {
        if length > self.config.max_value_length {
            return Err(EvaluationError::limit(format!(
                "value of length {length} exceeds limit {}",
                self.config.max_value_length
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(number) => number as f64,
            Number::Float(number) => number,
        }
    }
}

/// Numeric view of a value; booleans count as 0 and 1.
pub(super) fn as_number(value: &JsonValue) -> Option<Number> {
    match value {
        JsonValue::Bool(flag) => Some(Number::Int(i64::from(*flag))),
        JsonValue::Number(number) => number.as_i64().map(Number::Int).or_else(|| number.as_f64().map(Number::Float)),
        _ => None,
    }
}

pub(super) fn number_to_json(number: Number) -> Result<JsonValue, EvaluationError> {
    match number {
        Number::Int(value) => Ok(JsonValue::from(value)),
        Number::Float(value) => JsonNumber::from_f64(value)
            .map(JsonValue::Number)
            .ok_or_else(|| EvaluationError::runtime("result is not a finite number")),
    }
}

fn is_integer(value: &JsonValue) -> bool {
    matches!(as_number(value), Some(Number::Int(_)))
}

fn repeat_count(value: &JsonValue) -> usize {
    match as_number(value) {
        Some(Number::Int(count)) if count > 0 => usize::try_from(count).unwrap_or(usize::MAX),
        _ => 0,
    }
}

/// Python type name, used in error messages.
pub(super) fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "NoneType",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(number) if number.is_f64() => "float",
        JsonValue::Number(_) => "int",
        JsonValue::String(_) => "str",
        JsonValue::Array(_) => "list",
        JsonValue::Object(_) => "dict",
    }
}

pub(super) fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(flag) => *flag,
        JsonValue::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
        JsonValue::String(text) => !text.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(entries) => !entries.is_empty(),
    }
}

fn operator_symbol(operator: BinaryOperator) -> &'static str {
    match operator {
        BinaryOperator::Add => "+",
        BinaryOperator::Subtract => "-",
        BinaryOperator::Multiply => "*",
        BinaryOperator::Divide => "/",
        BinaryOperator::FloorDivide => "//",
        BinaryOperator::Modulo => "%",
    }
}

fn arithmetic(operator: BinaryOperator, left: &JsonValue, right: &JsonValue) -> Result<JsonValue, EvaluationError> {
    let (Some(left_number), Some(right_number)) = (as_number(left), as_number(right)) else {
        return Err(EvaluationError::runtime(format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            operator_symbol(operator),
            type_name(left),
            type_name(right)
        )));
    };

    let result = match (left_number, right_number) {
        (Number::Int(left), Number::Int(right)) => integer_arithmetic(operator, left, right)?,
        (left, right) => float_arithmetic(operator, left.as_f64(), right.as_f64())?,
    };
    number_to_json(result)
}

fn integer_arithmetic(operator: BinaryOperator, left: i64, right: i64) -> Result<Number, EvaluationError> {
    let overflow = || EvaluationError::runtime("integer overflow");
    match operator {
        BinaryOperator::Add => left.checked_add(right).map(Number::Int).ok_or_else(overflow),
        BinaryOperator::Subtract => left.checked_sub(right).map(Number::Int).ok_or_else(overflow),
        BinaryOperator::Multiply => left.checked_mul(right).map(Number::Int).ok_or_else(overflow),
        BinaryOperator::Divide => float_arithmetic(operator, left as f64, right as f64),
        BinaryOperator::FloorDivide | BinaryOperator::Modulo => {
            if right == 0 {
                return Err(EvaluationError::runtime("integer division or modulo by zero"));
            }
            let quotient = left.checked_div(right).ok_or_else(overflow)?;
            let remainder = left.checked_rem(right).ok_or_else(overflow)?;
            let needs_adjust = remainder != 0 && ((remainder < 0) != (right < 0));
            if operator == BinaryOperator::FloorDivide {
                Ok(Number::Int(if needs_adjust { quotient - 1 } else { quotient }))
            } else {
                Ok(Number::Int(if needs_adjust { remainder + right } else { remainder }))
            }
        }
    }
}

fn float_arithmetic(operator: BinaryOperator, left: f64, right: f64) -> Result<Number, EvaluationError> {
    let is_division = matches!(
        operator,
        BinaryOperator::Divide | BinaryOperator::FloorDivide | BinaryOperator::Modulo
    );
    if is_division && right == 0.0 {
        return Err(EvaluationError::runtime("division by zero"));
    }
    let result = match operator {
        BinaryOperator::Add => left + right,
        BinaryOperator::Subtract => left - right,
        BinaryOperator::Multiply => left * right,
        BinaryOperator::Divide => left / right,
        BinaryOperator::FloorDivide => (left / right).floor(),
        BinaryOperator::Modulo => left - right * (left / right).floor(),
    };
    Ok(Number::Float(result))
}

pub(super) fn values_equal(left: &JsonValue, right: &JsonValue) -> bool {
    match (as_number(left), as_number(right)) {
        (Some(Number::Int(left)), Some(Number::Int(right))) => left == right,
        (Some(left), Some(right)) => left.as_f64() == right.as_f64(),
        _ => left == right,
    }
}

fn ordering(left: &JsonValue, right: &JsonValue, symbol: &str) -> Result<Ordering, EvaluationError> {
    let unsupported = || {
        EvaluationError::runtime(format!(
            "'{symbol}' not supported between instances of '{}' and '{}'",
            type_name(left),
            type_name(right)
        ))
    };

    match (left, right) {
        (JsonValue::String(left), JsonValue::String(right)) => Ok(left.cmp(right)),
        (JsonValue::Array(left_items), JsonValue::Array(right_items)) => {
            for (left_item, right_item) in left_items.iter().zip(right_items) {
                if !values_equal(left_item, right_item) {
                    return ordering(left_item, right_item, symbol);
                }
            }
            Ok(left_items.len().cmp(&right_items.len()))
        }
        _ => match (as_number(left), as_number(right)) {
            (Some(Number::Int(left)), Some(Number::Int(right))) => Ok(left.cmp(&right)),
            (Some(left), Some(right)) => left.as_f64().partial_cmp(&right.as_f64()).ok_or_else(unsupported),
            _ => Err(unsupported()),
        },
    }
}

fn contains(container: &JsonValue, item: &JsonValue) -> Result<bool, EvaluationError> {
    match (container, item) {
        (JsonValue::String(text), JsonValue::String(needle)) => Ok(text.contains(needle.as_str())),
        (JsonValue::String(_), other) => Err(EvaluationError::runtime(format!(
            "'in <string>' requires string as left operand, not {}",
            type_name(other)
        ))),
        (JsonValue::Array(items), item) => Ok(items.iter().any(|candidate| values_equal(candidate, item))),
        (JsonValue::Object(entries), JsonValue::String(key)) => Ok(entries.contains_key(key)),
        (JsonValue::Object(_), _) => Ok(false),
        (other, _) => Err(EvaluationError::runtime(format!(
            "argument of type '{}' is not iterable",
            type_name(other)
        ))),
    }
}

fn compare(operator: CompareOperator, left: &JsonValue, right: &JsonValue) -> Result<bool, EvaluationError> {
    Ok(match operator {
        CompareOperator::Equal => values_equal(left, right),
        CompareOperator::NotEqual => !values_equal(left, right),
        CompareOperator::Less => ordering(left, right, "<")? == Ordering::Less,
        CompareOperator::LessEqual => ordering(left, right, "<=")? != Ordering::Greater,
        CompareOperator::Greater => ordering(left, right, ">")? == Ordering::Greater,
        CompareOperator::GreaterEqual => ordering(left, right, ">=")? != Ordering::Less,
        CompareOperator::In => contains(right, left)?,
        CompareOperator::NotIn => !contains(right, left)?,
    })
}

fn subscript(target: &JsonValue, index: &JsonValue) -> Result<JsonValue, EvaluationError> {
    match target {
        JsonValue::Array(items) => {
            let position = resolve_index(index, items.len(), "list")?;
            Ok(items[position].clone())
        }
        JsonValue::String(text) => {
            let characters: Vec<char> = text.chars().collect();
            let position = resolve_index(index, characters.len(), "string")?;
            Ok(JsonValue::String(characters[position].to_string()))
        }
        JsonValue::Object(entries) => {
            let JsonValue::String(key) = index else {
                return Err(EvaluationError::runtime(format!("dict keys must be str, not {}", type_name(index))));
            };
            entries
                .get(key)
                .cloned()
                .ok_or_else(|| EvaluationError::runtime(format!("key '{key}' not found")))
        }
        other => Err(EvaluationError::runtime(format!("'{}' object is not subscriptable", type_name(other)))),
    }
}

fn resolve_index(index: &JsonValue, length: usize, kind: &str) -> Result<usize, EvaluationError> {
    let Some(Number::Int(raw_index)) = as_number(index) else {
        return Err(EvaluationError::runtime(format!(
            "{kind} indices must be integers, not {}",
            type_name(index)
        )));
    };
    let length = i64::try_from(length).unwrap_or(i64::MAX);
    let resolved = if raw_index < 0 { raw_index + length } else { raw_index };
    if (0..length).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(EvaluationError::runtime(format!("{kind} index out of range")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use serde_json::json;

    fn evaluate(expression: &str, variables: &[(&str, JsonValue)]) -> Result<JsonValue, EvaluationError> {
        let values: Vec<(String, Value)> = variables
            .iter()
            .map(|(name, raw)| (name.to_string(), Value::new(raw.clone())))
            .collect();
        let mut scope = EvaluationScope::new(None);
        for (name, value) in &values {
            scope.insert(name, value);
        }
        ScriptEvaluator::default().evaluate(expression, &scope)
    }

    #[test]
    fn arithmetic_over_scope_variables() {
        assert_eq!(evaluate("3 + valX", &[("valX", json!(5))]), Ok(json!(8)));
        assert_eq!(evaluate("input1 + 3 * 2", &[("input1", json!(3))]), Ok(json!(9)));
        assert_eq!(evaluate("(1 + 2) * 3 - 4", &[]), Ok(json!(5)));
        assert_eq!(evaluate("7 / 2", &[]), Ok(json!(3.5)));
        assert_eq!(evaluate("-7 // 2", &[]), Ok(json!(-4)));
        assert_eq!(evaluate("-7 % 3", &[]), Ok(json!(2)));
        assert_eq!(evaluate("7.5 // 2", &[]), Ok(json!(3.0)));
        assert_eq!(evaluate("1 + 0.5", &[]), Ok(json!(1.5)));
        assert_eq!(evaluate("True + 1", &[]), Ok(json!(2)));
    }

    #[test]
    fn string_and_list_operations() {
        assert_eq!(
            evaluate("'a' + valB + valC", &[("valB", json!("b")), ("valC", json!("c"))]),
            Ok(json!("abc"))
        );
        assert_eq!(
            evaluate("'mighty' + ' max '   + varX", &[("varX", json!("roles"))]),
            Ok(json!("mighty max roles"))
        );
        assert_eq!(evaluate("'ab' * 3", &[]), Ok(json!("ababab")));
        assert_eq!(evaluate("[1] + [2, 3]", &[]), Ok(json!([1, 2, 3])));
        assert_eq!(evaluate("2 * [0]", &[]), Ok(json!([0, 0])));
        assert_eq!(evaluate("'abc'[-1]", &[]), Ok(json!("c")));
        assert_eq!(evaluate("cfg['host']", &[("cfg", json!({"host": "h"}))]), Ok(json!("h")));
    }

    #[test]
    fn logic_and_comparisons() {
        assert_eq!(evaluate("1 < 2 <= 2", &[]), Ok(json!(true)));
        assert_eq!(evaluate("1 < 2 > 3", &[]), Ok(json!(false)));
        assert_eq!(evaluate("1 == 1.0", &[]), Ok(json!(true)));
        assert_eq!(evaluate("'b' in 'abc' and 4 not in [1, 2]", &[]), Ok(json!(true)));
        assert_eq!(evaluate("x or 'fallback'", &[("x", JsonValue::Null)]), Ok(json!("fallback")));
        assert_eq!(evaluate("x and 'never'", &[("x", json!(0))]), Ok(json!(0)));
        assert_eq!(evaluate("'yes' if n > 2 else 'no'", &[("n", json!(3))]), Ok(json!("yes")));
        assert_eq!(evaluate("not ''", &[]), Ok(json!(true)));
    }

    #[test]
    fn short_circuit_skips_undefined_names() {
        assert_eq!(evaluate("True or missing", &[]), Ok(json!(true)));
        assert_eq!(evaluate("'a' if True else missing", &[]), Ok(json!("a")));
        assert_eq!(
            evaluate("False or missing", &[]),
            Err(EvaluationError::UndefinedName { name: "missing".into() })
        );
    }

    #[test]
    fn runtime_faults_are_reported() {
        assert!(matches!(evaluate("1 / 0", &[]), Err(EvaluationError::Runtime { .. })));
        assert!(matches!(evaluate("5 % 0", &[]), Err(EvaluationError::Runtime { .. })));
        assert!(matches!(evaluate("1 + 'a'", &[]), Err(EvaluationError::Runtime { message }) if message.contains("'int' and 'str'")));
        assert!(matches!(evaluate("[1][3]", &[]), Err(EvaluationError::Runtime { .. })));
        assert!(matches!(evaluate("1 < 'a'", &[]), Err(EvaluationError::Runtime { .. })));
        assert!(matches!(evaluate("9223372036854775807 + 1", &[]), Err(EvaluationError::Runtime { .. })));
        assert!(matches!(evaluate("None[0]", &[]), Err(EvaluationError::Runtime { .. })));
    }

    #[test]
    fn limits_are_enforced() {
        let evaluator = ScriptEvaluator::with_config(EvaluatorConfig {
            max_expression_length: 10,
            max_depth: 64,
            max_value_length: 8,
        });
        let scope = EvaluationScope::new(None);

        assert!(matches!(
            evaluator.evaluate("1 + 2 + 3 + 4", &scope),
            Err(EvaluationError::LimitExceeded { .. })
        ));
        assert!(matches!(evaluator.evaluate("'ab' * 5", &scope), Err(EvaluationError::LimitExceeded { .. })));
        assert_eq!(evaluator.evaluate("'ab' * 4", &scope), Ok(json!("abababab")));
    }

    #[test]
    fn long_subscript_chain_is_rejected_before_evaluation() {
        let nested = json!([[0]]);
        let chain = format!("a{}", "[0]".repeat(800));
        assert!(matches!(
            evaluate(&chain, &[("a", nested)]),
            Err(EvaluationError::LimitExceeded { .. })
        ));
    }
}
