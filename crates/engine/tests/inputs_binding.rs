use std::io;
use std::sync::{Arc, Mutex};

use indexmap::indexmap;
use serde_json::{Value as JsonValue, json};
use strata_engine::{BindingError, Context, EvaluationError, InputsBinding, SystemPropertyStore, Value};
use strata_types::{Input, SystemProperty};

fn bind(inputs: &[Input], context: &Context) -> Result<Context, BindingError> {
    InputsBinding::new().bind_inputs(inputs, context, None)
}

fn bind_ok(inputs: &[Input], context: &Context) -> Context {
    bind(inputs, context).expect("inputs bind")
}

fn raw<'a>(bound: &'a Context, name: &str) -> &'a JsonValue {
    bound.get(name).map(Value::raw).unwrap_or_else(|| panic!("{name} missing from {bound:?}"))
}

#[test]
fn empty_declarations_bind_to_an_empty_scope() {
    let bound = bind_ok(&[], &Context::new());
    assert!(bound.is_empty());
}

#[test]
fn literal_defaults_keep_their_type() {
    let inputs = vec![
        Input::builder("text", "value").build(),
        Input::builder("number", 2).build(),
        Input::builder("yes", true).build(),
        Input::builder("no", false).build(),
        Input::builder("phrase", "${ str('phrase containing true and false') }").build(),
    ];

    let bound = bind_ok(&inputs, &Context::new());

    assert_eq!(raw(&bound, "text"), &json!("value"));
    assert_eq!(raw(&bound, "number"), &json!(2));
    assert_eq!(raw(&bound, "yes"), &json!(true));
    assert_eq!(raw(&bound, "no"), &json!(false));
    assert_eq!(raw(&bound, "phrase"), &json!("phrase containing true and false"));
}

#[test]
fn result_preserves_declaration_order() {
    let inputs = vec![Input::builder("input2", "yyy").build(), Input::builder("input1", "zzz").build()];

    let bound = bind_ok(&inputs, &Context::new());

    assert_eq!(bound.keys().collect::<Vec<_>>(), vec!["input2", "input1"]);
    assert_eq!(raw(&bound, "input1"), &json!("zzz"));
    assert_eq!(raw(&bound, "input2"), &json!("yyy"));
}

#[test]
fn private_self_reference_resolves_to_null() {
    let inputs = vec![
        Input::builder("input1", "${ input1 }").required(false).private_input(true).build(),
        Input::builder("input2", "${ input1 }").required(false).private_input(true).build(),
    ];

    let bound = bind_ok(&inputs, &Context::new());

    assert!(bound["input1"].is_null());
    assert!(bound["input2"].is_null());
}

#[test]
fn expressions_read_the_caller_context_without_changing_it() {
    let context = indexmap! {
        "inputX".to_string() => Value::new("xxx"),
        "valX".to_string() => Value::new(5),
    };
    let inputs = vec![
        Input::builder("input1", "${ str(inputX) }").build(),
        Input::builder("input2", "${ 3 + valX }").build(),
    ];

    let bound = bind_ok(&inputs, &context);

    assert_eq!(raw(&bound, "input1"), &json!("xxx"));
    assert_eq!(raw(&bound, "input2"), &json!(8));
    assert_eq!(context.len(), 2);
    assert!(!context.contains_key("input1"));
}

#[test]
fn string_concatenation_over_context_values() {
    let context = indexmap! {
        "valB".to_string() => Value::new("b"),
        "valC".to_string() => Value::new("c"),
        "varX".to_string() => Value::new("roles"),
    };
    let inputs = vec![
        Input::builder("input1", "${ 'a' + valB + valC }").build(),
        Input::builder("input2", "${ 'mighty' + ' max '   + varX }").build(),
    ];

    let bound = bind_ok(&inputs, &context);

    assert_eq!(raw(&bound, "input1"), &json!("abc"));
    assert_eq!(raw(&bound, "input2"), &json!("mighty max roles"));
    assert_eq!(context.len(), 3);
}

#[test]
fn expression_default_applies_when_context_lacks_the_name() {
    let context = Context::new();
    let inputs = vec![Input::builder("input1", "${ str('val') }").build()];

    let bound = bind_ok(&inputs, &context);

    assert_eq!(raw(&bound, "input1"), &json!("val"));
    assert!(context.is_empty());
}

#[test]
fn assign_from_wins_over_expression_and_constant_defaults() {
    let context = indexmap! { "input1".to_string() => Value::new(3) };

    let from_expression = bind_ok(&[Input::builder("input1", "${ 5+7 }").build()], &context);
    let from_constant = bind_ok(&[Input::builder("input1", 5).build()], &context);

    assert_eq!(raw(&from_expression, "input1"), &json!(3));
    assert_eq!(raw(&from_constant, "input1"), &json!(3));
    assert_eq!(context.len(), 1);
    assert_eq!(context["input1"].raw(), &json!(3));
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let context = indexmap! { "input1".to_string() => Value::new(3) };

    let bound = bind_ok(&[Input::builder("input2", "${ input1 + 3 * 2 }").build()], &context);

    assert_eq!(raw(&bound, "input2"), &json!(9));
    assert_eq!(bound.len(), 1);
}

#[test]
fn assign_from_wins_over_reference_to_another_variable() {
    let context = indexmap! {
        "input2".to_string() => Value::new(3),
        "input1".to_string() => Value::new(5),
    };

    let bound = bind_ok(&[Input::builder("input1", "${ input2 }").build()], &context);

    assert_eq!(raw(&bound, "input1"), &json!(5));
    assert_eq!(bound.len(), 1);
}

#[test]
fn private_inputs_ignore_the_caller_value() {
    let context = indexmap! {
        "input2".to_string() => Value::new(3),
        "input1".to_string() => Value::new(5),
    };

    let referenced = bind_ok(
        &[Input::builder("input1", "${ input2 }").required(false).private_input(true).build()],
        &context,
    );
    let constant = bind_ok(
        &[Input::builder("input1", 3).required(false).private_input(true).build()],
        &context,
    );
    let empty = bind_ok(
        &[Input::builder("input1", JsonValue::Null).required(false).private_input(true).build()],
        &context,
    );

    assert_eq!(raw(&referenced, "input1"), &json!(3));
    assert_eq!(raw(&constant, "input1"), &json!(3));
    assert!(empty["input1"].is_null(), "privacy disables assign-from");
    assert_eq!(context.len(), 2);
}

#[test]
fn non_private_input_takes_caller_value_over_default() {
    let context = indexmap! { "input1".to_string() => Value::new(5) };

    let bound = bind_ok(&[Input::builder("input1", 6).build()], &context);

    assert_eq!(raw(&bound, "input1"), &json!(5));
    assert_eq!(bound.len(), 1);
}

#[test]
fn unresolvable_reference_fails_even_when_optional() {
    let inputs = vec![Input::builder("input1", "${ input2 }").required(false).private_input(true).build()];

    let error = bind(&inputs, &Context::new()).expect_err("input2 is not in scope");

    assert!(error.is_evaluation());
    assert_eq!(error.input_name(), "input1");
    assert_eq!(
        error,
        BindingError::Evaluation {
            input: "input1".into(),
            source: EvaluationError::UndefinedName { name: "input2".into() },
        }
    );
}

#[test]
fn later_inputs_see_earlier_bindings() {
    let context = Context::new();
    let inputs = vec![
        Input::builder("input1", 5).build(),
        Input::builder("input2", "${ input1 }").build(),
    ];

    let bound = bind_ok(&inputs, &context);

    assert_eq!(raw(&bound, "input1"), &json!(5));
    assert_eq!(raw(&bound, "input2"), &json!(5));
    assert_eq!(bound.len(), 2);
    assert!(context.is_empty(), "caller context must not change");
}

#[test]
fn bound_inputs_shadow_caller_variables_in_expressions() {
    let context = indexmap! {
        "varX".to_string() => Value::new(5),
        "shared".to_string() => Value::new("caller"),
    };
    let inputs = vec![
        Input::builder("input1", 5).build(),
        Input::builder("input2", "${ input1 + 5 + varX }").build(),
        Input::builder("shared", "local").private_input(true).build(),
        Input::builder("input3", "${ shared }").build(),
    ];

    let bound = bind_ok(&inputs, &context);

    assert_eq!(raw(&bound, "input2"), &json!(15));
    assert_eq!(raw(&bound, "input3"), &json!("local"));
    assert_eq!(context.len(), 2);
}

#[test]
fn required_input_resolving_to_null_is_rejected() {
    let inputs = vec![Input::builder("input1", "${ None }").build()];

    let error = bind(&inputs, &Context::new()).expect_err("required input is null");

    assert!(error.is_missing_required());
    assert_eq!(error.input_name(), "input1");
}

#[test]
fn inherited_null_fails_a_required_input() {
    let context = indexmap! { "input1".to_string() => Value::null() };
    let inputs = vec![Input::builder("input1", JsonValue::Null).build()];

    let error = bind(&inputs, &context).expect_err("caller value is null");

    assert_eq!(error, BindingError::MissingRequiredInput { input: "input1".into() });
}

#[test]
fn inherited_null_is_accepted_for_optional_input() {
    let context = indexmap! { "input1".to_string() => Value::null() };
    let inputs = vec![Input::builder("input1", 7).required(false).build()];

    let bound = bind_ok(&inputs, &context);

    assert!(bound["input1"].is_null());
}

#[test]
fn encrypted_input_redacts_inherited_plain_value() {
    let context = indexmap! { "password".to_string() => Value::new("hunter2") };
    let inputs = vec![Input::builder("password", JsonValue::Null).sensitive(true).build()];

    let bound = bind_ok(&inputs, &context);

    assert!(bound["password"].is_sensitive());
    assert_eq!(raw(&bound, "password"), &json!("hunter2"));
    assert_ne!(bound["password"].to_string(), "hunter2");
}

#[test]
fn system_properties_are_reached_through_get_sp() {
    let store = SystemPropertyStore::new(&[
        SystemProperty::new("cfg.net", "host", "db.internal"),
        SystemProperty::from_qualified("cfg.net.password", "s3cr3t")
            .expect("valid name")
            .with_sensitive(true),
    ])
    .expect("valid properties");
    let context = indexmap! { "host".to_string() => Value::new("caller-host") };
    let inputs = vec![
        Input::builder("server", "${ get_sp('cfg.net.host') }").build(),
        Input::builder("port", "${ get_sp('cfg.net.port', 5432) }").build(),
        Input::builder("secret", "${ get_sp('cfg.net.password') }").build(),
        Input::builder("missing", "${ get_sp('cfg.net.absent') }").required(false).build(),
    ];

    let bound = InputsBinding::new()
        .bind_inputs(&inputs, &context, Some(&store))
        .expect("inputs bind");

    assert_eq!(raw(&bound, "server"), &json!("db.internal"));
    assert_eq!(raw(&bound, "port"), &json!(5432));
    assert!(!bound["server"].is_sensitive());
    assert!(bound["secret"].is_sensitive());
    assert!(bound["missing"].is_null());
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn sensitive_values_never_reach_the_logs() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let context = indexmap! {
        "token".to_string() => Value::sensitive("tok-123"),
        "api_key".to_string() => Value::new("key-456"),
    };
    let inputs = vec![
        Input::builder("token", JsonValue::Null).build(),
        Input::builder("header", "${ 'Bearer ' + token }").build(),
        Input::builder("password", "hunter2").sensitive(true).build(),
        Input::builder("visible", "plain-text").build(),
        Input::builder("api_key", JsonValue::Null).sensitive(true).build(),
    ];

    let bound = tracing::subscriber::with_default(subscriber, || bind_ok(&inputs, &context));

    assert!(bound["header"].is_sensitive());
    assert_eq!(raw(&bound, "header"), &json!("Bearer tok-123"));

    let output = String::from_utf8(logs.0.lock().expect("log buffer").clone()).expect("utf-8 logs");
    assert!(output.contains("plain-text"), "debug events should be captured: {output}");
    assert!(!output.contains("tok-123"));
    assert!(!output.contains("hunter2"));
    assert!(!output.contains("key-456"));
}
