//! Schema cleaning across pre validators, fields and post validators.

use keystone_rs_validator::{
    CallbackValidator, CompareOperator, ErrorSchema, NumberValidator, PassValidator,
    SchemaCompareValidator, StringValidator, Validator, ValidationError, ValidatorError,
    ValidatorSchema,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn schema() -> ValidatorSchema {
    ValidatorSchema::new()
        .with_field("name", StringValidator::new().max_length(5))
        .with_field("age", NumberValidator::new().min(0.0))
        .with_field("nickname", StringValidator::new().required(false))
}

fn errors(result: Result<Value, ValidationError>) -> ErrorSchema {
    match result.unwrap_err() {
        ValidationError::Schema(schema) => schema,
        other => panic!("expected schema, got {other:?}"),
    }
}

#[test]
fn cleans_every_declared_field() {
    let clean = schema()
        .clean(&json!({"name": "ann", "age": "31"}))
        .expect("clean");
    assert_eq!(clean, json!({"name": "ann", "age": 31, "nickname": null}));
}

#[test]
fn reports_all_failing_fields_at_once() {
    let errors = errors(schema().clean(&json!({"name": "annabelle", "age": -1})));
    assert_eq!(
        errors.flatten(),
        vec![
            ("name".to_string(), "\"annabelle\" is too long (5 characters max).".to_string()),
            ("age".to_string(), "\"-1\" must be at least 0.".to_string()),
        ]
    );

    let errors = self::errors(schema().clean(&Value::Null));
    assert_eq!(errors.named_errors().keys().collect::<Vec<_>>(), vec!["name", "age"]);
}

#[test]
fn output_follows_declared_field_order() {
    let clean = schema()
        .allow_extra_fields(true)
        .filter_extra_fields(false)
        .clean(&json!({"foo": "x", "nickname": "al", "age": 3, "name": "ann"}))
        .expect("clean");
    assert_eq!(
        clean.as_object().expect("object").keys().collect::<Vec<_>>(),
        vec!["name", "age", "nickname", "foo"]
    );

    let errors = errors(schema().clean(&json!({"age": -1, "name": "annabelle"})));
    assert_eq!(
        errors.named_errors().keys().collect::<Vec<_>>(),
        vec!["name", "age"]
    );
}

#[test]
fn extra_fields_follow_options() {
    let errors = errors(schema().clean(&json!({"name": "ann", "age": 1, "foo": "x"})));
    assert_eq!(
        errors.flatten(),
        vec![(String::new(), "Unexpected extra form field named \"foo\".".to_string())]
    );

    let dropped = schema()
        .allow_extra_fields(true)
        .clean(&json!({"name": "ann", "age": 1, "foo": "x"}))
        .expect("clean");
    assert!(dropped.get("foo").is_none());

    let kept = schema()
        .allow_extra_fields(true)
        .filter_extra_fields(false)
        .clean(&json!({"foo": "x", "name": "ann", "age": 1}))
        .expect("clean");
    assert_eq!(kept.get("foo"), Some(&json!("x")));
}

#[test]
fn post_max_size_short_circuits() {
    let schema = schema().post_max_size("1k");
    let errors = errors(schema.clean_request(&json!({"foo": "bar"}), Some(2048)));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.global_errors()[0].code(), "post_max_size");

    assert!(schema.clean_request(&json!({"name": "ann", "age": 1}), Some(1024)).is_ok());
    let disabled = self::schema().post_max_size("0");
    assert!(disabled.clean_request(&json!({"name": "ann", "age": 1}), Some(1 << 30)).is_ok());
}

#[test]
fn pre_and_post_validators_contribute_errors() {
    let pre = CallbackValidator::new(|_, values| {
        let mut values = values.clone();
        if let Some(name) = values.get_mut("name") {
            *name = json!(name.as_str().unwrap_or_default().to_lowercase());
        }
        Ok(values)
    });
    let schema = ValidatorSchema::new()
        .with_field("name", StringValidator::new())
        .with_field("password", StringValidator::new())
        .with_field("password_again", StringValidator::new())
        .pre_validator(pre)
        .post_validator(SchemaCompareValidator::new(
            "password",
            CompareOperator::Equal,
            "password_again",
        ));

    let clean = schema
        .clean(&json!({"name": "ANN", "password": "a", "password_again": "a"}))
        .expect("clean");
    assert_eq!(clean["name"], json!("ann"));

    let errors = errors(schema.clean(&json!({"name": "ANN", "password": "a", "password_again": "b"})));
    assert_eq!(errors.named_errors().keys().collect::<Vec<_>>(), vec!["password"]);

    let failing_pre = ValidatorSchema::new()
        .with_field("name", StringValidator::new())
        .pre_validator(CallbackValidator::new(|options, _| {
            Err(ValidatorError::new("csrf", options.message("invalid")).into())
        }));
    let errors = self::errors(failing_pre.clean(&json!({})));
    assert_eq!(
        errors.flatten(),
        vec![
            (String::new(), "Invalid.".to_string()),
            ("name".to_string(), "Required.".to_string()),
        ]
    );
}

#[test]
fn nested_schemas_nest_their_errors() {
    let address = ValidatorSchema::new()
        .with_field("city", StringValidator::new())
        .with_field("zip", StringValidator::new().required(false));
    let schema = ValidatorSchema::new()
        .with_field("name", PassValidator::new())
        .with_field("address", address);
    let errors = errors(schema.clean(&json!({"address": {"zip": "12345"}})));
    assert_eq!(
        errors.flatten(),
        vec![("address[city]".to_string(), "Required.".to_string())]
    );
}

#[test]
fn replacing_a_field_inherits_limits() {
    let mut schema = ValidatorSchema::new().with_field("title", StringValidator::new().max_length(3));
    schema.set_field("title", Box::new(StringValidator::new().min_length(1)));
    assert!(schema.field("title").expect("field").clean(&json!("abcd")).is_err());

    let mut schema = ValidatorSchema::new().with_field("count", NumberValidator::new().max(10.0));
    schema.set_field(
        "count",
        Box::new(keystone_rs_validator::AndValidator::new(vec![
            Box::new(StringValidator::new()),
            Box::new(NumberValidator::new()),
        ])),
    );
    assert!(schema.clean(&json!({"count": "11"})).is_err());
    assert!(schema.clean(&json!({"count": "9"})).is_ok());
}
