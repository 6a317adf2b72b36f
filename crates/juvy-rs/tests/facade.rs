//! Public surface tests through the facade crate.

use juvy_rs::{Juvy, JuvyError, ValidateOptions, Value};
use juvy_rs_test_utils::{argv, env_vars, server_schema};
use pretty_assertions::assert_eq;

fn server(env: &[(&str, &str)], args: &[&str]) -> Juvy {
    Juvy::builder(server_schema())
        .env(env_vars(env))
        .args(argv(args))
        .build()
        .expect("juvy")
}

/// Walk the port from default to env to argument, then past its range.
#[test]
fn port_scenario() {
    juvy_rs::init_logging();

    assert_eq!(server(&[], &[]).get("port").unwrap(), Value::Integer(3000));
    assert_eq!(
        server(&[("PORT", "8080")], &[]).get("port").unwrap(),
        Value::Integer(8080)
    );

    let mut juvy = server(&[("PORT", "8080")], &["--port=9090"]);
    assert_eq!(juvy.get("port").unwrap(), Value::Integer(9090));
    juvy.validate(ValidateOptions::strict()).expect("valid");

    juvy.set("port", "70000").expect("set");
    match juvy.validate(ValidateOptions::warn()) {
        Err(JuvyError::Validation(err)) => {
            assert!(err.message().contains("must be within range 0 - 65535"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn config_module_is_reexported() {
    let schema = juvy_rs::config::Schema::new(&server_schema()).expect("schema");
    assert_eq!(schema.leaves().len(), 2);
    assert_eq!(
        schema.arg_bindings().get("port").map(String::as_str),
        Some("port")
    );
}
