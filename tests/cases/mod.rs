// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use vellum::schema::error::format_path;
use vellum::*;

use anyhow::{bail, Result};
use indexmap::IndexMap;
use test_generator::test_resources;

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Failure {
    instance: Value,
    paths: Vec<String>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    <Value as serde::Deserialize>::deserialize(deserializer).map(Some)
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Conversion {
    input: Value,
    // `output: null` expects a null result; only a missing key is `None`.
    #[serde(default, deserialize_with = "present")]
    output: Option<Value>,
    // Path of the constraint that stops the conversion.
    error: Option<String>,
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    dialect: Option<String>,
    strict: Option<bool>,
    partial: Option<bool>,
    skip: Option<bool>,
    // Named schemas compiled before `schema`, in order.
    #[serde(default)]
    definitions: IndexMap<String, Value>,
    schema: Value,
    error: Option<String>,
    #[serde(default)]
    valid: Vec<Value>,
    #[serde(default)]
    invalid: Vec<Value>,
    #[serde(default)]
    failures: Vec<Failure>,
    #[serde(default)]
    convert: Vec<Conversion>,
}

#[derive(serde::Deserialize)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn environment(dialect: Option<&str>) -> Result<Environment> {
    Ok(match dialect {
        None | Some("native") => Environment::native(),
        Some("jsonSchema") => Environment::json_schema(),
        Some(other) => bail!("unknown dialect {other}"),
    })
}

fn leaf_paths(result: &ValidationResult) -> Vec<String> {
    let mut paths: Vec<String> = result
        .failures()
        .iter()
        .map(|(path, _)| format_path(path))
        .collect();
    paths.sort();
    paths
}

fn run_case(case: TestCase) -> Result<()> {
    let env = environment(case.dialect.as_deref())?;
    for (name, raw) in case.definitions {
        env.schema(raw, Some(&name))?;
    }

    let compiled = match case.strict {
        Some(strict) => env.schema_with_strictness(case.schema, None, strict),
        None => env.schema(case.schema, None),
    };
    let schema = match (compiled, case.error) {
        (Ok(schema), None) => schema,
        (Err(e), Some(expected)) => {
            let actual = e.to_string();
            if !actual.contains(&expected) {
                bail!("expected compile error containing '{expected}', got '{actual}'");
            }
            return Ok(());
        }
        (Ok(_), Some(expected)) => bail!("expected compile error '{expected}'"),
        (Err(e), None) => bail!("compile failed: {e}"),
    };
    let partial = case.partial.unwrap_or(false);

    for instance in &case.valid {
        let result = schema.validate(instance, partial);
        if !result.success() {
            bail!(
                "{instance} should be valid, failed with {:?}",
                leaf_paths(&result)
            );
        }
    }

    for instance in &case.invalid {
        if schema.validate(instance, partial).success() {
            bail!("{instance} should be invalid");
        }
    }

    for failure in case.failures {
        let result = schema.validate(&failure.instance, partial);
        let mut expected = failure.paths;
        expected.sort();
        assert_eq!(leaf_paths(&result), expected, "paths for {}", failure.instance);
    }

    for conversion in case.convert {
        let outcome = schema.convert(conversion.input.clone(), partial);
        match (outcome, conversion.output, conversion.error) {
            (Ok(actual), Some(expected), None) => {
                assert_eq!(actual, expected, "converting {}", conversion.input);
                if !schema.validate(&actual, partial).success() {
                    bail!("{actual} converted from {} does not validate", conversion.input);
                }
            }
            (Err(e), None, Some(path)) => {
                assert_eq!(format_path(&e.path), path, "converting {}", conversion.input);
            }
            (Ok(actual), _, Some(path)) => {
                bail!(
                    "converting {} should fail at {path}, got {actual}",
                    conversion.input
                )
            }
            (Err(e), _, None) => bail!("converting {} failed: {e}", conversion.input),
            (_, Some(_), Some(_)) | (Ok(_), None, None) => {
                bail!("a conversion needs exactly one of output and error")
            }
        }
    }

    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    println!("running {file}");

    for case in test.cases.into_iter() {
        print!("case {} ", case.note);
        if case.skip == Some(true) {
            println!("skipped");
            continue;
        }
        let note = case.note.clone();
        if let Err(e) = run_case(case) {
            bail!("{note}: {e}");
        }
        println!("passed");
    }

    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
