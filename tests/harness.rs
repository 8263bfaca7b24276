use anyhow::{Context, Result, bail, ensure};
use std::path::Path;

use pyinterp::parser::parse_program;
use pyinterp::{Interpreter, InterpreterConfig};
use test_support::{
    Case, CaseClass, detect_python_interpreter, load_cases, normalize_output, run_python_file,
    validate_case,
};

fn parity_required() -> bool {
    std::env::var("PYTHON_PARITY_REQUIRED")
        .map(|value| value == "1")
        .unwrap_or(false)
}

fn config_for(case: &Case) -> InterpreterConfig {
    let limits = case.spec.limits;
    let mut config = InterpreterConfig::default();
    if let Some(limit) = limits.max_loop_iterations {
        config = config.with_max_loop_iterations(limit);
    }
    if let Some(limit) = limits.max_recursion_depth {
        config = config.with_max_recursion_depth(limit);
    }
    config
}

fn check_case(case: &Case) -> Result<()> {
    validate_case(case)?;
    let source = case.source()?;

    match case.spec.class {
        CaseClass::RuntimeSuccess => {
            let mut interpreter = Interpreter::capturing(config_for(case));
            interpreter
                .evaluate(&source)
                .with_context(|| format!("Evaluating {}", case.name))?;
            let expected = case.expected_stdout()?.unwrap_or_default();
            assert_eq!(
                normalize_output(&interpreter.take_output()),
                normalize_output(&expected),
                "stdout mismatch for {}",
                case.name
            );
        }
        CaseClass::FrontendError => {
            let expected_error = case.expected_error()?;
            let Err(error) = parse_program(&source) else {
                bail!("Expected frontend error in {}, but parsing succeeded", case.name);
            };
            let actual = error.to_string();
            ensure!(
                actual.contains(&expected_error),
                "Expected frontend error containing '{expected_error}' in {}, got '{actual}'",
                case.name
            );
        }
        CaseClass::RuntimeError => {
            let expected_error = case.expected_error()?;
            let program =
                parse_program(&source).with_context(|| format!("Parsing {}", case.name))?;
            let mut interpreter = Interpreter::capturing(config_for(case));
            let Err(error) = interpreter.run(&program) else {
                bail!("Expected runtime error in {}", case.name);
            };
            let actual = error.to_string();
            ensure!(
                actual.contains(&expected_error),
                "Expected runtime error containing '{expected_error}' in {}, got '{actual}'",
                case.name
            );
            if let Some(expected) = case.expected_stdout()? {
                assert_eq!(
                    normalize_output(&interpreter.take_output()),
                    normalize_output(&expected),
                    "stdout before the error mismatch for {}",
                    case.name
                );
            }
        }
    }
    Ok(())
}

#[test]
fn runs_programs_interpreter() -> Result<()> {
    for case in load_cases(Path::new("tests/programs"))? {
        check_case(&case)?;
    }
    Ok(())
}

#[test]
fn runs_parity_programs_under_cpython() -> Result<()> {
    let Some(python) = detect_python_interpreter() else {
        if parity_required() {
            bail!("CPython parity required but no interpreter found. Set PYTHON or install python3.");
        }
        eprintln!("Skipping CPython parity test: no PYTHON env or python3 interpreter found.");
        return Ok(());
    };

    for case in load_cases(Path::new("tests/programs"))? {
        if !case.spec.parity {
            continue;
        }
        let expected = case.expected_stdout()?.unwrap_or_default();
        let actual = run_python_file(&python, &case.program_path)
            .with_context(|| format!("Running CPython for {}", case.name))?;
        assert_eq!(
            normalize_output(&actual),
            normalize_output(&expected),
            "CPython mismatch for {}",
            case.name
        );
    }
    Ok(())
}
