use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseClass {
    RuntimeSuccess,
    FrontendError,
    RuntimeError,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BenchConfig {
    pub enabled: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Per-case interpreter limits; unset fields keep the interpreter defaults.
#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct CaseLimits {
    pub max_loop_iterations: Option<usize>,
    pub max_recursion_depth: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExpectedOutcome {
    pub exit_code: i32,
    pub stdout_file: Option<String>,
    pub stderr_contains_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaseSpec {
    pub class: CaseClass,
    /// Whether CPython must print the same stdout for this program.
    #[serde(default)]
    pub parity: bool,
    #[serde(default)]
    pub limits: CaseLimits,
    #[serde(default)]
    pub bench: BenchConfig,
    pub expected: ExpectedOutcome,
}

#[derive(Debug, Clone)]
pub struct Case {
    pub name: String,
    pub dir: PathBuf,
    pub program_path: PathBuf,
    pub spec: CaseSpec,
}

impl Case {
    pub fn read_text(&self, relative_path: &str) -> Result<String> {
        fs::read_to_string(self.dir.join(relative_path))
            .with_context(|| format!("Reading {} fixture file {}", self.name, relative_path))
    }

    pub fn source(&self) -> Result<String> {
        fs::read_to_string(&self.program_path)
            .with_context(|| format!("Reading program for {}", self.name))
    }

    pub fn expected_stdout(&self) -> Result<Option<String>> {
        self.spec
            .expected
            .stdout_file
            .as_deref()
            .map(|file| self.read_text(file))
            .transpose()
    }

    pub fn expected_error(&self) -> Result<String> {
        let file = self
            .spec
            .expected
            .stderr_contains_file
            .as_deref()
            .with_context(|| format!("Missing stderr_contains_file in {}", self.name))?;
        Ok(self.read_text(file)?.trim().to_string())
    }

    pub fn has_bench_tag(&self, tag: &str) -> bool {
        self.spec.bench.enabled && self.spec.bench.tags.iter().any(|name| name == tag)
    }
}

pub fn load_cases(programs_dir: &Path) -> Result<Vec<Case>> {
    let mut cases = Vec::new();

    for entry in
        fs::read_dir(programs_dir).with_context(|| format!("Reading {}", programs_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }

        let case_path = path.join("case.yaml");
        if !case_path.exists() {
            continue;
        }

        let program_path = path.join("program.py");
        ensure!(
            program_path.exists(),
            "Missing program.py for case {}",
            path.display()
        );

        let case_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .map(str::to_string)
            .with_context(|| format!("Invalid case directory name {}", path.display()))?;
        let case_raw = fs::read_to_string(&case_path)
            .with_context(|| format!("Reading {}", case_path.display()))?;
        let spec: CaseSpec = serde_yaml::from_str(&case_raw)
            .with_context(|| format!("Parsing {}", case_path.display()))?;

        cases.push(Case {
            name: case_name,
            dir: path,
            program_path,
            spec,
        });
    }

    ensure!(
        !cases.is_empty(),
        "No test cases found in {}",
        programs_dir.display()
    );
    cases.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(cases)
}

/// Checks the fields every case class requires.
pub fn validate_case(case: &Case) -> Result<()> {
    let expected = &case.spec.expected;
    match case.spec.class {
        CaseClass::RuntimeSuccess => {
            ensure!(
                expected.exit_code == 0,
                "Case {} expected exit code must be 0 for runtime_success",
                case.name
            );
            ensure!(
                expected.stdout_file.is_some(),
                "Missing stdout_file in {}",
                case.name
            );
        }
        CaseClass::FrontendError | CaseClass::RuntimeError => {
            ensure!(
                expected.exit_code == 1,
                "Case {} expected exit code must be 1 for an error case",
                case.name
            );
            ensure!(
                expected.stderr_contains_file.is_some(),
                "Missing stderr_contains_file in {}",
                case.name
            );
            ensure!(
                !case.spec.parity,
                "Case {} cannot require parity for an error outcome",
                case.name
            );
        }
    }
    if case.spec.bench.enabled {
        ensure!(
            !case.spec.bench.tags.is_empty(),
            "Case {} has bench enabled but no tags",
            case.name
        );
    }
    Ok(())
}

pub fn normalize_output(output: &str) -> String {
    output.replace("\r\n", "\n").trim_end().to_string()
}

pub fn run_python_startup(interpreter: &str) -> Result<()> {
    let status = Command::new(interpreter)
        .arg("-c")
        .arg("pass")
        .status()
        .with_context(|| format!("Running '{interpreter} -c pass'"))?;
    ensure!(status.success(), "python startup command failed");
    Ok(())
}

/// Finds a runnable CPython: `$PYTHON` first, then `python3`, then `python`.
pub fn detect_python_interpreter() -> Option<String> {
    if let Ok(python) = std::env::var("PYTHON")
        && run_python_startup(&python).is_ok()
    {
        return Some(python);
    }
    ["python3", "python"]
        .into_iter()
        .find(|candidate| run_python_startup(candidate).is_ok())
        .map(str::to_string)
}

pub fn run_python_file(interpreter: &str, path: &Path) -> Result<String> {
    let output = Command::new(interpreter)
        .arg(path)
        .output()
        .with_context(|| format!("Running python file {}", path.display()))?;
    ensure!(
        output.status.success(),
        "python failed for {}: {}",
        path.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
