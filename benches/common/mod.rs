#![allow(dead_code)]
use std::path::Path;

use test_support::load_cases;

/// `(case name, program source)` for every case carrying the bench `tag`.
pub fn workloads(tag: &str) -> Vec<(String, String)> {
    let cases = load_cases(Path::new("tests/programs"))
        .unwrap_or_else(|err| panic!("load bench cases: {err:#}"));
    cases
        .into_iter()
        .filter(|case| case.has_bench_tag(tag))
        .map(|case| {
            let source = case
                .source()
                .unwrap_or_else(|err| panic!("read {}: {err:#}", case.name));
            (case.name, source)
        })
        .collect()
}
