use crate::domain::{BatchVerdict, ExecutionResult, OverallStatus, TestCaseVerdict};

/// Compare normalized results against expected outputs and aggregate.
///
/// Pure; performs no I/O. Comparison is exact after a symmetric trim of
/// leading/trailing whitespace on both sides; internal whitespace, case
/// and line endings are preserved because formatting matters to the
/// judge. A missing stdout always fails, even against an empty expected
/// output. Engine status codes are informational only and never decide
/// pass/fail.
///
/// # Panics
///
/// Panics when `results` and `expected` differ in length; the caller
/// builds both from the same test-case slice, so a mismatch is a
/// programmer error, not a judging outcome.
pub fn evaluate(results: &[ExecutionResult], expected: &[String]) -> BatchVerdict {
    assert_eq!(
        results.len(),
        expected.len(),
        "results and expected outputs must be index-aligned"
    );

    let cases: Vec<TestCaseVerdict> = results
        .iter()
        .zip(expected)
        .enumerate()
        .map(|(i, (result, expected))| {
            let passed = result
                .stdout
                .as_deref()
                .map(|stdout| stdout.trim() == expected.trim())
                .unwrap_or(false);

            TestCaseVerdict {
                index: (i + 1) as u32,
                passed,
                stdout: result.stdout.clone(),
                expected: expected.clone(),
                stderr: result.stderr.clone(),
                compile_output: result.compile_output.clone(),
                status: result.status,
                memory_kb: result.memory_kb,
                time_seconds: result.time_seconds,
            }
        })
        .collect();

    let total_count = cases.len() as u32;
    let passed_count = cases.iter().filter(|c| c.passed).count() as u32;
    let all_passed = passed_count == total_count;

    BatchVerdict {
        all_passed,
        overall_status: if all_passed {
            OverallStatus::Accepted
        } else {
            OverallStatus::WrongAnswer
        },
        total_count,
        passed_count,
        mean_memory_kb: mean(results.iter().filter_map(|r| r.memory_kb)),
        mean_time_seconds: mean(results.iter().filter_map(|r| r.time_seconds)),
        cases,
    }
}

/// Mean over reported values only; test cases without a figure are
/// excluded rather than counted as zero.
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0u32;
    for value in values {
        sum += value;
        count += 1;
    }
    (count > 0).then(|| sum / f64::from(count))
}
