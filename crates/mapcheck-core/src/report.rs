use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::capture::CapturedState;

/// Result of checking one expectation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    Pass,
    Fail {
        description: String,
        observed: String,
        expected: String,
    },
}

impl Outcome {
    /// Build an outcome from a comparison already made.
    pub fn compare(description: String, ok: bool, observed: String, expected: String) -> Self {
        if ok {
            Outcome::Pass
        } else {
            Outcome::Fail {
                description,
                observed,
                expected,
            }
        }
    }
}

/// Lifecycle of a scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Pending,
    Running,
    /// Every outcome passed.
    Passed,
    /// At least one assertion failed or a non-fatal step erred, but the run
    /// completed.
    Failed,
    /// An unhandled error aborted the scenario before completion.
    Erred,
}

impl ScenarioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioStatus::Pending => "pending",
            ScenarioStatus::Running => "running",
            ScenarioStatus::Passed => "passed",
            ScenarioStatus::Failed => "failed",
            ScenarioStatus::Erred => "erred",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScenarioStatus::Passed | ScenarioStatus::Failed | ScenarioStatus::Erred
        )
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-step disposition in the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    /// An assertion mismatch or a recovered non-fatal error.
    Failed,
    /// The step's own error aborted the scenario.
    Erred,
    /// Never reached because an earlier fatal step aborted the run.
    Skipped,
}

/// What happened to one step.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StepReport {
    pub label: String,
    pub status: StepStatus,
    /// What was checked, observed vs. expected — present for passed checks
    /// and assertion mismatches.
    pub detail: Option<String>,
    /// The step's error, for failed/erred steps.
    pub error: Option<String>,
}

/// The terminal artifact of one scenario run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VerificationResult {
    pub run_id: Uuid,
    pub scenario: String,
    pub status: ScenarioStatus,
    pub steps: Vec<StepReport>,
    /// Everything captured before the run ended — attached even when the
    /// run was aborted, for diagnosis.
    pub captures: Vec<CapturedState>,
    pub screenshots: Vec<PathBuf>,
    /// The unhandled error, for erred runs.
    pub error: Option<String>,
    /// Last step that completed successfully, for triage of erred runs.
    pub last_completed_step: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl VerificationResult {
    /// Process exit code for this result: non-zero only when setup never
    /// completed (erred). Assertion mismatches exit zero with warnings.
    pub fn exit_code(&self) -> i32 {
        if self.status == ScenarioStatus::Erred { 1 } else { 0 }
    }
}

/// Events emitted during a run for monitoring/logging.
#[derive(Debug, Clone)]
pub enum RunEvent<'a> {
    ScenarioStarted {
        scenario: &'a str,
        url: &'a str,
    },
    StepStarted {
        index: usize,
        total: usize,
        label: &'a str,
    },
    StepPassed {
        label: &'a str,
        detail: Option<&'a str>,
    },
    AssertionFailed {
        label: &'a str,
        description: &'a str,
        observed: &'a str,
        expected: &'a str,
    },
    StepErred {
        label: &'a str,
        error: &'a str,
        fatal: bool,
    },
    StepSkipped {
        label: &'a str,
    },
    ScenarioFinished {
        result: &'a VerificationResult,
    },
}

/// Trait for receiving run events (decoupled reporting).
pub trait RunReporter: Send + Sync {
    fn report(&self, event: RunEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl RunReporter for TracingReporter {
    fn report(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::ScenarioStarted { scenario, url } => {
                tracing::info!(%scenario, %url, "Scenario started");
            }
            RunEvent::StepStarted { index, total, label } => {
                tracing::debug!(step = index + 1, total, %label, "Step started");
            }
            RunEvent::StepPassed { label, detail } => {
                tracing::info!(%label, detail = detail.unwrap_or(""), "Step passed");
            }
            RunEvent::AssertionFailed {
                label,
                description,
                observed,
                expected,
            } => {
                tracing::warn!(%label, %description, %observed, %expected, "Assertion failed");
            }
            RunEvent::StepErred { label, error, fatal } => {
                tracing::warn!(%label, %error, %fatal, "Step erred");
            }
            RunEvent::StepSkipped { label } => {
                tracing::debug!(%label, "Step skipped");
            }
            RunEvent::ScenarioFinished { result } => {
                tracing::info!(
                    scenario = %result.scenario,
                    status = %result.status,
                    steps = result.steps.len(),
                    "Scenario finished"
                );
            }
        }
    }
}

/// Reporter that prints a human-readable per-step summary to stdout —
/// what was checked, observed vs. expected, and for erred runs the
/// unhandled error and the last completed step.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl RunReporter for ConsoleReporter {
    fn report(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::ScenarioStarted { scenario, url } => {
                println!("Scenario '{scenario}' against {url}");
            }
            RunEvent::StepStarted { index, total, label } => {
                println!("  [{}/{}] {label} ...", index + 1, total);
            }
            RunEvent::StepPassed { label, detail } => match detail {
                Some(detail) => println!("  ok   {label} — {detail}"),
                None => println!("  ok   {label}"),
            },
            RunEvent::AssertionFailed {
                label,
                description,
                observed,
                expected,
            } => {
                println!("  FAIL {label} — {description}: expected {expected}, observed {observed}");
            }
            RunEvent::StepErred { label, error, fatal } => {
                if fatal {
                    println!("  ERR  {label} — {error} (fatal, aborting)");
                } else {
                    println!("  ERR  {label} — {error} (continuing)");
                }
            }
            RunEvent::StepSkipped { label } => {
                println!("  skip {label}");
            }
            RunEvent::ScenarioFinished { result } => {
                println!(
                    "Scenario '{}' {} in {} ms",
                    result.scenario,
                    result.status,
                    (result.finished_at - result.started_at).num_milliseconds()
                );
                if result.status == ScenarioStatus::Erred {
                    if let Some(error) = &result.error {
                        println!("  unhandled error: {error}");
                    }
                    match &result.last_completed_step {
                        Some(step) => println!("  last completed step: {step}"),
                        None => println!("  no step completed"),
                    }
                }
                for shot in &result.screenshots {
                    println!("  screenshot: {}", shot.display());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_result(status: ScenarioStatus) -> VerificationResult {
        VerificationResult {
            run_id: Uuid::new_v4(),
            scenario: "initial load".into(),
            status,
            steps: vec![],
            captures: vec![],
            screenshots: vec![],
            error: None,
            last_completed_step: None,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_terminality() {
        assert!(!ScenarioStatus::Pending.is_terminal());
        assert!(!ScenarioStatus::Running.is_terminal());
        assert!(ScenarioStatus::Passed.is_terminal());
        assert!(ScenarioStatus::Failed.is_terminal());
        assert!(ScenarioStatus::Erred.is_terminal());
    }

    #[test]
    fn test_exit_codes() {
        // Assertion mismatches warn but exit zero; only erred runs exit non-zero.
        assert_eq!(empty_result(ScenarioStatus::Passed).exit_code(), 0);
        assert_eq!(empty_result(ScenarioStatus::Failed).exit_code(), 0);
        assert_eq!(empty_result(ScenarioStatus::Erred).exit_code(), 1);
    }

    #[test]
    fn test_outcome_compare() {
        assert_eq!(
            Outcome::compare("count".into(), true, "1".into(), "1".into()),
            Outcome::Pass
        );
        let fail = Outcome::compare("count of '.marker'".into(), false, "3".into(), "1".into());
        match fail {
            Outcome::Fail {
                description,
                observed,
                expected,
            } => {
                assert_eq!(description, "count of '.marker'");
                assert_eq!(observed, "3");
                assert_eq!(expected, "1");
            }
            Outcome::Pass => panic!("expected fail"),
        }
    }

    #[test]
    fn test_result_serializes_to_json() {
        let json = serde_json::to_value(empty_result(ScenarioStatus::Passed)).unwrap();
        assert_eq!(json["status"], "passed");
        assert_eq!(json["scenario"], "initial load");
    }
}
