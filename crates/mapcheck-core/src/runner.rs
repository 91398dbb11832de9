//! Scenario execution: Pending → Running → {Passed, Failed, Erred}.
//!
//! Steps run strictly in order on one page. A step's own error aborts the
//! run only when the step is fatal; otherwise it is recorded and execution
//! continues. Terminal states are final — whole-scenario retry, if wanted,
//! is an external wrapper that re-invokes the runner.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::capture::{CapturedState, CapturedValue, capture};
use crate::error::CheckError;
use crate::report::{
    Outcome, RunEvent, RunReporter, ScenarioStatus, StepReport, StepStatus, VerificationResult,
};
use crate::scenario::Scenario;
use crate::step::{Step, StepAction};
use crate::traits::PageDriver;
use crate::wait::{DEFAULT_POLL_INTERVAL, wait_for};

/// Runner knobs.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Gap between wait-condition probes.
    pub poll_interval: Duration,
    /// Overall deadline for the whole scenario. Exceeding it terminates the
    /// run as erred, with everything captured so far attached.
    pub deadline: Option<Duration>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }
}

/// What one step produced, before it is folded into the report.
enum StepEval {
    Passed(Option<String>),
    AssertionFailed {
        description: String,
        observed: String,
        expected: String,
    },
}

#[derive(Default)]
struct RunState {
    steps: Vec<StepReport>,
    captures: Vec<CapturedState>,
    screenshots: Vec<std::path::PathBuf>,
    any_failed: bool,
    last_completed: Option<String>,
}

/// Drives one scenario over one page. Owns the page for the duration of the
/// run and releases it exactly once on every exit path.
pub struct ScenarioRunner<P: PageDriver> {
    page: P,
    config: RunnerConfig,
}

impl<P: PageDriver> ScenarioRunner<P> {
    pub fn new(page: P) -> Self {
        Self::with_config(page, RunnerConfig::default())
    }

    pub fn with_config(page: P, config: RunnerConfig) -> Self {
        Self { page, config }
    }

    /// Run the scenario to a terminal status.
    pub async fn run<R: RunReporter>(self, scenario: &Scenario, reporter: &R) -> VerificationResult {
        self.run_with_cancellation(scenario, reporter, CancellationToken::new())
            .await
    }

    /// Run the scenario, additionally honoring a host cancellation token.
    /// Cancellation terminates the run as erred with partial captures kept.
    pub async fn run_with_cancellation<R: RunReporter>(
        self,
        scenario: &Scenario,
        reporter: &R,
        cancel: CancellationToken,
    ) -> VerificationResult {
        let started_at = Utc::now();
        let target = scenario.target_url();
        reporter.report(RunEvent::ScenarioStarted {
            scenario: &scenario.name,
            url: target.as_str(),
        });

        let mut state = RunState::default();

        let run_error: Option<CheckError> = {
            let exec = async {
                match self.config.deadline {
                    Some(deadline) => {
                        match tokio::time::timeout(
                            deadline,
                            self.execute(scenario, target.as_str(), &mut state, reporter),
                        )
                        .await
                        {
                            Ok(res) => res,
                            Err(_) => Err(CheckError::DeadlineExceeded(deadline.as_secs())),
                        }
                    }
                    None => self.execute(scenario, target.as_str(), &mut state, reporter).await,
                }
            };

            tokio::select! {
                res = exec => res.err(),
                () = cancel.cancelled() => {
                    Some(CheckError::Cancelled("run cancelled by host".into()))
                }
            }
        };

        // Steps never reached (fatal abort, deadline, cancellation).
        for step in scenario.steps.iter().skip(state.steps.len()) {
            reporter.report(RunEvent::StepSkipped { label: &step.label });
            state.steps.push(StepReport {
                label: step.label.clone(),
                status: StepStatus::Skipped,
                detail: None,
                error: None,
            });
        }

        let status = match &run_error {
            Some(_) => ScenarioStatus::Erred,
            None if state.any_failed => ScenarioStatus::Failed,
            None => ScenarioStatus::Passed,
        };

        // Release the page on every exit path, exceptional ones included.
        if let Err(e) = self.page.close().await {
            tracing::warn!(error = %e, "Failed to close page");
        }

        let result = VerificationResult {
            run_id: Uuid::new_v4(),
            scenario: scenario.name.clone(),
            status,
            steps: state.steps,
            captures: state.captures,
            screenshots: state.screenshots,
            error: run_error.map(|e| e.to_string()),
            last_completed_step: state.last_completed,
            started_at,
            finished_at: Utc::now(),
        };
        reporter.report(RunEvent::ScenarioFinished { result: &result });
        result
    }

    /// Navigate to the target and execute every step in order. Returns `Err`
    /// only for errors that abort the run (fatal steps).
    async fn execute<R: RunReporter>(
        &self,
        scenario: &Scenario,
        target: &str,
        state: &mut RunState,
        reporter: &R,
    ) -> Result<(), CheckError> {
        // Entering Running navigates to the target. The initial page never
        // loading is a setup failure and always aborts.
        self.page.navigate(target).await?;

        let total = scenario.steps.len();
        for (index, step) in scenario.steps.iter().enumerate() {
            reporter.report(RunEvent::StepStarted {
                index,
                total,
                label: &step.label,
            });

            match self.run_step(step, state).await {
                Ok(StepEval::Passed(detail)) => {
                    reporter.report(RunEvent::StepPassed {
                        label: &step.label,
                        detail: detail.as_deref(),
                    });
                    state.steps.push(StepReport {
                        label: step.label.clone(),
                        status: StepStatus::Passed,
                        detail,
                        error: None,
                    });
                    state.last_completed = Some(step.label.clone());
                }
                Ok(StepEval::AssertionFailed {
                    description,
                    observed,
                    expected,
                }) => {
                    reporter.report(RunEvent::AssertionFailed {
                        label: &step.label,
                        description: &description,
                        observed: &observed,
                        expected: &expected,
                    });
                    state.steps.push(StepReport {
                        label: step.label.clone(),
                        status: StepStatus::Failed,
                        detail: Some(format!(
                            "{description}: expected {expected}, observed {observed}"
                        )),
                        error: None,
                    });
                    state.any_failed = true;
                }
                Err(e) => {
                    let error = e.to_string();
                    reporter.report(RunEvent::StepErred {
                        label: &step.label,
                        error: &error,
                        fatal: step.fatal,
                    });
                    state.steps.push(StepReport {
                        label: step.label.clone(),
                        status: if step.fatal {
                            StepStatus::Erred
                        } else {
                            StepStatus::Failed
                        },
                        detail: None,
                        error: Some(error),
                    });
                    if step.fatal {
                        return Err(e);
                    }
                    state.any_failed = true;
                }
            }
        }
        Ok(())
    }

    async fn run_step(&self, step: &Step, state: &mut RunState) -> Result<StepEval, CheckError> {
        match &step.action {
            StepAction::Navigate { url } => {
                self.page.navigate(url.as_str()).await?;
                Ok(StepEval::Passed(Some(format!("navigated to {url}"))))
            }
            StepAction::WaitFor { condition, timeout } => {
                wait_for(&self.page, condition, *timeout, self.config.poll_interval).await?;
                Ok(StepEval::Passed(Some(condition.to_string())))
            }
            StepAction::Fill { selector, text } => {
                self.page.fill(selector, text).await?;
                Ok(StepEval::Passed(Some(format!(
                    "filled '{selector}' with \"{text}\""
                ))))
            }
            StepAction::Click { selector } => {
                self.page.click(selector).await?;
                Ok(StepEval::Passed(Some(format!("clicked '{selector}'"))))
            }
            StepAction::Evaluate { expression } => {
                self.page.evaluate(expression).await?;
                Ok(StepEval::Passed(Some(format!("evaluated `{expression}`"))))
            }
            StepAction::Capture { kind } => {
                let value = capture(&self.page, kind).await?;
                if let CapturedValue::Screenshot(path) = &value {
                    state.screenshots.push(path.clone());
                }
                state.captures.push(CapturedState {
                    step: step.label.clone(),
                    value,
                    captured_at: Utc::now(),
                });
                Ok(StepEval::Passed(Some(kind.to_string())))
            }
            StepAction::Assert { expect } => {
                match expect.check(&self.page, &state.captures).await? {
                    Outcome::Pass => Ok(StepEval::Passed(Some(expect.to_string()))),
                    Outcome::Fail {
                        description,
                        observed,
                        expected,
                    } => Ok(StepEval::AssertionFailed {
                        description,
                        observed,
                        expected,
                    }),
                }
            }
            StepAction::Pause { duration } => {
                tokio::time::sleep(*duration).await;
                Ok(StepEval::Passed(Some(format!(
                    "paused {} ms",
                    duration.as_millis()
                ))))
            }
        }
    }
}
