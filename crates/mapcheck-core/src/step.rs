use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::capture::{CaptureKind, CapturedState, CapturedValue};
use crate::condition::{Condition, is_truthy};
use crate::error::CheckError;
use crate::report::Outcome;
use crate::traits::PageDriver;

/// One atomic action or check within a scenario.
///
/// Wait and pause variants carry their bound as a required field — there is
/// no unbounded wait anywhere in a scenario.
#[derive(Debug, Clone)]
pub enum StepAction {
    /// Navigate mid-scenario to a new URL.
    Navigate { url: Url },
    /// Poll a condition until it holds or the timeout elapses.
    WaitFor { condition: Condition, timeout: Duration },
    /// Type text into an input.
    Fill { selector: String, text: String },
    /// Click the first element matching a selector.
    Click { selector: String },
    /// Run an expression in the page context for its side effect
    /// (e.g. `map.flyTo(...)` on the application's map handle).
    Evaluate { expression: String },
    /// Extract state and attach it to the result.
    Capture { kind: CaptureKind },
    /// Check an expectation against current page state. A mismatch is a
    /// recorded outcome, never an abort.
    Assert { expect: Expectation },
    /// Bounded delay for intervals with no observable signal (debounced
    /// fetches after pan/zoom). Best effort — prefer `WaitFor` wherever a
    /// real condition exists.
    Pause { duration: Duration },
}

/// A success predicate an assertion step checks against captured state.
#[derive(Debug, Clone)]
pub enum Expectation {
    /// Exactly `expected` elements match the selector.
    CountEquals { selector: String, expected: usize },
    /// At least `min` elements match the selector.
    CountAtLeast { selector: String, min: usize },
    /// First matching element's text equals a literal.
    TextEquals { selector: String, expected: String },
    /// First matching element's text equals a text value captured earlier
    /// in the run, referenced by the capture step's label.
    TextMatchesCapture { selector: String, capture: String },
    /// A page expression evaluates truthy. `description` names the check
    /// in reports, since the raw expression is rarely readable.
    Truthy { expression: String, description: String },
}

impl Expectation {
    /// Check the expectation against live page state and prior captures.
    pub async fn check<P: PageDriver>(
        &self,
        page: &P,
        captures: &[CapturedState],
    ) -> Result<Outcome, CheckError> {
        match self {
            Expectation::CountEquals { selector, expected } => {
                let observed = page.count(selector).await?;
                Ok(Outcome::compare(
                    format!("count of '{selector}'"),
                    observed == *expected,
                    observed.to_string(),
                    expected.to_string(),
                ))
            }
            Expectation::CountAtLeast { selector, min } => {
                let observed = page.count(selector).await?;
                Ok(Outcome::compare(
                    format!("count of '{selector}'"),
                    observed >= *min,
                    observed.to_string(),
                    format!(">= {min}"),
                ))
            }
            Expectation::TextEquals { selector, expected } => {
                let observed = page.text(selector).await?;
                Ok(Outcome::compare(
                    format!("text of '{selector}'"),
                    observed == *expected,
                    observed,
                    expected.clone(),
                ))
            }
            Expectation::TextMatchesCapture { selector, capture } => {
                let expected = captures
                    .iter()
                    .rev()
                    .find(|c| c.step == *capture)
                    .ok_or_else(|| {
                        CheckError::Capture(format!("no capture labeled '{capture}' in this run"))
                    })?;
                let CapturedValue::Text(expected) = &expected.value else {
                    return Err(CheckError::Capture(format!(
                        "capture '{capture}' is not a text capture"
                    )));
                };
                let observed = page.text(selector).await?;
                Ok(Outcome::compare(
                    format!("text of '{selector}' vs capture '{capture}'"),
                    observed == *expected,
                    observed,
                    expected.clone(),
                ))
            }
            Expectation::Truthy {
                expression,
                description,
            } => {
                let value = page.evaluate(expression).await?;
                let ok = is_truthy(&value);
                Ok(Outcome::compare(
                    description.clone(),
                    ok,
                    value.to_string(),
                    "truthy".to_string(),
                ))
            }
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::CountEquals { selector, expected } => {
                write!(f, "count of '{selector}' == {expected}")
            }
            Expectation::CountAtLeast { selector, min } => {
                write!(f, "count of '{selector}' >= {min}")
            }
            Expectation::TextEquals { selector, expected } => {
                write!(f, "text of '{selector}' == \"{expected}\"")
            }
            Expectation::TextMatchesCapture { selector, capture } => {
                write!(f, "text of '{selector}' matches capture '{capture}'")
            }
            Expectation::Truthy { description, .. } => f.write_str(description),
        }
    }
}

/// A labeled step with its abort policy.
///
/// `fatal` decides what a *step error* (timeout, failed interaction, failed
/// capture) does: fatal steps abort the scenario as erred, non-fatal steps
/// record a failed outcome and let the run continue. Assertion mismatches
/// never abort regardless of this flag.
#[derive(Debug, Clone)]
pub struct Step {
    pub label: String,
    pub action: StepAction,
    pub fatal: bool,
}

impl Step {
    fn new(label: impl Into<String>, action: StepAction) -> Self {
        Self {
            label: label.into(),
            action,
            fatal: false,
        }
    }

    pub fn navigate(label: impl Into<String>, url: Url) -> Self {
        Self::new(label, StepAction::Navigate { url })
    }

    pub fn wait_for(label: impl Into<String>, condition: Condition, timeout: Duration) -> Self {
        Self::new(label, StepAction::WaitFor { condition, timeout })
    }

    pub fn fill(label: impl Into<String>, selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(
            label,
            StepAction::Fill {
                selector: selector.into(),
                text: text.into(),
            },
        )
    }

    pub fn click(label: impl Into<String>, selector: impl Into<String>) -> Self {
        Self::new(
            label,
            StepAction::Click {
                selector: selector.into(),
            },
        )
    }

    pub fn evaluate(label: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(
            label,
            StepAction::Evaluate {
                expression: expression.into(),
            },
        )
    }

    pub fn capture(label: impl Into<String>, kind: CaptureKind) -> Self {
        Self::new(label, StepAction::Capture { kind })
    }

    pub fn screenshot(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::capture(label, CaptureKind::Screenshot { path: path.into() })
    }

    pub fn assert(label: impl Into<String>, expect: Expectation) -> Self {
        Self::new(label, StepAction::Assert { expect })
    }

    pub fn pause(label: impl Into<String>, duration: Duration) -> Self {
        Self::new(label, StepAction::Pause { duration })
    }

    /// Mark this step load-bearing: an error here aborts the scenario.
    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockPage;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn steps_default_to_non_fatal() {
        let step = Step::click("open first place", ".place-item");
        assert!(!step.fatal);
        assert!(step.fatal().fatal);
    }

    #[tokio::test]
    async fn count_equals_reports_observed_and_expected() {
        let page = MockPage::new();
        page.set_count(".marker", 3);

        let expect = Expectation::CountEquals {
            selector: ".marker".into(),
            expected: 1,
        };
        match expect.check(&page, &[]).await.unwrap() {
            Outcome::Fail {
                observed, expected, ..
            } => {
                assert_eq!(observed, "3");
                assert_eq!(expected, "1");
            }
            Outcome::Pass => panic!("expected a mismatch"),
        }
    }

    #[tokio::test]
    async fn text_matches_capture_compares_against_earlier_snapshot() {
        let page = MockPage::new();
        page.set_text("#detail-view h2", "El Xampanyet");

        let captures = vec![CapturedState {
            step: "first place name".into(),
            value: CapturedValue::Text("El Xampanyet".into()),
            captured_at: Utc::now(),
        }];

        let expect = Expectation::TextMatchesCapture {
            selector: "#detail-view h2".into(),
            capture: "first place name".into(),
        };
        assert!(matches!(
            expect.check(&page, &captures).await.unwrap(),
            Outcome::Pass
        ));
    }

    #[tokio::test]
    async fn text_matches_capture_without_the_capture_is_an_error() {
        let page = MockPage::new();
        page.set_text("#detail-view h2", "El Xampanyet");

        let expect = Expectation::TextMatchesCapture {
            selector: "#detail-view h2".into(),
            capture: "first place name".into(),
        };
        let err = expect.check(&page, &[]).await.unwrap_err();
        assert!(matches!(err, CheckError::Capture(_)));
    }

    #[tokio::test]
    async fn truthy_expectation_uses_the_description_in_reports() {
        let page = MockPage::new();
        page.set_eval("window.__INITIAL_STATE__", json!(null));

        let expect = Expectation::Truthy {
            expression: "window.__INITIAL_STATE__".into(),
            description: "injected initial state present".into(),
        };
        match expect.check(&page, &[]).await.unwrap() {
            Outcome::Fail { description, .. } => {
                assert_eq!(description, "injected initial state present");
            }
            Outcome::Pass => panic!("expected a mismatch"),
        }
    }
}
