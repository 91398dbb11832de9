use std::fmt;

use crate::error::CheckError;
use crate::traits::PageDriver;

/// A predicate over live page state, polled by the wait evaluator until it
/// holds or a deadline elapses.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Condition {
    /// At least one element matches the selector.
    Exists { selector: String },
    /// At least `min` elements match the selector.
    CountAtLeast { selector: String, min: usize },
    /// The first matching element exists and is rendered visible.
    Visible { selector: String },
    /// The first matching element's text equals `expected`.
    TextEquals { selector: String, expected: String },
    /// A page expression evaluates to a truthy value.
    Truthy { expression: String },
}

impl Condition {
    /// Evaluate the condition once against the page.
    ///
    /// A missing element means "not yet true", never an error — probing must
    /// be safe when the target never appears (application not started,
    /// selector changed, data empty).
    pub async fn probe<P: PageDriver>(&self, page: &P) -> Result<bool, CheckError> {
        match self {
            Condition::Exists { selector } => Ok(page.count(selector).await? >= 1),
            Condition::CountAtLeast { selector, min } => Ok(page.count(selector).await? >= *min),
            Condition::Visible { selector } => page.is_visible(selector).await,
            Condition::TextEquals { selector, expected } => match page.text(selector).await {
                Ok(text) => Ok(text == *expected),
                Err(CheckError::Capture(_)) => Ok(false),
                Err(e) => Err(e),
            },
            Condition::Truthy { expression } => {
                Ok(is_truthy(&page.evaluate(expression).await?))
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Exists { selector } => write!(f, "element '{selector}' present"),
            Condition::CountAtLeast { selector, min } => {
                write!(f, "at least {min} '{selector}' elements")
            }
            Condition::Visible { selector } => write!(f, "element '{selector}' visible"),
            Condition::TextEquals { selector, expected } => {
                write!(f, "text of '{selector}' equals \"{expected}\"")
            }
            Condition::Truthy { expression } => write!(f, "expression `{expression}` truthy"),
        }
    }
}

/// JavaScript-style truthiness over a JSON value.
pub fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockPage;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(3)));
        assert!(is_truthy(&json!("tapas")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({"view": {}})));
    }

    #[test]
    fn test_display_names_the_target() {
        let c = Condition::CountAtLeast {
            selector: ".place-item".into(),
            min: 1,
        };
        assert_eq!(c.to_string(), "at least 1 '.place-item' elements");

        let c = Condition::Visible {
            selector: "#detail-view".into(),
        };
        assert_eq!(c.to_string(), "element '#detail-view' visible");
    }

    #[tokio::test]
    async fn probe_counts_against_live_state() {
        let page = MockPage::new();
        let cond = Condition::Exists {
            selector: ".marker".into(),
        };
        assert!(!cond.probe(&page).await.unwrap());

        page.set_count(".marker", 4);
        assert!(cond.probe(&page).await.unwrap());
    }

    #[tokio::test]
    async fn probe_text_equals_treats_absent_as_not_yet() {
        let page = MockPage::new();
        let cond = Condition::TextEquals {
            selector: "#detail-view h2".into(),
            expected: "El Xampanyet".into(),
        };
        // No such element yet: not met, but not an error either.
        assert!(!cond.probe(&page).await.unwrap());

        page.set_text("#detail-view h2", "El Xampanyet");
        assert!(cond.probe(&page).await.unwrap());
    }

    #[tokio::test]
    async fn probe_truthy_evaluates_in_page() {
        let page = MockPage::new();
        let cond = Condition::Truthy {
            expression: "window.__INITIAL_STATE__".into(),
        };
        assert!(!cond.probe(&page).await.unwrap());

        page.set_eval("window.__INITIAL_STATE__", json!({"view": {"zoom": 13}}));
        assert!(cond.probe(&page).await.unwrap());
    }
}
