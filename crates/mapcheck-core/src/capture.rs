//! State capturer: read-only extraction of observable page state.
//!
//! Capturing is idempotent — two captures with no intervening interaction
//! yield the same result. Callers are expected to have already waited for
//! presence via [`crate::wait`]; a missing target here is a
//! [`CheckError::Capture`], not a timeout.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::CheckError;
use crate::traits::PageDriver;

/// What to extract from the page.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CaptureKind {
    /// Number of elements matching a selector.
    Count { selector: String },
    /// Inner text of the first element matching a selector.
    Text { selector: String },
    /// Structured value of a page expression (e.g. injected application
    /// state such as current view bounds or a loaded feature count).
    Json { expression: String },
    /// Screenshot written to a caller-given path.
    Screenshot { path: PathBuf },
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureKind::Count { selector } => write!(f, "count of '{selector}'"),
            CaptureKind::Text { selector } => write!(f, "text of '{selector}'"),
            CaptureKind::Json { expression } => write!(f, "value of `{expression}`"),
            CaptureKind::Screenshot { path } => write!(f, "screenshot to {}", path.display()),
        }
    }
}

/// A captured value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum CapturedValue {
    Count(usize),
    Text(String),
    Json(serde_json::Value),
    Screenshot(PathBuf),
}

/// One snapshot of observable state, tagged with the step that produced it.
/// Immutable once captured; owned by the result for the rest of the run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CapturedState {
    /// Label of the capture step that produced this snapshot.
    pub step: String,
    pub value: CapturedValue,
    pub captured_at: DateTime<Utc>,
}

/// Perform one capture against the page.
pub async fn capture<P: PageDriver>(
    page: &P,
    kind: &CaptureKind,
) -> Result<CapturedValue, CheckError> {
    match kind {
        CaptureKind::Count { selector } => Ok(CapturedValue::Count(page.count(selector).await?)),
        CaptureKind::Text { selector } => Ok(CapturedValue::Text(page.text(selector).await?)),
        CaptureKind::Json { expression } => {
            Ok(CapturedValue::Json(page.evaluate(expression).await?))
        }
        CaptureKind::Screenshot { path } => {
            Ok(CapturedValue::Screenshot(page.screenshot(path).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockPage;
    use serde_json::json;

    #[tokio::test]
    async fn count_capture_is_idempotent() {
        let page = MockPage::new();
        page.set_count(".place-item", 7);

        let kind = CaptureKind::Count {
            selector: ".place-item".into(),
        };
        let first = capture(&page, &kind).await.unwrap();
        let second = capture(&page, &kind).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, CapturedValue::Count(7));
    }

    #[tokio::test]
    async fn text_capture_of_absent_element_is_a_capture_error() {
        let page = MockPage::new();
        let err = capture(
            &page,
            &CaptureKind::Text {
                selector: "#detail-view h2".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CheckError::Capture(_)));
    }

    #[tokio::test]
    async fn json_capture_returns_structured_state() {
        let page = MockPage::new();
        page.set_eval(
            "window.__INITIAL_STATE__.view",
            json!({"zoom": 13, "center": [1.52, 42.50]}),
        );

        let value = capture(
            &page,
            &CaptureKind::Json {
                expression: "window.__INITIAL_STATE__.view".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(
            value,
            CapturedValue::Json(json!({"zoom": 13, "center": [1.52, 42.50]}))
        );
    }

    #[tokio::test]
    async fn screenshot_capture_returns_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("map_page.png");

        let page = MockPage::new();
        let value = capture(
            &page,
            &CaptureKind::Screenshot {
                path: target.clone(),
            },
        )
        .await
        .unwrap();
        assert_eq!(value, CapturedValue::Screenshot(target.clone()));
        assert_eq!(page.screenshots(), vec![target]);
    }
}
