use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::CheckError;

/// Capability surface the runner needs from a live browser page.
///
/// The core depends only on this trait, never on a specific automation
/// engine. `mapcheck-browser` implements it over the Chrome DevTools
/// Protocol; [`crate::testutil::MockPage`] provides a scripted in-memory
/// implementation for tests.
///
/// Read-only probes (`count`, `text`, `is_visible`, `evaluate`) must be
/// safe to call when the target element never appears — a missing element
/// is an expected state during polling, not a crash.
pub trait PageDriver: Send + Sync + Clone {
    /// Navigate the page to a URL and wait for the load to settle.
    fn navigate(&self, url: &str) -> impl Future<Output = Result<(), CheckError>> + Send;

    /// Number of elements currently matching a CSS selector. Zero when absent.
    fn count(&self, selector: &str) -> impl Future<Output = Result<usize, CheckError>> + Send;

    /// Inner text of the first element matching a selector.
    /// Fails with [`CheckError::Capture`] if no element matches.
    fn text(&self, selector: &str) -> impl Future<Output = Result<String, CheckError>> + Send;

    /// Whether the first matching element exists and occupies layout space.
    fn is_visible(&self, selector: &str) -> impl Future<Output = Result<bool, CheckError>> + Send;

    /// Type text into the first element matching a selector.
    fn fill(
        &self,
        selector: &str,
        text: &str,
    ) -> impl Future<Output = Result<(), CheckError>> + Send;

    /// Click the first element matching a selector.
    fn click(&self, selector: &str) -> impl Future<Output = Result<(), CheckError>> + Send;

    /// Evaluate an expression in the page's execution context and return its
    /// value. `undefined` results map to `serde_json::Value::Null`.
    fn evaluate(
        &self,
        expression: &str,
    ) -> impl Future<Output = Result<serde_json::Value, CheckError>> + Send;

    /// Write a PNG screenshot of the current viewport to `path` and return
    /// the path written.
    fn screenshot(&self, path: &Path) -> impl Future<Output = Result<PathBuf, CheckError>> + Send;

    /// Release the underlying page resource. Called exactly once by the
    /// runner on every exit path.
    fn close(&self) -> impl Future<Output = Result<(), CheckError>> + Send;
}
