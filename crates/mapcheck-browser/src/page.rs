use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use mapcheck_core::error::CheckError;
use mapcheck_core::traits::PageDriver;

/// One browser tab, driven over CDP.
///
/// Cheap to clone (the underlying page handle is reference-counted); the
/// runner still closes each page exactly once at scenario end.
#[derive(Clone)]
pub struct ChromiumPage {
    page: Page,
    nav_timeout: Duration,
}

impl ChromiumPage {
    pub(crate) fn new(page: Page, nav_timeout: Duration) -> Self {
        Self { page, nav_timeout }
    }

    /// Quote a selector for safe embedding into a page expression.
    fn quoted(selector: &str) -> String {
        serde_json::Value::String(selector.to_string()).to_string()
    }
}

impl PageDriver for ChromiumPage {
    async fn navigate(&self, url: &str) -> Result<(), CheckError> {
        let result = tokio::time::timeout(self.nav_timeout, async {
            self.page
                .goto(url)
                .await
                .map_err(|e| CheckError::Interaction(format!("failed to navigate to {url}: {e}")))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| CheckError::Interaction(format!("page load did not settle: {e}")))?;
            Ok::<(), CheckError>(())
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => Err(CheckError::Interaction(format!(
                "navigation to {url} timed out after {} s",
                self.nav_timeout.as_secs()
            ))),
        }
    }

    async fn count(&self, selector: &str) -> Result<usize, CheckError> {
        let expr = format!("document.querySelectorAll({}).length", Self::quoted(selector));
        let result = self
            .page
            .evaluate(expr)
            .await
            .map_err(|e| CheckError::Capture(format!("count of '{selector}' failed: {e}")))?;
        result
            .value()
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .ok_or_else(|| CheckError::Capture(format!("count of '{selector}' returned no number")))
    }

    async fn text(&self, selector: &str) -> Result<String, CheckError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| CheckError::Capture(format!("no element matching '{selector}': {e}")))?;
        let text = element
            .inner_text()
            .await
            .map_err(|e| CheckError::Capture(format!("text of '{selector}' failed: {e}")))?;
        Ok(text.unwrap_or_default().trim().to_string())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, CheckError> {
        // Visible means present and occupying layout space, the same check
        // the application's own tests rely on.
        let expr = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; \
             const r = el.getBoundingClientRect(); return r.width > 0 && r.height > 0; }})()",
            Self::quoted(selector)
        );
        let result = self
            .page
            .evaluate(expr)
            .await
            .map_err(|e| CheckError::Capture(format!("visibility of '{selector}' failed: {e}")))?;
        Ok(result.value().and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), CheckError> {
        let element = self.page.find_element(selector).await.map_err(|e| {
            CheckError::Interaction(format!("input '{selector}' not found: {e}"))
        })?;
        // Click to focus, then type.
        element
            .click()
            .await
            .map_err(|e| CheckError::Interaction(format!("failed to focus '{selector}': {e}")))?;
        element
            .type_str(text)
            .await
            .map_err(|e| CheckError::Interaction(format!("failed to type into '{selector}': {e}")))?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), CheckError> {
        let element = self.page.find_element(selector).await.map_err(|e| {
            CheckError::Interaction(format!("no element matching '{selector}': {e}"))
        })?;
        element
            .click()
            .await
            .map_err(|e| CheckError::Interaction(format!("click on '{selector}' failed: {e}")))?;
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, CheckError> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| CheckError::Interaction(format!("evaluate failed: {e}")))?;
        // `undefined` has no JSON value; map it to null.
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self, path: &Path) -> Result<PathBuf, CheckError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.page
            .save_screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
                path,
            )
            .await
            .map_err(|e| {
                CheckError::Capture(format!("screenshot to {} failed: {e}", path.display()))
            })?;
        Ok(path.to_path_buf())
    }

    async fn close(&self) -> Result<(), CheckError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| CheckError::Generic(format!("failed to close page: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_quoting_survives_embedded_quotes() {
        assert_eq!(ChromiumPage::quoted(".place-item"), "\".place-item\"");
        assert_eq!(
            ChromiumPage::quoted("a[title=\"x\"]"),
            "\"a[title=\\\"x\\\"]\""
        );
    }
}
