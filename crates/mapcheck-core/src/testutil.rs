//! Test utilities: a scripted in-memory [`PageDriver`].
//!
//! Handwritten mock for dependency injection in unit tests. State lives
//! behind `Arc<Mutex<_>>` for interior mutability, so tests can mutate the
//! simulated page mid-run and assert on recorded calls afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::CheckError;
use crate::traits::PageDriver;

#[derive(Default)]
struct MockPageState {
    /// Per-selector count script. More than one entry means the count
    /// changes across probes (element appearing after an async load): each
    /// probe pops the front until one value remains, which then sticks.
    counts: HashMap<String, Vec<usize>>,
    texts: HashMap<String, String>,
    visible: HashMap<String, bool>,
    eval_results: HashMap<String, serde_json::Value>,
    /// One-shot injected failures, keyed by operation name
    /// (`navigate`, `count`, `text`, `fill`, `click`, `evaluate`, `screenshot`).
    errors: HashMap<&'static str, CheckError>,

    navigations: Vec<String>,
    fills: Vec<(String, String)>,
    clicks: Vec<String>,
    evaluated: Vec<String>,
    screenshots: Vec<PathBuf>,
    close_calls: usize,
}

impl MockPageState {
    fn take_error(&mut self, op: &'static str) -> Result<(), CheckError> {
        match self.errors.remove(op) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Scripted page for tests. No browser, no I/O — screenshots are recorded,
/// not written.
#[derive(Clone, Default)]
pub struct MockPage {
    inner: Arc<Mutex<MockPageState>>,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the match count for a selector.
    pub fn set_count(&self, selector: &str, count: usize) {
        self.inner
            .lock()
            .unwrap()
            .counts
            .insert(selector.to_string(), vec![count]);
    }

    /// Script a sequence of counts, one per probe; the last value sticks.
    pub fn count_sequence(&self, selector: &str, counts: Vec<usize>) {
        self.inner
            .lock()
            .unwrap()
            .counts
            .insert(selector.to_string(), counts);
    }

    pub fn set_text(&self, selector: &str, text: &str) {
        self.inner
            .lock()
            .unwrap()
            .texts
            .insert(selector.to_string(), text.to_string());
    }

    pub fn set_visible(&self, selector: &str, visible: bool) {
        self.inner
            .lock()
            .unwrap()
            .visible
            .insert(selector.to_string(), visible);
    }

    pub fn set_eval(&self, expression: &str, value: serde_json::Value) {
        self.inner
            .lock()
            .unwrap()
            .eval_results
            .insert(expression.to_string(), value);
    }

    /// Make the next call of `op` fail with `error` (one-shot).
    pub fn fail_on(&self, op: &'static str, error: CheckError) {
        self.inner.lock().unwrap().errors.insert(op, error);
    }

    pub fn navigations(&self) -> Vec<String> {
        self.inner.lock().unwrap().navigations.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().fills.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.inner.lock().unwrap().clicks.clone()
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.inner.lock().unwrap().evaluated.clone()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.inner.lock().unwrap().screenshots.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.inner.lock().unwrap().close_calls
    }
}

impl PageDriver for MockPage {
    async fn navigate(&self, url: &str) -> Result<(), CheckError> {
        let mut state = self.inner.lock().unwrap();
        state.take_error("navigate")?;
        state.navigations.push(url.to_string());
        Ok(())
    }

    async fn count(&self, selector: &str) -> Result<usize, CheckError> {
        let mut state = self.inner.lock().unwrap();
        state.take_error("count")?;
        match state.counts.get_mut(selector) {
            Some(script) if script.len() > 1 => Ok(script.remove(0)),
            Some(script) => Ok(script[0]),
            None => Ok(0),
        }
    }

    async fn text(&self, selector: &str) -> Result<String, CheckError> {
        let mut state = self.inner.lock().unwrap();
        state.take_error("text")?;
        state
            .texts
            .get(selector)
            .cloned()
            .ok_or_else(|| CheckError::Capture(format!("no element matching '{selector}'")))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, CheckError> {
        let state = self.inner.lock().unwrap();
        Ok(state.visible.get(selector).copied().unwrap_or(false))
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), CheckError> {
        let mut state = self.inner.lock().unwrap();
        state.take_error("fill")?;
        state.fills.push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), CheckError> {
        let mut state = self.inner.lock().unwrap();
        state.take_error("click")?;
        state.clicks.push(selector.to_string());
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, CheckError> {
        let mut state = self.inner.lock().unwrap();
        state.take_error("evaluate")?;
        state.evaluated.push(expression.to_string());
        Ok(state
            .eval_results
            .get(expression)
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self, path: &Path) -> Result<PathBuf, CheckError> {
        let mut state = self.inner.lock().unwrap();
        state.take_error("screenshot")?;
        state.screenshots.push(path.to_path_buf());
        Ok(path.to_path_buf())
    }

    async fn close(&self) -> Result<(), CheckError> {
        self.inner.lock().unwrap().close_calls += 1;
        Ok(())
    }
}
