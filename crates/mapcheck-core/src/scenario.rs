use url::Url;

use crate::error::CheckError;
use crate::step::Step;

/// Geographic bounds encoded into the target URL as query parameters, so a
/// scenario can start the application on a known view.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl Viewport {
    /// Append the bounds as `minLat`/`minLon`/`maxLat`/`maxLon` query
    /// parameters — the format the application reads its initial view from.
    pub fn apply(&self, url: &mut Url) {
        url.query_pairs_mut()
            .append_pair("minLat", &self.min_lat.to_string())
            .append_pair("minLon", &self.min_lon.to_string())
            .append_pair("maxLat", &self.max_lat.to_string())
            .append_pair("maxLon", &self.max_lon.to_string());
    }
}

/// One named end-to-end verification flow: a target URL, an optional
/// starting viewport, and an ordered list of steps. Transient — built at
/// invocation, discarded with the run; never persisted.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub base_url: Url,
    pub viewport: Option<Viewport>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            base_url,
            viewport: None,
            steps: Vec::new(),
        }
    }

    /// Build a scenario from an unparsed URL string.
    pub fn parse(name: impl Into<String>, base_url: &str) -> Result<Self, CheckError> {
        Ok(Self::new(name, Url::parse(base_url)?))
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// The URL the runner navigates to on start, viewport applied.
    pub fn target_url(&self) -> Url {
        let mut url = self.base_url.clone();
        if let Some(viewport) = &self.viewport {
            viewport.apply(&mut url);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_encodes_bounds_as_query_params() {
        let scenario = Scenario::parse("item detail", "http://localhost:8000")
            .unwrap()
            .with_viewport(Viewport {
                min_lat: 42.50,
                min_lon: 1.52,
                max_lat: 42.52,
                max_lon: 1.53,
            });

        let url = scenario.target_url();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/?minLat=42.5&minLon=1.52&maxLat=42.52&maxLon=1.53"
        );
    }

    #[test]
    fn test_target_url_without_viewport_is_the_base() {
        let scenario = Scenario::parse("initial load", "http://localhost:8000").unwrap();
        assert_eq!(scenario.target_url().as_str(), "http://localhost:8000/");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = Scenario::parse("bad", "not a url").unwrap_err();
        assert!(matches!(err, CheckError::Url(_)));
    }
}
