//! The verification flows this tool ships, as thin configuration over the
//! core runner. Selectors, timeouts, and screenshot names follow the map
//! application's current UI.

use std::path::Path;
use std::time::Duration;

use url::Url;

use mapcheck_core::capture::CaptureKind;
use mapcheck_core::condition::Condition;
use mapcheck_core::scenario::{Scenario, Viewport};
use mapcheck_core::step::{Expectation, Step};

const LOAD_TIMEOUT: Duration = Duration::from_secs(10);
/// The clustering view loads places incrementally; give it longer.
const INCREMENTAL_LOAD_TIMEOUT: Duration = Duration::from_secs(15);
/// Map pan/zoom fetches are debounced; there is no observable completion
/// signal, so these flows fall back to a bounded pause.
const REFETCH_SETTLE: Duration = Duration::from_secs(2);

fn exists(selector: &str) -> Condition {
    Condition::Exists {
        selector: selector.into(),
    }
}

fn visible(selector: &str) -> Condition {
    Condition::Visible {
        selector: selector.into(),
    }
}

fn at_least(selector: &str, min: usize) -> Condition {
    Condition::CountAtLeast {
        selector: selector.into(),
        min,
    }
}

/// Navigate to the application root and verify at least one place renders.
pub fn initial_load(url: Url) -> Scenario {
    Scenario::new("initial load", url)
        .step(Step::wait_for("map container renders", visible("#map"), LOAD_TIMEOUT).fatal())
        .step(Step::wait_for("places load", at_least(".place-item", 1), LOAD_TIMEOUT).fatal())
        .step(Step::assert(
            "at least one place listed",
            Expectation::CountAtLeast {
                selector: ".place-item".into(),
                min: 1,
            },
        ))
}

/// Search for a term and verify the marker set narrows to the expected
/// count. A count mismatch is recorded, not fatal — seed data drifts.
pub fn search_filter(url: Url, term: &str, expected: usize, shots: &Path) -> Scenario {
    Scenario::new("search filter", url)
        .step(Step::wait_for("map container renders", visible("#map"), LOAD_TIMEOUT).fatal())
        .step(Step::wait_for("markers appear", at_least(".marker", 1), LOAD_TIMEOUT).fatal())
        .step(Step::fill("enter search term", "#search-input", term))
        .step(Step::click("trigger search", "#search-btn"))
        .step(Step::pause("search fetch and re-render", REFETCH_SETTLE))
        .step(Step::assert(
            "search narrowed the results",
            Expectation::CountEquals {
                selector: ".marker".into(),
                expected,
            },
        ))
        .step(Step::screenshot("map after search", shots.join("map_page.png")))
}

/// Click the first list item and verify the detail panel heading matches
/// the clicked item's name. Also covers the sidebar checks: sidebar
/// visible, expected category names somewhere in the page.
pub fn item_detail(url: Url, bounds: Viewport) -> Scenario {
    Scenario::new("item detail", url)
        .with_viewport(bounds)
        .step(Step::wait_for("sidebar renders", visible("#sidebar"), LOAD_TIMEOUT).fatal())
        .step(
            Step::wait_for(
                "places load",
                at_least("#list-view .place-item", 1),
                LOAD_TIMEOUT,
            )
            .fatal(),
        )
        .step(Step::assert(
            "new category names present",
            Expectation::Truthy {
                expression: "['shopping', 'wellness', 'education', 'family']\
                             .some(c => document.body.innerText.toLowerCase().includes(c))"
                    .into(),
                description: "new category names present in page text".into(),
            },
        ))
        .step(Step::capture(
            "first place name",
            CaptureKind::Text {
                selector: ".place-item h3".into(),
            },
        ))
        .step(Step::click("open first place", ".place-item"))
        .step(Step::wait_for("detail panel opens", visible("#detail-view"), Duration::from_secs(5)).fatal())
        .step(Step::assert(
            "detail heading matches selection",
            Expectation::TextMatchesCapture {
                selector: "#detail-view h2".into(),
                capture: "first place name".into(),
            },
        ))
}

/// Pan the map via the application's own handle and verify the
/// viewport-triggered refetch completes without errors.
pub fn viewport_refetch(url: Url, bounds: Viewport, shots: &Path) -> Scenario {
    Scenario::new("viewport refetch", url)
        .with_viewport(bounds)
        .step(
            Step::wait_for(
                "initial data loads",
                at_least("#list-view .place-item", 1),
                LOAD_TIMEOUT,
            )
            .fatal(),
        )
        .step(Step::screenshot(
            "initial view",
            shots.join("map_step1_initial.png"),
        ))
        .step(Step::evaluate(
            "pan map east",
            "map.flyTo({ center: [1.54, 42.51], zoom: 14 })",
        ))
        .step(Step::pause("moveend debounce and fetch", REFETCH_SETTLE))
        .step(Step::screenshot(
            "panned view",
            shots.join("map_step2_panned.png"),
        ))
}

/// Zoom out far enough that markers collapse into clusters, capturing
/// before and after for visual review.
pub fn clustering(url: Url, shots: &Path) -> Scenario {
    Scenario::new("clustering", url)
        .step(Step::wait_for("map container renders", exists("#map"), LOAD_TIMEOUT).fatal())
        .step(
            Step::wait_for(
                "places load incrementally",
                at_least(".place-item", 1),
                INCREMENTAL_LOAD_TIMEOUT,
            )
            .fatal(),
        )
        .step(Step::screenshot(
            "initial view",
            shots.join("clustering_step1_initial.png"),
        ))
        .step(Step::evaluate(
            "zoom out to cluster level",
            "map.flyTo({ center: [1.52, 42.50], zoom: 10 })",
        ))
        .step(Step::pause("cluster re-render", Duration::from_secs(3)))
        .step(Step::screenshot(
            "zoomed-out view",
            shots.join("clustering_step2_zoomed_out.png"),
        ))
}

/// Dump the injected initial state (view bounds and loaded feature count)
/// and capture a screenshot for manual review.
pub fn snapshot(url: Url, shots: &Path) -> Scenario {
    Scenario::new("state snapshot", url)
        .step(Step::pause("initial fetch settles", Duration::from_secs(3)))
        .step(Step::assert(
            "initial state injected",
            Expectation::Truthy {
                expression: "window.__INITIAL_STATE__".into(),
                description: "injected initial state present".into(),
            },
        ))
        .step(Step::capture(
            "initial view",
            CaptureKind::Json {
                expression: "window.__INITIAL_STATE__ && window.__INITIAL_STATE__.view".into(),
            },
        ))
        .step(Step::capture(
            "loaded feature count",
            CaptureKind::Json {
                expression: "window.__INITIAL_STATE__ \
                             && window.__INITIAL_STATE__.places.features.length"
                    .into(),
            },
        ))
        .step(Step::screenshot(
            "current map",
            shots.join("map_catalonia.png"),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapcheck_core::step::StepAction;

    fn root() -> Url {
        Url::parse("http://localhost:8000").unwrap()
    }

    fn bounds() -> Viewport {
        Viewport {
            min_lat: 42.50,
            min_lon: 1.52,
            max_lat: 42.52,
            max_lon: 1.53,
        }
    }

    fn all() -> Vec<Scenario> {
        let shots = Path::new("verification");
        vec![
            initial_load(root()),
            search_filter(root(), "tapas", 1, shots),
            item_detail(root(), bounds()),
            viewport_refetch(root(), bounds(), shots),
            clustering(root(), shots),
            snapshot(root(), shots),
        ]
    }

    #[test]
    fn every_wait_and_pause_is_bounded() {
        for scenario in all() {
            for step in &scenario.steps {
                match &step.action {
                    StepAction::WaitFor { timeout, .. } => {
                        assert!(
                            !timeout.is_zero(),
                            "{}/{} has a zero wait timeout",
                            scenario.name,
                            step.label
                        );
                    }
                    StepAction::Pause { duration } => {
                        assert!(
                            *duration <= Duration::from_secs(5),
                            "{}/{} pauses suspiciously long",
                            scenario.name,
                            step.label
                        );
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn setup_waits_are_fatal_and_assertions_are_not() {
        for scenario in all() {
            for step in &scenario.steps {
                if matches!(step.action, StepAction::Assert { .. }) {
                    assert!(
                        !step.fatal,
                        "{}/{}: assertions must record, not abort",
                        scenario.name,
                        step.label
                    );
                }
            }
            // Each scenario that waits marks its first wait load-bearing.
            if let Some(first_wait) = scenario
                .steps
                .iter()
                .find(|s| matches!(s.action, StepAction::WaitFor { .. }))
            {
                assert!(first_wait.fatal, "{}: setup wait not fatal", scenario.name);
            }
        }
    }

    #[test]
    fn detail_scenario_encodes_the_seeded_viewport() {
        let scenario = item_detail(root(), bounds());
        let url = scenario.target_url();
        assert!(url.as_str().contains("minLat=42.5"));
        assert!(url.as_str().contains("maxLon=1.53"));
    }

    #[test]
    fn screenshots_land_in_the_given_directory() {
        let scenario = clustering(root(), Path::new("out/shots"));
        let screenshots: Vec<_> = scenario
            .steps
            .iter()
            .filter_map(|s| match &s.action {
                StepAction::Capture {
                    kind: CaptureKind::Screenshot { path },
                } => Some(path.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(screenshots.len(), 2);
        assert!(screenshots.iter().all(|p| p.starts_with("out/shots")));
    }
}
