//! Behavioural coverage for the end-to-end site scoring pipeline.

use std::cell::RefCell;

use chargesite_core::test_support::{
    SAMPLE_LAT, SAMPLE_LON, StubElementSource, StubPoiCountSource, sample_ring,
};
use chargesite_core::{
    FeatureEngine, OsmElement, PipelineError, PoiCategory, PoiCounts, RawFeatureSnapshot,
    ScoreResult, ScoringConfig, ScoringEngine, SiteRequest, SiteScorer, WeightOverrides,
};
use chargesite_core::geometry::EARTH_RADIUS_METERS;
use chargesite_core::request::PointInput;
use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio_util::sync::CancellationToken;

/// World state shared by the steps of one scenario.
#[derive(Debug, Default)]
struct ScoringWorld {
    request: RefCell<Option<SiteRequest>>,
    elements: RefCell<Vec<OsmElement>>,
    enrichment: RefCell<Option<PoiCounts>>,
    snapshot: RefCell<RawFeatureSnapshot>,
    outcome: RefCell<Option<Result<ScoreResult, PipelineError>>>,
}

#[fixture]
fn world() -> ScoringWorld {
    ScoringWorld::default()
}

fn base_request() -> SiteRequest {
    SiteRequest {
        polygon: sample_ring(),
        point: PointInput {
            lat: SAMPLE_LAT,
            lon: SAMPLE_LON,
        },
        radius_meters: None,
        weights: None,
    }
}

fn north_of_sample(meters: f64) -> Coord<f64> {
    Coord {
        x: SAMPLE_LON,
        y: SAMPLE_LAT + meters / (EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0),
    }
}

#[expect(clippy::expect_used, reason = "runtime construction failure aborts the test")]
fn evaluate(
    request: SiteRequest,
    elements: Vec<OsmElement>,
    enrichment: Option<PoiCounts>,
) -> Result<ScoreResult, PipelineError> {
    let enrichment = enrichment.map_or_else(StubPoiCountSource::unavailable, StubPoiCountSource::available);
    let scorer = SiteScorer::new(
        ScoringConfig::default(),
        StubElementSource::with_elements(elements),
        enrichment,
    );
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("build runtime")
        .block_on(scorer.evaluate(request, &CancellationToken::new()))
}

#[expect(clippy::expect_used, reason = "steps require a successful outcome")]
fn with_result<T>(world: &ScoringWorld, check: impl FnOnce(&ScoreResult) -> T) -> T {
    let outcome = world.outcome.borrow();
    let result = outcome
        .as_ref()
        .expect("outcome should be recorded")
        .as_ref()
        .expect("scoring should succeed");
    check(result)
}

// --- Given steps ---

#[given("a site request without overrides")]
fn request_without_overrides(world: &ScoringWorld) {
    world.request.replace(Some(base_request()));
}

#[given("a site request with every weight override set to zero")]
fn request_with_zero_overrides(world: &ScoringWorld) {
    let request = SiteRequest {
        weights: Some(WeightOverrides {
            demography: Some(0.0),
            traffic: Some(0.0),
            poi: Some(0.0),
            competition: Some(0.0),
            grid: Some(0.0),
            accessibility: Some(0.0),
        }),
        ..base_request()
    };
    world.request.replace(Some(request));
}

#[given("a site request with latitude {lat}")]
fn request_with_latitude(world: &ScoringWorld, lat: f64) {
    let mut request = base_request();
    request.point.lat = lat;
    world.request.replace(Some(request));
}

#[given("a collapsed site request with a {radius} metre radius")]
fn collapsed_request(world: &ScoringWorld, radius: f64) {
    let request = SiteRequest {
        polygon: vec![[SAMPLE_LON, SAMPLE_LAT]; 4],
        radius_meters: Some(radius),
        ..base_request()
    };
    world.request.replace(Some(request));
}

#[given("a fallback provider returning a supermarket")]
fn fallback_with_supermarket(world: &ScoringWorld) {
    world.elements.replace(vec![OsmElement::node(
        1,
        north_of_sample(50.0),
        [("shop", "supermarket")],
    )]);
}

#[given("a fallback provider returning a one kilometre motorway")]
fn fallback_with_motorway(world: &ScoringWorld) {
    world.elements.replace(vec![OsmElement::way(
        1,
        vec![north_of_sample(0.0), north_of_sample(1_000.0)],
        [("highway", "motorway")],
    )]);
}

#[given("an enrichment provider returning POI counts")]
fn enrichment_available(world: &ScoringWorld) {
    world.enrichment.replace(Some(PoiCounts::from([
        (PoiCategory::Mall, 2),
        (PoiCategory::Office, 9),
    ])));
}

#[given("an unavailable enrichment provider")]
fn enrichment_unavailable(world: &ScoringWorld) {
    world.enrichment.replace(None);
}

#[given("a raw snapshot with competition gravity {gravity}")]
fn snapshot_with_competition(world: &ScoringWorld, gravity: f64) {
    world.snapshot.replace(RawFeatureSnapshot {
        competition_gravity: gravity,
        accessibility_meters: 200.0,
        ..RawFeatureSnapshot::default()
    });
}

// --- When steps ---

#[when("I evaluate the request")]
#[expect(clippy::expect_used, reason = "scenarios always provide a request")]
fn evaluate_request(world: &ScoringWorld) {
    let request = world
        .request
        .borrow()
        .clone()
        .expect("request should be configured");
    let outcome = evaluate(
        request,
        world.elements.borrow().clone(),
        world.enrichment.borrow().clone(),
    );
    world.outcome.replace(Some(outcome));
}

#[when("I score the snapshot with enrichment counts")]
fn score_snapshot(world: &ScoringWorld) {
    let config = ScoringConfig::default();
    let extraction =
        FeatureEngine::new(&config).assemble(&world.snapshot.borrow(), Some(PoiCounts::new()));
    let result = ScoringEngine::new(&config).score(&extraction, &WeightOverrides::default());
    world.outcome.replace(Some(Ok(result)));
}

// --- Then steps ---

#[then("the score equals the score without overrides")]
#[expect(clippy::expect_used, reason = "scenarios always provide a request")]
fn score_matches_defaults(world: &ScoringWorld) {
    let mut request = world
        .request
        .borrow()
        .clone()
        .expect("request should be configured");
    request.weights = None;
    let baseline = evaluate(
        request,
        world.elements.borrow().clone(),
        world.enrichment.borrow().clone(),
    )
    .expect("baseline scoring should succeed");
    with_result(world, |result| assert_eq!(result, &baseline));
}

#[then("the warnings include {warning}")]
fn warnings_include(world: &ScoringWorld, warning: String) {
    let expected = warning.trim_matches('"');
    with_result(world, |result| {
        assert!(
            result.warnings.iter().any(|w| w == expected),
            "expected warning {expected:?} in {:?}",
            result.warnings
        );
    });
}

#[then("the explanation contains {label} of {amount}")]
fn explanation_contains(world: &ScoringWorld, label: String, amount: f64) {
    with_result(world, |result| {
        let entry = result
            .explain
            .iter()
            .find(|entry| entry.feature == label)
            .unwrap_or_else(|| panic!("no {label} entry in {:?}", result.explain));
        assert!(
            (entry.contribution - amount).abs() < 1e-9,
            "{label} contributed {} instead of {amount}",
            entry.contribution
        );
    });
}

#[then("the {component} component is {value}")]
fn component_is(world: &ScoringWorld, component: String, value: f64) {
    with_result(world, |result| {
        let actual = match component.as_str() {
            "demography" => result.components.demography,
            "traffic" => result.components.traffic,
            "poi" => result.components.poi,
            "competition" => result.components.competition,
            "grid" => result.components.grid_proxy,
            "accessibility" => result.components.accessibility,
            other => panic!("unknown component {other}"),
        };
        assert!(
            (actual - value).abs() < 1e-9,
            "{component} component was {actual}, expected {value}"
        );
    });
}

#[then("a validation error names {field}")]
fn validation_error_names(world: &ScoringWorld, field: String) {
    let outcome = world.outcome.borrow();
    match outcome.as_ref() {
        Some(Err(PipelineError::Validation(error))) => assert_eq!(error.field(), field),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/site_scoring.feature", name = $title)]
        fn $fn_name(world: ScoringWorld) {
            let _ = world;
        }
    };
}

register_scenario!(
    zero_overrides_revert,
    "zero weight overrides revert to the configured defaults"
);
register_scenario!(
    enrichment_unavailable_falls_back,
    "enrichment unavailable falls back to aggregated counts"
);
register_scenario!(heavy_competition_penalised, "heavy competition is penalised");
register_scenario!(
    missing_major_road_is_neutral,
    "missing major road yields a neutral accessibility score"
);
register_scenario!(
    degenerate_polygon_uses_circle,
    "degenerate polygon area falls back to the search circle"
);
register_scenario!(
    out_of_range_latitude_rejected,
    "out-of-range latitude is rejected"
);
