//! Property-based tests for the learner model
//!
//! Covers:
//! - scheduler bounds and rating ordering
//! - staircase step monotonicity and bounded termination
//! - IRT probability bounds, strict monotonicity in ability and difficulty
//! - MAP update direction and variance bounds

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use danci_learner_algo::irt::{fisher_information, map_update, probability, ItemParams, ThetaState};
use danci_learner_algo::{
    CefrBand, MemoryParams, PlacementOutcome, PlacementStaircase, Rating, ReviewScheduler,
    SchedulerConfig,
};

// ============================================================================
// Generators
// ============================================================================

fn arb_rating() -> impl Strategy<Value = Rating> {
    prop_oneof![
        Just(Rating::Again),
        Just(Rating::Hard),
        Just(Rating::Good),
        Just(Rating::Easy),
    ]
}

fn arb_params() -> impl Strategy<Value = MemoryParams> {
    (0.0f64..200.0, 0.0f64..20.0).prop_map(|(stability, difficulty)| MemoryParams {
        stability,
        difficulty,
    })
}

fn arb_outcome() -> impl Strategy<Value = PlacementOutcome> {
    prop_oneof![Just(PlacementOutcome::Easy), Just(PlacementOutcome::Hard)]
}

fn arb_item() -> impl Strategy<Value = ItemParams> {
    (-4.0f64..4.0, prop_oneof![Just(0.0), Just(0.25), 0.0f64..0.5])
        .prop_map(|(difficulty, guessing)| ItemParams::new(difficulty, guessing))
}

fn arb_theta_state() -> impl Strategy<Value = ThetaState> {
    (-3.0f64..3.0, 0.02f64..1.0).prop_map(|(theta, variance)| ThetaState::new(theta, variance))
}

// ============================================================================
// Scheduler
// ============================================================================

proptest! {
    #[test]
    fn prop_schedule_stays_in_bounds(params in arb_params(), rating in arb_rating()) {
        let scheduler = ReviewScheduler::default();
        let config = SchedulerConfig::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let result = scheduler.update(params, rating, now).unwrap();
        prop_assert!(result.stability >= config.min_stability);
        prop_assert!(result.stability <= config.max_stability);
        prop_assert!(result.difficulty >= config.min_difficulty);
        prop_assert!(result.difficulty <= config.max_difficulty);
        prop_assert!(result.interval_days >= 1);
        prop_assert!(result.due > now);
    }

    #[test]
    fn prop_better_rating_never_shortens_interval(params in arb_params()) {
        let scheduler = ReviewScheduler::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let intervals: Vec<u32> = Rating::ALL
            .iter()
            .map(|r| scheduler.update(params, *r, now).unwrap().interval_days)
            .collect();
        for pair in intervals.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn prop_repeated_reviews_stay_in_bounds(ratings in prop::collection::vec(arb_rating(), 1..50)) {
        let scheduler = ReviewScheduler::default();
        let config = SchedulerConfig::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut params = scheduler.initial_params();
        for rating in ratings {
            let result = scheduler.update(params, rating, now).unwrap();
            params = MemoryParams { stability: result.stability, difficulty: result.difficulty };
            prop_assert!((config.min_stability..=config.max_stability).contains(&params.stability));
            prop_assert!((config.min_difficulty..=config.max_difficulty).contains(&params.difficulty));
        }
    }
}

// ============================================================================
// Placement
// ============================================================================

proptest! {
    #[test]
    fn prop_staircase_step_never_grows(outcomes in prop::collection::vec(arb_outcome(), 1..40)) {
        let staircase = PlacementStaircase::default();
        let mut state = staircase.start();
        for outcome in outcomes {
            let next = staircase.update(&state, outcome);
            prop_assert!(next.step <= state.step);
            prop_assert!(next.step > 0.0);
            prop_assert_eq!(next.response_count, state.response_count + 1);
            state = next;
        }
    }

    #[test]
    fn prop_staircase_stops_within_cap(outcomes in prop::collection::vec(arb_outcome(), 15..30)) {
        let staircase = PlacementStaircase::default();
        let mut state = staircase.start();
        let mut stopped_at = None;
        for (i, outcome) in outcomes.into_iter().enumerate() {
            state = staircase.update(&state, outcome);
            if staircase.should_stop(&state) {
                stopped_at = Some(i + 1);
                break;
            }
        }
        let n = stopped_at.expect("staircase must stop");
        prop_assert!(n >= 10 && n <= 15);
    }

    #[test]
    fn prop_estimate_is_consistent(outcomes in prop::collection::vec(arb_outcome(), 0..15)) {
        let staircase = PlacementStaircase::default();
        let mut state = staircase.start();
        for outcome in outcomes {
            state = staircase.update(&state, outcome);
        }
        let estimate = staircase.to_estimate(&state);
        prop_assert_eq!(estimate.band, CefrBand::from_theta(state.theta));
        prop_assert!(estimate.vocab_index > 0.0 && estimate.vocab_index < 10.0);
        prop_assert!(estimate.confidence >= 0.3 && estimate.confidence <= 1.0);
        let d = staircase.pick_difficulty(&state);
        prop_assert!(d.abs() <= 2.5);
    }
}

// ============================================================================
// IRT
// ============================================================================

proptest! {
    #[test]
    fn prop_probability_bounded_and_monotone(
        item in arb_item(),
        a in -10.0f64..10.0,
        delta in 0.01f64..5.0,
    ) {
        let low = probability(a, item);
        let high = probability(a + delta, item);
        prop_assert!(low >= item.guessing && low <= 1.0);
        prop_assert!(high >= item.guessing && high < 1.0);
        prop_assert!(high > low);
        prop_assert!(fisher_information(a, item) >= 0.0);
    }

    // |theta - b| stays below the logit clamp, so the ordering is strict
    #[test]
    fn prop_probability_strictly_decreasing_in_difficulty(
        theta in -10.0f64..10.0,
        difficulty in -4.0f64..4.0,
        guessing in prop_oneof![Just(0.0), Just(0.25), 0.0f64..0.5],
        delta in 0.01f64..5.0,
    ) {
        let easier = probability(theta, ItemParams::new(difficulty, guessing));
        let harder = probability(theta, ItemParams::new(difficulty + delta, guessing));
        prop_assert!(harder < easier);
        prop_assert!(harder > guessing);
    }

    #[test]
    fn prop_map_update_moves_toward_outcome(
        state in arb_theta_state(),
        item in arb_item(),
        correct in any::<bool>(),
    ) {
        let next = map_update(state, item, correct, 0.02, 1.0);
        if correct {
            prop_assert!(next.theta >= state.theta);
        } else {
            prop_assert!(next.theta <= state.theta);
        }
        prop_assert!(next.variance >= 0.02 && next.variance <= 1.0);
        prop_assert!(next.variance <= state.variance + 1e-12);
        prop_assert!(next.theta.is_finite());
    }
}
