//! Property tests for backoff schedules and stream assembly

use futures::executor::block_on;
use futures::stream;
use proptest::prelude::*;
use std::time::Duration;
use steady_core::config::FastRetryConfig;
use steady_core::http::collect_fragments;
use steady_core::protocol::StreamChunk;
use steady_core::resilience::Backoff;

fn fast_config() -> impl Strategy<Value = FastRetryConfig> {
    (1u64..5_000, 1u64..120_000, 0.0f64..=0.5).prop_map(|(initial, extra, jitter)| {
        FastRetryConfig {
            initial_delay_ms: initial,
            max_delay_ms: initial + extra,
            exponential_base: 2.0,
            jitter_factor: jitter,
            ..FastRetryConfig::default()
        }
    })
}

proptest! {
    #[test]
    fn backoff_never_exceeds_cap(config in fast_config(), retry in 0u32..64) {
        let backoff = Backoff::from(&config);
        let delay = backoff.calculate_delay(retry);
        prop_assert!(delay <= Duration::from_millis(config.max_delay_ms));
    }

    #[test]
    fn backoff_is_non_decreasing(config in fast_config(), retries in 1u32..12) {
        let backoff = Backoff::from(&config);
        let delays: Vec<Duration> = (0..retries).map(|r| backoff.calculate_delay(r)).collect();
        for pair in delays.windows(2) {
            prop_assert!(pair[1] >= pair[0], "{:?}", delays);
        }
    }

    #[test]
    fn default_schedule_stays_within_a_minute(retry in 0u32..1_000) {
        let delay = Backoff::default().calculate_delay(retry);
        prop_assert!(delay <= Duration::from_secs(60));
    }

    #[test]
    fn fragments_concatenate_in_order(
        fragments in prop::collection::vec(prop::option::of(".{0,12}"), 0..20)
    ) {
        let expected: String = fragments.iter().flatten().cloned().collect();
        let chunks = fragments.into_iter().map(|fragment| Ok(StreamChunk { fragment }));

        let text = block_on(collect_fragments(stream::iter(chunks))).unwrap();
        prop_assert_eq!(text, expected);
    }
}
