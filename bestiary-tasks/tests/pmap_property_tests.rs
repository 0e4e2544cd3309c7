//! Property-based and scenario tests for the parallel mapper.
//!
//! Properties:
//! - output order matches input order for any concurrency
//! - progress rises by exactly one per settled item, N + 1 reports in total
//! - no more than `concurrency` transforms are ever in flight
//! - continue-on-error always resolves with errors at the failing indices

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bestiary_tasks::{
    pmap, pmap_settled, progress_fn, CancellationToken, MapConfig, MapError, ParallelMapper,
    Progress,
};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime should build")
}

/// Progress sink that records every snapshot.
fn recorder() -> (Arc<Mutex<Vec<Progress>>>, impl bestiary_tasks::ProgressSink) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    (seen, progress_fn(move |p| sink_seen.lock().unwrap().push(p)))
}

/// Yield `n` times so transforms settle out of input order.
async fn jitter(n: u8) {
    for _ in 0..n {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[tokio::test]
async fn test_doubling_with_two_workers() {
    let (seen, sink) = recorder();
    let mapper = ParallelMapper::new(MapConfig::new().with_concurrency(2)).with_progress(sink);

    let settled = mapper
        .map(vec![10, 20, 30, 40, 50], |x, _| async move { Ok::<_, String>(x * 2) })
        .await
        .unwrap();

    assert_eq!(settled.into_values(), vec![20, 40, 60, 80, 100]);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 6);
    assert_eq!(seen.first(), Some(&Progress::new(0, 5)));
    assert_eq!(seen.last(), Some(&Progress::new(5, 5)));
}

#[tokio::test]
async fn test_continue_on_error_keeps_other_slots() {
    let settled = pmap_settled(vec![0, 1, 2, 3, 4], 3, |x, _| async move {
        if x == 2 {
            Err("fetch failed for 2".to_string())
        } else {
            Ok(format!("r{x}"))
        }
    })
    .await;

    assert_eq!(
        settled.results,
        vec![
            Some("r0".to_string()),
            Some("r1".to_string()),
            None,
            Some("r3".to_string()),
            Some("r4".to_string()),
        ]
    );
    assert_eq!(
        settled.errors,
        vec![None, None, Some("fetch failed for 2".to_string()), None, None]
    );
    assert!(!settled.cancelled);
}

#[tokio::test]
async fn test_fail_fast_surfaces_failing_item() {
    let err = pmap(vec![1, 2, 3, 4, 5], 2, |x, _| async move {
        jitter(x as u8).await;
        if x == 4 {
            Err(format!("bad {x}"))
        } else {
            Ok(x)
        }
    })
    .await
    .unwrap_err();

    assert_eq!(err.index(), Some(3));
    assert_eq!(err.into_source().as_deref(), Some("bad 4"));
}

#[tokio::test]
async fn test_cancellation_stops_claiming() {
    let token = CancellationToken::new();
    let sink_token = token.clone();
    let mapper = ParallelMapper::new(MapConfig::new().with_concurrency(1))
        .with_cancellation(token)
        .with_progress(progress_fn(move |p: Progress| {
            if p.done == 2 {
                sink_token.cancel();
            }
        }));

    let settled = mapper
        .map(vec!['a', 'b', 'c', 'd', 'e'], |c, _| async move { Ok::<_, ()>(c) })
        .await
        .unwrap();

    assert!(settled.cancelled);
    assert_eq!(settled.results, vec![Some('a'), Some('b'), None, None, None]);
    assert!(settled.errors.iter().all(Option::is_none));
}

#[tokio::test]
async fn test_in_flight_item_finishes_after_cancel() {
    let token = CancellationToken::new();
    let transform_token = token.clone();
    let mapper = ParallelMapper::new(MapConfig::new().with_concurrency(2)).with_cancellation(token);

    let settled = mapper
        .map(vec![0u8, 1, 2, 3], move |x, _| {
            let token = transform_token.clone();
            async move {
                if x == 0 {
                    jitter(1).await;
                    token.cancel();
                } else {
                    jitter(3).await;
                }
                Ok::<_, ()>(x)
            }
        })
        .await
        .unwrap();

    assert!(settled.cancelled);
    assert_eq!(settled.results, vec![Some(0), Some(1), None, None]);
}

#[tokio::test]
async fn test_fail_fast_error_type_displays_index() {
    let err: MapError<std::io::Error> = MapError::Transform {
        index: 7,
        source: std::io::Error::other("timed out"),
    };
    assert_eq!(err.to_string(), "Item 7 failed: timed out");
    assert!(std::error::Error::source(&err).is_some());
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_output_matches_input_order(
        items in prop::collection::vec((any::<i32>(), 0u8..4), 0..40),
        concurrency in 1usize..12,
    ) {
        let expected: Vec<i64> = items.iter().map(|(x, _)| i64::from(*x) * 3).collect();

        let out = runtime().block_on(pmap(items, concurrency, |(x, delay), _| async move {
            jitter(delay).await;
            Ok::<_, ()>(i64::from(x) * 3)
        }));

        prop_assert_eq!(out, Ok(expected));
    }

    #[test]
    fn prop_progress_counts_every_item(
        len in 0usize..40,
        concurrency in 1usize..12,
        fail_every in 2usize..6,
    ) {
        let (seen, sink) = recorder();
        let mapper = ParallelMapper::new(
            MapConfig::new().with_concurrency(concurrency).with_continue_on_error(true),
        )
        .with_progress(sink);

        let settled = runtime()
            .block_on(mapper.map((0..len).collect(), |x, _| async move {
                jitter((x % 3) as u8).await;
                if x % fail_every == 0 { Err(x) } else { Ok(x) }
            }))
            .unwrap();

        let seen = seen.lock().unwrap();
        prop_assert_eq!(seen.len(), len + 1);
        for (step, progress) in seen.iter().enumerate() {
            prop_assert_eq!(*progress, Progress::new(step, len));
        }

        for i in 0..len {
            if i % fail_every == 0 {
                prop_assert_eq!(settled.results[i], None);
                prop_assert_eq!(settled.errors[i], Some(i));
            } else {
                prop_assert_eq!(settled.results[i], Some(i));
                prop_assert_eq!(settled.errors[i], None);
            }
        }
    }

    #[test]
    fn prop_in_flight_never_exceeds_concurrency(
        len in 1usize..40,
        concurrency in 1usize..8,
    ) {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let transform = {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            move |x: usize, _| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    jitter((x % 4) as u8 + 1).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, ()>(x)
                }
            }
        };

        let out = runtime().block_on(pmap((0..len).collect(), concurrency, transform)).unwrap();

        prop_assert_eq!(out.len(), len);
        prop_assert!(peak.load(Ordering::SeqCst) <= concurrency.min(len));
        prop_assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }
}
