// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use tokio::time::Instant;
// self
use mpesa_core::{
	CancellationToken,
	config::RateLimitConfig,
	context::Context,
	error::{Error, NetworkCause},
	limit::RateLimiter,
};

fn limiter(max_concurrent: usize, max_per_window: usize, window_ms: u64) -> RateLimiter {
	RateLimiter::new(RateLimitConfig {
		max_concurrent,
		max_per_window,
		window_duration_ms: window_ms,
	})
}

#[tokio::test(start_paused = true)]
async fn concurrent_holders_never_exceed_the_ceiling() {
	let limiter = limiter(3, 1_000, 60_000);
	let in_flight = Arc::new(AtomicUsize::new(0));
	let peak = Arc::new(AtomicUsize::new(0));
	let mut tasks = Vec::new();

	for i in 0..20_u64 {
		let limiter = limiter.clone();
		let in_flight = in_flight.clone();
		let peak = peak.clone();

		tasks.push(tokio::spawn(async move {
			let permit = limiter
				.acquire(&Context::background())
				.await
				.expect("Acquisition without a deadline should succeed.");
			let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;

			peak.fetch_max(now, Ordering::SeqCst);
			assert!(limiter.snapshot().active <= 3);

			tokio::time::sleep(Duration::from_millis(10 + i % 4)).await;
			in_flight.fetch_sub(1, Ordering::SeqCst);
			drop(permit);
		}));
	}
	for task in tasks {
		task.await.expect("Holder task should not panic.");
	}

	assert_eq!(peak.load(Ordering::SeqCst), 3);
	assert_eq!(limiter.snapshot().active, 0);
	assert_eq!(limiter.snapshot().admitted_in_window, 20);
}

#[tokio::test(start_paused = true)]
async fn window_budget_resets_exactly_at_the_boundary() {
	let start = Instant::now();
	let limiter = limiter(10, 2, 1_000);

	limiter.try_acquire().expect("First admission should fit the window.").release();
	limiter.try_acquire().expect("Second admission should fit the window.").release();

	assert!(limiter.try_acquire().is_none(), "Budget should be spent.");

	tokio::time::advance(Duration::from_millis(999)).await;

	assert!(limiter.try_acquire().is_none(), "Budget should stay spent until the boundary.");

	tokio::time::advance(Duration::from_millis(1)).await;

	let snapshot = {
		let _permit = limiter.try_acquire().expect("New window should admit again.");

		limiter.snapshot()
	};

	assert_eq!(snapshot.admitted_in_window, 1);
	assert_eq!(snapshot.window_start, start + Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn exhausted_acquire_sleeps_until_the_next_window() {
	let start = Instant::now();
	let limiter = limiter(10, 1, 500);
	let ctx = Context::background();

	drop(limiter.acquire(&ctx).await.expect("First admission should be immediate."));

	let permit = limiter.acquire(&ctx).await.expect("Second admission should wait for rollover.");

	let waited = start.elapsed();

	assert!(
		waited >= Duration::from_millis(500) && waited < Duration::from_millis(502),
		"{waited:?}"
	);

	drop(permit);
}

#[tokio::test(start_paused = true)]
async fn budget_spent_just_before_the_boundary_blocks_until_it() {
	let start = Instant::now();
	let limiter = limiter(10, 2, 1_000);
	let ctx = Context::background();

	drop(limiter.acquire(&ctx).await.expect("First admission should be immediate."));
	tokio::time::advance(Duration::from_millis(999)).await;
	drop(limiter.acquire(&ctx).await.expect("Last admission of the window should be immediate."));

	let _permit = limiter.acquire(&ctx).await.expect("Next admission should wait for rollover.");
	let waited = start.elapsed();

	assert!(
		waited >= Duration::from_millis(1_000) && waited < Duration::from_millis(1_002),
		"{waited:?}"
	);
	assert_eq!(limiter.snapshot().admitted_in_window, 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_during_acquire_leaves_counters_untouched() {
	let limiter = limiter(1, 10, 60_000);
	let held = limiter.try_acquire().expect("First slot should be free.");
	let ctx = Context::background().with_timeout(Duration::from_millis(50));
	let err = limiter.acquire(&ctx).await.expect_err("Saturated limiter should time out.");

	assert!(matches!(err, Error::Network(ref e) if e.cause == NetworkCause::TimedOut));
	assert_eq!(limiter.snapshot().active, 1);
	assert_eq!(limiter.snapshot().admitted_in_window, 1);

	drop(held);

	assert_eq!(limiter.snapshot().active, 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_wakes_a_parked_acquire() {
	let limiter = limiter(1, 10, 60_000);
	let _held = limiter.try_acquire().expect("First slot should be free.");
	let token = CancellationToken::new();
	let waiter = {
		let limiter = limiter.clone();
		let ctx = Context::background().with_cancellation(token.clone());

		tokio::spawn(async move { limiter.acquire(&ctx).await.map(drop) })
	};

	tokio::task::yield_now().await;
	token.cancel();

	let err = waiter
		.await
		.expect("Waiter task should not panic.")
		.expect_err("Cancelled acquisition should fail.");

	assert!(matches!(err, Error::Network(ref e) if e.cause == NetworkCause::Cancelled));
	assert_eq!(limiter.snapshot().active, 1);
}
