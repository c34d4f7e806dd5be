mod common;

// std
use std::{sync::Arc, time::Duration};
// crates.io
use time::{Duration as TimeDuration, OffsetDateTime};
// self
use common::{FakeGateway, credentials, is_token_request, token_response};
use mpesa_core::{
	auth::TokenManager,
	clock::{Clock, ManualClock},
	config::CoreConfig,
	context::Context,
	error::{Error, ErrorKind, NetworkCause},
	http::HttpResponse,
};

fn manager(gateway: &Arc<FakeGateway>, clock: &ManualClock) -> Arc<TokenManager<FakeGateway>> {
	let manager =
		TokenManager::<FakeGateway>::new(gateway.clone(), credentials(), &CoreConfig::default())
			.expect("Default configuration should build a manager.")
			.with_clock(Arc::new(clock.clone()));

	Arc::new(manager)
}

#[tokio::test(start_paused = true)]
async fn concurrent_cold_lookups_share_one_exchange() {
	let gateway = FakeGateway::with_latency(Duration::from_millis(50), |request, index| {
		assert!(is_token_request(request));

		token_response(&format!("tok-{index}"), 3_599)
	});
	let clock = ManualClock::new(OffsetDateTime::UNIX_EPOCH);
	let manager = manager(&gateway, &clock);
	let tasks = (0..10)
		.map(|_| {
			let manager = manager.clone();

			tokio::spawn(async move { manager.get_valid_token(&Context::background()).await })
		})
		.collect::<Vec<_>>();
	let mut values = Vec::new();

	for task in tasks {
		let token = task
			.await
			.expect("Lookup task should not panic.")
			.expect("Lookup should succeed.");

		values.push(token.value.expose().to_owned());
	}

	assert!(values.iter().all(|value| value == "tok-0"), "{values:?}");
	assert_eq!(gateway.token_calls(), 1);
	assert_eq!(manager.metrics().exchanges(), 1);
}

#[tokio::test(start_paused = true)]
async fn token_inside_the_margin_is_refreshed_once() {
	let gateway = FakeGateway::new(|_, index| token_response(&format!("tok-{index}"), 90));
	let clock = ManualClock::new(OffsetDateTime::UNIX_EPOCH);
	let manager = manager(&gateway, &clock);
	let ctx = Context::background();
	let first = manager.get_valid_token(&ctx).await.expect("Cold lookup should succeed.");

	clock.advance(TimeDuration::seconds(29));

	let cached = manager.get_valid_token(&ctx).await.expect("Fresh lookup should succeed.");

	assert_eq!(cached, first);

	// The token now expires in 30 s, inside the 60 s margin but not yet expired.
	clock.advance(TimeDuration::seconds(31));

	assert!(!first.is_expired_at(clock.now_utc()));

	let (a, b) = tokio::join!(manager.get_valid_token(&ctx), manager.get_valid_token(&ctx));
	let a = a.expect("Refresh should succeed.");
	let b = b.expect("Queued lookup should adopt the refresh.");

	assert_eq!(a.value.expose(), "tok-1");
	assert_eq!(a, b);
	assert_eq!(gateway.token_calls(), 2);
	assert_eq!(a.expires_at - clock.now_utc(), TimeDuration::seconds(90));
}

#[tokio::test(start_paused = true)]
async fn queued_callers_share_the_failure() {
	let gateway = FakeGateway::with_latency(Duration::from_millis(20), |_, _| {
		Ok(HttpResponse::new(
			400,
			r#"{"requestId":"r-9","errorCode":"400.008.02","errorMessage":"Invalid grant type passed"}"#,
		))
	});
	let manager = manager(&gateway, &ManualClock::new(OffsetDateTime::UNIX_EPOCH));
	let tasks = (0..5)
		.map(|_| {
			let manager = manager.clone();

			tokio::spawn(async move { manager.get_valid_token(&Context::background()).await })
		})
		.collect::<Vec<_>>();

	for task in tasks {
		let err = task
			.await
			.expect("Lookup task should not panic.")
			.expect_err("Rejected credentials should fail every caller.");

		assert_eq!(err.kind(), ErrorKind::Authentication);
		assert_eq!(err.provider_code(), Some("400.008.02"));
	}

	assert_eq!(gateway.token_calls(), 1);
	assert!(manager.cached().is_none());
}

#[tokio::test(start_paused = true)]
async fn waiter_deadline_does_not_disturb_the_refresh() {
	let gateway =
		FakeGateway::with_latency(Duration::from_millis(100), |_, _| token_response("tok", 3_599));
	let manager = manager(&gateway, &ManualClock::new(OffsetDateTime::UNIX_EPOCH));
	let patient = {
		let manager = manager.clone();

		tokio::spawn(async move { manager.get_valid_token(&Context::background()).await })
	};

	tokio::task::yield_now().await;

	let hurried = Context::background().with_timeout(Duration::from_millis(10));
	let err = manager
		.get_valid_token(&hurried)
		.await
		.expect_err("Waiter with a short deadline should give up.");

	assert!(matches!(err, Error::Network(ref e) if e.cause == NetworkCause::TimedOut));

	let token = patient
		.await
		.expect("Lookup task should not panic.")
		.expect("Refresh should still complete.");

	assert_eq!(token.value.expose(), "tok");
	assert_eq!(gateway.token_calls(), 1);
}
