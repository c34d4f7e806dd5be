//! Generates an access token with the default reqwest transport against a local mock gateway, then
//! reuses the cached token for an authenticated STK push.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use mpesa_core::{
	auth::{Credentials, TokenSecret},
	config::{CoreConfig, Environment},
	context::Context,
	http::HttpRequest,
	obs::Operation,
	request::{Call, ReqwestCore},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/oauth/v1/generate")
				.query_param("grant_type", "client_credentials");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"demo-access","expires_in":"3599"}"#);
		})
		.await;
	let push_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/mpesa/stkpush/v1/processrequest")
				.header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body(
				r#"{"MerchantRequestID":"m-1","CheckoutRequestID":"ws_CO_demo","ResponseCode":"0","ResponseDescription":"Success. Request accepted for processing"}"#,
			);
		})
		.await;
	let config = CoreConfig::default()
		.with_environment(Environment::Custom(Url::parse(&server.base_url())?));
	let core = ReqwestCore::new(config, Credentials::new("demo-key", "demo-secret")?)?;
	let ctx = Context::background();
	let token = core.generate_token(&ctx).await?;

	println!("Token {} expires at {}.", token.value, token.expires_at);

	let url = core.endpoint("mpesa/stkpush/v1/processrequest")?;
	let status = core
		.send(
			&ctx,
			Call::authenticated(Operation::StkPush),
			|token| {
				HttpRequest::post(url.clone())
					.bearer(token.map(TokenSecret::expose).unwrap_or_default())
					.json(&serde_json::json!({ "BusinessShortCode": "174379", "Amount": 1 }))
			},
			|response| Ok(response.status),
		)
		.await?;

	println!("STK push answered with HTTP {status}.");

	token_mock.assert_calls_async(1).await;
	push_mock.assert_calls_async(1).await;

	Ok(())
}
