use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use scopekit_api::{Application, RequestContext, wrap};
use scopekit_auth::{Credential, StaticProvider};
use scopekit_core::CodedError;
use scopekit_infra::{AppConfig, load};

const SECRET: &str = "TestKey";

struct TestServer {
    base_url: String,
    supplier_calls: Arc<AtomicUsize>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let mut config = AppConfig::default();
        config.credential.secret = SECRET.to_string();
        config.credential.ttl_secs = 60;

        let provider = StaticProvider::new(HashMap::from([(
            "8282".to_string(),
            Credential::new("8282", "TestKey", vec!["Test-0".into(), "Test-1".into()]),
        )]));

        let app = Application::new(config).expect("bootstrap");
        let cache = app.state().cache.clone();
        let supplier_calls = Arc::new(AtomicUsize::new(0));
        let calls = supplier_calls.clone();

        let cached = Router::new().route(
            "/cached/:Resource",
            get(wrap(move |ctx: RequestContext<()>| {
                let cache = cache.clone();
                let calls = calls.clone();
                async move {
                    let key = ctx.resource.unwrap_or_default();
                    let label = key.clone();
                    load(cache.as_ref(), &key, Duration::from_secs(60), || async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, CodedError>(format!("{label}-{n}"))
                    })
                    .await
                }
            })),
        );

        let whoami = Router::new().route(
            "/whoami",
            get(wrap(|ctx: RequestContext<()>| async move {
                Ok::<_, CodedError>(ctx.credential.subject)
            })),
        );

        let router = app
            .with_credential_routes(Arc::new(provider))
            .merge(cached)
            .merge_protected(whoami)
            .into_router();

        // Same router as prod, bound to an ephemeral port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url,
            supplier_calls,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn envelope(res: reqwest::Response) -> Value {
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

async fn issue(client: &reqwest::Client, server: &TestServer, code: &str) -> Value {
    let res = client
        .post(server.url("/credential/issue"))
        .json(&json!({ "code": code }))
        .send()
        .await
        .unwrap();
    envelope(res).await
}

fn mint_jwt(secret: &str, expires_in_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "iss": "JwtUtil",
        "sub": "TestKey",
        "aud": ["Test-0"],
        "jti": "8282",
        "iat": now,
        "exp": now + expires_in_secs,
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_wrapped_in_an_envelope() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let body = envelope(client.get(server.url("/health")).send().await.unwrap()).await;
    assert_eq!(body["Code"], 0);
    assert_eq!(body["Message"], "SUC");
    assert_eq!(body["Data"], "Health");
    assert!(body["SerialNum"].as_str().unwrap().starts_with("SERIAL-"));
}

#[tokio::test]
async fn issued_token_round_trips_through_the_middleware() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let issued = issue(&client, &server, "8282").await;
    assert_eq!(issued["Code"], 0);
    let token = issued["Data"].as_str().unwrap().to_string();

    let raw = envelope(
        client
            .get(server.url("/credential"))
            .header("Authorization", &token)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(raw["Code"], 0);
    assert_eq!(
        raw["Data"],
        json!({ "ID": "8282", "Subject": "TestKey", "Audience": ["Test-0", "Test-1"] })
    );

    let bearer = envelope(
        client
            .get(server.url("/whoami"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(bearer["Code"], 0);
    assert_eq!(bearer["Data"], "TestKey");
}

#[tokio::test]
async fn issue_reports_its_own_codes() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let unknown = issue(&client, &server, "nope").await;
    assert_eq!(unknown["Code"], 110_002);
    assert_eq!(unknown["Message"], "unknown exchange code");
    assert!(unknown["Data"].is_null());

    let unbound = envelope(
        client
            .post(server.url("/credential/issue"))
            .header("content-type", "application/json")
            .body("{}")
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(unbound["Code"], 110_001);

    let by_query = envelope(
        client
            .get(server.url("/credential/issue?code=8282"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(by_query["Code"], 0);
}

#[tokio::test]
async fn protected_routes_reject_bad_tokens() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let cases = [
        None,
        Some("garbage".to_string()),
        Some(mint_jwt("OtherKey", 60)),
        Some(mint_jwt(SECRET, -60)),
    ];

    for token in cases {
        let mut req = client.get(server.url("/whoami"));
        if let Some(token) = &token {
            req = req.header("Authorization", token);
        }
        let body = envelope(req.send().await.unwrap()).await;
        assert_eq!(body["Code"], 110_004, "token {token:?} gave {body}");
        assert!(body["Data"].is_null());
    }

    let good = envelope(
        client
            .get(server.url("/whoami"))
            .header("Authorization", mint_jwt(SECRET, 60))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(good["Data"], "TestKey");
}

#[tokio::test]
async fn cached_route_runs_supplier_once_per_key() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let body = envelope(client.get(server.url("/cached/alpha")).send().await.unwrap()).await;
        assert_eq!(body["Data"], "alpha-0");
    }
    let other = envelope(client.get(server.url("/cached/beta")).send().await.unwrap()).await;
    assert_eq!(other["Data"], "beta-1");

    assert_eq!(server.supplier_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unknown_route_is_not_enveloped() {
    let server = TestServer::spawn().await;
    let res = reqwest::Client::new()
        .get(server.url("/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
