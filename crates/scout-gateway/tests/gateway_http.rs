//! Integration tests for `NetworkGateway::fetch`.
//!
//! Uses `wiremock` as the destination server. Proxy scenarios point the pool
//! at closed local ports so every proxied attempt fails at connect time.

use std::io::Write as _;
use std::time::{Duration, Instant};

use scout_core::{ConfigError, ProxyMode, ScoutConfig};
use scout_gateway::{Gateway, GatewayError, NetworkGateway, Route};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// No spacing, no back-off delay, two retries.
fn fast_config() -> ScoutConfig {
    ScoutConfig {
        rate_limit_delay_ms: 0,
        retry_backoff_base_ms: 0,
        request_timeout_secs: 5,
        ..ScoutConfig::default()
    }
}

fn dead_proxy_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "127.0.0.1:1").unwrap();
    writeln!(file, "127.0.0.1:2").unwrap();
    file
}

#[tokio::test]
async fn fetch_returns_body_status_and_route() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contact"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<a href=\"mailto:hi@acme.test\">"))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = NetworkGateway::from_config(&fast_config()).unwrap();
    let response = gateway
        .fetch(&format!("{}/contact", server.uri()))
        .await
        .expect("fetch should succeed");

    assert_eq!(response.status, 200);
    assert!(response.is_success());
    assert!(response.body.contains("mailto:hi@acme.test"));
    assert_eq!(response.route, Route::Direct);
    assert!(response.final_url.ends_with("/contact"));
}

#[tokio::test]
async fn server_error_is_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200).set_body_string("about us"))
        .mount(&server)
        .await;

    let gateway = NetworkGateway::from_config(&fast_config()).unwrap();
    let response = gateway.fetch(&format!("{}/about", server.uri())).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "about us");
}

#[tokio::test]
async fn persistent_server_error_surfaces_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let gateway = NetworkGateway::from_config(&fast_config()).unwrap();
    let err = gateway.fetch(&server.uri()).await.unwrap_err();
    assert!(
        matches!(err, GatewayError::ServerError { status: 500, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn not_found_is_returned_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contact"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = NetworkGateway::from_config(&fast_config()).unwrap();
    let response = gateway.fetch(&format!("{}/contact", server.uri())).await.unwrap();
    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}

#[tokio::test]
async fn rate_limited_response_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let gateway = NetworkGateway::from_config(&fast_config()).unwrap();
    let response = gateway.fetch(&server.uri()).await.unwrap();
    assert_eq!(response.body, "ok");
}

#[tokio::test]
async fn dead_proxies_fail_over_to_direct() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("reached directly"))
        .expect(1)
        .mount(&server)
        .await;

    let proxies = dead_proxy_file();
    let config = ScoutConfig {
        proxy_mode: ProxyMode::RotatingFile(proxies.path().to_path_buf()),
        proxy_direct_fallback: true,
        ..fast_config()
    };
    let gateway = NetworkGateway::from_config(&config).unwrap();
    assert_eq!(gateway.proxy_count().await, 2);

    let response = gateway.fetch(&server.uri()).await.unwrap();
    assert_eq!(response.body, "reached directly");
    assert_eq!(response.route, Route::Direct);
}

#[tokio::test]
async fn dead_proxies_without_fallback_return_proxy_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let proxies = dead_proxy_file();
    let config = ScoutConfig {
        proxy_mode: ProxyMode::RotatingFile(proxies.path().to_path_buf()),
        proxy_direct_fallback: false,
        max_retries: 0,
        ..fast_config()
    };
    let gateway = NetworkGateway::from_config(&config).unwrap();
    let err = gateway.fetch(&server.uri()).await.unwrap_err();
    assert!(err.is_proxy_failure(), "got: {err:?}");
}

#[tokio::test]
async fn requests_to_one_host_are_spaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let config = ScoutConfig {
        rate_limit_delay_ms: 200,
        ..fast_config()
    };
    let gateway = NetworkGateway::from_config(&config).unwrap();
    let start = Instant::now();
    for page in ["/", "/contact", "/about"] {
        gateway
            .fetch(&format!("{}{page}", server.uri()))
            .await
            .unwrap();
    }
    assert!(
        start.elapsed() >= Duration::from_millis(400),
        "elapsed {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn non_http_url_is_rejected() {
    let gateway = NetworkGateway::from_config(&fast_config()).unwrap();
    let err = gateway.fetch("ftp://acme.test/file").await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidUrl { .. }));
}

#[test]
fn empty_proxy_file_fails_construction() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let config = ScoutConfig {
        proxy_mode: ProxyMode::RotatingFile(file.path().to_path_buf()),
        ..fast_config()
    };
    let err = NetworkGateway::from_config(&config).err().unwrap();
    assert!(matches!(
        err,
        GatewayError::Config(ConfigError::EmptyProxyFile { .. })
    ));
}

#[test]
fn invalid_smtp_sender_fails_construction() {
    let config = ScoutConfig {
        smtp_sender: "nobody".to_owned(),
        ..fast_config()
    };
    let err = NetworkGateway::from_config(&config).err().unwrap();
    assert!(matches!(
        err,
        GatewayError::Config(ConfigError::InvalidSender(_))
    ));
}
