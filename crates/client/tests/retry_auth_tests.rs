//! Session expiry and re-login behavior tests.
//!
//! # Invariants
//! - A 401 on a live session triggers one re-login and a replay of the request
//! - Concurrent 401s on the same session collapse into a single re-login
//! - Reused sessions are never re-established by logging in
//! - A dropped connection re-establishes the session and replays the request
//!
//! # What this does NOT handle
//! - Async operation polling (see async_tests)

mod common;

use common::*;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{header, method, path};

fn counting_login(counter: Arc<AtomicUsize>) -> impl Fn(&wiremock::Request) -> ResponseTemplate {
    move |_: &wiremock::Request| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        ResponseTemplate::new(200)
            .insert_header("set-cookie", format!("TM1SessionId=s{n}; Path=/api/").as_str())
            .set_body_string(V11_VERSION)
    }
}

/// TCP front for `upstream` that closes its `drop_nth` connection (0-based)
/// after reading the request, and forwards every other connection.
async fn flaky_front(upstream: SocketAddr, drop_nth: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut accepted = 0usize;
        while let Ok((mut inbound, _)) = listener.accept().await {
            let n = accepted;
            accepted += 1;
            tokio::spawn(async move {
                if n == drop_nth {
                    let mut buf = [0u8; 4096];
                    let _ = inbound.read(&mut buf).await;
                    return;
                }
                if let Ok(mut outbound) = TcpStream::connect(upstream).await {
                    let _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await;
                }
            });
        }
    });
    format!("http://{addr}")
}

/// Config against the flaky front; every request opens a fresh connection.
fn fresh_connection_config(base_url: String) -> Config {
    let mut config = Config::with_base_url(base_url, AuthConfig::basic("admin", "apple"));
    config.connection.connection_pool_size = 0;
    config.session.max_retry_attempts = 1;
    config
}

#[tokio::test]
async fn test_reconnect_on_remote_disconnect() {
    let server = MockServer::start().await;
    let logins = Arc::new(AtomicUsize::new(0));

    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(counting_login(logins.clone()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api("/Configuration/ServerName/$value")))
        .and(header("cookie", "TM1SessionId=s2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("tm1srv01"))
        .expect(1)
        .mount(&server)
        .await;

    // Connection 0 is the login, connection 1 the first attempt.
    let front = flaky_front(*server.address(), 1).await;
    let client = Tm1Client::builder()
        .from_config(&fresh_connection_config(front))
        .connect()
        .await
        .unwrap();

    assert_eq!(client.server_name().await.unwrap(), "tm1srv01");
    assert_eq!(logins.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_remote_disconnect_without_reconnect_fails() {
    let server = MockServer::start().await;
    let logins = Arc::new(AtomicUsize::new(0));

    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(counting_login(logins.clone()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api("/Configuration/ServerName/$value")))
        .respond_with(ResponseTemplate::new(200).set_body_string("tm1srv01"))
        .expect(0)
        .mount(&server)
        .await;

    let front = flaky_front(*server.address(), 1).await;
    let mut config = fresh_connection_config(front);
    config.session.reconnect_on_remote_disconnect = false;
    let client = Tm1Client::builder().from_config(&config).connect().await.unwrap();

    let err = client.server_name().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)), "unexpected error: {err:?}");
    assert_eq!(logins.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_relogin_on_401() {
    let server = MockServer::start().await;
    let logins = Arc::new(AtomicUsize::new(0));

    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(counting_login(logins.clone()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(api("/Configuration/ServerName/$value")))
        .and(header("cookie", "TM1SessionId=s1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(error_body("", "Session expired")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(api("/Configuration/ServerName/$value")))
        .and(header("cookie", "TM1SessionId=s2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("tm1srv01"))
        .expect(1)
        .mount(&server)
        .await;

    let client = Tm1Client::builder()
        .from_config(&basic_config(&server))
        .connect()
        .await
        .unwrap();
    assert_eq!(logins.load(Ordering::SeqCst), 1);

    assert_eq!(client.server_name().await.unwrap(), "tm1srv01");
    assert_eq!(logins.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_401s_share_one_relogin() {
    let server = MockServer::start().await;
    let logins = Arc::new(AtomicUsize::new(0));

    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(counting_login(logins.clone()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(api("/Configuration/ServerName/$value")))
        .and(header("cookie", "TM1SessionId=s1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(api("/Configuration/ServerName/$value")))
        .and(header("cookie", "TM1SessionId=s2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("tm1srv01"))
        .mount(&server)
        .await;

    let client = Tm1Client::builder()
        .from_config(&basic_config(&server))
        .connect()
        .await
        .unwrap();

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.server_name().await })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), "tm1srv01");
    }
    assert_eq!(logins.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_no_relogin_when_disabled() {
    let server = MockServer::start().await;
    let logins = Arc::new(AtomicUsize::new(0));

    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(counting_login(logins.clone()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(api("/Cubes")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut config = basic_config(&server);
    config.session.reconnect_on_session_timeout = false;
    let client = Tm1Client::builder().from_config(&config).connect().await.unwrap();

    let err = client.get_all_cube_names(false).await.unwrap_err();
    assert!(err.is_auth_error());
    assert_eq!(logins.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reused_session_is_not_reestablished() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(api("/Cubes")))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config::with_base_url(server.uri(), AuthConfig::session("gone"));
    let client = Tm1Client::builder().from_config(&config).build().unwrap();
    let err = client.get_all_cube_names(false).await.unwrap_err();
    assert!(matches!(err, ClientError::AuthFailure { .. }), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_retries_exhausted_surface_auth_failure() {
    let server = MockServer::start().await;
    let logins = Arc::new(AtomicUsize::new(0));

    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(counting_login(logins.clone()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(api("/Dimensions")))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let client = Tm1Client::builder()
        .from_config(&basic_config(&server))
        .connect()
        .await
        .unwrap();
    let err = client.get_all_dimension_names(false).await.unwrap_err();
    assert!(err.is_auth_error());
    // Initial login plus one re-login for the single allowed retry.
    assert_eq!(logins.load(Ordering::SeqCst), 2);
}
