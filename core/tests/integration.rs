//! Lookups against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `LookupClient` over
//! real HTTP with `UreqTransport`. Validates that request building, batching
//! and response classification agree with what the server actually sends.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use mock_server::{Lists, MockConfig, MockState, SharedState, LOOKUP_PATH};
use sblookup_core::{ClientConfig, LookupClient, LookupFailure, UreqTransport, Verdict};

const KEY: &str = "integration-key";
const GUMBLAR: &str = "http://www.gumblar.cn/";

/// Start a mock server on a background thread and return its address.
fn start(config: MockConfig) -> (SocketAddr, SharedState) {
    let _ = env_logger::builder().is_test(true).try_init();

    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let state = MockState::new(config);
    let server_state = state.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, server_state).await
        })
        .unwrap();
    });

    (addr, state)
}

fn set_lists(state: &SharedState, malware: &[&str], phishing: &[&str]) {
    let lists = Lists {
        malware: malware.iter().map(|u| u.to_string()).collect::<HashSet<_>>(),
        phishing: phishing.iter().map(|u| u.to_string()).collect::<HashSet<_>>(),
    };
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    rt.block_on(state.set_lists(lists));
}

fn client(addr: SocketAddr, key: &str) -> LookupClient {
    let config = ClientConfig::new(key).with_endpoint(format!("http://{addr}{LOOKUP_PATH}"));
    LookupClient::new(config).unwrap()
}

fn transport() -> UreqTransport {
    UreqTransport::new(Duration::from_secs(5))
}

#[test]
fn unlisted_urls_are_clean() {
    let (addr, state) = start(MockConfig::new(KEY));
    let mut client = client(addr, KEY);

    let urls = ["http://www.google.com/", "http://www.google.org/"];
    let results = client.lookup(&transport(), &urls);

    assert_eq!(results.len(), 2);
    assert!(results.values().all(|v| *v == Verdict::Clean));
    assert!(client.last_error().is_none());
    assert_eq!(state.lookups(), 1);
}

#[test]
fn listed_url_is_reported() {
    let (addr, state) = start(MockConfig::new(KEY));
    set_lists(&state, &[GUMBLAR], &[]);
    let mut client = client(addr, KEY);

    let results = client.lookup(&transport(), &[GUMBLAR, "http://www.google.com/"]);

    assert_eq!(results[GUMBLAR], Verdict::Malware);
    assert_eq!(results["http://www.google.com/"], Verdict::Clean);
}

#[test]
fn url_on_both_lists() {
    let (addr, state) = start(MockConfig::new(KEY));
    set_lists(&state, &["http://both.example/"], &["http://both.example/"]);
    let mut client = client(addr, KEY);

    let results = client.lookup(&transport(), &["http://both.example/"]);

    assert_eq!(results["http://both.example/"], Verdict::MalwarePhishing);
}

#[test]
fn scheme_is_added_before_sending() {
    let (addr, state) = start(MockConfig::new(KEY));
    set_lists(&state, &[], &["http://phish.example/"]);
    let mut client = client(addr, KEY);

    let results = client.lookup(&transport(), &["phish.example/"]);

    // keyed by the caller's URL, matched by the normalized one
    assert_eq!(results["phish.example/"], Verdict::Phishing);
}

#[test]
fn wrong_key_fails_every_url() {
    for forbid in [false, true] {
        let config = MockConfig {
            forbid_instead_of_unauthorized: forbid,
            ..MockConfig::new(KEY)
        };
        let (addr, _state) = start(config);
        let mut client = client(addr, "wrong-key");

        let report =
            client.lookup_report(&transport(), &["http://www.google.com/", GUMBLAR]);

        assert_eq!(report.results.len(), 2);
        assert!(report.results.values().all(|v| *v == Verdict::Error));
        assert_eq!(report.chunks[0].failure, Some(LookupFailure::InvalidApiKey));
        assert_eq!(client.last_error(), Some("invalid API key"));
    }
}

#[test]
fn overloaded_service() {
    let (addr, state) = start(MockConfig::new(KEY));
    state.set_overloaded(true);
    let mut client = client(addr, KEY);

    let results = client.lookup(&transport(), &[GUMBLAR]);

    assert_eq!(results[GUMBLAR], Verdict::Error);
    assert_eq!(client.last_error(), Some("server error, too many requests"));
    assert_eq!(state.lookups(), 0);
}

#[test]
fn large_input_is_sent_in_two_requests() {
    let (addr, state) = start(MockConfig::new(KEY));
    let urls: Vec<String> = (1..600).map(|i| format!("http://www.gumblar.cn/{i}")).collect();
    let listed: Vec<&str> = urls.iter().map(String::as_str).collect();
    set_lists(&state, &listed, &[]);
    let mut client = client(addr, KEY);

    let report = client.lookup_report(&transport(), &urls);

    assert_eq!(report.results.len(), 599);
    assert!(report.results.values().all(|v| *v == Verdict::Malware));
    assert!(report.is_complete());
    assert_eq!(report.chunks.len(), 2);
    assert_eq!(report.chunks[0].len, 500);
    assert_eq!(report.chunks[1].len, 99);
    assert_eq!(state.lookups(), 2);
}

#[test]
fn unreachable_server_is_an_error_verdict() {
    // bind and drop to get a port nothing listens on
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let mut client = client(addr, KEY);

    let report = client.lookup_report(&transport(), &[GUMBLAR]);

    assert_eq!(report.results[GUMBLAR], Verdict::Error);
    assert!(matches!(
        report.chunks[0].failure,
        Some(LookupFailure::Transport(_))
    ));
    assert_eq!(client.last_error(), Some("unexpected server response"));
}
