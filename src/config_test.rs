use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn from_lookup_defaults() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.poll_interval, Duration::from_millis(2000));
    assert_eq!(cfg.max_upload_bytes, 50 * 1024 * 1024);
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 60, connect_secs: 10 });
}

#[test]
fn from_lookup_parses_overrides() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[
        ("DOCDESK_BASE_URL", "https://docs.example.test/"),
        ("DOCDESK_TOKEN_FILE", "/tmp/docdesk-token"),
        ("DOCDESK_POLL_INTERVAL_MS", "500"),
        ("DOCDESK_MAX_UPLOAD_MB", "5"),
        ("DOCDESK_REQUEST_TIMEOUT_SECS", "42"),
        ("DOCDESK_CONNECT_TIMEOUT_SECS", "7"),
    ]))
    .unwrap();
    assert_eq!(cfg.base_url, "https://docs.example.test");
    assert_eq!(cfg.token_file, Some(PathBuf::from("/tmp/docdesk-token")));
    assert_eq!(cfg.poll_interval, Duration::from_millis(500));
    assert_eq!(cfg.max_upload_bytes, 5 * 1024 * 1024);
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 42, connect_secs: 7 });
}

#[test]
fn from_lookup_ignores_unparseable_numbers() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[("DOCDESK_POLL_INTERVAL_MS", "soon")])).unwrap();
    assert_eq!(cfg.poll_interval, Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
}

#[test]
fn from_lookup_rejects_non_http_base_url() {
    let err = ClientConfig::from_lookup(lookup_from(&[("DOCDESK_BASE_URL", "ftp://x")])).unwrap_err();
    assert!(err.to_string().contains("invalid base URL"));
}

#[test]
fn with_base_url_trims_trailing_slash() {
    let cfg = ClientConfig::default().with_base_url("http://localhost:8080///").unwrap();
    assert_eq!(cfg.base_url, "http://localhost:8080");
}
