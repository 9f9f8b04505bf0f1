use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
        pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn empty_environment_uses_defaults() {
    let cfg = ChatConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg, ChatConfig::default());
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.transport, TransportMode::Stream);
    assert_eq!(
        cfg.timeouts,
        ChatTimeouts { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    );
}

#[test]
fn overrides_are_parsed() {
    let cfg = ChatConfig::from_lookup(lookup_from(&[
        ("FITCHAT_BASE_URL", "https://coach.example.test/"),
        ("FITCHAT_TRANSPORT", "json"),
        ("FITCHAT_REQUEST_TIMEOUT_SECS", "42"),
        ("FITCHAT_CONNECT_TIMEOUT_SECS", " 7 "),
    ]))
    .unwrap();

    assert_eq!(cfg.base_url, "https://coach.example.test");
    assert_eq!(cfg.transport, TransportMode::Json);
    assert_eq!(cfg.timeouts, ChatTimeouts { request_secs: 42, connect_secs: 7 });
}

#[test]
fn unknown_transport_errors() {
    let err = ChatConfig::from_lookup(lookup_from(&[("FITCHAT_TRANSPORT", "websocket")])).unwrap_err();
    assert!(err.to_string().contains("unsupported transport 'websocket'"));
}

#[test]
fn non_numeric_timeout_errors() {
    let err =
        ChatConfig::from_lookup(lookup_from(&[("FITCHAT_REQUEST_TIMEOUT_SECS", "soon")])).unwrap_err();
    assert_eq!(
        err,
        ConfigError::Parse("FITCHAT_REQUEST_TIMEOUT_SECS must be whole seconds, got 'soon'".to_owned())
    );
}
