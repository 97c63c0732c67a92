use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_when_nothing_is_set() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.license_key, "");
    assert_eq!(cfg.model, Model::Gpt3);
    assert_eq!(cfg.orientation, Orientation::LeftRight);
    assert_eq!(
        cfg.timeouts,
        Timeouts { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    );
}

#[test]
fn overrides_are_parsed() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[
        ("FLOWSKETCH_BASE_URL", "https://diagrams.example.test/"),
        ("FLOWSKETCH_LICENSE_KEY", "abc-123"),
        ("FLOWSKETCH_MODEL", "gpt4"),
        ("FLOWSKETCH_ORIENTATION", "td"),
        ("FLOWSKETCH_REQUEST_TIMEOUT_SECS", "42"),
        ("FLOWSKETCH_CONNECT_TIMEOUT_SECS", "7"),
    ]))
    .unwrap();
    assert_eq!(cfg.base_url, "https://diagrams.example.test");
    assert_eq!(cfg.license_key, "abc-123");
    assert_eq!(cfg.model, Model::Gpt4);
    assert_eq!(cfg.orientation, Orientation::TopBottom);
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 42, connect_secs: 7 });
}

#[test]
fn unknown_model_is_rejected() {
    let err = ClientConfig::from_lookup(lookup_from(&[("FLOWSKETCH_MODEL", "gpt5")])).unwrap_err();
    assert!(err.to_string().contains("gpt5"));
    assert_eq!(err.error_code(), "E_CONFIG_PARSE");
}

#[test]
fn unknown_orientation_is_rejected() {
    let err = ClientConfig::from_lookup(lookup_from(&[("FLOWSKETCH_ORIENTATION", "diagonal")])).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(ref msg) if msg.contains("diagonal")));
}

#[test]
fn unparseable_timeouts_fall_back_to_defaults() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[("FLOWSKETCH_REQUEST_TIMEOUT_SECS", "soon")])).unwrap();
    assert_eq!(cfg.timeouts.request_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
}
