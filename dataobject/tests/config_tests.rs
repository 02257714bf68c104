use dataobject::config::{AmbiguityPolicy, CodecConfig};
use dataobject::namespace::Namespace;
use dataobject::{Config, Error};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const FULL: &str = r#"
[[namespaces]]
id = "scout"
order = 20.0

[[namespaces]]
id = "crm"
order = 10.0

[codec]
type_name_key = "@type"
pretty = true

[registry]
ambiguous_replacements = "warn"
"#;

#[test]
fn parses_every_section() {
    let config = Config::from_toml_str(FULL).unwrap();
    assert_eq!(
        config.namespaces,
        vec![Namespace::new("scout", 20.0), Namespace::new("crm", 10.0)]
    );
    assert_eq!(config.codec.type_name_key, "@type");
    assert_eq!(config.codec.type_version_key, "_typeVersion");
    assert!(config.codec.pretty);
    assert_eq!(config.registry.ambiguous_replacements, AmbiguityPolicy::Warn);
}

#[test]
fn empty_file_yields_defaults() {
    let config = Config::from_toml_str("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.codec, CodecConfig::default());
    assert_eq!(config.codec.contributions_key, "_contributions");
    assert_eq!(config.registry.ambiguous_replacements, AmbiguityPolicy::Fail);
}

#[test]
fn namespace_order_defaults_to_zero() {
    let config = Config::from_toml_str("[[namespaces]]\nid = \"crm\"\n").unwrap();
    assert_eq!(config.namespaces, vec![Namespace::new("crm", 0.0)]);
}

#[test]
fn namespaces_are_sorted_and_unique() {
    let config = Config::from_toml_str(FULL).unwrap();
    let namespaces = config.namespaces().unwrap();
    let ids: Vec<&str> = namespaces.all().iter().map(|ns| ns.id.as_str()).collect();
    assert_eq!(ids, vec!["crm", "scout"]);

    let duplicated = Config {
        namespaces: vec![Namespace::new("crm", 1.0), Namespace::new("crm", 2.0)],
        ..Config::default()
    };
    assert!(matches!(duplicated.namespaces(), Err(Error::Configuration(_))));
}

#[test]
fn invalid_policy_is_rejected() {
    let result = Config::from_toml_str("[registry]\nambiguous_replacements = \"maybe\"\n");
    assert!(matches!(result, Err(Error::Config(_))));
}

// ── files ────────────────────────────────────────────────────────

#[test]
fn read_from_parses_a_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataobject.toml");
    fs::write(&path, FULL).unwrap();
    let config = Config::read_from(&path).unwrap();
    assert_eq!(config, Config::from_toml_str(FULL).unwrap());
}

#[test]
fn read_from_reports_missing_and_broken_files() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.toml");
    assert!(matches!(Config::read_from(&missing), Err(Error::Io(_))));

    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "namespaces = 3").unwrap();
    assert!(matches!(Config::read_from(&broken), Err(Error::Config(_))));
}

#[test]
fn load_from_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    assert_eq!(Config::load_from(&dir.path().join("missing.toml")), Config::default());

    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "[codec\n").unwrap();
    assert_eq!(Config::load_from(&broken), Config::default());

    let good = dir.path().join("good.toml");
    fs::write(&good, FULL).unwrap();
    assert_eq!(Config::load_from(&good), Config::from_toml_str(FULL).unwrap());
}

#[test]
fn config_round_trips_through_toml() {
    let config = Config::from_toml_str(FULL).unwrap();
    let text = toml::to_string(&config).unwrap();
    assert_eq!(Config::from_toml_str(&text).unwrap(), config);
}
