use serial_test::serial;
use std::{fs, path::PathBuf};
use subtext_common::SchemaVersion;
use subtext_config::SubtextConfigLoader;
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn file_values_are_overridden_by_env() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(
        &tmp,
        "subtext.yaml",
        r#"
llm:
  provider: openai
  model: "gpt-4o-mini"
  api_key: "${SUBTEXT_IT_KEY}"
  temperature: 0.1
acquisition:
  min_words: 80
analysis:
  schema: v1
"#,
    );

    temp_env::with_vars(
        [
            ("SUBTEXT_IT_KEY", Some("sk-from-env")),
            ("SUBTEXT__LLM__TEMPERATURE", Some("0.4")),
            ("SUBTEXT__ACQUISITION__MAX_CHARS", Some("5000")),
        ],
        || {
            let cfg = SubtextConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load config");

            assert_eq!(cfg.llm.model, "gpt-4o-mini");
            assert_eq!(cfg.llm.resolve_api_key().as_deref(), Some("sk-from-env"));
            assert_eq!(cfg.llm.temperature, Some(0.4));
            assert_eq!(cfg.acquisition.min_words, 80);
            assert_eq!(cfg.acquisition.max_chars, 5000);
            assert_eq!(cfg.analysis.schema, SchemaVersion::V1);
            // untouched sections keep their defaults
            assert_eq!(cfg.acquisition.min_block_words, 25);
            assert!(cfg.llm.json_mode);
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let cfg = SubtextConfigLoader::new()
        .without_env()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults load");
    assert_eq!(cfg.analysis.schema, SchemaVersion::V2);
    assert_eq!(cfg.llm.max_retries, 0);
}

#[test]
#[serial]
fn missing_explicit_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let err = SubtextConfigLoader::new()
        .with_file(tmp.path().join("nope.yaml"))
        .load();
    assert!(err.is_err());
}

#[test]
#[serial]
fn invalid_values_fail_validation() {
    let err = SubtextConfigLoader::new()
        .without_env()
        .with_yaml_str("acquisition:\n  min_words: 0\n")
        .load()
        .unwrap_err();
    assert!(err.to_string().contains("min_words"), "{err}");

    let err = SubtextConfigLoader::new()
        .without_env()
        .with_yaml_str("analysis:\n  schema: v9\n")
        .load();
    assert!(err.is_err());
}

#[test]
#[serial]
fn api_key_falls_back_to_openai_env() {
    temp_env::with_var("OPENAI_API_KEY", Some("sk-default"), || {
        let cfg = SubtextConfigLoader::new().without_env().load().unwrap();
        assert_eq!(cfg.llm.resolve_api_key().as_deref(), Some("sk-default"));
    });
    temp_env::with_var("OPENAI_API_KEY", None::<&str>, || {
        let cfg = SubtextConfigLoader::new().without_env().load().unwrap();
        assert_eq!(cfg.llm.resolve_api_key(), None);
    });
}
