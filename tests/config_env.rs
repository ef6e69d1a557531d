// tests/config_env.rs
// Mutates process env and CWD; serialized with serial_test.

use std::{env, fs, path::PathBuf};

use market_news_enricher::config::AiProviderKind;
use market_news_enricher::{LoadPolicy, Settings};

/// Small RAII helper to snapshot & restore env vars in each test.
struct EnvSnapshot {
    saved: Vec<(String, Option<String>)>,
}
impl EnvSnapshot {
    /// Provide a list of (KEY, Some(VALUE)) to set, or (KEY, None) to remove.
    fn set(pairs: &[(&str, Option<&str>)]) -> Self {
        let mut saved = Vec::with_capacity(pairs.len());
        for (k, v) in pairs {
            let key = k.to_string();
            saved.push((key.clone(), env::var(k).ok()));
            match v {
                Some(val) => env::set_var(&key, val),
                None => env::remove_var(&key),
            }
        }
        Self { saved }
    }
}
impl Drop for EnvSnapshot {
    fn drop(&mut self) {
        for (k, maybe_v) in self.saved.drain(..) {
            match maybe_v {
                Some(v) => env::set_var(&k, v),
                None => env::remove_var(&k),
            }
        }
    }
}

const KEYS: &[&str] = &[
    "NEWS_CONFIG_PATH",
    "NEWS_FILE_PATH",
    "NEWS_MAX_ITEMS",
    "NEWS_MAX_AGE_SECS",
    "NEWS_TREAT_CORRUPT_AS_EMPTY",
    "AI_PROVIDER",
    "ANALYSIS_VERSION",
    "MAX_ARTICLES_PER_RUN",
    "OPENAI_API_KEY",
    "GEMINI_API_KEY",
    "ANALYZE_CONCURRENCY",
];

fn cleared(extra: &[(&str, Option<&str>)]) -> EnvSnapshot {
    let mut pairs: Vec<(&str, Option<&str>)> = KEYS.iter().map(|k| (*k, None)).collect();
    pairs.extend_from_slice(extra);
    EnvSnapshot::set(&pairs)
}

#[serial_test::serial]
#[test]
fn defaults_without_file_or_env() {
    let _env = cleared(&[]);
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    let cfg = Settings::load(None).unwrap();
    assert_eq!(cfg.store.path, PathBuf::from("news/top.json"));
    assert_eq!(cfg.retention.max_items, 1000);
    assert_eq!(cfg.analyze.max_per_run, 50);
    assert_eq!(cfg.analyze.schema_version, 2);
    assert_eq!(cfg.analyze.provider, AiProviderKind::OpenAi);
    assert!(cfg.analyze.api_key.is_empty());

    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn config_path_env_then_env_overrides() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("news.toml");
    fs::write(
        &p,
        r#"
[store]
path = "from-file.json"
treat_corrupt_as_empty = true

[analyze]
provider = "gemini"
max_per_run = 5
"#,
    )
    .unwrap();
    let p_str = p.display().to_string();
    let _env = cleared(&[
        ("NEWS_CONFIG_PATH", Some(p_str.as_str())),
        ("MAX_ARTICLES_PER_RUN", Some("12")),
        ("GEMINI_API_KEY", Some("g-secret")),
        ("ANALYZE_CONCURRENCY", Some("0")),
    ]);

    let cfg = Settings::load(None).unwrap();
    assert_eq!(cfg.store.path, PathBuf::from("from-file.json"));
    assert_eq!(cfg.analyze.provider, AiProviderKind::Gemini);
    assert_eq!(cfg.analyze.max_per_run, 12);
    assert_eq!(cfg.analyze.api_key, "g-secret");
    assert_eq!(cfg.analyze.concurrency, 1);

    let store = cfg.news_store();
    assert_eq!(store.path(), PathBuf::from("from-file.json").as_path());
    assert_eq!(store.policy(), LoadPolicy::TreatAsEmpty);
}

#[serial_test::serial]
#[test]
fn missing_config_path_env_is_an_error() {
    let _env = cleared(&[("NEWS_CONFIG_PATH", Some("/definitely/not/here.toml"))]);
    assert!(Settings::load(None).is_err());
}
