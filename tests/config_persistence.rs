#![allow(clippy::field_reassign_with_default)]
//! Config load/save round-trip tests against isolated temp directories.

use std::fs;
use toolbox::config::{CompressConfig, Config, GatewayConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn gateway_defaults_bind_loopback_with_50mb_uploads() {
    let gateway = GatewayConfig::default();
    assert_eq!(gateway.host, "127.0.0.1");
    assert_eq!(gateway.max_upload_bytes, 50 * 1024 * 1024);
    assert_eq!(gateway.request_timeout_secs, 120);
    assert!(!gateway.allow_public_bind);
}

#[test]
fn compress_defaults_match_bisection_bounds() {
    let compress = CompressConfig::default();
    assert_eq!(compress.min_quality, 10);
    assert_eq!(compress.max_quality, 90);
    assert_eq!(compress.iterations, 7);
}

#[test]
fn upstream_defaults_point_at_public_services() {
    let config = Config::default();
    assert_eq!(config.shortener.api_url, "https://cleanuri.com");
    assert!(config.qr.api_url.contains("qrserver.com"));
    assert!(config.chat.api_url.contains("cohere"));
}

// ─────────────────────────────────────────────────────────────────────────────
// TOML parsing
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn unknown_keys_are_ignored() {
    let parsed: Config = toml::from_str(
        r#"
totally_unknown_key = "ignored"

[gateway]
port = 8088
"#,
    )
    .expect("unknown keys should be ignored");
    assert_eq!(parsed.gateway.port, 8088);
}

#[test]
fn wrong_type_for_port_fails() {
    let result: Result<Config, _> = toml::from_str("[gateway]\nport = \"not_a_number\"\n");
    assert!(result.is_err(), "string for u16 port should fail to parse");
}

#[test]
fn convert_temp_dir_is_optional() {
    let parsed: Config = toml::from_str("[convert]\ntemp_dir = \"/var/tmp/toolbox\"\n").unwrap();
    assert_eq!(
        parsed.convert.temp_dir.as_deref(),
        Some(std::path::Path::new("/var/tmp/toolbox"))
    );
    assert_eq!(parsed.convert.soffice_bin, "soffice");
}

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn load_or_init_creates_file_in_custom_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("nested").join("toolbox");

    let config = Config::load_or_init_in(&dir).await.unwrap();

    assert!(dir.join("config.toml").exists());
    assert_eq!(config.config_path, dir.join("config.toml"));
    assert_eq!(config.gateway.port, 3000);
}

#[tokio::test]
async fn edited_file_is_picked_up_on_next_load() {
    let tmp = tempfile::tempdir().unwrap();
    Config::load_or_init_in(tmp.path()).await.unwrap();

    let path = tmp.path().join("config.toml");
    let edited = fs::read_to_string(&path)
        .unwrap()
        .replace("iterations = 7", "iterations = 4");
    fs::write(&path, edited).unwrap();

    let config = Config::load_or_init_in(tmp.path()).await.unwrap();
    assert_eq!(config.compress.iterations, 4);
}

#[tokio::test]
async fn invalid_file_is_rejected_at_load() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("config.toml"),
        "[compress]\nmin_quality = 80\nmax_quality = 20\n",
    )
    .unwrap();

    let err = Config::load_or_init_in(tmp.path()).await.unwrap_err();
    assert!(err.to_string().contains("min_quality"), "{err:#}");
}

#[tokio::test]
async fn save_leaves_no_temp_files_behind() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = Config::load_or_init_in(tmp.path()).await.unwrap();
    config.gateway.max_upload_bytes = 1024;
    config.save().await.unwrap();
    config.save().await.unwrap();

    let names: Vec<String> = fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["config.toml".to_string()]);

    let reloaded = Config::load_or_init_in(tmp.path()).await.unwrap();
    assert_eq!(reloaded.gateway.max_upload_bytes, 1024);
}
