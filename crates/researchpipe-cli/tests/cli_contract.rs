use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

const CONFIG_ENV: &[&str] = &[
    "RESEARCHPIPE_ENV_FILE",
    "RESEARCHPIPE_CONFIG",
    "RESEARCHPIPE_LLM__API_KEY",
    "RESEARCHPIPE_LLM__MODEL",
    "RESEARCHPIPE_RESEARCH__MAX_SOURCES",
];

fn researchpipe(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("researchpipe"));
    cmd.current_dir(dir);
    for k in CONFIG_ENV {
        cmd.env_remove(k);
    }
    cmd
}

#[test]
fn version_json_contract() {
    let tmp = tempfile::tempdir().unwrap();
    let out = researchpipe(tmp.path()).arg("version").output().unwrap();
    assert!(out.status.success(), "researchpipe version failed");
    let v: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("parse version json");
    assert_eq!(v["kind"].as_str(), Some("version"));
    assert_eq!(v["name"].as_str(), Some("researchpipe"));
    assert!(!v["version"].as_str().unwrap_or("").is_empty());
}

#[test]
fn version_text_contract() {
    let tmp = tempfile::tempdir().unwrap();
    researchpipe(tmp.path())
        .args(["version", "--output", "text"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("researchpipe "));
}

#[test]
fn config_merges_file_and_env_and_masks_the_api_key() {
    let tmp = tempfile::tempdir().unwrap();
    let mut f = std::fs::File::create(tmp.path().join("researchpipe.toml")).unwrap();
    writeln!(
        f,
        r#"
[llm]
provider = "openai_compat"
api_key = "sk-very-secret"

[research]
max_sources = 3
"#
    )
    .unwrap();

    let out = researchpipe(tmp.path())
        .arg("config")
        .env("RESEARCHPIPE_RESEARCH__MAX_SOURCES", "5")
        .output()
        .unwrap();
    assert!(out.status.success(), "researchpipe config failed");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(!stdout.contains("sk-very-secret"));
    let v: serde_json::Value = serde_json::from_str(&stdout).expect("parse config json");
    assert_eq!(v["llm"]["provider"].as_str(), Some("openai_compat"));
    assert_eq!(v["llm"]["api_key"].as_str(), Some("***"));
    assert_eq!(v["research"]["max_sources"].as_u64(), Some(5));
    assert_eq!(v["research"]["content_limit"].as_u64(), Some(4096));
    assert_eq!(v["search"]["engine"].as_str(), Some("duckduckgo"));
}

#[test]
fn env_file_fills_unset_variables_only() {
    let tmp = tempfile::tempdir().unwrap();
    let env_file = tmp.path().join("keys.env");
    std::fs::write(
        &env_file,
        "RESEARCHPIPE_LLM__MODEL=from-file\nRESEARCHPIPE_RESEARCH__MAX_SOURCES=4\n",
    )
    .unwrap();

    let out = researchpipe(tmp.path())
        .arg("config")
        .env("RESEARCHPIPE_ENV_FILE", &env_file)
        .env("RESEARCHPIPE_LLM__MODEL", "from-process")
        .output()
        .unwrap();
    assert!(out.status.success(), "researchpipe config failed");
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["llm"]["model"].as_str(), Some("from-process"));
    assert_eq!(v["research"]["max_sources"].as_u64(), Some(4));
}

#[test]
fn invalid_config_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    researchpipe(tmp.path())
        .arg("config")
        .env("RESEARCHPIPE_RESEARCH__MAX_SOURCES", "0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_sources"));
}

#[test]
fn research_rejects_an_empty_query_before_any_network_call() {
    let tmp = tempfile::tempdir().unwrap();
    researchpipe(tmp.path())
        .args(["research", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty"));
}
