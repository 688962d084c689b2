use std::env;
use std::sync::{Mutex, OnceLock};

use dealdesk_cli::commands::{config, doctor, seed};
use serde_json::Value;

#[test]
fn seed_loads_deterministic_fixtures() {
    with_env(
        &[("DEALDESK_DATABASE_URL", "sqlite::memory:"), ("DEALDESK_DATABASE_MAX_CONNECTIONS", "1")],
        || {
            let result = seed::run();
            assert_eq!(result.exit_code, 0, "expected seed success: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "seed");
            assert_eq!(payload["status"], "ok");

            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains("t-demo"));
            assert!(message.contains("4 products"));
            assert!(message.contains("2 active rules"));
            assert!(message.contains("3661.00"));
        },
    );
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_env(
        &[("DEALDESK_DATABASE_URL", "sqlite::memory:"), ("DEALDESK_DATABASE_MAX_CONNECTIONS", "1")],
        || {
            let first = seed::run();
            assert_eq!(first.exit_code, 0, "first run: {}", first.output);
            let second = seed::run();
            assert_eq!(second.exit_code, 0, "second run: {}", second.output);

            let first_payload = parse_payload(&first.output);
            let second_payload = parse_payload(&second.output);
            assert_eq!(first_payload["message"], second_payload["message"]);
        },
    );
}

#[test]
fn doctor_passes_with_in_memory_database() {
    with_env(
        &[("DEALDESK_DATABASE_URL", "sqlite::memory:"), ("DEALDESK_DATABASE_MAX_CONNECTIONS", "1")],
        || {
            let report: Value =
                serde_json::from_str(&doctor::run(true)).expect("doctor emits valid JSON");
            assert_eq!(report["overall_status"], "pass", "report: {report}");

            let checks = report["checks"].as_array().expect("checks array");
            assert_eq!(checks.len(), 3);
            assert!(checks.iter().all(|check| check["status"] == "pass"));
        },
    );
}

#[test]
fn doctor_skips_downstream_checks_on_config_failure() {
    with_env(&[("DEALDESK_LOG_FORMAT", "yaml")], || {
        let report: Value =
            serde_json::from_str(&doctor::run(true)).expect("doctor emits valid JSON");
        assert_eq!(report["overall_status"], "fail");

        let checks = report["checks"].as_array().expect("checks array");
        assert_eq!(checks[0]["name"], "config_validation");
        assert_eq!(checks[0]["status"], "fail");
        assert!(checks.iter().skip(1).all(|check| check["status"] == "skipped"));
    });
}

#[test]
fn config_attributes_env_overrides_and_redacts_the_api_key() {
    with_env(
        &[
            ("DEALDESK_DATABASE_URL", "sqlite::memory:"),
            ("DEALDESK_EXTRACTION_API_KEY", "sk-integration-secret"),
        ],
        || {
            let output = config::run();

            assert!(output.contains(
                "- database.url = sqlite::memory: (source: env (DEALDESK_DATABASE_URL))"
            ));
            assert!(output
                .contains("- extraction.api_key = <redacted> (source: env (DEALDESK_EXTRACTION_API_KEY))"));
            assert!(!output.contains("sk-integration-secret"));
            assert!(output.contains("- logging.level = info (source: default)"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "DEALDESK_CONFIG",
        "DEALDESK_DATABASE_URL",
        "DEALDESK_DATABASE_MAX_CONNECTIONS",
        "DEALDESK_EXTRACTION_BASE_URL",
        "DEALDESK_EXTRACTION_API_KEY",
        "DEALDESK_EXTRACTION_TIMEOUT_SECS",
        "DEALDESK_LOG_LEVEL",
        "DEALDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
