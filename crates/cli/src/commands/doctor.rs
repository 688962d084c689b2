use dealdesk_core::config::AppConfig;
use dealdesk_core::config::LoadOptions;
use dealdesk_db::{connect_with_settings, SqliteDocumentStore};
use secrecy::ExposeSecret;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_document_store(&config));
            checks.push(check_extraction_endpoint(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "document_store_connectivity",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "extraction_endpoint_configured",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_document_store(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "document_store_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        let store = SqliteDocumentStore::new(pool.clone());
        store
            .ensure_schema()
            .await
            .map_err(|error| format!("failed to apply document schema: {error}"))?;

        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "document_store_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected and schema verified using `{}`", config.database.url),
        },
        Err(error) => DoctorCheck {
            name: "document_store_connectivity",
            status: CheckStatus::Fail,
            details: error,
        },
    }
}

fn check_extraction_endpoint(config: &AppConfig) -> DoctorCheck {
    // Connectivity to the extraction service is not probed here; extraction
    // is tier-gated and billed per call. The doctor only verifies the
    // endpoint is plausibly configured.
    if !config.extraction.base_url.starts_with("http://")
        && !config.extraction.base_url.starts_with("https://")
    {
        return DoctorCheck {
            name: "extraction_endpoint_configured",
            status: CheckStatus::Fail,
            details: format!(
                "extraction.base_url `{}` is not an http(s) endpoint",
                config.extraction.base_url
            ),
        };
    }

    let key_state = match &config.extraction.api_key {
        Some(key) if !key.expose_secret().trim().is_empty() => "api key present",
        _ => "no api key configured",
    };
    DoctorCheck {
        name: "extraction_endpoint_configured",
        status: CheckStatus::Pass,
        details: format!("endpoint `{}` ({key_state})", config.extraction.base_url),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
