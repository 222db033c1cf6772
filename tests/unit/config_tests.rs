use serial_test::serial;
use shift_orchestrator::config::GlobalConfig;
use shift_orchestrator::AppError;

const REQUIRED: [(&str, &str); 7] = [
    ("OPENAI_API_KEY", "sk-test"),
    ("LAMBDA_GET_SCHEDULE", "http://backend/getScheduleStarted"),
    ("LAMBDA_UPDATE_SCHEDULE", "http://backend/updateWorkScheduleResponse"),
    ("LAMBDA_UPDATE_CLINICAL", "http://backend/updateClinicalData"),
    ("LAMBDA_UPDATE_SUMMARY", "http://backend/updatereportsummaryad"),
    ("LAMBDA_GET_NOTE_REPORT", "http://backend/getNoteReport"),
    ("N8N_WEBHOOK_URL", "http://n8n/webhook"),
];

const OPTIONAL: [&str; 8] = [
    "HTTP_PORT",
    "STATE_STORE_PATH",
    "OPENAI_BASE_URL",
    "INTENT_MODEL",
    "EXTRACTOR_MODEL",
    "TIMEOUT_LAMBDAS",
    "MAX_RETRIES",
    "LOG_LEVEL",
];

fn set_required() {
    for (key, value) in REQUIRED {
        std::env::set_var(key, value);
    }
}

fn clear_all() {
    for (key, _) in REQUIRED {
        std::env::remove_var(key);
    }
    for key in OPTIONAL {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn loads_with_defaults_when_only_required_keys_are_set() {
    clear_all();
    set_required();

    let config = GlobalConfig::from_env().expect("load");
    assert_eq!(config.http_port, 8080);
    assert_eq!(config.backend.timeout_secs, 30);
    assert_eq!(config.backend.max_retries, 3);
    assert_eq!(config.request_deadline_secs, 45);
    assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
    assert_eq!(config.log_level, "info");

    clear_all();
}

#[test]
#[serial]
fn missing_required_key_names_the_variable() {
    clear_all();
    set_required();
    std::env::remove_var("N8N_WEBHOOK_URL");

    let err = GlobalConfig::from_env().expect_err("must fail");
    match err {
        AppError::Config(msg) => assert!(msg.contains("N8N_WEBHOOK_URL"), "got {msg}"),
        other => panic!("expected config error, got {other:?}"),
    }

    clear_all();
}

#[test]
#[serial]
fn numeric_overrides_are_parsed() {
    clear_all();
    set_required();
    std::env::set_var("HTTP_PORT", "9090");
    std::env::set_var("TIMEOUT_LAMBDAS", "10");
    std::env::set_var("MAX_RETRIES", "1");

    let config = GlobalConfig::from_env().expect("load");
    assert_eq!(config.http_port, 9090);
    assert_eq!(config.backend.timeout_secs, 10);
    assert_eq!(config.backend.max_retries, 1);

    clear_all();
}

#[test]
#[serial]
fn invalid_numeric_value_fails_with_the_key_name() {
    clear_all();
    set_required();
    std::env::set_var("TIMEOUT_LAMBDAS", "trinta");

    let err = GlobalConfig::from_env().expect_err("must fail");
    match err {
        AppError::Config(msg) => assert!(msg.contains("TIMEOUT_LAMBDAS"), "got {msg}"),
        other => panic!("expected config error, got {other:?}"),
    }

    clear_all();
}

#[test]
#[serial]
fn zero_timeout_is_rejected_by_validation() {
    clear_all();
    set_required();
    std::env::set_var("TIMEOUT_LAMBDAS", "0");

    let err = GlobalConfig::from_env().expect_err("must fail");
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");

    clear_all();
}
