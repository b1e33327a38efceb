use std::{collections::HashMap, fs, path::Path};

use student_core::Settings;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "studentmgmt.toml";

/// Defaults, then the TOML file (if readable), then `APP__*` environment
/// variables.
pub fn load_settings(config_path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!("ignoring unreadable settings file: {err}");
            return;
        }
    };

    for (key, value) in file_cfg {
        let value = match value {
            toml::Value::String(v) => v,
            other => other.to_string(),
        };
        apply_value(settings, &key, &value);
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("STUDENT_SERVICE_URL") {
        settings.service_base_url = v;
    }
    for key in [
        "service_base_url",
        "create_service",
        "query_service",
        "students_path",
        "navigation_delay_ms",
        "passing_score",
        "signal_capacity",
    ] {
        if let Some(v) = lookup(&format!("APP__{}", key.to_ascii_uppercase())) {
            apply_value(settings, key, &v);
        }
    }
}

fn apply_value(settings: &mut Settings, key: &str, value: &str) {
    match key {
        "service_base_url" => settings.service_base_url = value.to_string(),
        "create_service" => settings.create_service = value.to_string(),
        "query_service" => settings.query_service = value.to_string(),
        "students_path" => settings.students_path = value.to_string(),
        "navigation_delay_ms" => match value.parse() {
            Ok(parsed) => settings.navigation_delay_ms = parsed,
            Err(_) => warn!(key, value, "ignoring non-numeric setting"),
        },
        "passing_score" => match value.parse() {
            Ok(parsed) => settings.passing_score = parsed,
            Err(_) => warn!(key, value, "ignoring non-numeric setting"),
        },
        "signal_capacity" => match value.parse() {
            Ok(parsed) => settings.signal_capacity = parsed,
            Err(_) => warn!(key, value, "ignoring non-numeric setting"),
        },
        _ => warn!(key, "ignoring unknown setting"),
    }
}
