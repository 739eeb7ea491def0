use crate::cli::context::CliContext;
use crate::cli::output::{emit_structured, OutputFormat};
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use railbook_core_types::{BookingConfig, StationCode};
use railbook_scheduler::parse_schedule_time;
use railbook_state_center::JsonSettingsStore;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::info;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show current booking settings
    Show,

    /// Set a settings value (dotted keys, e.g. schedule.time)
    Set {
        /// Settings key
        key: String,

        /// Settings value (JSON, or a plain string)
        value: String,
    },

    /// Get a settings value
    Get {
        /// Settings key
        key: String,
    },

    /// Reset booking settings to defaults
    Reset,

    /// Validate booking settings
    Validate,
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    path: String,
    errors: Vec<String>,
    warnings: Vec<String>,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext, output: &OutputFormat) -> Result<()> {
    let store = ctx.settings_store();
    let path = store.path().to_path_buf();
    match args.action {
        ConfigAction::Show => {
            let config = load_settings(&store)?;
            if !emit_structured(&config, output)? {
                println!("Booking settings ({}):", path.display());
                print!("{}", serde_yaml::to_string(&config)?);
            }
        }
        ConfigAction::Set { key, value } => {
            let current = load_settings(&store)?;
            let segments = split_key(&key)?;
            let updated = apply_setting(&current, &segments, &value)
                .with_context(|| format!("invalid value for {key}"))?;
            store
                .try_save(&updated)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Updated booking setting {}", key);

            let json = serde_json::to_value(&updated)?;
            match get_json_value(&json, &segments) {
                Some(stored) => println!("{key} = {stored}"),
                None => println!("{key} saved"),
            }
            println!("Saved settings to {}", path.display());
        }
        ConfigAction::Get { key } => {
            let config = load_settings(&store)?;
            let json = serde_json::to_value(&config)?;
            let segments = split_key(&key)?;
            let Some(value) = get_json_value(&json, &segments) else {
                bail!("{} not found in booking settings", key);
            };
            if !emit_structured(value, output)? {
                match value {
                    JsonValue::String(text) => println!("{text}"),
                    other => println!("{other}"),
                }
            }
        }
        ConfigAction::Reset => {
            store
                .try_save(&BookingConfig::default())
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Booking settings reset to defaults and written to {}", path.display());
        }
        ConfigAction::Validate => {
            let report = if store.exists() {
                let config = store
                    .try_load()
                    .with_context(|| format!("parsing {}", path.display()))?;
                validate_settings(&config, path.display().to_string())
            } else {
                ValidationReport {
                    path: path.display().to_string(),
                    errors: Vec::new(),
                    warnings: vec!["no settings file; defaults apply".to_string()],
                }
            };
            if !emit_structured(&report, output)? {
                for warning in &report.warnings {
                    println!("warning: {warning}");
                }
                for error in &report.errors {
                    println!("error: {error}");
                }
            }
            if !report.errors.is_empty() {
                bail!("booking settings in {} are invalid", report.path);
            }
            if matches!(output, OutputFormat::Human) {
                println!("Booking settings {} are valid", report.path);
            }
        }
    }

    Ok(())
}

fn load_settings(store: &JsonSettingsStore) -> Result<BookingConfig> {
    if !store.exists() {
        return Ok(BookingConfig::default());
    }
    store
        .try_load()
        .with_context(|| format!("reading {}", store.path().display()))
}

/// Set one key and normalize the result. A raw value that parses as JSON of
/// the wrong type (e.g. a window code like `06001200`) is retried as a string.
fn apply_setting(current: &BookingConfig, path: &[&str], raw: &str) -> Result<BookingConfig> {
    let parsed = parse_cli_value(raw);
    let retry_as_string = !parsed.is_string();
    match rebuild(current, path, parsed) {
        Ok(config) => Ok(config),
        Err(_) if retry_as_string => rebuild(current, path, JsonValue::String(raw.to_string())),
        Err(err) => Err(err),
    }
}

fn rebuild(current: &BookingConfig, path: &[&str], value: JsonValue) -> Result<BookingConfig> {
    let mut json = serde_json::to_value(current)?;
    if get_json_value(&json, path).is_none() {
        bail!("unknown settings key {}", path.join("."));
    }
    set_json_value(&mut json, path, value)?;
    let config: BookingConfig = serde_json::from_value(json)?;
    Ok(config.normalized())
}

fn validate_settings(config: &BookingConfig, path: String) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (field, raw) in [("from_station", &config.from_station), ("to_station", &config.to_station)] {
        if raw.trim().is_empty() {
            continue;
        }
        if let Err(err) = StationCode::parse(raw) {
            errors.push(format!("{field}: {err}"));
        }
    }
    for field in config.missing_query_fields() {
        if field == "date" || config_field_empty(config, field) {
            warnings.push(format!("{field} is not set; searches will not be issued"));
        }
    }
    if config.schedule.enabled {
        if let Err(err) = parse_schedule_time(&config.schedule.time) {
            errors.push(format!("schedule.time: {err}"));
        }
    }
    if config.passengers.is_empty() {
        warnings.push("no passengers configured".to_string());
    }

    ValidationReport {
        path,
        errors,
        warnings,
    }
}

fn config_field_empty(config: &BookingConfig, field: &str) -> bool {
    match field {
        "from_station" => config.from_station.trim().is_empty(),
        "to_station" => config.to_station.trim().is_empty(),
        _ => false,
    }
}

fn parse_cli_value(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}

fn split_key(key: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = key
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        bail!("settings key cannot be empty");
    }
    Ok(segments)
}

fn set_json_value(target: &mut JsonValue, path: &[&str], value: JsonValue) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        bail!("settings key cannot be empty");
    };
    let mut current = target;
    for segment in parents {
        current = ensure_object(current, segment)?
            .entry((*segment).to_string())
            .or_insert(JsonValue::Null);
    }
    ensure_object(current, last)?.insert((*last).to_string(), value);
    Ok(())
}

fn ensure_object<'a>(
    value: &'a mut JsonValue,
    segment: &str,
) -> Result<&'a mut Map<String, JsonValue>> {
    if value.is_null() {
        *value = JsonValue::Object(Map::new());
    }
    match value {
        JsonValue::Object(map) => Ok(map),
        _ => bail!(
            "{} resolves to a non-object value; cannot assign nested settings",
            segment
        ),
    }
}

fn get_json_value<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let mut current = value;
    for segment in path {
        match current {
            JsonValue::Object(map) => {
                current = map.get(*segment)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_and_get_nested_keys() {
        let mut doc = json!({});
        set_json_value(&mut doc, &["schedule", "enabled"], JsonValue::Bool(true)).unwrap();
        set_json_value(&mut doc, &["schedule", "time"], JsonValue::from("09:00")).unwrap();
        assert_eq!(
            get_json_value(&doc, &["schedule", "enabled"]),
            Some(&JsonValue::Bool(true))
        );
        assert_eq!(
            get_json_value(&doc, &["schedule", "time"]),
            Some(&JsonValue::from("09:00"))
        );
        assert!(set_json_value(&mut doc, &["schedule", "time", "hour"], JsonValue::from(9)).is_err());
    }

    #[test]
    fn setting_is_normalized_before_save() {
        let updated =
            apply_setting(&BookingConfig::default(), &["query_interval_ms"], "100").unwrap();
        assert_eq!(updated.query_interval_ms, 800);

        let updated =
            apply_setting(&BookingConfig::default(), &["train_prefixes"], r#"["g"," k"]"#)
                .unwrap();
        assert_eq!(updated.train_prefixes, vec!["G", "K"]);
    }

    #[test]
    fn window_codes_fall_back_to_strings() {
        let updated = apply_setting(&BookingConfig::default(), &["time_window"], "06001200").unwrap();
        assert_eq!(updated.time_window.code(), "06001200");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(apply_setting(&BookingConfig::default(), &["seat"], "x").is_err());
    }

    #[test]
    fn validation_flags_malformed_stations_and_times() {
        let mut config = BookingConfig {
            from_station: "北京".into(),
            to_station: "上海,SHH".into(),
            ..BookingConfig::default()
        };
        config.schedule.enabled = true;
        config.schedule.time = "9h".into();

        let report = validate_settings(&config, "settings.json".into());
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].starts_with("from_station"));
        assert!(report.warnings.iter().any(|w| w.starts_with("date")));
    }
}
