//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, VideoConversion};
use crate::domain::error::ConfigError;
use crate::domain::recording::Duration;
use crate::infrastructure::encoding::KNOWN_SOURCES;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let mut config = store.load().await?;
    set_value(&mut config, key, value)?;

    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let config = store.load().await?;
    match get_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output(NOT_SET),
    }

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        presenter.key_value(
            key,
            get_value(&config, key).as_deref().unwrap_or(NOT_SET),
        );
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        Ok(())
    } else {
        Err(invalid(
            key,
            format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        ))
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Read one key as display text
fn get_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "duration" => config.duration.clone(),
        "output_dir" => config.output_dir.clone(),
        "name" => config.name.clone(),
        "video_device" => config.video_device.clone(),
        "audio_device" => config.audio_device.clone(),
        "encoder_sources" => config.encoder_sources.as_ref().map(|s| s.join(",")),
        "encoder_settle_ms" => config.encoder_settle_ms.map(|v| v.to_string()),
        "compression_level" => config.compression_level.map(|v| v.to_string()),
        "video_conversion" => config.video_conversion.clone(),
        "preview" => config.preview.map(|b| b.to_string()),
        "notify" => config.notify.map(|b| b.to_string()),
        _ => None,
    }
}

/// Validate `value` for `key` and store it
fn set_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "duration" => {
            value
                .parse::<Duration>()
                .map_err(|e| invalid(key, e.to_string()))?;
            config.duration = Some(value.to_string());
        }
        "output_dir" | "name" | "video_device" | "audio_device" => {
            if value.trim().is_empty() {
                return Err(invalid(key, "Value must not be empty"));
            }
            let value = Some(value.to_string());
            match key {
                "output_dir" => config.output_dir = value,
                "name" => config.name = value,
                "video_device" => config.video_device = value,
                _ => config.audio_device = value,
            }
        }
        "encoder_sources" => config.encoder_sources = Some(parse_sources(key, value)?),
        "encoder_settle_ms" => {
            config.encoder_settle_ms = Some(
                value
                    .parse::<u64>()
                    .map_err(|_| invalid(key, "Value must be a whole number of milliseconds"))?,
            )
        }
        "compression_level" => {
            let level = value
                .parse::<u8>()
                .ok()
                .filter(|l| *l <= 8)
                .ok_or_else(|| invalid(key, "Value must be between 0 and 8"))?;
            config.compression_level = Some(level);
        }
        "video_conversion" => {
            let conversion = value
                .parse::<VideoConversion>()
                .map_err(|message| invalid(key, message))?;
            config.video_conversion = Some(conversion.to_string());
        }
        "preview" => config.preview = Some(parse_bool_for(key, value)?),
        "notify" => config.notify = Some(parse_bool_for(key, value)?),
        _ => return Err(invalid(key, "Unknown key")),
    }
    Ok(())
}

/// Comma-separated list of known encoder sources
fn parse_sources(key: &str, value: &str) -> Result<Vec<String>, ConfigError> {
    let sources: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if sources.is_empty() {
        return Err(invalid(key, "At least one encoder source is required"));
    }
    if let Some(unknown) = sources.iter().find(|s| !KNOWN_SOURCES.contains(&s.as_str())) {
        return Err(invalid(
            key,
            format!(
                "Invalid source '{}'. Valid options: {}",
                unknown,
                KNOWN_SOURCES.join(", ")
            ),
        ));
    }
    Ok(sources)
}

fn parse_bool_for(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).map_err(|_| invalid(key, "Value must be 'true' or 'false'"))
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(()),
    }
}
