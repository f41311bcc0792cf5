use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const APP_JSON: &str = "app.json";
const CONFIG_SCHEMA: u64 = 1;
pub const DEFAULT_COLLECTION: &str = "staytracker";
pub const DEFAULT_DOCUMENT_ID: &str = "days";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const MIN_POLL_INTERVAL_MS: u64 = 250;

const API_KEY_KEYS: &[&str] = &[
    "STAYTRACKER_FIREBASE_API_KEY",
    "FIREBASE_API_KEY",
    "VITE_FIREBASE_API_KEY",
];
const PROJECT_ID_KEYS: &[&str] = &[
    "STAYTRACKER_FIREBASE_PROJECT_ID",
    "FIREBASE_PROJECT_ID",
    "VITE_FIREBASE_PROJECT_ID",
];
const AUTH_DOMAIN_KEYS: &[&str] = &[
    "STAYTRACKER_FIREBASE_AUTH_DOMAIN",
    "FIREBASE_AUTH_DOMAIN",
    "VITE_FIREBASE_AUTH_DOMAIN",
];
const STORAGE_BUCKET_KEYS: &[&str] = &[
    "STAYTRACKER_FIREBASE_STORAGE_BUCKET",
    "FIREBASE_STORAGE_BUCKET",
    "VITE_FIREBASE_STORAGE_BUCKET",
];
const MESSAGING_SENDER_ID_KEYS: &[&str] = &[
    "STAYTRACKER_FIREBASE_MESSAGING_SENDER_ID",
    "FIREBASE_MESSAGING_SENDER_ID",
    "VITE_FIREBASE_MESSAGING_SENDER_ID",
];
const APP_ID_KEYS: &[&str] = &[
    "STAYTRACKER_FIREBASE_APP_ID",
    "FIREBASE_APP_ID",
    "VITE_FIREBASE_APP_ID",
];

/// Connection parameters for the Firebase project, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub auth_domain: Option<String>,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub schema: u8,
    pub collection: String,
    pub document_id: String,
    pub poll_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            schema: CONFIG_SCHEMA as u8,
            collection: DEFAULT_COLLECTION.to_string(),
            document_id: DEFAULT_DOCUMENT_ID.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timezone: None,
        }
    }
}

impl AppSettings {
    pub fn validate(&self) -> Result<(), InfraError> {
        validate_path_segment(&self.collection, "collection")?;
        validate_path_segment(&self.document_id, "documentId")?;
        self.time_zone()?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    pub fn time_zone(&self) -> Result<Option<Tz>, InfraError> {
        let Some(name) = self
            .timezone
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        else {
            return Ok(None);
        };
        name.parse::<Tz>()
            .map(Some)
            .map_err(|_| InfraError::InvalidConfig(format!("unknown timezone: {name}")))
    }
}

fn validate_path_segment(value: &str, field: &str) -> Result<(), InfraError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InfraError::InvalidConfig(format!("{field} must not be empty")));
    }
    if value.contains('/') {
        return Err(InfraError::InvalidConfig(format!(
            "{field} must be a single path segment"
        )));
    }
    Ok(())
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppSettings::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != CONFIG_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_settings(config_dir: &Path) -> Result<AppSettings, InfraError> {
    let settings: AppSettings = serde_json::from_value(read_config(&config_dir.join(APP_JSON))?)?;
    settings.validate()?;
    Ok(settings)
}

pub fn load_firebase_config_from_env() -> Result<FirebaseConfig, InfraError> {
    load_firebase_config_from_lookup(|key| std::env::var(key).ok())
}

pub fn load_firebase_config_from_lookup<F>(lookup: F) -> Result<FirebaseConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(FirebaseConfig {
        api_key: required_lookup_value(&lookup, API_KEY_KEYS, "firebase api key")?,
        project_id: required_lookup_value(&lookup, PROJECT_ID_KEYS, "firebase project id")?,
        auth_domain: optional_lookup_value(&lookup, AUTH_DOMAIN_KEYS),
        storage_bucket: optional_lookup_value(&lookup, STORAGE_BUCKET_KEYS),
        messaging_sender_id: optional_lookup_value(&lookup, MESSAGING_SENDER_ID_KEYS),
        app_id: optional_lookup_value(&lookup, APP_ID_KEYS),
    })
}

fn required_lookup_value<F>(
    lookup: &F,
    keys: &[&str],
    field_name: &str,
) -> Result<String, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    optional_lookup_value(lookup, keys).ok_or_else(|| {
        InfraError::InvalidConfig(format!(
            "missing {} (set one of: {})",
            field_name,
            keys.join(", ")
        ))
    })
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}
