use std::{fs, path::Path, str::FromStr};

use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "history_bridge.toml";
const ENV_PREFIX: &str = "HISTORY_BRIDGE__";

/// What `getAvatars` does when the repository has no recognizable origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingOriginPolicy {
    /// Fail the command with a regular error envelope.
    #[default]
    Normalize,
    /// Push an uncorrelated `{cmd: "error"}` notice and answer with an empty
    /// success envelope.
    DirectPush,
}

impl FromStr for MissingOriginPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normalize" => Ok(Self::Normalize),
            "direct_push" | "direct-push" => Ok(Self::DirectPush),
            other => Err(format!("unknown missing origin policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub log_filter: String,
    pub default_page_size: u64,
    pub missing_origin_policy: MissingOriginPolicy,
    pub github_api_url: String,
    pub gravatar_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "info".into(),
            default_page_size: 30,
            missing_origin_policy: MissingOriginPolicy::Normalize,
            github_api_url: "https://api.github.com".into(),
            gravatar_url: "https://www.gravatar.com/avatar".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = load_settings_from(Path::new(SETTINGS_FILE));
    apply_overrides(&mut settings, |key| {
        std::env::var(format!("{ENV_PREFIX}{}", key.to_ascii_uppercase())).ok()
    });
    settings
}

/// Reads flat `key = value` settings from `path`, keeping defaults for
/// anything missing or unparseable. A missing file yields the defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    let mut settings = Settings::default();

    let Ok(raw) = fs::read_to_string(path) else {
        return settings;
    };
    let table = match raw.parse::<toml::Table>() {
        Ok(table) => table,
        Err(err) => {
            warn!(path = %path.display(), "ignoring unreadable settings file: {err}");
            return settings;
        }
    };

    apply_overrides(&mut settings, |key| {
        table.get(key).map(|value| match value {
            toml::Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    });
    settings
}

fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("log_filter") {
        settings.log_filter = v;
    }
    if let Some(v) = lookup("default_page_size") {
        match v.trim().parse::<u64>() {
            Ok(parsed) if parsed > 0 => settings.default_page_size = parsed,
            _ => warn!(value = %v, "ignoring invalid default_page_size"),
        }
    }
    if let Some(v) = lookup("missing_origin_policy") {
        match v.parse::<MissingOriginPolicy>() {
            Ok(policy) => settings.missing_origin_policy = policy,
            Err(err) => warn!("{err}"),
        }
    }
    if let Some(v) = lookup("github_api_url") {
        settings.github_api_url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = lookup("gravatar_url") {
        settings.gravatar_url = v.trim_end_matches('/').to_string();
    }
}
