use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use biogen_contracts::Locale;
use biogen_engine::gemini::GeminiSettings;

pub const DEFAULT_DATA_DIR: &str = ".biogen";
pub const ARCHIVE_FILE: &str = "archive.json";
pub const EVENTS_FILE: &str = "events.jsonl";

/// Values given on the command line; `None` defers to the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigFlags {
    pub data_dir: Option<PathBuf>,
    pub events: Option<PathBuf>,
    pub locale: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub archive_path: PathBuf,
    pub events_path: PathBuf,
    pub locale: Locale,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    pub gemini: GeminiSettings,
}

impl AppConfig {
    pub fn resolve(flags: &ConfigFlags) -> Result<Self> {
        let cwd = env::current_dir().context("cannot read working directory")?;
        Self::resolve_with(flags, &cwd, process_env)
    }

    /// Precedence per setting: flag, process environment, `.env` in the
    /// working directory, `.env` in the data directory, default.
    pub fn resolve_with(
        flags: &ConfigFlags,
        cwd: &Path,
        process: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let cwd_dotenv = parse_dotenv(&cwd.join(".env"));
        let data_dir = flags
            .data_dir
            .clone()
            .or_else(|| {
                process("BIOGEN_DATA_DIR")
                    .or_else(|| dotenv_value(&cwd_dotenv, "BIOGEN_DATA_DIR"))
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let data_dir = if data_dir.is_absolute() {
            data_dir
        } else {
            cwd.join(data_dir)
        };
        let data_dotenv = parse_dotenv(&data_dir.join(".env"));

        let lookup = |key: &str| {
            process(key)
                .or_else(|| dotenv_value(&cwd_dotenv, key))
                .or_else(|| dotenv_value(&data_dotenv, key))
        };

        let locale = match non_blank(flags.locale.as_deref()).or_else(|| lookup("BIOGEN_LOCALE")) {
            Some(raw) => raw
                .parse::<Locale>()
                .map_err(|err| anyhow!(err))
                .context("invalid locale setting")?,
            None => Locale::default(),
        };

        Ok(Self {
            archive_path: data_dir.join(ARCHIVE_FILE),
            events_path: flags
                .events
                .clone()
                .unwrap_or_else(|| data_dir.join(EVENTS_FILE)),
            locale,
            text_model: non_blank(flags.text_model.as_deref())
                .or_else(|| lookup("BIOGEN_TEXT_MODEL")),
            image_model: non_blank(flags.image_model.as_deref())
                .or_else(|| lookup("BIOGEN_IMAGE_MODEL")),
            gemini: GeminiSettings::from_lookup(lookup),
            data_dir,
        })
    }
}

fn process_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn dotenv_value(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    non_blank(vars.get(key).map(String::as_str))
}

/// `KEY=value` lines; `#` comments, `export ` prefixes and one layer of
/// matching quotes are accepted. A missing file is empty.
pub fn parse_dotenv(path: &Path) -> HashMap<String, String> {
    let content = std::fs::read_to_string(path).unwrap_or_default();
    let mut vars = HashMap::new();
    for raw_line in content.lines() {
        let mut line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("export ") {
            line = stripped.trim();
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let mut value = value.trim();
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        vars.insert(key.to_string(), value.to_string());
    }
    vars
}
