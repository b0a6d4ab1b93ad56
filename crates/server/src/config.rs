use std::{collections::HashMap, env, fs};

use anyhow::Context;
use climate::ClimateConfig;
use url::Url;

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub public_url: String,
    pub climate: ClimateConfig,
}

/// Partner credentials come from the environment and are hard-required; the
/// process refuses to start without them. Network knobs fall back to demo
/// defaults, with an optional `partner.toml` overlay and env overrides on top.
pub fn load_settings() -> anyhow::Result<Settings> {
    let client_id = require_env("CLIMATE_API_ID")?;
    let client_secret = require_env("CLIMATE_API_SECRET")?;
    let scopes = require_env("CLIMATE_API_SCOPES")?;
    let api_key = require_env("CLIMATE_API_KEY")?;

    let mut settings = Settings {
        bind_addr: "127.0.0.1:8080".into(),
        public_url: "http://localhost:8080".into(),
        climate: ClimateConfig::new(client_id, client_secret, scopes, api_key),
    };

    if let Ok(raw) = fs::read_to_string("partner.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            apply_file_overrides(&mut settings, &file_cfg);
        }
    }

    if let Ok(v) = env::var("SERVER_BIND") {
        settings.bind_addr = v;
    }
    if let Ok(v) = env::var("PUBLIC_URL") {
        settings.public_url = v;
    }
    if let Ok(v) = env::var("CLIMATE_LOGIN_BASE") {
        settings.climate.login_base =
            Url::parse(&v).context("CLIMATE_LOGIN_BASE is not a valid URL")?;
    }
    if let Ok(v) = env::var("CLIMATE_TOKEN_URL") {
        settings.climate.token_url =
            Url::parse(&v).context("CLIMATE_TOKEN_URL is not a valid URL")?;
    }
    if let Ok(v) = env::var("CLIMATE_API_BASE") {
        settings.climate.api_base =
            Url::parse(&v).context("CLIMATE_API_BASE is not a valid URL")?;
    }

    Ok(settings)
}

fn require_env(name: &str) -> anyhow::Result<String> {
    env::var(name).with_context(|| format!("required environment variable {name} is not set"))
}

fn apply_file_overrides(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.bind_addr = v.clone();
    }
    if let Some(v) = file_cfg.get("public_url") {
        settings.public_url = v.clone();
    }
}
