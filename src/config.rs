use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::client::ClientConfig;

pub(crate) const DEFAULT_URL: &str = "https://opendata.aemet.es/opendata/api";

#[derive(Debug, Default, PartialEq)]
struct RcConfig {
    url: Option<String>,
    key: Option<String>,
}

pub(crate) fn load_config(url: Option<String>, token: Option<String>) -> Result<ClientConfig> {
    load_config_with(url, token, non_empty_env, rc_candidates())
}

/// Same as [`load_config`] with the environment lookup and the rc search
/// path supplied by the caller.
fn load_config_with<E>(
    url: Option<String>,
    token: Option<String>,
    env: E,
    rc_candidates: Vec<PathBuf>,
) -> Result<ClientConfig>
where
    E: Fn(&str) -> Option<String>,
{
    let mut url = url.or_else(|| env("AEMET_API_URL"));
    let mut token = token.or_else(|| env("AEMET_API_TOKEN"));

    if url.is_none() || token.is_none() {
        for rc_path in &rc_candidates {
            if rc_path.exists() {
                let cfg = read_rc(rc_path).with_context(|| {
                    format!("failed to read configuration file {}", rc_path.display())
                })?;

                if url.is_none() {
                    url = cfg.url;
                }
                if token.is_none() {
                    token = cfg.key;
                }
                break;
            }
        }
    }

    let token = match token {
        Some(v) => v,
        None => {
            if !rc_candidates.is_empty() {
                bail!(
                    "Missing configuration: API token (set AEMET_API_TOKEN or put `key:` in one of: {})",
                    rc_candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            bail!("Missing configuration: API token (set AEMET_API_TOKEN or create .aemetrc)");
        }
    };

    Ok(ClientConfig {
        url: url.unwrap_or_else(|| DEFAULT_URL.to_string()),
        token,
    })
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Split on the first colon only: urls carry their own.
        if let Some((k, v)) = line.split_once(':') {
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                continue;
            }
            match k.trim() {
                "url" => cfg.url = Some(v.to_string()),
                "key" | "token" => cfg.key = Some(v.to_string()),
                _ => {}
            }
        }
    }

    cfg
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) AEMET_RC (explicit)
    // 2) ./.aemetrc
    // 3) ~/.aemetrc
    if let Ok(p) = std::env::var("AEMET_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".aemetrc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".aemetrc"));
    }
    v
}
