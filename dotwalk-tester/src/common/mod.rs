use anyhow::{Context, Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

use dotwalk_core::{Viewport, WalkerConfig};

pub mod scenario;

static VIEWPORT_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*[xX×]\s*(\d+(?:\.\d+)?)\s*$").ok());

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Parse a `WIDTHxHEIGHT` string such as `1280x720`.
pub fn parse_viewport(raw: &str) -> Result<Viewport> {
    let pattern = VIEWPORT_PATTERN
        .as_ref()
        .ok_or_else(|| anyhow!("viewport pattern failed to compile"))?;
    let caps = pattern
        .captures(raw)
        .with_context(|| format!("viewport must look like 1280x720 (got '{raw}')"))?;
    let width: f64 = caps[1]
        .parse()
        .with_context(|| format!("invalid viewport width in '{raw}'"))?;
    let height: f64 = caps[2]
        .parse()
        .with_context(|| format!("invalid viewport height in '{raw}'"))?;
    anyhow::ensure!(
        width > 0.0 && height > 0.0,
        "viewport extents must be positive (got '{raw}')"
    );
    Ok(Viewport::new(width, height))
}

/// Load a walker configuration from a JSON file, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<WalkerConfig> {
    let Some(path) = path else {
        return Ok(WalkerConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    WalkerConfig::from_json(&raw).with_context(|| format!("invalid config {}", path.display()))
}
