//! Runtime configuration, layered from defaults, an optional TOML file and
//! `MARQUEE_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use marquee_api::{
  Environment,
  auth::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS},
};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                   String,
  pub port:                   u16,
  pub database_path:          PathBuf,
  pub environment:            Environment,
  pub jwt_secret:             String,
  pub access_token_ttl_secs:  i64,
  pub refresh_token_ttl_secs: i64,
}

impl ServerConfig {
  pub fn load(file: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 3000)?
      .set_default("database_path", "marquee.db")?
      .set_default("environment", "development")?
      .set_default("jwt_secret", "")?
      .set_default("access_token_ttl_secs", DEFAULT_ACCESS_TTL_SECS)?
      .set_default("refresh_token_ttl_secs", DEFAULT_REFRESH_TTL_SECS)?
      .add_source(config::File::from(file).required(false))
      .add_source(config::Environment::with_prefix("MARQUEE"))
      .build()
      .context("failed to read configuration")?;

    let cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.check()?;
    Ok(cfg)
  }

  fn check(&self) -> anyhow::Result<()> {
    if self.jwt_secret.is_empty() {
      if self.environment == Environment::Production {
        anyhow::bail!("jwt_secret must be set in production");
      }
      tracing::warn!("jwt_secret is empty; tokens are signed with an empty key");
    }
    if self.access_token_ttl_secs <= 0 || self.refresh_token_ttl_secs <= 0 {
      anyhow::bail!("token lifetimes must be positive");
    }
    Ok(())
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}
