use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
}

impl Config {
    /// Read `ALUMNI_*` variables from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = lookup("ALUMNI_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("ALUMNI_JWT_SECRET is unset or still a placeholder");
        }

        let db_path = lookup("ALUMNI_DB_PATH").unwrap_or_else(|| "alumni.db".into()).into();
        let host = lookup("ALUMNI_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("ALUMNI_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("ALUMNI_PORT is not a valid port")?;

        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("ALUMNI_HOST is not a valid address")?;

        Ok(Self { jwt_secret, db_path, addr })
    }
}
