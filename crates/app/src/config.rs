use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub index_dir: PathBuf,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub index_refresh_interval: Duration,
    pub request_timeout: Duration,
    pub max_search_limit: usize,
    pub max_list_limit: usize,
    pub feed_capacity: usize,
    pub cookie_secret: Option<String>,
    pub cookie_secure: bool,
    pub admin_password_hash: Option<String>,
    pub admin_token_secret: Option<String>,
    pub cors_allow_origins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid socket address: {0}")]
    InvalidSocket(String),
    #[error("invalid integer for {0}: {1}")]
    InvalidNumber(&'static str, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr_raw = read_string("QUOTTIT_HTTP_ADDR", "127.0.0.1:8080");
        let http_addr = http_addr_raw
            .parse()
            .map_err(|_| ConfigError::InvalidSocket(http_addr_raw.clone()))?;
        let index_dir = PathBuf::from(read_string("QUOTTIT_INDEX_DIR", "./data/index"));
        let feed_capacity = read_number("QUOTTIT_FEED_CAPACITY", 256usize)?;
        if feed_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "QUOTTIT_FEED_CAPACITY",
                feed_capacity.to_string(),
            ));
        }

        Ok(Self {
            http_addr,
            index_dir,
            database_url: read_optional_string("QUOTTIT_DATABASE_URL"),
            db_max_connections: read_number("QUOTTIT_DB_MAX_CONNECTIONS", 5u32)?,
            index_refresh_interval: Duration::from_secs(read_number(
                "QUOTTIT_INDEX_REFRESH_INTERVAL_SECS",
                300u64,
            )?),
            request_timeout: Duration::from_secs(read_number(
                "QUOTTIT_REQUEST_TIMEOUT_SECS",
                15u64,
            )?),
            max_search_limit: read_number("QUOTTIT_MAX_SEARCH_LIMIT", 50usize)?,
            max_list_limit: read_number("QUOTTIT_MAX_LIST_LIMIT", 200usize)?,
            feed_capacity,
            cookie_secret: read_optional_string("QUOTTIT_COOKIE_SECRET"),
            cookie_secure: read_bool("QUOTTIT_COOKIE_SECURE", true)?,
            admin_password_hash: read_optional_string("QUOTTIT_ADMIN_PASSWORD_HASH"),
            admin_token_secret: read_optional_string("QUOTTIT_ADMIN_TOKEN_SECRET"),
            cors_allow_origins: read_list("QUOTTIT_CORS_ALLOW_ORIGINS"),
        })
    }
}

/// Loads `./.env` into the process environment without overriding
/// variables that are already set.
pub fn load_dotenv() -> Result<(), std::io::Error> {
    let path = Path::new(".env");
    if !path.exists() {
        return Ok(());
    }
    let contents = std::fs::read_to_string(path)?;
    for (key, value) in contents.lines().filter_map(parse_dotenv_line) {
        if std::env::var_os(&key).is_none() {
            // Safety: invoked during startup before any threads are spawned.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }
    Ok(())
}

fn read_string(key: &'static str, default: &'static str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn read_number<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match read_optional_string(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(key, raw)),
        None => Ok(default),
    }
}

fn read_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = read_optional_string(key) else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key, raw)),
    }
}

fn read_optional_string(key: &'static str) -> Option<String> {
    let value = std::env::var(key).unwrap_or_default();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn read_list(key: &'static str) -> Vec<String> {
    read_optional_string(key)
        .map(|raw| split_list(&raw))
        .unwrap_or_default()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_dotenv_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, raw_value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let raw_value = raw_value.trim();
    let value = if let Some(inner) = strip_quotes(raw_value, '"') {
        unescape(inner)
    } else if let Some(inner) = strip_quotes(raw_value, '\'') {
        inner.to_string()
    } else {
        raw_value.to_string()
    };
    Some((key.to_string(), value))
}

fn strip_quotes(value: &str, quote: char) -> Option<&str> {
    if value.len() >= 2 {
        value.strip_prefix(quote)?.strip_suffix(quote)
    } else {
        None
    }
}

fn unescape(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => output.push('\n'),
            Some('t') => output.push('\t'),
            Some('r') => output.push('\r'),
            Some(escaped @ ('\\' | '"')) => output.push(escaped),
            Some(other) => {
                output.push('\\');
                output.push(other);
            }
            None => output.push('\\'),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::{parse_dotenv_line, split_list};

    #[test]
    fn dotenv_plain_and_export() {
        assert_eq!(
            parse_dotenv_line("QUOTTIT_HTTP_ADDR=0.0.0.0:80"),
            Some(("QUOTTIT_HTTP_ADDR".to_string(), "0.0.0.0:80".to_string()))
        );
        assert_eq!(
            parse_dotenv_line("export KEY = value "),
            Some(("KEY".to_string(), "value".to_string()))
        );
    }

    #[test]
    fn dotenv_quoted_values() {
        let (_, value) = parse_dotenv_line(r#"KEY="a \"b\"\nc""#).unwrap();
        assert_eq!(value, "a \"b\"\nc");
        let (_, value) = parse_dotenv_line(r"KEY='raw \n'").unwrap();
        assert_eq!(value, r"raw \n");
    }

    #[test]
    fn dotenv_skips_comments_and_blank_keys() {
        assert!(parse_dotenv_line("# QUOTTIT_DATABASE_URL=x").is_none());
        assert!(parse_dotenv_line("   ").is_none());
        assert!(parse_dotenv_line("=value").is_none());
        assert!(parse_dotenv_line("novalue").is_none());
    }

    #[test]
    fn dotenv_lone_quote_is_literal() {
        let (_, value) = parse_dotenv_line("KEY=\"").unwrap();
        assert_eq!(value, "\"");
    }

    #[test]
    fn list_values_are_trimmed() {
        assert_eq!(
            split_list(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
    }
}
