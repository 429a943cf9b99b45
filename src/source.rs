//! Fetching playlist and guide text
//!
//! Downloads over HTTP(S) with retries or reads local files. Both paths
//! transparently decompress gzip payloads. Callers get the whole document or
//! an error, never a partial body.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use flate2::read::GzDecoder;
use log::{debug, warn};

use crate::error::FetchError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Download configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// User agent string
    pub user_agent: String,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Overall request timeout in seconds
    pub read_timeout_secs: u64,
    /// Total attempts before giving up
    pub max_retries: u32,
    /// Delay between retries in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "IptvGuide/0.2".to_string(),
            connect_timeout_secs: 30,
            read_timeout_secs: 120,
            max_retries: 3,
            retry_delay_ms: 2000,
        }
    }
}

fn create_agent(config: &FetchConfig) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(config.read_timeout_secs)))
        .timeout_connect(Some(Duration::from_secs(config.connect_timeout_secs)))
        .build()
        .new_agent()
}

/// Download a document, retrying transport and status failures
pub fn fetch_text(url: &str, config: &FetchConfig) -> Result<String, FetchError> {
    let agent = create_agent(config);
    let mut attempts = 0;

    loop {
        attempts += 1;

        match try_fetch(&agent, url, config) {
            Ok(bytes) => {
                debug!("Fetched {} bytes from {} in {} attempt(s)", bytes.len(), url, attempts);
                return decode_payload(bytes);
            }
            Err(e) => {
                if attempts >= config.max_retries {
                    return Err(FetchError::RetriesExhausted {
                        attempts,
                        last: Box::new(e),
                    });
                }
                warn!("Fetching {} failed (attempt {}): {}", url, attempts, e);
                std::thread::sleep(Duration::from_millis(config.retry_delay_ms));
            }
        }
    }
}

fn try_fetch(agent: &ureq::Agent, url: &str, config: &FetchConfig) -> Result<Vec<u8>, FetchError> {
    let response = agent
        .get(url)
        .header("User-Agent", &config.user_agent)
        .call()
        .map_err(|e| match e {
            ureq::Error::StatusCode(code) => FetchError::Status(code),
            other => FetchError::Http(other.to_string()),
        })?;

    let status = response.status().as_u16();
    if status != 200 {
        return Err(FetchError::Status(status));
    }

    let mut bytes = Vec::new();
    response.into_body().into_reader().read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Read a local document, auto-detecting gzip compression
pub fn read_text_file(path: impl AsRef<Path>) -> Result<String, FetchError> {
    let bytes = fs::read(path.as_ref())?;
    decode_payload(bytes)
}

/// Load from a URL when `location` has an http(s) scheme, otherwise from disk
pub fn load_text(location: &str, config: &FetchConfig) -> Result<String, FetchError> {
    if is_remote(location) {
        fetch_text(location, config)
    } else {
        read_text_file(location)
    }
}

fn is_remote(location: &str) -> bool {
    let lower = location.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Gunzip when the payload carries the gzip magic, then decode as UTF-8
fn decode_payload(bytes: Vec<u8>) -> Result<String, FetchError> {
    let bytes = if bytes.starts_with(&GZIP_MAGIC) {
        let mut out = Vec::with_capacity(bytes.len() * 4);
        GzDecoder::new(bytes.as_slice()).read_to_end(&mut out)?;
        out
    } else {
        bytes
    };
    String::from_utf8(bytes).map_err(|_| FetchError::Decode)
}
