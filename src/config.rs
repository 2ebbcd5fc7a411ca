//! Process configuration read from the environment.

use anyhow::Context;
use std::{net::SocketAddr, str::FromStr, time::Duration};

use crate::consumer::ConsumerConfig;

pub const QUEUE_URL_VAR: &str = "SQS_QUEUE_URL";
pub const REGION_VAR: &str = "SQS_REGION";
pub const MAX_MESSAGES_VAR: &str = "MAX_MESSAGES";
pub const WAIT_TIME_VAR: &str = "POLLING_WAIT_TIME";
pub const VISIBILITY_TIMEOUT_VAR: &str = "VISIBILITY_TIMEOUT";
pub const ENDPOINT_URL_VAR: &str = "AWS_ENDPOINT_URL";
pub const HEALTH_ADDR_VAR: &str = "HEALTH_CHECK_ADDR";

const DEFAULT_REGION: &str = "ap-northeast-1";
const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:8080";

/// Resolved settings for the worker process
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Queue to consume (required)
    pub queue_url: String,
    /// Default: ap-northeast-1
    pub region: String,
    /// Default: 10
    pub max_messages: i32,
    /// Default: 20
    pub wait_time_seconds: i32,
    /// Default: 30
    pub visibility_timeout_seconds: i32,
    /// Alternate service endpoint, e.g. a LocalStack URL
    pub endpoint_url: Option<String>,
    /// Listen address of the liveness endpoint
    /// Default: 0.0.0.0:8080
    pub health_addr: SocketAddr,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through `lookup`; empty values count as unset.
    ///
    /// Only a missing queue URL or an unparseable health address is an error.
    /// Numeric values that fail to parse fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let queue_url = get(QUEUE_URL_VAR).with_context(|| format!("{QUEUE_URL_VAR} is not set"))?;

        let health_addr = get(HEALTH_ADDR_VAR)
            .unwrap_or_else(|| DEFAULT_HEALTH_ADDR.to_string())
            .parse::<SocketAddr>()
            .with_context(|| format!("{HEALTH_ADDR_VAR} is not a valid socket address"))?;

        Ok(Self {
            queue_url,
            region: get(REGION_VAR).unwrap_or_else(|| DEFAULT_REGION.to_string()),
            max_messages: parse_or(get(MAX_MESSAGES_VAR), MAX_MESSAGES_VAR, 10),
            wait_time_seconds: parse_or(get(WAIT_TIME_VAR), WAIT_TIME_VAR, 20),
            visibility_timeout_seconds: parse_or(
                get(VISIBILITY_TIMEOUT_VAR),
                VISIBILITY_TIMEOUT_VAR,
                30,
            ),
            endpoint_url: get(ENDPOINT_URL_VAR),
            health_addr,
        })
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            max_messages: self.max_messages,
            wait_time_seconds: self.wait_time_seconds,
            visibility_timeout_seconds: self.visibility_timeout_seconds,
            receive_error_backoff: Duration::from_secs(5),
        }
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match value {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "invalid value, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = load(&[(QUEUE_URL_VAR, "http://localhost:4566/000000000000/jobs")]).unwrap();

        assert_eq!(
            settings,
            Settings {
                queue_url: "http://localhost:4566/000000000000/jobs".to_string(),
                region: "ap-northeast-1".to_string(),
                max_messages: 10,
                wait_time_seconds: 20,
                visibility_timeout_seconds: 30,
                endpoint_url: None,
                health_addr: "0.0.0.0:8080".parse().unwrap(),
            }
        );
    }

    #[test]
    fn test_missing_queue_url_is_an_error() {
        let err = load(&[(REGION_VAR, "us-east-1")]).unwrap_err();
        assert!(err.to_string().contains(QUEUE_URL_VAR));

        assert!(load(&[(QUEUE_URL_VAR, "")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let settings = load(&[
            (QUEUE_URL_VAR, "https://sqs.us-east-1.amazonaws.com/1/q"),
            (REGION_VAR, "us-east-1"),
            (MAX_MESSAGES_VAR, "5"),
            (WAIT_TIME_VAR, "1"),
            (VISIBILITY_TIMEOUT_VAR, "120"),
            (ENDPOINT_URL_VAR, "http://localstack:4566"),
            (HEALTH_ADDR_VAR, "127.0.0.1:9000"),
        ])
        .unwrap();

        assert_eq!(settings.region, "us-east-1");
        assert_eq!(settings.max_messages, 5);
        assert_eq!(settings.wait_time_seconds, 1);
        assert_eq!(settings.visibility_timeout_seconds, 120);
        assert_eq!(settings.endpoint_url.as_deref(), Some("http://localstack:4566"));
        assert_eq!(settings.health_addr, "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let settings = load(&[
            (QUEUE_URL_VAR, "q"),
            (MAX_MESSAGES_VAR, "ten"),
            (WAIT_TIME_VAR, "20s"),
            (VISIBILITY_TIMEOUT_VAR, ""),
        ])
        .unwrap();

        assert_eq!(settings.max_messages, 10);
        assert_eq!(settings.wait_time_seconds, 20);
        assert_eq!(settings.visibility_timeout_seconds, 30);
    }

    #[test]
    fn test_empty_endpoint_is_none() {
        let settings = load(&[(QUEUE_URL_VAR, "q"), (ENDPOINT_URL_VAR, "")]).unwrap();
        assert_eq!(settings.endpoint_url, None);
    }

    #[test]
    fn test_invalid_health_addr_is_an_error() {
        assert!(load(&[(QUEUE_URL_VAR, "q"), (HEALTH_ADDR_VAR, "not-an-addr")]).is_err());
    }

    #[test]
    fn test_consumer_config_follows_settings() {
        let settings = load(&[(QUEUE_URL_VAR, "q"), (MAX_MESSAGES_VAR, "3")]).unwrap();
        let config = settings.consumer_config();

        assert_eq!(config.max_messages, 3);
        assert_eq!(config.wait_time_seconds, 20);
        assert_eq!(config.visibility_timeout_seconds, 30);
        assert_eq!(config.receive_error_backoff, Duration::from_secs(5));
    }
}
