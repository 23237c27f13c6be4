use std::fmt::Display;
use std::str::FromStr;

use axum::http::HeaderValue;
use gd_core::scoring::ScoringConfig;
use gd_pipeline::PipelineSettings;

use crate::auth::jwt::JwtConfig;

/// Shortest allowed sweeper period.
pub const MIN_SWEEPER_INTERVAL_MINS: u64 = 30;

/// Reasons the server configuration cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<HeaderValue>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    /// Period of the background sweeper, never below 30 minutes.
    pub sweeper_interval_mins: u64,
    pub pipeline: PipelineSettings,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `DB_URL`                | required                |
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `8080`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `JWT_SECRET`            | required                |
    /// | `JWT_SECRET_STUDENT`    | `JWT_SECRET`            |
    /// | `JWT_EXPIRY_MINS`       | `480`                   |
    /// | `LIVENESS_WINDOW_MINS`  | `5`                     |
    /// | `PHASE_RETENTION_MINS`  | `60`                    |
    /// | `SWEEPER_INTERVAL_MINS` | `30` (clamped to >= 30) |
    /// | `COMPLETION_GRACE_MINS` | `15`                    |
    /// | `BIAS_THRESHOLD`        | `2.5`                   |
    /// | `BIAS_DETECTION_LIMIT`  | `2`                     |
    /// | `MAX_PENALTY`           | `3`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = required(&lookup, "DB_URL")?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&lookup, "PORT", 8080)?;

        let cors_raw = lookup("CORS_ORIGINS").unwrap_or_else(|| "http://localhost:5173".into());
        let cors_origins = cors_raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|origin| {
                origin.parse::<HeaderValue>().map_err(|e| ConfigError::Invalid {
                    name: "CORS_ORIGINS",
                    value: origin.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let request_timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        ensure(
            request_timeout_secs > 0,
            "REQUEST_TIMEOUT_SECS",
            request_timeout_secs,
            "must be positive",
        )?;

        let jwt = JwtConfig::from_lookup(&lookup)?;

        let requested_interval: u64 =
            parse_or(&lookup, "SWEEPER_INTERVAL_MINS", MIN_SWEEPER_INTERVAL_MINS)?;
        let sweeper_interval_mins = requested_interval.max(MIN_SWEEPER_INTERVAL_MINS);
        if sweeper_interval_mins != requested_interval {
            tracing::warn!(
                requested = requested_interval,
                effective = sweeper_interval_mins,
                "SWEEPER_INTERVAL_MINS below minimum, clamped"
            );
        }

        let defaults = PipelineSettings::default();
        let liveness_window_mins: i64 =
            parse_or(&lookup, "LIVENESS_WINDOW_MINS", defaults.liveness_window_mins)?;
        ensure(
            liveness_window_mins > 0,
            "LIVENESS_WINDOW_MINS",
            liveness_window_mins,
            "must be positive",
        )?;
        let phase_retention_mins: i64 =
            parse_or(&lookup, "PHASE_RETENTION_MINS", defaults.phase_retention_mins)?;
        ensure(
            phase_retention_mins > 0,
            "PHASE_RETENTION_MINS",
            phase_retention_mins,
            "must be positive",
        )?;
        let completion_grace_mins: i64 =
            parse_or(&lookup, "COMPLETION_GRACE_MINS", defaults.completion_grace_mins)?;
        ensure(
            completion_grace_mins >= 0,
            "COMPLETION_GRACE_MINS",
            completion_grace_mins,
            "must not be negative",
        )?;

        let bias_threshold: f64 =
            parse_or(&lookup, "BIAS_THRESHOLD", defaults.scoring.bias_threshold)?;
        ensure(
            bias_threshold.is_finite() && bias_threshold >= 0.0,
            "BIAS_THRESHOLD",
            bias_threshold,
            "must be a non-negative number",
        )?;
        let bias_detection_limit: usize =
            parse_or(&lookup, "BIAS_DETECTION_LIMIT", defaults.scoring.bias_detection_limit)?;
        ensure(
            bias_detection_limit >= 1,
            "BIAS_DETECTION_LIMIT",
            bias_detection_limit,
            "must be at least 1",
        )?;
        let max_penalty: i32 = parse_or(&lookup, "MAX_PENALTY", defaults.scoring.max_penalty)?;
        ensure(max_penalty >= 0, "MAX_PENALTY", max_penalty, "must not be negative")?;

        Ok(Self {
            database_url,
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            sweeper_interval_mins,
            pipeline: PipelineSettings {
                liveness_window_mins,
                phase_retention_mins,
                completion_grace_mins,
                scoring: ScoringConfig {
                    bias_threshold,
                    bias_detection_limit,
                    max_penalty,
                },
            },
        })
    }
}

pub(crate) fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

pub(crate) fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

pub(crate) fn ensure(
    ok: bool,
    name: &'static str,
    value: impl Display,
    reason: &str,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: reason.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("DB_URL", "postgres://localhost/gd"),
        ("JWT_SECRET", "admin-secret"),
    ];

    #[test]
    fn defaults_apply() {
        let config = ServerConfig::from_lookup(lookup_from(BASE)).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.sweeper_interval_mins, 30);
        assert_eq!(config.cors_origins.len(), 1);
        assert_eq!(config.jwt.expiry_mins, 480);
        assert_eq!(config.jwt.student_secret, "admin-secret");
        assert_eq!(config.pipeline, PipelineSettings::default());
    }

    #[test]
    fn missing_db_url_is_an_error() {
        let result = ServerConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s")]));
        assert_matches!(result, Err(ConfigError::Missing("DB_URL")));
    }

    #[test]
    fn missing_jwt_secret_is_an_error() {
        let result = ServerConfig::from_lookup(lookup_from(&[("DB_URL", "postgres://x")]));
        assert_matches!(result, Err(ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn bad_port_is_an_error() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PORT", "eighty"));
        let result = ServerConfig::from_lookup(lookup_from(&pairs));
        assert_matches!(result, Err(ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn sweeper_interval_is_clamped() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SWEEPER_INTERVAL_MINS", "5"));
        let config = ServerConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.sweeper_interval_mins, MIN_SWEEPER_INTERVAL_MINS);

        let mut pairs = BASE.to_vec();
        pairs.push(("SWEEPER_INTERVAL_MINS", "90"));
        let config = ServerConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.sweeper_interval_mins, 90);
    }

    #[test]
    fn scoring_overrides_are_read() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("BIAS_THRESHOLD", "3.5"),
            ("BIAS_DETECTION_LIMIT", "4"),
            ("MAX_PENALTY", "5"),
            ("JWT_SECRET_STUDENT", "student-secret"),
        ]);
        let config = ServerConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.pipeline.scoring.bias_threshold, 3.5);
        assert_eq!(config.pipeline.scoring.bias_detection_limit, 4);
        assert_eq!(config.pipeline.scoring.max_penalty, 5);
        assert_eq!(config.jwt.student_secret, "student-secret");
    }

    #[test]
    fn nonsensical_tunables_are_rejected() {
        for (name, value) in [
            ("LIVENESS_WINDOW_MINS", "0"),
            ("BIAS_THRESHOLD", "-1"),
            ("BIAS_DETECTION_LIMIT", "0"),
            ("MAX_PENALTY", "-2"),
            ("JWT_EXPIRY_MINS", "0"),
        ] {
            let mut pairs = BASE.to_vec();
            pairs.push((name, value));
            let result = ServerConfig::from_lookup(lookup_from(&pairs));
            assert_matches!(result, Err(ConfigError::Invalid { .. }), "{name}={value}");
        }
    }

    #[test]
    fn invalid_cors_origin_is_an_error() {
        let mut pairs = BASE.to_vec();
        pairs.push(("CORS_ORIGINS", "http://ok.example, bad\norigin"));
        let result = ServerConfig::from_lookup(lookup_from(&pairs));
        assert_matches!(result, Err(ConfigError::Invalid { name: "CORS_ORIGINS", .. }));
    }
}
