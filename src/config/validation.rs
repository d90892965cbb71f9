//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Probe budgets shorter than the request timeout
//! - Threshold ordering and non-zero limits
//! - Unique, well-formed dependencies
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HealthConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use url::Url;

use crate::config::schema::{HealthConfig, PLACEHOLDER_API_KEY};

/// One semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &HealthConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::new("service.name", "must not be empty"));
    }

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("`{}` is not a socket address", config.listener.bind_address),
        ));
    }

    let request_ms = config.timeouts.request_secs.saturating_mul(1000);
    if request_ms == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    check_probe_budget(&mut errors, "probe.timeout_ms", config.probe.timeout_ms, request_ms);

    let mut seen = HashSet::new();
    for (i, dep) in config.dependencies.iter().enumerate() {
        let field = |name: &str| format!("dependencies[{}].{}", i, name);

        if dep.name.trim().is_empty() {
            errors.push(ValidationError::new(field("name"), "must not be empty"));
        } else if !seen.insert(dep.name.as_str()) {
            errors.push(ValidationError::new(
                field("name"),
                format!("duplicate dependency `{}`", dep.name),
            ));
        }

        match Url::parse(&dep.url) {
            Ok(url) if url.scheme() == "http" && url.has_host() => {}
            Ok(_) => errors.push(ValidationError::new(
                field("url"),
                format!("`{}` must be an absolute http:// URL", dep.url),
            )),
            Err(e) => errors.push(ValidationError::new(
                field("url"),
                format!("`{}` is not a valid URL: {}", dep.url, e),
            )),
        }

        if let Some(timeout_ms) = dep.timeout_ms {
            check_probe_budget(&mut errors, &field("timeout_ms"), timeout_ms, request_ms);
        }
    }

    let res = &config.resources;
    if res.memory_limit_bytes == 0 {
        errors.push(ValidationError::new("resources.memory_limit_bytes", "must be greater than 0"));
    }
    if res.max_records == 0 {
        errors.push(ValidationError::new("resources.max_records", "must be greater than 0"));
    }
    if res.memory_sample_interval_secs == 0 {
        errors.push(ValidationError::new(
            "resources.memory_sample_interval_secs",
            "must be greater than 0",
        ));
    }
    if !(res.memory_soft_pct > 0.0
        && res.memory_soft_pct < res.memory_hard_pct
        && res.memory_hard_pct <= 100.0)
    {
        errors.push(ValidationError::new(
            "resources.memory_soft_pct",
            "thresholds must satisfy 0 < memory_soft_pct < memory_hard_pct <= 100",
        ));
    }
    if !(res.record_soft_pct > 0.0 && res.record_soft_pct < 100.0) {
        errors.push(ValidationError::new(
            "resources.record_soft_pct",
            "must be between 0 and 100 (exclusive)",
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("`{}` is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.admin.enabled
        && (config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_API_KEY)
    {
        errors.push(ValidationError::new(
            "admin.api_key",
            "must be set to a real key when admin is enabled",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_probe_budget(errors: &mut Vec<ValidationError>, field: &str, budget_ms: u64, request_ms: u64) {
    if budget_ms == 0 {
        errors.push(ValidationError::new(field, "must be greater than 0"));
    } else if request_ms > 0 && budget_ms >= request_ms {
        errors.push(ValidationError::new(
            field,
            format!(
                "probe budget {}ms must be shorter than the {}ms request timeout",
                budget_ms, request_ms
            ),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DependencyConfig;

    fn dependency(name: &str, url: &str) -> DependencyConfig {
        DependencyConfig {
            name: name.to_string(),
            url: url.to_string(),
            timeout_ms: None,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&HealthConfig::default()), Ok(()));
    }

    #[test]
    fn test_probe_budget_must_be_shorter_than_request_timeout() {
        let mut config = HealthConfig::default();
        config.probe.timeout_ms = 5000;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "probe.timeout_ms");

        config.probe.timeout_ms = 2000;
        config.dependencies.push(DependencyConfig {
            timeout_ms: Some(6000),
            ..dependency("catalog", "http://catalog:3001/health")
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "dependencies[0].timeout_ms");
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = HealthConfig::default();
        config.dependencies.push(dependency("catalog", "http://catalog:3001/health"));
        config.dependencies.push(dependency("catalog", "not a url"));
        config.dependencies.push(dependency("", "https://orders/health"));
        config.resources.memory_soft_pct = 95.0;
        config.resources.max_records = 0;
        config.admin.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            [
                "dependencies[1].name",
                "dependencies[1].url",
                "dependencies[2].name",
                "dependencies[2].url",
                "resources.max_records",
                "resources.memory_soft_pct",
                "admin.api_key",
            ]
        );
    }

    #[test]
    fn test_effective_probe_timeout() {
        let mut config = HealthConfig::default();
        let plain = dependency("catalog", "http://catalog/health");
        let tuned = DependencyConfig {
            timeout_ms: Some(500),
            ..dependency("orders", "http://orders/health")
        };
        config.dependencies = vec![plain.clone(), tuned.clone()];
        assert_eq!(config.probe_timeout_ms(&plain), 2000);
        assert_eq!(config.probe_timeout_ms(&tuned), 500);
    }
}
