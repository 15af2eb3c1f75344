//! Introspection helpers: cache keys by name and the retry schedule.

use anyhow::{Result, bail};
use std::time::Duration;

use crate::http::RetryPolicy;
use crate::query::{QueryKey, keys};

/// Names accepted by [`key_for`], with the number of arguments each takes.
pub const KEY_NAMES: &[(&str, usize)] = &[
    ("auth", 0),
    ("user", 1),
    ("partners", 0),
    ("partner", 1),
    ("partner-analytics", 1),
    ("api-keys", 1),
    ("analytics", 0),
    ("analytics-overview", 1),
    ("analytics-usage", 2),
    ("support", 0),
    ("tickets", 1),
    ("ticket", 1),
    ("health", 0),
    ("health-status", 0),
    ("health-metrics", 1),
    ("billing", 0),
    ("billing-info", 1),
    ("billing-usage", 1),
];

/// Builds the cache key named `name` from the factory.
pub fn key_for(name: &str, args: &[String]) -> Result<QueryKey> {
    let Some(&(_, arity)) = KEY_NAMES.iter().find(|(n, _)| *n == name) else {
        let names: Vec<&str> = KEY_NAMES.iter().map(|(n, _)| *n).collect();
        bail!("Unknown key '{}'. Expected one of: {}", name, names.join(", "));
    };

    if args.len() != arity {
        bail!(
            "Key '{}' takes {} argument(s), got {}",
            name,
            arity,
            args.len()
        );
    }

    let arg = |i: usize| args[i].as_str();
    let key = match name {
        "auth" => keys::auth(),
        "user" => keys::user(arg(0)),
        "partners" => keys::partners(),
        "partner" => keys::partner(arg(0)),
        "partner-analytics" => keys::partner_analytics(arg(0)),
        "api-keys" => keys::api_keys(arg(0)),
        "analytics" => keys::analytics(),
        "analytics-overview" => keys::analytics_overview(arg(0)),
        "analytics-usage" => keys::analytics_usage(arg(0), arg(1)),
        "support" => keys::support(),
        "tickets" => keys::tickets(arg(0)),
        "ticket" => keys::ticket(arg(0)),
        "health" => keys::health(),
        "health-status" => keys::health_status(),
        "health-metrics" => keys::health_metrics(arg(0)),
        "billing" => keys::billing(),
        "billing-info" => keys::billing_info(arg(0)),
        "billing-usage" => keys::billing_usage(arg(0)),
        other => bail!("Key '{}' is listed but has no builder", other),
    };
    Ok(key)
}

/// Delays before each retry, for `attempts` retries.
pub fn backoff_schedule(policy: &RetryPolicy, attempts: u32) -> Vec<Duration> {
    (0..attempts).map(|i| policy.retry_delay(i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_key_for_every_name() {
        for (name, arity) in KEY_NAMES {
            let values: Vec<String> = (0..*arity).map(|i| format!("a{}", i)).collect();
            assert!(key_for(name, &values).is_ok(), "{} failed", name);
        }
    }

    #[test]
    fn test_every_name_builds_its_own_key() {
        let mut seen = std::collections::HashSet::new();
        for (name, arity) in KEY_NAMES {
            let values: Vec<String> = (0..*arity).map(|i| format!("a{}", i)).collect();
            let key = key_for(name, &values).unwrap();
            assert!(seen.insert(key.clone()), "{} duplicates key {}", name, key);
        }
        assert_eq!(seen.len(), KEY_NAMES.len());
    }

    #[test]
    fn test_key_for_matches_factory() {
        assert_eq!(
            key_for("partner-analytics", &args(&["p1"])).unwrap(),
            keys::partner_analytics("p1")
        );
        assert_eq!(
            key_for("analytics-usage", &args(&["p1", "30d"])).unwrap(),
            keys::analytics_usage("p1", "30d")
        );
        assert_eq!(
            key_for("billing-usage", &args(&["p1"])).unwrap(),
            keys::billing_usage("p1")
        );
    }

    #[test]
    fn test_key_for_errors() {
        assert!(key_for("nope", &[]).is_err());
        assert!(key_for("partner", &[]).is_err());
        assert!(key_for("health", &args(&["x"])).is_err());
    }

    #[test]
    fn test_backoff_schedule() {
        let schedule = backoff_schedule(&RetryPolicy::default(), 6);
        let ms: Vec<u128> = schedule.iter().map(Duration::as_millis).collect();
        assert_eq!(ms, vec![1000, 2000, 4000, 8000, 16000, 30000]);
    }
}
