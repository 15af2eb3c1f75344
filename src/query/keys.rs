//! Hierarchical cache keys and the factory that builds them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered sequence of segments addressing a cached result.
///
/// Keys compare by value over the whole sequence. A key is "under" another when the
/// other is a prefix of it, which is what invalidation by prefix relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Returns a new key with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

pub fn auth() -> QueryKey {
    QueryKey::new(["auth"])
}

pub fn user(id: &str) -> QueryKey {
    auth().child("user").child(id)
}

pub fn partners() -> QueryKey {
    QueryKey::new(["partners"])
}

pub fn partner(id: &str) -> QueryKey {
    partners().child(id)
}

pub fn partner_analytics(id: &str) -> QueryKey {
    partner(id).child("analytics")
}

pub fn api_keys(partner_id: &str) -> QueryKey {
    partner(partner_id).child("apiKeys")
}

pub fn analytics() -> QueryKey {
    QueryKey::new(["analytics"])
}

pub fn analytics_overview(partner_id: &str) -> QueryKey {
    analytics().child("overview").child(partner_id)
}

pub fn analytics_usage(partner_id: &str, period: &str) -> QueryKey {
    analytics().child("usage").child(partner_id).child(period)
}

pub fn support() -> QueryKey {
    QueryKey::new(["support"])
}

pub fn tickets(partner_id: &str) -> QueryKey {
    support().child("tickets").child(partner_id)
}

pub fn ticket(id: &str) -> QueryKey {
    support().child("ticket").child(id)
}

pub fn health() -> QueryKey {
    QueryKey::new(["health"])
}

pub fn health_status() -> QueryKey {
    health().child("status")
}

pub fn health_metrics(service: &str) -> QueryKey {
    health().child("metrics").child(service)
}

pub fn billing() -> QueryKey {
    QueryKey::new(["billing"])
}

pub fn billing_info(partner_id: &str) -> QueryKey {
    billing().child(partner_id)
}

pub fn billing_usage(partner_id: &str) -> QueryKey {
    billing().child("usage").child(partner_id)
}
