use std::fmt;

use crate::domain::error::{EngineError, EngineResult};

/// Host a digest pin applies to.
///
/// * `example.com` matches only that host;
/// * `*.example.com` matches exactly one extra leftmost label
///   (`api.example.com`, not `example.com` nor `a.b.example.com`);
/// * `**.example.com` matches zero or more extra labels.
///
/// Comparison is ASCII case-insensitive and ignores a trailing dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPattern {
    raw: String,
    kind: PatternKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternKind {
    Exact(String),
    SingleLabel(String),
    AnyLabels(String),
}

impl HostPattern {
    pub fn parse(pattern: &str) -> EngineResult<Self> {
        let raw = pattern.trim().to_string();
        let lowered = normalize(&raw);
        if lowered.is_empty() {
            return Err(EngineError::MisconfiguredPolicy("pin hostname is empty".into()));
        }
        let kind = if let Some(rest) = lowered.strip_prefix("**.") {
            PatternKind::AnyLabels(checked_suffix(rest, &raw)?)
        } else if let Some(rest) = lowered.strip_prefix("*.") {
            PatternKind::SingleLabel(checked_suffix(rest, &raw)?)
        } else if lowered.contains('*') {
            return Err(EngineError::MisconfiguredPolicy(format!(
                "unexpected wildcard in pin hostname: {raw}"
            )));
        } else {
            PatternKind::Exact(lowered)
        };
        Ok(Self { raw, kind })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, hostname: &str) -> bool {
        let host = normalize(hostname);
        match &self.kind {
            PatternKind::Exact(h) => host == *h,
            PatternKind::SingleLabel(suffix) => match strip_label_suffix(&host, suffix) {
                Some(prefix) => !prefix.is_empty() && !prefix.contains('.'),
                None => false,
            },
            PatternKind::AnyLabels(suffix) => {
                host == *suffix || strip_label_suffix(&host, suffix).is_some_and(|p| !p.is_empty())
            }
        }
    }
}

impl fmt::Display for HostPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn normalize(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn checked_suffix(rest: &str, raw: &str) -> EngineResult<String> {
    if rest.is_empty() || rest.contains('*') {
        return Err(EngineError::MisconfiguredPolicy(format!(
            "invalid wildcard pin hostname: {raw}"
        )));
    }
    Ok(rest.to_string())
}

/// `a.b.example.com` minus `.example.com` gives `a.b`.
fn strip_label_suffix<'a>(host: &'a str, suffix: &str) -> Option<&'a str> {
    host.strip_suffix(suffix)?.strip_suffix('.')
}
