//! Build metadata
//!
//! Branch, commit and build details are injected at compile time through the
//! `GFC_BRANCH`, `GFC_COMMIT_HASH`, `GFC_BUILD_TIMESTAMP` and `GFC_BUILT_BY`
//! environment variables; unset values read as `n/a`.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const UNKNOWN: &str = "n/a";

/// Version metadata exported by the build-info gauge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: &'static str,
    pub branch: &'static str,
    pub commit_hash: &'static str,
    pub build_timestamp: &'static str,
    pub built_by: &'static str,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            version: VERSION,
            branch: or_unknown(option_env!("GFC_BRANCH")),
            commit_hash: or_unknown(option_env!("GFC_COMMIT_HASH")),
            build_timestamp: or_unknown(option_env!("GFC_BUILD_TIMESTAMP")),
            built_by: or_unknown(option_env!("GFC_BUILT_BY")),
        }
    }

    /// One-line description, e.g. `0.1.0 main:1a2b3c (2024-05-01, ci)`
    pub fn describe(&self) -> String {
        format!(
            "{} {}:{} ({}, {})",
            self.version, self.branch, self.commit_hash, self.build_timestamp, self.built_by
        )
    }
}

const fn or_unknown(value: Option<&'static str>) -> &'static str {
    match value {
        Some(v) => v,
        None => UNKNOWN,
    }
}
