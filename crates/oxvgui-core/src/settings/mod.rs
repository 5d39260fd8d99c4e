//! User settings, their fingerprints and the engine configuration they map to.

mod fingerprint;
mod jobs;

use std::collections::BTreeMap;

pub use fingerprint::Fingerprint;
pub use jobs::{
    ID_PREFIX, JOB_TABLE, JobConfig, JobDefinition, JobParams, JobShape, JobsConfig,
    PRECHECK_JOB, job_definition,
};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Default number of decimals kept for numbers.
pub const DEFAULT_FLOAT_PRECISION: u8 = 3;

/// Default number of decimals kept for transform values.
pub const DEFAULT_TRANSFORM_PRECISION: u8 = 5;

/// The settings a user applies to the current document.
///
/// Serialized in the camelCase shape the settings form and the compute
/// endpoint exchange: `{ jobs, floatPrecision, transformPrecision, pretty, gzip, original }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Job name to enabled flag.
    pub jobs: BTreeMap<String, bool>,
    pub float_precision: u8,
    pub transform_precision: u8,
    /// Indent the output instead of minifying whitespace.
    pub pretty: bool,
    /// Report gzip sizes instead of plain sizes.
    pub gzip: bool,
    /// Show the original document instead of an optimized one.
    pub original: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jobs: JOB_TABLE
                .iter()
                .map(|job| (job.name.to_owned(), job.enabled_by_default))
                .collect(),
            ..Self::empty()
        }
    }
}

impl Settings {
    /// Settings with no jobs enabled and default precisions.
    pub fn empty() -> Self {
        Self {
            jobs: BTreeMap::new(),
            float_precision: DEFAULT_FLOAT_PRECISION,
            transform_precision: DEFAULT_TRANSFORM_PRECISION,
            pretty: false,
            gzip: true,
            original: false,
        }
    }

    /// Enables or disables a job.
    #[must_use]
    pub fn with_job(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.jobs.insert(name.into(), enabled);
        self
    }

    #[must_use]
    pub fn with_float_precision(mut self, precision: u8) -> Self {
        self.float_precision = precision;
        self
    }

    #[must_use]
    pub fn with_transform_precision(mut self, precision: u8) -> Self {
        self.transform_precision = precision;
        self
    }

    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    #[must_use]
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    #[must_use]
    pub fn with_original(mut self, original: bool) -> Self {
        self.original = original;
        self
    }

    /// Names of the enabled jobs, in name order.
    pub fn enabled_jobs(&self) -> impl Iterator<Item = &str> {
        self.jobs
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.as_str())
    }

    /// Returns `true` if `name` is enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.jobs.get(name).copied().unwrap_or(false)
    }

    /// Cache identity of these settings.
    #[inline]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }

    /// Translates these settings into an engine configuration.
    #[inline]
    pub fn jobs_config(&self) -> Result<JobsConfig> {
        JobsConfig::from_settings(self)
    }

    /// JSON form written to persistent storage.
    ///
    /// The "show original" toggle is transient and never persisted.
    pub fn to_persisted(&self) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(object) = value.as_object_mut() {
            object.remove("original");
        }
        Ok(value)
    }

    /// Restores settings from their persisted JSON form.
    pub fn from_persisted(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.jobs.len(), JOB_TABLE.len());
        assert!(settings.gzip);
        assert!(!settings.original);
        assert!(settings.jobs_config().is_ok());
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let settings = Settings::empty().with_job("removeTitle", true);
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(
            json,
            json!({
                "jobs": { "removeTitle": true },
                "floatPrecision": 3,
                "transformPrecision": 5,
                "pretty": false,
                "gzip": true,
                "original": false,
            })
        );
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_value(json!({ "floatPrecision": 1 })).unwrap();
        assert_eq!(settings.float_precision, 1);
        assert_eq!(settings.transform_precision, DEFAULT_TRANSFORM_PRECISION);
        assert_eq!(settings.jobs.len(), JOB_TABLE.len());
    }

    #[test]
    fn test_persisted_form_drops_original() {
        let settings = Settings::empty().with_original(true).with_pretty(true);
        let persisted = settings.to_persisted().unwrap();
        assert!(persisted.get("original").is_none());

        let restored = Settings::from_persisted(persisted).unwrap();
        assert!(!restored.original);
        assert!(restored.pretty);
    }

    #[test]
    fn test_enabled_jobs_skips_disabled() {
        let settings = Settings::empty()
            .with_job("removeTitle", true)
            .with_job("removeDesc", false);
        assert_eq!(settings.enabled_jobs().collect::<Vec<_>>(), vec!["removeTitle"]);
        assert!(settings.is_enabled("removeTitle"));
        assert!(!settings.is_enabled("removeDesc"));
        assert!(!settings.is_enabled("unknown"));
    }
}
