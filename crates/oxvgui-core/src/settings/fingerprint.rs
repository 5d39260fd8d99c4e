//! Cache identity of a settings configuration.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Settings;

/// Deterministic identity of the settings that produced a result.
///
/// Derived from every field that affects the optimized output or its display,
/// excluding the "show original" toggle. Disabled jobs do not contribute, so a
/// job explicitly set to `false` and an absent job yield the same fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, From, Into)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of `settings`.
    pub fn of(settings: &Settings) -> Self {
        let mut hasher = Sha256::new();

        // Job names never contain NUL, so it separates them unambiguously.
        for name in settings.enabled_jobs() {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
        }

        hasher.update([
            0xff,
            settings.float_precision,
            settings.transform_precision,
            u8::from(settings.pretty),
            u8::from(settings.gzip),
        ]);

        Self(hex::encode(hasher.finalize()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Settings {
        Settings::empty()
            .with_job("x", true)
            .with_float_precision(2)
    }

    #[test]
    fn test_equal_settings_have_equal_fingerprints() {
        assert_eq!(Fingerprint::of(&base()), Fingerprint::of(&base()));
        assert_eq!(Fingerprint::of(&base()).as_str().len(), 64);
    }

    #[test]
    fn test_every_field_changes_the_fingerprint() {
        let reference = Fingerprint::of(&base());
        let variants = [
            base().with_job("x", false),
            base().with_job("y", true),
            base().with_float_precision(3),
            base().with_transform_precision(1),
            Settings { pretty: !base().pretty, ..base() },
            Settings { gzip: !base().gzip, ..base() },
        ];

        for variant in &variants {
            assert_ne!(Fingerprint::of(variant), reference, "{variant:?}");
        }
    }

    #[test]
    fn test_original_toggle_is_ignored() {
        let shown = Settings { original: true, ..base() };
        assert_eq!(Fingerprint::of(&shown), Fingerprint::of(&base()));
    }

    #[test]
    fn test_disabled_jobs_do_not_contribute() {
        let explicit = base().with_job("y", false);
        assert_eq!(Fingerprint::of(&explicit), Fingerprint::of(&base()));
    }

    #[test]
    fn test_job_boundaries_are_unambiguous() {
        let joined = Settings::empty().with_job("ab", true);
        let split = Settings::empty().with_job("a", true).with_job("b", true);
        assert_ne!(Fingerprint::of(&joined), Fingerprint::of(&split));
    }
}
