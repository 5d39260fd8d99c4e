//! Optimization settings given on the command line.

use clap::Args;
use oxvgui_core::Settings;
use oxvgui_core::settings::{DEFAULT_FLOAT_PRECISION, DEFAULT_TRANSFORM_PRECISION};
use serde::{Deserialize, Serialize};

/// Settings applied to the input document.
#[derive(Debug, Clone, Serialize, Deserialize, Args)]
pub struct SettingsArgs {
    /// Job to enable. Repeat for several; without any, the default jobs run.
    #[arg(long = "job", value_name = "NAME")]
    #[serde(default)]
    pub jobs: Vec<String>,

    /// Number of decimals kept for numbers.
    #[arg(long, env = "OXVGUI_FLOAT_PRECISION", default_value_t = DEFAULT_FLOAT_PRECISION)]
    pub float_precision: u8,

    /// Number of decimals kept for transform values.
    #[arg(long, env = "OXVGUI_TRANSFORM_PRECISION", default_value_t = DEFAULT_TRANSFORM_PRECISION)]
    pub transform_precision: u8,

    /// Indent the output instead of minifying whitespace.
    #[arg(long)]
    #[serde(default)]
    pub pretty: bool,

    /// Report plain sizes instead of gzip sizes.
    #[arg(long)]
    #[serde(default)]
    pub no_gzip: bool,

    /// Output the original document unchanged.
    #[arg(long)]
    #[serde(default)]
    pub original: bool,
}

impl SettingsArgs {
    /// Builds the settings these arguments describe.
    pub fn to_settings(&self) -> Settings {
        let base = if self.jobs.is_empty() {
            Settings::default()
        } else {
            self.jobs
                .iter()
                .fold(Settings::empty(), |settings, name| {
                    settings.with_job(name.as_str(), true)
                })
        };

        base.with_float_precision(self.float_precision)
            .with_transform_precision(self.transform_precision)
            .with_pretty(self.pretty)
            .with_gzip(!self.no_gzip)
            .with_original(self.original)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        settings: SettingsArgs,
    }

    fn parse(args: &[&str]) -> Settings {
        let cli = TestCli::parse_from(std::iter::once("oxvgui").chain(args.iter().copied()));
        cli.settings.to_settings()
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&[]);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_explicit_jobs_replace_defaults() {
        let settings = parse(&["--job", "removeTitle", "--job", "removeDesc", "--no-gzip"]);
        let enabled: Vec<_> = settings.enabled_jobs().collect();
        assert_eq!(enabled, vec!["removeDesc", "removeTitle"]);
        assert!(!settings.gzip);
    }

    #[test]
    fn test_precisions_and_toggles() {
        let settings = parse(&["--float-precision", "1", "--transform-precision", "2", "--pretty"]);
        assert_eq!(settings.float_precision, 1);
        assert_eq!(settings.transform_precision, 2);
        assert!(settings.pretty);
        assert!(!settings.original);
    }
}
