//! Job table and translation of settings into an engine configuration.

use serde::ser::{Serialize, SerializeMap, Serializer};
use strum::{AsRefStr, IntoStaticStr};

use super::Settings;
use crate::{Error, Result, TRACING_TARGET_SETTINGS};

/// Prefix handed to `prefixIds`.
pub const ID_PREFIX: &str = "oxvgui";

/// Name of the job that always runs first with default options.
pub const PRECHECK_JOB: &str = "precheck";

/// Largest float or transform precision the engine accepts.
pub const MAX_PRECISION: u8 = 20;

/// Shape of the configuration entry a job accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum JobShape {
    /// Encoded as a bare `true`.
    Flag,
    /// Encoded as an object carrying `floatPrecision` and `transformPrecision`.
    Precision,
}

/// A row of the job table.
#[derive(Debug, Clone, Copy)]
pub struct JobDefinition {
    pub name: &'static str,
    pub shape: JobShape,
    /// Whether fresh settings enable this job.
    pub enabled_by_default: bool,
    /// Whether a float precision of zero must be raised to one.
    pub nonzero_float_precision: bool,
}

const fn flag(name: &'static str, enabled_by_default: bool) -> JobDefinition {
    JobDefinition {
        name,
        shape: JobShape::Flag,
        enabled_by_default,
        nonzero_float_precision: false,
    }
}

const fn precision(name: &'static str, enabled_by_default: bool) -> JobDefinition {
    JobDefinition {
        name,
        shape: JobShape::Precision,
        enabled_by_default,
        nonzero_float_precision: false,
    }
}

const fn nonzero_precision(name: &'static str, enabled_by_default: bool) -> JobDefinition {
    JobDefinition {
        name,
        shape: JobShape::Precision,
        enabled_by_default,
        nonzero_float_precision: true,
    }
}

/// Every job the settings form may enable, in the order the engine runs them.
pub const JOB_TABLE: &[JobDefinition] = &[
    flag("removeDoctype", true),
    flag("removeXmlProcInst", true),
    precision("removeComments", true),
    flag("removeMetadata", true),
    precision("removeXlink", false),
    precision("removeEditorsNSData", true),
    precision("cleanupAttributes", true),
    flag("mergeStyles", true),
    precision("inlineStyles", true),
    precision("minifyStyles", true),
    precision("cleanupIds", true),
    flag("removeUselessDefs", true),
    nonzero_precision("cleanupNumericValues", true),
    precision("convertColors", true),
    precision("removeUnknownsAndDefaults", true),
    flag("removeNonInheritableGroupAttrs", true),
    precision("removeUselessStrokeAndFill", true),
    flag("removeViewBox", false),
    flag("cleanupEnableBackground", true),
    precision("removeHiddenElems", true),
    precision("removeEmptyText", true),
    precision("convertShapeToPath", true),
    flag("convertEllipseToCircle", true),
    flag("moveElemsAttrsToGroup", true),
    flag("moveGroupAttrsToElems", true),
    flag("collapseGroups", true),
    precision("convertPathData", true),
    precision("convertTransform", true),
    flag("removeEmptyAttrs", true),
    flag("removeEmptyContainers", true),
    precision("mergePaths", true),
    flag("removeUnusedNS", true),
    flag("sortDefsChildren", true),
    flag("removeTitle", true),
    precision("removeDesc", true),
    flag("removeDimensions", false),
    flag("removeStyleElement", false),
    flag("removeScripts", false),
    flag("removeRasterImages", false),
    flag("removeOffCanvasPaths", false),
    flag("removeXMLNS", false),
    flag("reusePaths", false),
    precision("convertStyleToAttrs", false),
    precision("convertOneStopGradients", false),
    nonzero_precision("cleanupListOfValues", false),
    precision("sortAttrs", false),
    precision("prefixIds", false),
];

/// Looks up a job by name.
pub fn job_definition(name: &str) -> Option<&'static JobDefinition> {
    JOB_TABLE.iter().find(|job| job.name == name)
}

/// Parameters of a precision-shaped job entry.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub float_precision: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform_precision: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// A single entry of an engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobConfig {
    /// Serialized as `true`.
    Flag,
    /// Serialized as an object.
    Params(JobParams),
}

impl Serialize for JobConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Flag => serializer.serialize_bool(true),
            Self::Params(params) => params.serialize(serializer),
        }
    }
}

/// Ordered engine configuration built from [`Settings`].
///
/// Serializes as a JSON object whose keys keep insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobsConfig {
    entries: Vec<(String, JobConfig)>,
}

impl JobsConfig {
    /// Translates settings into the configuration the engine expects.
    ///
    /// `precheck` always comes first with default options, followed by the enabled
    /// jobs in table order. Unknown job names are rejected here rather than passed
    /// on to the engine.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let float_precision = settings.float_precision;
        let transform_precision = settings.transform_precision;

        let mut entries = Vec::with_capacity(settings.jobs.len() + 1);
        entries.push((PRECHECK_JOB.to_owned(), JobConfig::Params(JobParams::default())));

        if let Some(unknown) = settings
            .enabled_jobs()
            .find(|name| job_definition(name).is_none())
        {
            return Err(Error::unknown_job(unknown));
        }

        if float_precision > MAX_PRECISION || transform_precision > MAX_PRECISION {
            return Err(Error::invalid_settings(format!(
                "precision must be at most {MAX_PRECISION}, got float {float_precision} \
                 and transform {transform_precision}"
            )));
        }

        let enabled = JOB_TABLE
            .iter()
            .filter(|definition| settings.is_enabled(definition.name));

        for definition in enabled {
            let config = match definition.shape {
                JobShape::Flag => JobConfig::Flag,
                JobShape::Precision => {
                    // Zero precision breaks numeric cleanups, so those get 1 instead.
                    let float_precision =
                        if float_precision == 0 && definition.nonzero_float_precision {
                            1
                        } else {
                            float_precision
                        };

                    JobConfig::Params(JobParams {
                        float_precision: Some(float_precision),
                        transform_precision: Some(transform_precision),
                        prefix: (definition.name == "prefixIds").then(|| ID_PREFIX.to_owned()),
                    })
                }
            };

            entries.push((definition.name.to_owned(), config));
        }

        tracing::trace!(
            target: TRACING_TARGET_SETTINGS,
            jobs = entries.len(),
            float_precision,
            transform_precision,
            "Built engine configuration"
        );

        Ok(Self { entries })
    }

    /// Returns the configuration entry for `name`.
    pub fn get(&self, name: &str) -> Option<&JobConfig> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, config)| config)
    }

    /// Returns `true` if the configuration enables `name`.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &JobConfig)> {
        self.entries.iter().map(|(name, config)| (name.as_str(), config))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for JobsConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, config) in &self.entries {
            map.serialize_entry(name, config)?;
        }
        map.end()
    }
}
