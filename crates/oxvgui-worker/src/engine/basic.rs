//! Reference engine working on the document text.

use std::sync::OnceLock;

use oxvgui_core::{Dimensions, JobsConfig};
use regex::{Captures, Regex};

use super::Engine;
use crate::protocol::OptimiseResult;

const INDENT: &str = "  ";

/// Elements dropped whole by their removal job.
const ELEMENT_JOBS: &[(&str, &str)] = &[
    ("removeMetadata", "metadata"),
    ("removeTitle", "title"),
    ("removeDesc", "desc"),
];

/// Small engine covering the text-level jobs.
///
/// Supports `removeComments`, `removeXmlProcInst`, `removeDoctype`,
/// `removeMetadata`, `removeTitle` and `removeDesc`. Whitespace between tags
/// is always collapsed; `pretty` re-indents the result with two spaces per
/// level. Other jobs are accepted and leave the document unchanged.
#[derive(Debug, Default)]
pub struct BasicEngine {
    patterns: OnceLock<Patterns>,
}

#[derive(Debug)]
struct Patterns {
    root: Regex,
    attribute: Regex,
    separator: Regex,
    comment: Regex,
    proc_inst: Regex,
    doctype: Regex,
    elements: Vec<(&'static str, Regex)>,
    between_tags: Regex,
    token: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        let elements = ELEMENT_JOBS
            .iter()
            .map(|(job, name)| {
                let pattern = format!(r"(?s)<{name}\b[^>]*/>|<{name}\b[^>]*>.*?</{name}\s*>");
                Regex::new(&pattern).map(|re| (*job, re))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            root: Regex::new(r"<svg\b([^>]*)>")?,
            attribute: Regex::new(
                r#"(?:^|\s)(width|height|viewBox)\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
            )?,
            separator: Regex::new(r"[ ,]+")?,
            comment: Regex::new(r"(?s)<!--.*?-->")?,
            proc_inst: Regex::new(r"(?s)<\?xml\b.*?\?>")?,
            doctype: Regex::new(r"(?is)<!DOCTYPE[^\[>]*(?:\[.*?\])?\s*>")?,
            elements,
            between_tags: Regex::new(r">\s+<")?,
            token: Regex::new(r"<[^>]*>|[^<]+")?,
        })
    }
}

impl BasicEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn patterns(&self) -> Result<&Patterns, String> {
        self.patterns
            .get()
            .ok_or_else(|| "engine is not initialized".to_owned())
    }
}

impl Engine for BasicEngine {
    fn initialize(&self) -> Result<(), String> {
        if self.patterns.get().is_none() {
            let patterns = Patterns::compile().map_err(|e| e.to_string())?;
            let _ = self.patterns.set(patterns);
        }
        Ok(())
    }

    fn dimensions(&self, svg: &str) -> Result<Dimensions, String> {
        let patterns = self.patterns()?;
        root_attributes(patterns, svg).map(|attrs| extract_dimensions(patterns, attrs))
    }

    fn optimise(
        &self,
        svg: &str,
        jobs: &JobsConfig,
        pretty: bool,
    ) -> Result<OptimiseResult, String> {
        let patterns = self.patterns()?;
        root_attributes(patterns, svg)?;

        let mut data = svg.to_owned();
        if jobs.contains("removeComments") {
            // `<!--! ... -->` marks a comment that must be preserved.
            data = patterns
                .comment
                .replace_all(&data, |caps: &Captures| {
                    if caps[0].starts_with("<!--!") {
                        caps[0].to_owned()
                    } else {
                        String::new()
                    }
                })
                .into_owned();
        }
        if jobs.contains("removeXmlProcInst") {
            data = patterns.proc_inst.replace_all(&data, "").into_owned();
        }
        if jobs.contains("removeDoctype") {
            data = patterns.doctype.replace_all(&data, "").into_owned();
        }
        for (job, pattern) in &patterns.elements {
            if jobs.contains(job) {
                data = pattern.replace_all(&data, "").into_owned();
            }
        }

        let mut data = patterns
            .between_tags
            .replace_all(data.trim(), "><")
            .into_owned();
        if pretty {
            data = indent(patterns, &data);
        }

        let attrs = root_attributes(patterns, &data)?;
        let dimensions = extract_dimensions(patterns, attrs);
        Ok(OptimiseResult { data, dimensions })
    }
}

fn root_attributes<'a>(patterns: &Patterns, svg: &'a str) -> Result<&'a str, String> {
    patterns
        .root
        .captures(svg)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| "document has no <svg> root element".to_owned())
}

/// Reads `width`/`height` from the root element, falling back to the last
/// two numbers of its `viewBox`. Unknown sizes are reported as zero.
fn extract_dimensions(patterns: &Patterns, attrs: &str) -> Dimensions {
    let mut width = None;
    let mut height = None;
    let mut view_box = None;

    for caps in patterns.attribute.captures_iter(attrs) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        match &caps[1] {
            "width" => width = parse_length(value),
            "height" => height = parse_length(value),
            _ => view_box = Some(value),
        }
    }

    if let (Some(width), Some(height)) = (width, height) {
        return Dimensions::new(width, height);
    }

    view_box
        .map(|value| {
            patterns
                .separator
                .split(value.trim())
                .collect::<Vec<_>>()
        })
        .filter(|parts| parts.len() == 4)
        .and_then(|parts| Some(Dimensions::new(parts[2].parse().ok()?, parts[3].parse().ok()?)))
        .unwrap_or_default()
}

fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    value.strip_suffix("px").unwrap_or(value).trim().parse().ok()
}

fn indent(patterns: &Patterns, data: &str) -> String {
    let mut lines = Vec::new();
    let mut depth = 0usize;

    for token in patterns.token.find_iter(data).map(|m| m.as_str()) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let closing = token.starts_with("</");
        let opening = token.starts_with('<')
            && !closing
            && !token.ends_with("/>")
            && !token.starts_with("<?")
            && !token.starts_with("<!");

        if closing {
            depth = depth.saturating_sub(1);
        }
        lines.push(format!("{}{token}", INDENT.repeat(depth)));
        if opening {
            depth += 1;
        }
    }

    lines.join("\n")
}
