//! Immutable computed documents with memoized size metrics.

use std::io::Write;
use std::sync::{Arc, OnceLock};

use flate2::Compression;
use flate2::write::GzEncoder;
use strum::{AsRefStr, IntoStaticStr};

use super::Dimensions;
use crate::TRACING_TARGET_CACHE;

/// How a document's size is measured for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CompressionMode {
    /// Raw UTF-8 byte length.
    Plain,
    /// Length after gzip compression at the default level.
    Gzip,
}

impl CompressionMode {
    /// Maps the `gzip` settings toggle to a compression mode.
    #[inline]
    pub fn from_gzip(gzip: bool) -> Self {
        if gzip { Self::Gzip } else { Self::Plain }
    }
}

#[derive(Debug)]
struct Inner {
    text: String,
    dimensions: Dimensions,
    plain_size: OnceLock<usize>,
    gzip_size: OnceLock<usize>,
}

/// A computed (or original) document together with its dimensions.
///
/// The value is immutable once constructed. Clones share the same document and
/// the same memoized sizes, so a size computed through one handle is visible to
/// every other handle, including the copy held by the result cache.
#[derive(Debug, Clone)]
pub struct ResultValue {
    inner: Arc<Inner>,
}

impl ResultValue {
    /// Wraps a document and its dimensions.
    pub fn new(text: impl Into<String>, dimensions: Dimensions) -> Self {
        Self {
            inner: Arc::new(Inner {
                text: text.into(),
                dimensions,
                plain_size: OnceLock::new(),
                gzip_size: OnceLock::new(),
            }),
        }
    }

    /// Returns the document text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.inner.text
    }

    /// Returns the document dimensions.
    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        self.inner.dimensions
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.inner.dimensions.width
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.inner.dimensions.height
    }

    /// Returns the size of the document in bytes for the given mode.
    ///
    /// Computed on first request per mode and memoized afterwards.
    pub fn size(&self, mode: CompressionMode) -> usize {
        match mode {
            CompressionMode::Plain => *self.inner.plain_size.get_or_init(|| self.inner.text.len()),
            CompressionMode::Gzip => *self
                .inner
                .gzip_size
                .get_or_init(|| gzip_len(&self.inner.text)),
        }
    }

    /// Returns `true` if the size for `mode` has already been computed.
    pub fn is_size_cached(&self, mode: CompressionMode) -> bool {
        match mode {
            CompressionMode::Plain => self.inner.plain_size.get().is_some(),
            CompressionMode::Gzip => self.inner.gzip_size.get().is_some(),
        }
    }

    /// Returns `true` if both handles refer to the same underlying value.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

fn gzip_len(text: &str) -> usize {
    let mut encoder = GzEncoder::new(Vec::with_capacity(text.len() / 2), Compression::default());
    let compressed = encoder
        .write_all(text.as_bytes())
        .and_then(|()| encoder.finish());

    match compressed {
        Ok(bytes) => bytes.len(),
        Err(err) => {
            // Writing into a Vec does not fail; fall back to the plain size just in case.
            tracing::warn!(
                target: TRACING_TARGET_CACHE,
                error = %err,
                "Failed to gzip document, reporting plain size"
            );
            text.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10"/><rect width="10" height="10"/><rect width="10" height="10"/></svg>"#;

    #[test]
    fn test_plain_size_is_byte_length() {
        let value = ResultValue::new("héllo", Dimensions::new(1.0, 1.0));
        assert_eq!(value.size(CompressionMode::Plain), 6);
    }

    #[test]
    fn test_sizes_are_lazy_and_memoized() {
        let value = ResultValue::new(SVG, Dimensions::new(10.0, 10.0));
        assert!(!value.is_size_cached(CompressionMode::Plain));
        assert!(!value.is_size_cached(CompressionMode::Gzip));

        let gzip = value.size(CompressionMode::Gzip);
        assert!(value.is_size_cached(CompressionMode::Gzip));
        assert!(!value.is_size_cached(CompressionMode::Plain));
        assert_eq!(value.size(CompressionMode::Gzip), gzip);
    }

    #[test]
    fn test_gzip_size_differs_from_plain() {
        let repeated = SVG.repeat(20);
        let value = ResultValue::new(repeated.clone(), Dimensions::new(10.0, 10.0));
        assert!(value.size(CompressionMode::Gzip) < value.size(CompressionMode::Plain));
        assert_eq!(value.size(CompressionMode::Plain), repeated.len());
    }

    #[test]
    fn test_clones_share_memoized_sizes() {
        let value = ResultValue::new(SVG, Dimensions::new(10.0, 10.0));
        let clone = value.clone();
        value.size(CompressionMode::Gzip);
        assert!(clone.is_size_cached(CompressionMode::Gzip));
        assert!(clone.ptr_eq(&value));
    }

    #[test]
    fn test_compression_mode_from_gzip() {
        assert_eq!(CompressionMode::from_gzip(true), CompressionMode::Gzip);
        assert_eq!(CompressionMode::from_gzip(false), CompressionMode::Plain);
        assert_eq!(CompressionMode::Gzip.as_ref(), "gzip");
    }
}
