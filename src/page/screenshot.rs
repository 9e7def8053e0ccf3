//! Screenshot capture.
//!
//! [`ScreenshotOptions`] lists every recognized option and is validated before
//! any command is sent. [`ScreenshotOptions::from_value`] accepts the raw
//! option mapping form and rejects unknown keys.
//!
//! | Option | Values | Default |
//! |--------|--------|---------|
//! | `format` | `"png"`, `"jpeg"` | `"png"` |
//! | `quality` | `0..=100`, jpeg only | none |
//! | `clip` | `{x, y, width, height, scale}` | none |
//! | `captureBeyondViewport` | bool | `false` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::MessageId;
use crate::protocol::Message;
use crate::transport::ResponseReader;

use super::Page;

// ============================================================================
// ImageFormat
// ============================================================================

/// Image format for screenshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format.
    Jpeg,
}

impl ImageFormat {
    /// Returns the protocol name of the format.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Returns the file extension for this format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "png" => Ok(Self::Png),
            "jpeg" => Ok(Self::Jpeg),
            other => Err(Error::invalid_argument(format!(
                "unsupported screenshot format {other:?}, expected \"png\" or \"jpeg\""
            ))),
        }
    }
}

// ============================================================================
// Clip
// ============================================================================

/// Region of the page to capture, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Clip {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Region width.
    pub width: f64,
    /// Region height.
    pub height: f64,
    /// Device scale factor.
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl Clip {
    /// Creates a clip at scale 1.
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            scale: default_scale(),
        }
    }

    /// Sets the scale factor.
    #[inline]
    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Validates the clip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a coordinate is not finite, or a
    /// size or the scale is not positive.
    pub fn validate(&self) -> Result<()> {
        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err(Error::invalid_argument("clip origin must be finite"));
        }
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("scale", self.scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::invalid_argument(format!(
                    "clip {name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }

    fn to_value(self) -> Value {
        json!({
            "x": self.x,
            "y": self.y,
            "width": self.width,
            "height": self.height,
            "scale": self.scale,
        })
    }
}

// ============================================================================
// ScreenshotOptions
// ============================================================================

/// Options for [`Page::screenshot`].
///
/// # Example
///
/// ```ignore
/// let options = ScreenshotOptions::jpeg(80).with_clip(Clip::new(0.0, 0.0, 800.0, 600.0));
/// let png = page.screenshot(&options).await?.wait_for_data(5_000).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScreenshotOptions {
    /// Image format.
    pub format: ImageFormat,
    /// Compression quality; valid for jpeg only.
    pub quality: Option<u8>,
    /// Region to capture.
    pub clip: Option<Clip>,
    /// Capture the whole page rather than the viewport.
    pub capture_beyond_viewport: bool,
}

/// Raw option mapping; every recognized key and nothing else.
#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawOptions {
    format: Option<String>,
    quality: Option<i64>,
    clip: Option<Clip>,
    #[serde(default)]
    capture_beyond_viewport: bool,
}

impl ScreenshotOptions {
    /// Creates PNG options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates JPEG options with `quality`.
    #[inline]
    #[must_use]
    pub fn jpeg(quality: u8) -> Self {
        Self {
            format: ImageFormat::Jpeg,
            quality: Some(quality),
            ..Self::default()
        }
    }

    /// Sets the format.
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the quality.
    #[inline]
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Sets the clip region.
    #[inline]
    #[must_use]
    pub fn with_clip(mut self, clip: Clip) -> Self {
        self.clip = Some(clip);
        self
    }

    /// Captures beyond the viewport.
    #[inline]
    #[must_use]
    pub fn with_capture_beyond_viewport(mut self, enabled: bool) -> Self {
        self.capture_beyond_viewport = enabled;
        self
    }

    /// Parses and validates a raw option mapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a non-object, an unknown key, a
    /// value of the wrong type, or any combination [`Self::validate`] rejects.
    pub fn from_value(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::invalid_argument("screenshot options must be an object"));
        }

        let raw = RawOptions::deserialize(value)
            .map_err(|e| Error::invalid_argument(format!("invalid screenshot options: {e}")))?;

        let format = match raw.format.as_deref() {
            Some(name) => name.parse()?,
            None => ImageFormat::default(),
        };

        let quality = match raw.quality {
            Some(q) => Some(u8::try_from(q).ok().filter(|q| *q <= 100).ok_or_else(|| {
                Error::invalid_argument(format!("quality must be between 0 and 100, got {q}"))
            })?),
            None => None,
        };

        let options = Self {
            format,
            quality,
            clip: raw.clip,
            capture_beyond_viewport: raw.capture_beyond_viewport,
        };
        options.validate()?;
        Ok(options)
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if quality is set for a format other
    /// than jpeg, quality exceeds 100, or the clip is invalid.
    pub fn validate(&self) -> Result<()> {
        if let Some(quality) = self.quality {
            if self.format != ImageFormat::Jpeg {
                return Err(Error::invalid_argument(format!(
                    "quality is only supported for jpeg, not {}",
                    self.format
                )));
            }
            if quality > 100 {
                return Err(Error::invalid_argument(format!(
                    "quality must be between 0 and 100, got {quality}"
                )));
            }
        }
        if let Some(clip) = &self.clip {
            clip.validate()?;
        }
        Ok(())
    }

    /// Builds the `Page.captureScreenshot` message.
    #[must_use]
    pub fn to_message(&self) -> Message {
        let mut message = Message::new("Page.captureScreenshot").param("format", self.format.as_str());
        if let Some(quality) = self.quality {
            message = message.param("quality", quality);
        }
        if let Some(clip) = self.clip {
            message = message.param("clip", clip.to_value());
        }
        if self.capture_beyond_viewport {
            message = message.param("captureBeyondViewport", true);
        }
        message
    }
}

// ============================================================================
// Page - Screenshot
// ============================================================================

impl Page {
    /// Requests a screenshot without waiting for it.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `options` are invalid; nothing is sent
    /// - transport errors if the command cannot be transmitted
    pub async fn screenshot(&self, options: &ScreenshotOptions) -> Result<ScreenshotHandle> {
        options.validate()?;
        debug!(format = %options.format, quality = ?options.quality, "Capturing screenshot");

        let reader = self.session.send_deferred(&options.to_message()).await?;
        Ok(ScreenshotHandle {
            reader,
            format: options.format,
        })
    }
}

// ============================================================================
// ScreenshotHandle
// ============================================================================

/// Pending result of [`Page::screenshot`].
#[derive(Debug)]
pub struct ScreenshotHandle {
    reader: ResponseReader,
    format: ImageFormat,
}

impl ScreenshotHandle {
    /// Returns the message ID of the capture.
    #[inline]
    #[must_use]
    pub fn id(&self) -> MessageId {
        self.reader.id()
    }

    /// Returns the requested format.
    #[inline]
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Checks for the reply, pumping at most once.
    pub async fn is_resolved(&mut self) -> Result<bool> {
        Ok(self.reader.poll().await?.is_some())
    }

    /// Waits for the image as base64 text.
    ///
    /// # Errors
    ///
    /// - [`Error::ResponseHasError`] if the capture failed
    /// - [`Error::InvalidResponse`] if the reply has no image data
    /// - [`Error::OperationTimedOut`] if no reply arrives in time
    pub async fn wait_for_base64(&mut self, timeout_ms: u64) -> Result<String> {
        let response = self.reader.wait_for_response(timeout_ms).await?;
        response.ensure_successful()?;
        response
            .get_str("data")
            .map(str::to_string)
            .ok_or_else(|| Error::invalid_response("Page.captureScreenshot returned no data"))
    }

    /// Waits for the decoded image bytes.
    ///
    /// # Errors
    ///
    /// As [`Self::wait_for_base64`], plus [`Error::InvalidResponse`] if the
    /// data is not valid base64.
    pub async fn wait_for_data(&mut self, timeout_ms: u64) -> Result<Vec<u8>> {
        let encoded = self.wait_for_base64(timeout_ms).await?;
        Base64Standard
            .decode(encoded)
            .map_err(|e| Error::invalid_response(format!("screenshot data is not base64: {e}")))
    }

    /// Waits for the image and writes it to `path`.
    ///
    /// # Errors
    ///
    /// As [`Self::wait_for_data`], plus [`Error::Io`] if writing fails.
    pub async fn save_to(&mut self, path: impl AsRef<Path>, timeout_ms: u64) -> Result<()> {
        let bytes = self.wait_for_data(timeout_ms).await?;
        tokio::fs::write(path.as_ref(), &bytes).await?;
        debug!(path = %path.as_ref().display(), bytes = bytes.len(), "Screenshot saved");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
