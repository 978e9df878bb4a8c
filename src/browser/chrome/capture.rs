//! PDF and PNG capture.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Clip, Command, EmulationCommand, PageCommand, Rgba};

use super::Chrome;

// ============================================================================
// Constants
// ============================================================================

/// CSS pixels per inch.
const PIXELS_PER_INCH: f64 = 96.0;

/// Capture region when none is given: the SVG root's box, or a letter-sized page.
const DEFAULT_CLIP_SCRIPT: &str = "document.rootElement ? \
    [document.rootElement.x.baseVal.value, document.rootElement.y.baseVal.value, \
    document.rootElement.width.baseVal.value, document.rootElement.height.baseVal.value] \
    : [0, 0, 816, 1056]";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct CaptureData {
    data: String,
}

/// Region of the page to capture, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Region {
    /// Creates a region.
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn clip(self, scale: f64) -> Clip {
        Clip {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            scale,
        }
    }
}

// ============================================================================
// Chrome - Capture
// ============================================================================

impl Chrome {
    /// Prints the page to PDF with a paper size given in CSS pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if printing fails or the reply carries no data.
    pub async fn pdf(&self, width: u32, height: u32) -> Result<Vec<u8>> {
        debug!(width, height, "Printing to PDF");

        let reply = self
            .execute(Command::Page(PageCommand::PrintToPdf {
                paper_width: f64::from(width) / PIXELS_PER_INCH,
                paper_height: f64::from(height) / PIXELS_PER_INCH,
            }))
            .await?;
        decode_capture(reply)
    }

    /// Captures a region of the page as PNG.
    ///
    /// `background` is a packed `0xAARRGGBB` color used where the page
    /// has no background of its own. With no `region`, the SVG root's box
    /// is captured, or 816x1056 for other documents.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let png = chrome.png(Some(Region::new(0.0, 0.0, 400.0, 300.0)), 0xFFFFFFFF, 1.0).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if any capture step fails.
    pub async fn png(&self, region: Option<Region>, background: u32, scale: f64) -> Result<Vec<u8>> {
        let region = match region {
            Some(region) => region,
            None => self.default_region().await?,
        };
        debug!(?region, background, scale, "Capturing PNG");

        self.execute(Command::Emulation(
            EmulationCommand::SetDefaultBackgroundColorOverride {
                color: Rgba::from_argb(background),
            },
        ))
        .await?;

        let reply = self
            .execute(Command::Page(PageCommand::CaptureScreenshot {
                clip: region.clip(scale),
            }))
            .await?;
        decode_capture(reply)
    }

    async fn default_region(&self) -> Result<Region> {
        let rect = self.eval(DEFAULT_CLIP_SCRIPT).await?;
        match serde_json::from_value::<[f64; 4]>(rect)? {
            [x, y, width, height] => Ok(Region::new(x, y, width, height)),
        }
    }
}

/// Decodes the base64 `data` field of a capture reply.
fn decode_capture(reply: Value) -> Result<Vec<u8>> {
    let capture = CaptureData::deserialize(&reply)
        .map_err(|_| Error::protocol("capture reply has no data"))?;
    Ok(Base64Standard.decode(capture.data)?)
}

// ============================================================================
// Tests
// ============================================================================
