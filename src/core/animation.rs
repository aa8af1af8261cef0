//! Animation specs
//!
//! An `AnimationSpec` is the unit handed to the render loop whenever the
//! displayed animation changes. It is moved, never shared: once submitted the
//! render loop owns it until the next submission replaces it.

use std::time::Duration;

use image::DynamicImage;
use unicode_width::UnicodeWidthChar;

use super::frame::Frame;
use crate::error::SpecError;

/// Ordered frames plus the glyph and interval used to display them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationSpec {
    frames: Vec<Frame>,
    glyph: char,
    interval: Duration,
}

impl AnimationSpec {
    /// Build a spec from already converted frames.
    ///
    /// The glyph must occupy exactly one terminal column. A non-empty spec
    /// needs a non-zero interval; an empty one is a blank and has no timer.
    pub fn new(frames: Vec<Frame>, glyph: char, interval: Duration) -> Result<Self, SpecError> {
        if glyph.width() != Some(1) {
            return Err(SpecError::InvalidGlyph(glyph));
        }
        if !frames.is_empty() && interval.is_zero() {
            return Err(SpecError::ZeroInterval);
        }
        Ok(Self {
            frames,
            glyph,
            interval,
        })
    }

    /// Convert decoded images and build a spec from them
    pub fn from_images(
        images: &[DynamicImage],
        glyph: char,
        interval: Duration,
    ) -> Result<Self, SpecError> {
        Self::new(images.iter().map(Frame::from_image).collect(), glyph, interval)
    }

    /// A spec with no frames; submitting it blanks the display
    pub fn blank() -> Self {
        Self {
            frames: Vec::new(),
            glyph: ' ',
            interval: Duration::ZERO,
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_blank(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn glyph(&self) -> char {
        self.glyph
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for AnimationSpec {
    fn default() -> Self {
        Self::blank()
    }
}
