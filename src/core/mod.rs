//! Image-to-animation conversion.
//!
//! - **frame**: Frame converter (decoded image -> opacity bitmap) and image loading
//! - **animation**: `AnimationSpec`, the unit exchanged with the render loop
//!
//! # Data flow
//!
//! ```text
//! paths ──load_images──▶ DynamicImage ──Frame::from_image──▶ Frame
//!                                                             │
//!                         AnimationSpec { frames, glyph, interval }
//! ```

pub mod animation;
pub mod frame;

pub use animation::AnimationSpec;
pub use frame::{load_images, Frame};
