//! Theatre-Common: Shared types, time codec, and errors.
//!
//! This crate provides functionality used across theatre:
//!
//! - **Typed IDs**: Newtype wrappers for media, series and playback session identifiers
//! - **Core Types**: Media references, media kinds and episode listings
//! - **Time Codec**: Conversion between seconds and the `"MM:SS"` resume wire format
//! - **Error Handling**: Common error type and result alias
//!
//! # Examples
//!
//! ```
//! use theatre_common::{timecode, MediaId, MediaReference, Timecode};
//!
//! let reference = MediaReference::movie(MediaId::new(7), "films/heat.mp4", Timecode::zero());
//! assert_eq!(reference.id.get(), 7);
//!
//! assert_eq!(timecode::encode(150.7), "02:30");
//! assert_eq!(timecode::decode("02:30").unwrap(), 150);
//! ```

pub mod error;
pub mod ids;
pub mod timecode;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use timecode::Timecode;
pub use types::*;
