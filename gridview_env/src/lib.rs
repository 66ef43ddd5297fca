//! gridview environment seam.
//!
//! Everything the core engines deliberately do not know about lives here:
//! where snapshots come from ([`FrameSource`] / [`FrameFeed`]), how time
//! passes ([`Clock`]), and the cooperative loop that stitches them to a
//! renderer ([`ScenePlayer`]). Production implementations talk HTTP
//! ([`HttpFrameSource`]) and Tokio timers ([`TokioClock`]); the sim crate
//! substitutes scripted sources and a virtual clock through the same
//! traits.

mod clock;
mod error;
mod http;
mod player;
mod source;

pub use clock::{Clock, TokioClock};
pub use error::SourceError;
pub use http::{BufferedFeed, HttpFrameSource, DEFAULT_BASE_URL};
pub use player::{PlaybackReport, PlayerCommand, PlayerConfig, ScenePlayer};
pub use source::{FrameFeed, FrameSource};
