//! core-types: value primitives for the channel dataflow.
//!
//! Everything in here is plain data with no reactor coupling: channel
//! values and their bounded-rescale relatives, the channel buffer with its
//! lazy shift/repeat representation, the RGB color view over a buffer, and
//! the duration grammar shared by the configuration layer and the trigger
//! expressions.

mod buffer;
mod color;
mod duration;
mod ranged;
mod value;

pub use buffer::ChannelBuffer;
pub use color::{colorwheel, ColorBuffer, ParseRgbError, Rgb};
pub use duration::{format_duration, parse_duration, DurationParseError};
pub use ranged::{rescale, Bounds, ByteBounds, PercentBounds, Ranged, UnitBounds};
pub use value::ChannelValue;
