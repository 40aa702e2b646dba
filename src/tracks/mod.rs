//! Track records and result normalization

pub mod normalize;
pub mod track;

pub use normalize::{clamp_limit, normalize, RawVideo};
pub use track::{Track, VideoId, VideoInfo};
