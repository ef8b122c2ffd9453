pub mod udp;
pub mod video;

pub use udp::{CommandLink, LinkConfig, Response};
pub use video::{VideoConfig, VideoStream};
