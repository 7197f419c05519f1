pub mod client;
pub mod transport;

pub use client::{OnvifClient, OnvifProfile, VideoEncoderConfig};
pub use transport::OnvifTransport;
