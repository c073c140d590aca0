//! Upload a photo, then either ask Gemini to describe it or to edit it from a
//! text prompt.

pub mod config;
pub mod encoder;
pub mod error;
pub mod gemini;
pub mod server;
pub mod state;

pub use config::Config;
pub use encoder::{EncodedImage, UploadedImage};
pub use error::{BoothError, ConfigError};
pub use gemini::{ContentGenerator, GeminiHttp, GeneratedResult, ImageService};
pub use state::{Controller, Mode, Phase, Rejection, StateSnapshot};
