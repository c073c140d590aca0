//! Google Gemini `generateContent`: wire types, request building, the HTTP
//! client and response normalization.

pub mod client;
pub mod normalize;
pub mod request;
pub mod types;

pub use client::{ContentGenerator, GeminiHttp, ImageService};
pub use normalize::{GeneratedImage, GeneratedResult};
