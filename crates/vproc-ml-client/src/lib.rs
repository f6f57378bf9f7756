//! Client for the external media services.
//!
//! The services generate subtitles, translate them, dub audio and upscale
//! renditions. They read and write object storage themselves; the worker
//! only triggers them and reports transport failures.

pub mod client;
pub mod error;

pub use client::{MediaServices, ServiceClient, ServiceClientConfig};
pub use error::{MlError, MlResult};
