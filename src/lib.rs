pub mod api;
pub mod config;
pub mod consumer;
pub mod decode;
pub mod error;
pub mod lines;
pub mod record;

pub use crate::api::{ApiClient, ModelTag, ProcessEntry};
pub use crate::config::Config;
pub use crate::consumer::{
    CancellationToken, GenerationConsumer, GenerationHandle, GenerationRequest, GenerationSink,
    StreamState,
};
pub use crate::error::{ClientError, ErrorKind};
