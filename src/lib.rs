pub mod avro;
pub mod config;
pub mod error;
pub mod event;
pub mod kafka;
pub mod loader;
pub mod masking;
pub mod registry;
pub mod transform;

pub use config::{LoaderConfig, TransformConfig};
pub use error::{Error, Result, TransformError, TransformState};
pub use transform::MaskingTransform;
