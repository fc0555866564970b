pub mod error;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;
pub mod store;
pub mod types;

pub use error::BlobError;
pub use memory::MemoryBlobStore;
#[cfg(feature = "s3")]
pub use s3::{S3BlobConfig, S3BlobStore};
pub use store::BlobStore;
pub use types::{StoredBlob, extension_for, generate_key};
