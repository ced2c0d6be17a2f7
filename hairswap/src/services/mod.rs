//! Clients for the two external collaborators: the inference backend and
//! the blob-storage backend. Both are reached over plain HTTP(S); their
//! availability is assumed, not verified beyond status and shape checks.

pub mod inference;
pub mod storage;

pub use inference::InferenceClient;
pub use storage::StorageClient;
