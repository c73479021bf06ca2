pub mod error;
pub mod registry;
pub mod schema;
pub mod scratch;
pub mod sqlite;
pub mod traits;
pub mod workbook;

pub use error::{Recovery, RemoteError, StorageError};
pub use registry::IdRegistry;
pub use scratch::ScratchFiles;
pub use sqlite::SqliteBlobStore;
pub use traits::*;
