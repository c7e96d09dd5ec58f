//! Domain types for complaint records and their encrypted pointers
//!
//! - [`ComplaintRecord`] - the JSON document pinned to the content store
//! - [`ContentId`] - validated content identifier
//! - [`EncryptedPointer`] / [`Secret`] - the shareable pointer and its key

mod content_id;
mod record;
mod types;

pub use content_id::*;
pub use record::*;
pub use types::*;
