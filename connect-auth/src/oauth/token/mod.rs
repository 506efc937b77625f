//! OAuth token types and the storage seam that persists them.

mod storage;
mod tokens;

pub use storage::Storage;
pub use tokens::{TokenBundle, TokenGrant};
