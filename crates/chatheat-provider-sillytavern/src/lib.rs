//! SillyTavern stores for chatheat
//!
//! Two ways to reach the same chat archive: [`FsStore`] reads the user data
//! directory on disk, [`HttpStore`] talks to a running server.

pub mod fs_store;
pub mod http_store;

#[cfg(test)]
pub mod test_utils;

pub use fs_store::FsStore;
pub use http_store::HttpStore;
