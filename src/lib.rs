pub mod cluster;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod remote;
pub mod session;
pub mod sync;

pub use error::{Error, Result};
