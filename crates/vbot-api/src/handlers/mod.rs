//! Request handlers.

pub mod download;
pub mod files;
pub mod health;
pub mod status;

pub use download::*;
pub use files::*;
pub use health::*;
pub use status::*;
