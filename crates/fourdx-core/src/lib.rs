pub mod attribution;
pub mod commitment;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod error;
pub mod io;
pub mod ledger;
pub mod member;
pub mod paths;
pub mod scoring;
pub mod session;
pub mod store;
pub mod template;
pub mod types;
pub mod week;
pub mod workspace;

pub use error::{ErrorKind, FourdxError, Result};
