pub mod classify;
pub mod cli;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod extract;
pub mod imaging;
pub mod pipeline;
pub mod postprocess;
pub mod record;
pub mod registry;
pub mod report;
pub mod store;
pub mod template;
pub mod util;

pub use error::{IngestError, Result};
