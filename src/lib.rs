pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, settings::Settings};

pub use adapters::http::ChatClient;
pub use core::{
    etl::{EtlEngine, RunSummary},
    pipeline::ReviewPipeline,
};
pub use utils::error::{EtlError, Result};
