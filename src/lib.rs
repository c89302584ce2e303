pub mod backend;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod generate;
pub mod model;
pub mod registry;
pub mod service;
pub mod training;
pub mod types;
pub mod utils;

pub use config::Config;
pub use error::{GanError, Result};
pub use registry::ModelRegistry;
pub use service::GanService;
