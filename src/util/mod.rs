pub mod config;
pub mod consts;
mod custom_types;
mod utils;

pub use config::Config;
pub use custom_types::*;
pub use utils::*;
