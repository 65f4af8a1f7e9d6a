pub mod config_manager;
pub mod document;
pub mod error;
pub mod memory_store;
pub mod traits;
pub mod types;

pub use config_manager::*;
pub use document::*;
pub use error::*;
pub use memory_store::*;
pub use traits::*;
pub use types::*;
