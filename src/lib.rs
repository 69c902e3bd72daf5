pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod render;
pub mod session;
pub mod storage;
pub mod timestamp;

pub use config::WidgetConfig;
pub use error::{Result, TabnotesError};
pub use render::{Board, Renderer};
pub use session::{PageMode, Session};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
