//! Storage backends for articles and generated content. The in-memory
//! backend is always available; SQLite persistence is behind the `sqlite`
//! feature. Both implement the `np_core` store traits, so the rest of the
//! system never knows which one it is talking to.

pub mod backends;

pub use backends::MemoryStorage;

#[cfg(feature = "sqlite")]
pub use backends::SqliteStorage;
