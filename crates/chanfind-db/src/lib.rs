//! # chanfind-db
//!
//! Store layer for chanfind.
//!
//! This crate provides:
//! - Connection pool management
//! - PostgreSQL repository implementations for channels, properties, and
//!   tags, with channel documents held as JSONB (embedded instance lists)
//! - Idempotent schema bootstrap
//! - An in-memory backend with identical semantics for tests and demos
//!
//! ## Example
//!
//! ```rust,ignore
//! use chanfind_db::{create_pool, ensure_schema, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool("postgres://localhost/chanfind").await?;
//!     ensure_schema(&pool).await?;
//!     let db = Database::new(pool);
//!
//!     let channel = db.channels.find_by_id("sig:A").await?;
//!     println!("{channel:?}");
//!     Ok(())
//! }
//! ```

pub mod channels;
pub mod memory;
pub mod pool;
pub mod properties;
pub mod schema;
pub mod tags;

// Re-export core types
pub use chanfind_core::*;

pub use channels::PgChannelRepository;
pub use memory::{
    MemoryChannelRepository, MemoryPropertyRepository, MemoryStore, MemoryTagRepository,
};
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use properties::PgPropertyRepository;
pub use schema::ensure_schema;
pub use tags::PgTagRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::PgPool,
    /// Channel document repository.
    pub channels: PgChannelRepository,
    /// Canonical property definition repository.
    pub properties: PgPropertyRepository,
    /// Canonical tag definition repository.
    pub tags: PgTagRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            channels: PgChannelRepository::new(pool.clone()),
            properties: PgPropertyRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            pool,
        }
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
