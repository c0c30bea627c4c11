//! Storage traits and in-memory backends.
//!
//! - [`ClientStorage`] - durable registry of OAuth clients
//! - [`TokenStore`] - TTL key-value store for ephemeral credentials
//! - [`EphemeralTokens`] - typed facade over a [`TokenStore`]
//!
//! # Implementations
//!
//! - [`MemoryClientStorage`], [`MemoryTokenStore`] - in-process
//! - `mykb-auth-postgres` - PostgreSQL client storage
//! - `mykb-server` - Redis token store

pub mod client;
pub mod ephemeral;
pub mod memory;
pub mod token;

pub use client::ClientStorage;
pub use ephemeral::{EphemeralTokens, IssuedTokens};
pub use memory::{MemoryClientStorage, MemoryTokenStore};
pub use token::TokenStore;
#[cfg(any(test, feature = "test-utils"))]
pub use token::count_concurrent_redemptions;
