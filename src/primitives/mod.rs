//! A collection of primitives useful for more than one protocol flow.
//!
//! A primitive is the smallest independent unit of policy used by the provider. The credential
//! [`store`] owns all shared mutable state (consumers, tokens and nonce records) while the
//! [`generator`] decides how token material is produced. Abstracting them away behind traits
//! makes it possible to provide, e.g., an independent database backed implementation without
//! touching any flow logic.
//!
//! ```
//! use patina_oauth::primitives::prelude::*;
//!
//! let mut store = MemoryStore::new();
//! store.register_consumer(Consumer::new("demo", "s3cr3t"));
//! ```
//!
//! [`store`]: store/index.html
//! [`generator`]: generator/index.html

use chrono::DateTime;
use chrono::Utc;

pub mod consumer;
pub mod generator;
pub mod store;
pub mod token;

type Time = DateTime<Utc>;

/// Commonly used primitives for providers and backends.
pub mod prelude {
    pub use super::consumer::{Consumer, ConsumerStatus};
    pub use super::generator::{KeyGenerator, RandomGenerator};
    pub use super::store::{MemoryStore, Store, StoreError};
    pub use super::token::{Callback, Token, TokenKind};
}
