//! PostgreSQL persistence: pool, schema types and the symbol store.

mod pool;
mod schema;
mod store;

pub use pool::DatabasePool;
pub use schema::{CategoryRecord, HistoryInsert, HistoryRow, SymbolRecord, SymbolUpsert};
pub use store::{PgSymbolStore, StoreError, SymbolStore};

#[cfg(test)]
pub use store::memory::MemoryStore;
