/// Record store access layer.
///
/// The store is an external collaborator known to the rest of the service
/// only through the `RecordStore` contract. Two backends are provided:
/// Postgres for deployments and an in-memory map for tests.
pub mod memory;
pub mod postgres;
pub mod schema;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgRecordStore;
pub use store::{BatchCommit, RecordStore};
