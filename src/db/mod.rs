mod schema;
mod store;

pub use store::{DurableStore, SqliteStore};
