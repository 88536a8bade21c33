pub mod connection;
pub mod migrations;
pub mod store;

pub use connection::initialize_database;
pub use store::SqliteStore;
