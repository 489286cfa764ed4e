// Storage layer: LanceDB for vectors, SQLite for the document registry.

pub mod lancedb;
pub mod sqlite;
