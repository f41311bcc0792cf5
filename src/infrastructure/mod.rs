pub mod config;
pub mod document_mapper;
pub mod error;
pub mod firestore_client;
pub mod logging;
#[cfg(test)]
pub mod testing;
