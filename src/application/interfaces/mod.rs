mod brief_archive;
mod chat_client;
mod embedding_service;
mod rag_store;

pub use brief_archive::*;
pub use chat_client::*;
pub use embedding_service::*;
pub use rag_store::*;
