mod file_rag_store;
mod flat_index;
mod gemini_api;
mod gemini_client;
mod gemini_embedding;
pub mod index_file;
mod mock_chat;
mod mock_embedding;
mod ort_embedding;
mod summary_archive;

pub use file_rag_store::*;
pub use flat_index::*;
pub use gemini_api::*;
pub use gemini_client::*;
pub use gemini_embedding::*;
pub use mock_chat::*;
pub use mock_embedding::*;
pub use ort_embedding::*;
pub use summary_archive::*;
