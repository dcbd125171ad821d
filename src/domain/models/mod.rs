mod brief;
mod document;
mod embedding;
mod interests;
mod search_result;

pub use brief::*;
pub use document::*;
pub use embedding::*;
pub use interests::*;
pub use search_result::*;
