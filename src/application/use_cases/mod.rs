mod generate_brief;
mod record_feedback;
mod retrieve_context;

pub use generate_brief::*;
pub use record_feedback::*;
pub use retrieve_context::*;
