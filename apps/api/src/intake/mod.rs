pub mod handlers;
pub mod log;
pub mod pipeline;
pub mod prompts;
pub mod structuring;
pub mod upload;
pub mod validation;
