//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod review_handlers;
mod submit_handlers;

pub use review_handlers::*;
pub use submit_handlers::*;
