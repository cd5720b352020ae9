//! Query Handlers 实现
//!
//! 所有 QueryHandler 的具体实现

mod publish_handlers;

pub use publish_handlers::*;
