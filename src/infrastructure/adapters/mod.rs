//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod chat;
pub mod language;
pub mod vision;

pub use chat::{ChatClient, ChatClientConfig};
pub use language::*;
pub use vision::*;
