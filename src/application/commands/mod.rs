//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：提交与评审决定

mod publish_commands;

pub mod handlers;

pub use publish_commands::*;
