//! Memory Layer - In-Memory State Management
//!
//! 实现待评审存储与状态/结果存储，流水线 worker 与外部请求并发访问

mod result_store;
mod review_store;

pub use result_store::InMemoryResultStore;
pub use review_store::InMemoryPendingReviewStore;
