//! layout2epub - 排版包到 EPUB 的转换流水线
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Document Context: 章节树、图片描述符、出现序号
//! - Package Context: zip / XML / URI 工具
//! - Processing Context: 处理上下文、状态、评审细节
//!
//! 应用层 (application/):
//! - Ports: 端口定义（PipelinePhase, PendingReviewStore, ResultStore, 外部服务, 描述缓存）
//! - Phases: 十个流水线阶段
//! - Commands: 提交与评审命令
//! - Queries: 状态、结果与待评审查询
//!
//! 基础设施层 (infrastructure/):
//! - Worker: 每阶段一个 worker 的编排器
//! - Memory: 待评审存储与结果存储
//! - Persistence: Sled 描述缓存 + 调试快照
//! - Adapters: 图片描述 / 语言检测客户端
//! - Events: 流水线事件广播

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
