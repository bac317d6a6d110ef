//! # 配置构建器模块
//!
//! 提供拨号配置的构建器实现，支持链式调用和严格验证

pub mod dial_builder;

pub use dial_builder::DialInfoBuilder;
