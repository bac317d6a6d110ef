//! # 配置管理模块
//!
//! 提供拨号配置，支持构建器模式、配置文件加载和连接串生成
//! 严格遵循项目规范：所有必需配置项必须显式设置

pub mod builders;
pub mod convenience;
pub mod core;

pub use builders::DialInfoBuilder;
pub use convenience::dial_info;
pub use self::core::{redact_uri, DialInfo, DEFAULT_DATABASE, DEFAULT_DIAL_TIMEOUT, DEFAULT_POOL_LIMIT};
