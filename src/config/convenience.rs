//! # 便利配置函数模块
//!
//! 提供常用拨号配置的便利函数，简化配置过程

use crate::config::core::{DialInfo, DEFAULT_DIAL_TIMEOUT, DEFAULT_POOL_LIMIT};
use crate::error::MgoError;

/// 创建单节点的拨号配置
///
/// 超时和连接池上限使用 `dial` 的默认值（10秒、10个连接）
///
/// # 参数
///
/// * `host` - 主机地址
/// * `port` - 端口号
/// * `database` - 数据库名
pub fn dial_info<H: Into<String>, D: Into<String>>(
    host: H,
    port: u16,
    database: D,
) -> Result<DialInfo, MgoError> {
    DialInfo::builder()
        .addr(format!("{}:{}", host.into(), port))
        .database(database)
        .timeout(DEFAULT_DIAL_TIMEOUT)
        .pool_limit(DEFAULT_POOL_LIMIT)
        .build()
}
