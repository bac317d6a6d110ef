//! rat_mgo - mgo 风格的 MongoDB 访问层
//!
//! 在官方 MongoDB 驱动之上提供 Session → Database → Collection → Query → Iter
//! 的链式接口，保留 mgo 的调用习惯：选择器和更新文档可以是任意可序列化的值，
//! 查询构建器惰性执行，单文档查询没有结果时返回 NotFound。

// 导出所有公共模块
pub mod collection;
pub mod config;
pub mod database;
pub mod error;
pub mod i18n;
pub mod iter;
pub mod query;
pub mod session;
pub mod types;
pub mod utils;

// 重新导出常用类型和函数
pub use collection::Collection;
pub use config::{dial_info, DialInfo, DialInfoBuilder};
pub use database::Database;
pub use error::{MgoError, MgoResult};
pub use iter::Iter;
pub use query::Query;
pub use session::{dial, dial_with_info, dial_with_timeout, Session};
pub use types::{ChangeInfo, Index, Mode, Safe};

// 调用方直接使用驱动的 BSON 类型构造文档
pub use mongodb::bson;

// 条件编译调试宏 - 只有在 debug 模式下才输出调试信息
#[cfg(debug_assertions)]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        rat_logger::debug!($($arg)*);
    };
}

#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        // 在 release 模式下不输出调试信息
    };
}

/// 初始化rat_mgo库
///
/// 注册多语言错误消息。日志系统由调用者自行初始化
pub fn init() {
    i18n::ErrorMessageI18n::init();
}

/// 库版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库名称
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// 获取库信息
pub fn get_info() -> String {
    format!("{} v{}", NAME, VERSION)
}
