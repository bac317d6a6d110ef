//! 公共类型定义
//!
//! 写入安全级别、一致性模式、索引定义和变更统计

pub mod change_info;
pub mod index;
pub mod safety;

// 重新导出所有公共类型
pub use change_info::ChangeInfo;
pub use index::Index;
pub use safety::{Mode, Safe};
