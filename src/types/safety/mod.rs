use mongodb::options::{
    Acknowledgment, ReadPreference, ReadPreferenceOptions, SelectionCriteria, WriteConcern,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 会话一致性模式
///
/// 与 mgo.v2 的三种模式对应，映射为驱动的读偏好
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Mode {
    /// 只从主节点读取
    Strong,
    /// 优先主节点
    #[default]
    Monotonic,
    /// 就近读取，可能读到旧数据
    Eventual,
}

impl Mode {
    /// 转换为驱动的服务器选择条件
    pub fn selection_criteria(&self) -> SelectionCriteria {
        let read_preference = match self {
            Mode::Strong => ReadPreference::Primary,
            Mode::Monotonic => ReadPreference::PrimaryPreferred {
                options: ReadPreferenceOptions::default(),
            },
            Mode::Eventual => ReadPreference::Nearest {
                options: ReadPreferenceOptions::default(),
            },
        };
        SelectionCriteria::ReadPreference(read_preference)
    }
}

/// 写入安全级别
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Safe {
    /// 需要确认写入的节点数量，0 表示使用服务器默认值
    pub w: u32,
    /// 写入模式，例如 "majority" 或自定义标签集，优先于 `w`
    pub w_mode: String,
    /// 等待写入确认的超时时间（毫秒），0 表示不限制
    pub w_timeout: u64,
    /// 写入前是否要求刷盘，新版服务器上等价于写入日志
    pub fsync: bool,
    /// 是否等待写入日志
    pub j: bool,
}

impl Default for Safe {
    fn default() -> Self {
        Self {
            w: 1,
            w_mode: String::new(),
            w_timeout: 0,
            fsync: false,
            j: false,
        }
    }
}

impl Safe {
    /// 转换为驱动的写关注
    pub fn write_concern(&self) -> WriteConcern {
        let mut write_concern = WriteConcern::default();

        write_concern.w = if !self.w_mode.is_empty() {
            if self.w_mode == "majority" {
                Some(Acknowledgment::Majority)
            } else {
                Some(Acknowledgment::Custom(self.w_mode.clone()))
            }
        } else if self.w > 0 {
            Some(Acknowledgment::Nodes(self.w))
        } else {
            None
        };

        if self.w_timeout > 0 {
            write_concern.w_timeout = Some(Duration::from_millis(self.w_timeout));
        }

        if self.j || self.fsync {
            write_concern.journal = Some(true);
        }

        write_concern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_safe_acknowledges_one_node() {
        let write_concern = Safe::default().write_concern();
        assert_eq!(write_concern.w, Some(Acknowledgment::Nodes(1)));
        assert_eq!(write_concern.w_timeout, None);
        assert_eq!(write_concern.journal, None);
    }

    #[test]
    fn test_w_mode_takes_precedence() {
        let safe = Safe {
            w: 3,
            w_mode: "majority".to_string(),
            w_timeout: 500,
            fsync: true,
            j: false,
        };
        let write_concern = safe.write_concern();
        assert_eq!(write_concern.w, Some(Acknowledgment::Majority));
        assert_eq!(write_concern.w_timeout, Some(Duration::from_millis(500)));
        assert_eq!(write_concern.journal, Some(true));

        let tagged = Safe {
            w_mode: "dc-east".to_string(),
            ..Safe::default()
        };
        assert_eq!(
            tagged.write_concern().w,
            Some(Acknowledgment::Custom("dc-east".to_string()))
        );
    }

    #[test]
    fn test_zero_w_uses_server_default() {
        let safe = Safe { w: 0, ..Safe::default() };
        assert_eq!(safe.write_concern().w, None);
    }

    #[test]
    fn test_mode_read_preference() {
        assert!(matches!(
            Mode::Strong.selection_criteria(),
            SelectionCriteria::ReadPreference(ReadPreference::Primary)
        ));
        assert!(matches!(
            Mode::Monotonic.selection_criteria(),
            SelectionCriteria::ReadPreference(ReadPreference::PrimaryPreferred { .. })
        ));
        assert!(matches!(
            Mode::Eventual.selection_criteria(),
            SelectionCriteria::ReadPreference(ReadPreference::Nearest { .. })
        ));
        assert_eq!(Mode::default(), Mode::Monotonic);
    }
}
