//! 错误处理模块
//!
//! 统一的错误类型定义。错误分为配置、连接、会话已关闭、序列化、
//! 反序列化、校验、未找到、超时以及驱动透传几类。

use std::time::Duration;
use thiserror::Error;

/// rat_mgo 错误类型
///
/// 需要 `Clone`：查询构建器会暂存转换失败的错误，每次终结调用都要原样返回它
#[derive(Error, Debug, Clone)]
pub enum MgoError {
    /// 配置错误（连接串为空或格式不正确、DialInfo 校验失败）
    #[error("{message}")]
    ConfigError { message: String },

    /// 连接错误（连接或 ping 失败）
    #[error("{message}")]
    ConnectionError { message: String },

    /// 会话已关闭
    #[error("session is closed")]
    SessionClosed,

    /// 单文档查询没有匹配结果
    #[error("not found")]
    NotFound,

    /// 文档无法规整为 BSON 文档
    #[error("{message}")]
    SerializationError { message: String },

    /// 服务器返回的文档无法解码为目标类型
    #[error("{message}")]
    DeserializationError { message: String },

    /// 调用方输入校验失败
    #[error("{field}: {message}")]
    ValidationError { field: String, message: String },

    /// 操作超过会话的超时时间
    #[error("{operation} timed out after {timeout:?}")]
    Timeout { operation: String, timeout: Duration },

    /// 驱动返回的其他错误，不做任何解释
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
}

/// rat_mgo 结果类型
pub type MgoResult<T> = Result<T, MgoError>;

impl MgoError {
    /// 是否为未找到错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, MgoError::NotFound)
    }

    /// 是否为会话已关闭错误
    pub fn is_closed(&self) -> bool {
        matches!(self, MgoError::SessionClosed)
    }

    /// 是否为超时错误
    pub fn is_timeout(&self) -> bool {
        matches!(self, MgoError::Timeout { .. })
    }

    /// 是否为唯一键冲突（E11000 / E11001 / E12582）
    pub fn is_dup_key(&self) -> bool {
        use mongodb::error::{ErrorKind, WriteFailure};

        let MgoError::Driver(err) = self else {
            return false;
        };
        let is_dup = |code: i32| matches!(code, 11000 | 11001 | 12582);
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(e)) => is_dup(e.code),
            ErrorKind::BulkWrite(failure) => failure
                .write_errors
                .as_ref()
                .map(|errors| errors.iter().any(|e| is_dup(e.code)))
                .unwrap_or(false),
            ErrorKind::Command(e) => is_dup(e.code),
            _ => false,
        }
    }
}

/// 快速创建本地化错误
///
/// ```ignore
/// quick_error!(config, "连接串不能为空");
/// quick_error!(validation, "sort", "排序字段不能为空");
/// ```
#[macro_export]
macro_rules! quick_error {
    (config, $msg:expr) => {
        $crate::error::MgoError::ConfigError {
            message: $crate::i18n::tf("error.config", &[("message", AsRef::<str>::as_ref(&$msg))]),
        }
    };
    (connection, $msg:expr) => {
        $crate::error::MgoError::ConnectionError {
            message: $crate::i18n::tf("error.connection", &[("message", AsRef::<str>::as_ref(&$msg))]),
        }
    };
    (serialization, $msg:expr) => {
        $crate::error::MgoError::SerializationError {
            message: $crate::i18n::tf("error.serialization", &[("message", AsRef::<str>::as_ref(&$msg))]),
        }
    };
    (deserialization, $msg:expr) => {
        $crate::error::MgoError::DeserializationError {
            message: $crate::i18n::tf("error.deserialization", &[("message", AsRef::<str>::as_ref(&$msg))]),
        }
    };
    (validation, $field:expr, $msg:expr) => {
        $crate::error::MgoError::ValidationError {
            field: ($field).to_string(),
            message: $crate::i18n::tf("error.validation", &[("message", AsRef::<str>::as_ref(&$msg))]),
        }
    };
    (timeout, $op:expr, $timeout:expr) => {
        $crate::error::MgoError::Timeout {
            operation: ($op).to_string(),
            timeout: $timeout,
        }
    };
}
