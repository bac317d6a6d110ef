//! # 拨号配置构建器模块
//!
//! 提供拨号配置的构建器实现，支持链式调用和严格验证

use crate::config::core::DialInfo;
use crate::error::MgoError;
use rat_logger::info;
use std::collections::BTreeMap;
use std::time::Duration;

/// 拨号配置构建器
///
/// 严格要求地址、数据库、超时和连接池上限显式设置，严禁使用默认值
#[derive(Debug)]
pub struct DialInfoBuilder {
    addrs: Vec<String>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    source: Option<String>,
    mechanism: Option<String>,
    replica_set_name: Option<String>,
    direct: bool,
    timeout: Option<Duration>,
    pool_limit: Option<u32>,
    options: BTreeMap<String, String>,
}

impl DialInfoBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            addrs: Vec::new(),
            database: None,
            username: None,
            password: None,
            source: None,
            mechanism: None,
            replica_set_name: None,
            direct: false,
            timeout: None,
            pool_limit: None,
            options: BTreeMap::new(),
        }
    }

    /// 添加服务器地址
    ///
    /// # 参数
    ///
    /// * `addr` - 形如 `host:port` 的地址
    pub fn addr<S: Into<String>>(mut self, addr: S) -> Self {
        self.addrs.push(addr.into());
        self
    }

    /// 设置默认数据库
    pub fn database<S: Into<String>>(mut self, database: S) -> Self {
        self.database = Some(database.into());
        self
    }

    /// 设置用户名和密码
    pub fn auth<U: Into<String>, P: Into<String>>(mut self, username: U, password: P) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// 设置认证数据库
    pub fn source<S: Into<String>>(mut self, source: S) -> Self {
        self.source = Some(source.into());
        self
    }

    /// 设置认证机制
    pub fn mechanism<S: Into<String>>(mut self, mechanism: S) -> Self {
        self.mechanism = Some(mechanism.into());
        self
    }

    /// 设置副本集名称
    pub fn replica_set_name<S: Into<String>>(mut self, name: S) -> Self {
        self.replica_set_name = Some(name.into());
        self
    }

    /// 是否直连单个节点
    pub fn direct(mut self, direct: bool) -> Self {
        self.direct = direct;
        self
    }

    /// 设置拨号和单次操作超时
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 设置连接池上限
    pub fn pool_limit(mut self, pool_limit: u32) -> Self {
        self.pool_limit = Some(pool_limit);
        self
    }

    /// 添加自定义连接串参数
    pub fn option<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// 构建拨号配置
    ///
    /// # 错误
    ///
    /// 如果任何必需的配置项未设置或取值非法，将返回错误
    pub fn build(self) -> Result<DialInfo, MgoError> {
        if self.addrs.is_empty() {
            return Err(required("addrs"));
        }
        if self.addrs.iter().any(|addr| addr.trim().is_empty()) {
            return Err(crate::quick_error!(config, "服务器地址不能为空字符串"));
        }

        let database = self
            .database
            .ok_or_else(|| required("database"))?;

        let timeout = self
            .timeout
            .ok_or_else(|| required("timeout"))?;

        let pool_limit = self
            .pool_limit
            .ok_or_else(|| required("pool_limit"))?;

        if timeout.is_zero() {
            return Err(crate::quick_error!(config, "超时时间不能为零"));
        }

        if pool_limit == 0 {
            return Err(crate::quick_error!(config, "连接池上限不能为零"));
        }

        if self.password.is_some() && self.username.as_deref().map_or(true, str::is_empty) {
            return Err(crate::quick_error!(config, "设置密码时用户名不能为空"));
        }

        info!("创建拨号配置: 地址={:?}, 数据库={}", self.addrs, database);

        Ok(DialInfo {
            addrs: self.addrs,
            database,
            username: self.username,
            password: self.password,
            source: self.source,
            mechanism: self.mechanism,
            replica_set_name: self.replica_set_name,
            direct: self.direct,
            timeout_ms: timeout.as_millis() as u64,
            pool_limit,
            options: self.options,
        })
    }
}

fn required(field: &str) -> MgoError {
    crate::quick_error!(config, crate::i18n::tf("error.required_field", &[("field", field)]))
}

impl Default for DialInfoBuilder {
    fn default() -> Self {
        Self::new()
    }
}
