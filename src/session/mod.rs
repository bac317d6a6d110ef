//! 会话模块
//!
//! `Session` 持有共享连接以及受读写锁保护的会话状态：
//! 关闭标记、默认数据库、一致性模式、写入安全级别、超时和连接池上限。
//! 读取状态（按默认库选库、ping、克隆）取读锁，修改状态（关闭、设置安全级别、
//! 设置超时、按名字选库时更新默认库）取写锁，锁从不跨越 `.await` 持有。

pub(crate) mod connection;

use crate::config::{redact_uri, DialInfo, DEFAULT_DATABASE, DEFAULT_DIAL_TIMEOUT, DEFAULT_POOL_LIMIT};
use crate::database::Database;
use crate::error::{MgoError, MgoResult};
use crate::types::{Mode, Safe};
use connection::{bounded, Connection};
use mongodb::bson::Document;
use mongodb::options::{CollectionOptions, DatabaseOptions};
use parking_lot::RwLock;
use rat_logger::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// 会话状态
#[derive(Debug, Clone)]
struct SessionState {
    closed: bool,
    database: String,
    mode: Mode,
    safe: Safe,
    socket_timeout: Duration,
    pool_limit: u32,
}

/// 数据库会话
///
/// 通过 [`dial`]、[`dial_with_timeout`] 或 [`dial_with_info`] 创建
pub struct Session {
    connection: Arc<Connection>,
    state: RwLock<SessionState>,
}

/// 使用默认超时（10秒）和默认连接池上限拨号
pub async fn dial(uri: &str) -> MgoResult<Session> {
    dial_with_timeout(uri, DEFAULT_DIAL_TIMEOUT, 0).await
}

/// 拨号并检查连接
///
/// # 参数
///
/// * `uri` - 以 `mongodb://` 开头的连接串
/// * `timeout` - 拨号超时，同时作为会话后续操作的超时
/// * `pool_max` - 连接池上限，0 表示使用默认值
pub async fn dial_with_timeout(uri: &str, timeout: Duration, pool_max: u32) -> MgoResult<Session> {
    if uri.is_empty() || !uri.starts_with("mongodb://") {
        return Err(crate::quick_error!(
            config,
            crate::i18n::tf("error.invalid_url", &[("url", redact_uri(uri).as_str())])
        ));
    }

    let pool_limit = if pool_max == 0 { DEFAULT_POOL_LIMIT } else { pool_max };
    info!("拨号MongoDB: {}", redact_uri(uri));

    let (connection, database) = Connection::open(uri, pool_limit, timeout).await?;

    // 检查连接
    if let Err(e) = bounded("ping", timeout, connection.ping()).await {
        connection.release().await;
        return Err(match e {
            MgoError::Driver(e) => crate::quick_error!(connection, e.to_string()),
            other => other,
        });
    }

    let database = database.unwrap_or_else(|| DEFAULT_DATABASE.to_string());
    info!("MongoDB连接成功: 默认数据库={}", database);

    Ok(Session::from_connection(connection, database, timeout, pool_limit))
}

/// 按拨号配置拨号
pub async fn dial_with_info(info: &DialInfo) -> MgoResult<Session> {
    debug!("按拨号配置拨号: {}", info.redacted_uri());
    dial_with_timeout(&info.build_uri(), info.timeout(), info.pool_limit).await
}

impl Session {
    fn from_connection(
        connection: Arc<Connection>,
        database: String,
        socket_timeout: Duration,
        pool_limit: u32,
    ) -> Self {
        Self {
            connection,
            state: RwLock::new(SessionState {
                closed: false,
                database,
                mode: Mode::Monotonic,
                safe: Safe::default(),
                socket_timeout,
                pool_limit,
            }),
        }
    }

    /// 不检查连通性，直接基于连接串构造会话
    #[cfg(test)]
    pub(crate) async fn connect_lazy(uri: &str, timeout: Duration) -> MgoResult<Self> {
        let (connection, database) = Connection::open(uri, DEFAULT_POOL_LIMIT, timeout).await?;
        let database = database.unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        Ok(Self::from_connection(connection, database, timeout, DEFAULT_POOL_LIMIT))
    }

    /// 读取会话状态，会话已关闭时返回错误
    fn open_state(&self) -> MgoResult<SessionState> {
        let state = self.state.read();
        if state.closed {
            return Err(MgoError::SessionClosed);
        }
        Ok(state.clone())
    }

    /// 当前写关注和读偏好下的驱动数据库句柄，以及操作超时
    pub(crate) fn database_handle(&self, name: &str) -> MgoResult<(mongodb::Database, Duration)> {
        let state = self.open_state()?;
        let mut options = DatabaseOptions::default();
        options.write_concern = Some(state.safe.write_concern());
        options.selection_criteria = Some(state.mode.selection_criteria());
        Ok((
            self.connection.client().database_with_options(name, options),
            state.socket_timeout,
        ))
    }

    /// 当前写关注和读偏好下的驱动集合句柄，以及操作超时
    pub(crate) fn collection_handle(
        &self,
        database: &str,
        name: &str,
    ) -> MgoResult<(mongodb::Collection<Document>, Duration)> {
        let state = self.open_state()?;
        let mut options = CollectionOptions::default();
        options.write_concern = Some(state.safe.write_concern());
        options.selection_criteria = Some(state.mode.selection_criteria());
        Ok((
            self.connection
                .client()
                .database(database)
                .collection_with_options(name, options),
            state.socket_timeout,
        ))
    }

    /// 克隆会话：共享同一个底层连接，复制会话设置
    pub fn try_clone(&self) -> MgoResult<Session> {
        let state = self.state.read();
        if state.closed {
            return Err(MgoError::SessionClosed);
        }

        self.connection.retain();
        debug!("克隆会话: 数据库={}", state.database);

        Ok(Session {
            connection: Arc::clone(&self.connection),
            state: RwLock::new(state.clone()),
        })
    }

    /// 复制会话：用相同的连接串和连接池上限建立新的底层连接，复制会话设置
    pub async fn copy(&self) -> MgoResult<Session> {
        let state = self.open_state()?;
        let uri = self.connection.uri().to_string();

        let (connection, _) = Connection::open(&uri, state.pool_limit, state.socket_timeout).await?;
        info!("复制会话: {}", redact_uri(&uri));

        Ok(Session {
            connection,
            state: RwLock::new(state),
        })
    }

    /// 关闭会话
    ///
    /// 重复调用无效果；共享连接在最后一个会话关闭时断开
    pub async fn close(&self) {
        {
            let mut state = self.state.write();
            if state.closed {
                return;
            }
            state.closed = true;
        }

        debug!("关闭会话");
        self.connection.release().await;
    }

    /// 会话是否已关闭
    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    /// 获取数据库句柄
    ///
    /// `name` 非空时成为会话新的默认数据库；为空时使用当前默认数据库，
    /// 初始值取自连接串（未指定时为 `test`）
    pub fn db(&self, name: &str) -> Database<'_> {
        let name = if name.is_empty() {
            self.state.read().database.clone()
        } else {
            let mut state = self.state.write();
            if state.database != name {
                debug!("切换默认数据库: {} -> {}", state.database, name);
                state.database = name.to_string();
            }
            state.database.clone()
        };
        Database::new(self, name)
    }

    /// 检查服务器是否可达
    pub async fn ping(&self) -> MgoResult<()> {
        let state = self.open_state()?;
        bounded("ping", state.socket_timeout, self.connection.ping())
            .await
            .map_err(|e| match e {
                MgoError::Driver(e) => crate::quick_error!(connection, e.to_string()),
                other => other,
            })
    }

    /// 设置写入安全级别，`None` 恢复为 `w = 1`
    pub fn set_safe(&self, safe: Option<Safe>) {
        let safe = safe.unwrap_or_default();
        debug!("设置写入安全级别: {:?}", safe);
        self.state.write().safe = safe;
    }

    /// 当前写入安全级别
    pub fn safe(&self) -> Safe {
        self.state.read().safe.clone()
    }

    /// 设置一致性模式
    pub fn set_mode(&self, mode: Mode) {
        debug!("设置一致性模式: {:?}", mode);
        self.state.write().mode = mode;
    }

    /// 当前一致性模式
    pub fn mode(&self) -> Mode {
        self.state.read().mode
    }

    /// 设置单次操作超时，0 表示不限制
    pub fn set_socket_timeout(&self, timeout: Duration) {
        self.state.write().socket_timeout = timeout;
    }

    /// 当前单次操作超时
    pub fn socket_timeout(&self) -> Duration {
        self.state.read().socket_timeout
    }

    /// 设置连接池上限，对之后 `copy` 出的会话生效
    pub fn set_pool_limit(&self, limit: u32) {
        let limit = if limit == 0 { DEFAULT_POOL_LIMIT } else { limit };
        self.state.write().pool_limit = limit;
    }

    /// 当前连接池上限
    pub fn pool_limit(&self) -> u32 {
        self.state.read().pool_limit
    }

    /// 服务器上的数据库名列表
    pub async fn database_names(&self) -> MgoResult<Vec<String>> {
        let state = self.open_state()?;
        bounded(
            "listDatabases",
            state.socket_timeout,
            self.connection.client().list_database_names(None, None),
        )
        .await
    }

    /// 在 admin 库上执行命令，不改变默认数据库
    pub async fn run<C, R>(&self, command: &C) -> MgoResult<R>
    where
        C: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        Database::new(self, "admin".to_string()).run(command).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.state.get_mut().closed {
            self.connection.forget();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Session")
            .field("uri", &redact_uri(self.connection.uri()))
            .field("database", &state.database)
            .field("closed", &state.closed)
            .field("mode", &state.mode)
            .field("socket_timeout", &state.socket_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    const LAZY_URI: &str = "mongodb://127.0.0.1:1/school";

    async fn lazy_session() -> Session {
        Session::connect_lazy(LAZY_URI, Duration::from_millis(200))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_dial_rejects_invalid_url() {
        for uri in ["", "localhost:27017", "redis://localhost:6379", "mongodb+srv://cluster.example.com"] {
            let result = dial(uri).await;
            assert!(
                matches!(result, Err(MgoError::ConfigError { .. })),
                "uri {:?} 应被拒绝",
                uri
            );
        }
    }

    #[tokio::test]
    async fn test_db_remembers_last_named_database() {
        let session = lazy_session().await;
        assert_eq!(session.db("").name(), "school");
        assert_eq!(session.db("other").name(), "other");
        assert_eq!(session.db("").name(), "other");

        // 克隆继承当前默认数据库，之后各自独立
        let cloned = session.try_clone().unwrap();
        assert_eq!(cloned.db("").name(), "other");
        cloned.db("third");
        assert_eq!(cloned.db("").name(), "third");
        assert_eq!(session.db("").name(), "other");

        cloned.close().await;
        session.close().await;
    }

    #[tokio::test]
    async fn test_run_keeps_default_database() {
        let session = lazy_session().await;
        session.db("reports");
        session.close().await;

        let result: MgoResult<Document> = session.run("ping").await;
        assert!(result.unwrap_err().is_closed());
        assert_eq!(session.db("").name(), "reports");
    }

    #[tokio::test]
    async fn test_missing_database_defaults_to_test() {
        let session = Session::connect_lazy("mongodb://127.0.0.1:1", Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(session.db("").name(), DEFAULT_DATABASE);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let session = lazy_session().await;
        assert!(!session.is_closed());
        session.close().await;
        assert!(session.is_closed());
        session.close().await;
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_operations_after_close_report_closed() {
        let session = lazy_session().await;
        session.close().await;

        assert!(session.ping().await.unwrap_err().is_closed());
        assert!(session.database_names().await.unwrap_err().is_closed());
        assert!(session.try_clone().unwrap_err().is_closed());
        assert!(session.copy().await.unwrap_err().is_closed());
        let result: MgoResult<Document> = session.run("ping").await;
        assert!(result.unwrap_err().is_closed());

        let db = session.db("");
        assert!(db.collection_names().await.unwrap_err().is_closed());
        assert!(db.drop_database().await.unwrap_err().is_closed());

        let users = db.c("users");
        assert!(users.insert([doc! { "name": "a" }]).await.unwrap_err().is_closed());
        assert!(users.count().await.unwrap_err().is_closed());
        assert!(users.remove(&doc! { "name": "a" }).await.unwrap_err().is_closed());

        let query = users.find(&doc! { "age": { "$gte": 25 } });
        let one: MgoResult<Document> = query.one().await;
        assert!(one.unwrap_err().is_closed());
        assert!(query.count().await.unwrap_err().is_closed());

        let mut iter = query.iter().await;
        assert!(iter.next::<Document>().await.is_none());
        assert!(iter.err().map(MgoError::is_closed).unwrap_or(false));
    }

    #[tokio::test]
    async fn test_clone_shares_connection_and_copies_settings() {
        let session = lazy_session().await;
        session.set_mode(Mode::Strong);
        session.set_safe(Some(Safe {
            w_mode: "majority".to_string(),
            ..Safe::default()
        }));

        let cloned = session.try_clone().unwrap();
        assert!(Arc::ptr_eq(&session.connection, &cloned.connection));
        assert_eq!(session.connection.open_sessions(), 2);
        assert_eq!(cloned.mode(), Mode::Strong);
        assert_eq!(cloned.safe().w_mode, "majority");

        // 克隆出的会话有独立的状态
        cloned.set_mode(Mode::Eventual);
        assert_eq!(session.mode(), Mode::Strong);

        cloned.close().await;
        assert!(cloned.is_closed());
        assert!(!session.is_closed());
        assert_eq!(session.connection.open_sessions(), 1);
        session.close().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_copy_opens_new_connection() {
        let session = lazy_session().await;
        session.set_pool_limit(7);

        let copied = session.copy().await.unwrap();
        assert!(!Arc::ptr_eq(&session.connection, &copied.connection));
        assert_eq!(copied.pool_limit(), 7);
        assert_eq!(copied.db("").name(), "school");

        session.close().await;
        assert!(!copied.is_closed());
        copied.close().await;
    }

    #[tokio::test]
    async fn test_set_safe_none_restores_default() {
        let session = lazy_session().await;
        session.set_safe(Some(Safe { w: 3, j: true, ..Safe::default() }));
        assert_eq!(session.safe().w, 3);

        session.set_safe(None);
        assert_eq!(session.safe(), Safe::default());
        assert_eq!(session.safe().w, 1);
    }

    #[tokio::test]
    async fn test_socket_timeout_and_pool_limit() {
        let session = lazy_session().await;
        assert_eq!(session.socket_timeout(), Duration::from_millis(200));
        session.set_socket_timeout(Duration::from_secs(2));
        assert_eq!(session.socket_timeout(), Duration::from_secs(2));

        session.set_pool_limit(0);
        assert_eq!(session.pool_limit(), DEFAULT_POOL_LIMIT);
    }

    #[tokio::test]
    async fn test_unreachable_server_times_out() {
        let session = lazy_session().await;
        let err = session.ping().await.unwrap_err();
        assert!(
            matches!(err, MgoError::Timeout { .. } | MgoError::ConnectionError { .. }),
            "意外的错误: {:?}",
            err
        );
    }
}
