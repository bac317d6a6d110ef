//! 共享连接模块
//!
//! 一个 `Connection` 包装一个驱动 `Client`，由 `try_clone` 得到的会话共享；
//! 最后一个共享它的会话关闭时才真正断开

use crate::error::{MgoError, MgoResult};
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;
use rat_logger::{debug, info};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 为驱动操作加上会话超时
///
/// 超时为零时不设上限
pub(crate) async fn bounded<T, F>(operation: &str, timeout: Duration, future: F) -> MgoResult<T>
where
    F: Future<Output = mongodb::error::Result<T>>,
{
    if timeout.is_zero() {
        return future.await.map_err(MgoError::from);
    }

    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result.map_err(MgoError::from),
        Err(_) => Err(crate::quick_error!(timeout, operation, timeout)),
    }
}

/// 共享的底层连接
pub(crate) struct Connection {
    client: Client,
    uri: String,
    open_sessions: AtomicUsize,
}

impl Connection {
    /// 按连接串建立连接池，返回连接和连接串中的默认数据库名
    ///
    /// 驱动的连接是惰性的，这里只解析选项并创建客户端
    pub(crate) async fn open(
        uri: &str,
        pool_limit: u32,
        timeout: Duration,
    ) -> MgoResult<(Arc<Self>, Option<String>)> {
        let parse = ClientOptions::parse(uri);
        let parsed = if timeout.is_zero() {
            parse.await
        } else {
            tokio::time::timeout(timeout, parse)
                .await
                .map_err(|_| crate::quick_error!(timeout, "parse", timeout))?
        };
        let mut options = parsed.map_err(|e| crate::quick_error!(config, e.to_string()))?;

        options.max_pool_size = Some(pool_limit);
        let database = options
            .default_database
            .clone()
            .filter(|name| !name.is_empty());

        let client = Client::with_options(options)
            .map_err(|e| crate::quick_error!(connection, e.to_string()))?;

        debug!("创建MongoDB客户端: 连接池上限={}", pool_limit);

        Ok((
            Arc::new(Self {
                client,
                uri: uri.to_string(),
                open_sessions: AtomicUsize::new(1),
            }),
            database,
        ))
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn uri(&self) -> &str {
        &self.uri
    }

    /// 向 admin 库发送 ping
    pub(crate) async fn ping(&self) -> mongodb::error::Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map(|_| ())
    }

    /// 新会话开始共享该连接
    pub(crate) fn retain(&self) {
        self.open_sessions.fetch_add(1, Ordering::AcqRel);
    }

    /// 会话关闭，最后一个会话关闭时断开客户端
    pub(crate) async fn release(&self) {
        if self.open_sessions.fetch_sub(1, Ordering::AcqRel) == 1 {
            info!("断开MongoDB连接: {}", crate::config::redact_uri(&self.uri));
            self.client.clone().shutdown_immediate().await;
        }
    }

    /// 会话未关闭就被丢弃时只减少计数，客户端随最后一个句柄一起释放
    pub(crate) fn forget(&self) {
        self.open_sessions.fetch_sub(1, Ordering::AcqRel);
    }

    #[cfg(test)]
    pub(crate) fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_reports_timeout() {
        let result: MgoResult<()> = bounded("sleep", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        match result {
            Err(MgoError::Timeout { operation, timeout }) => {
                assert_eq!(operation, "sleep");
                assert_eq!(timeout, Duration::from_millis(10));
            }
            other => panic!("期望超时错误，实际为 {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_timeout_is_unbounded() {
        let result = bounded("value", Duration::ZERO, async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(7)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_open_reads_default_database() {
        let (connection, database) =
            Connection::open("mongodb://127.0.0.1:1/inventory", 4, Duration::from_secs(5))
                .await
                .unwrap();
        assert_eq!(database.as_deref(), Some("inventory"));
        assert_eq!(connection.open_sessions(), 1);
        assert_eq!(connection.uri(), "mongodb://127.0.0.1:1/inventory");

        connection.retain();
        assert_eq!(connection.open_sessions(), 2);
        connection.forget();
        connection.release().await;
        assert_eq!(connection.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_malformed_uri_is_config_error() {
        let result = Connection::open("mongodb://", 4, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(MgoError::ConfigError { .. })));
    }
}
