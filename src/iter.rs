//! 游标迭代器模块
//!
//! `Iter` 逐个取出查询结果。出错时 `next` 返回 `None`，
//! 错误保存在迭代器中，由 [`Iter::err`] 查看或由 [`Iter::close`] 返回。

use crate::error::{MgoError, MgoResult};
use crate::session::connection::bounded;
use crate::utils::bson_conversion::from_document;
use mongodb::bson::Document;
use mongodb::Cursor;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// 结果迭代器
pub struct Iter {
    cursor: Option<Cursor<Document>>,
    timeout: Duration,
    err: Option<MgoError>,
}

impl Iter {
    pub(crate) fn new(cursor: Cursor<Document>, timeout: Duration) -> Self {
        Self {
            cursor: Some(cursor),
            timeout,
            err: None,
        }
    }

    /// 打开游标失败时得到的迭代器，不产出任何结果
    pub(crate) fn failed(err: MgoError) -> Self {
        Self {
            cursor: None,
            timeout: Duration::ZERO,
            err: Some(err),
        }
    }

    /// 取下一个结果
    ///
    /// 结果耗尽或出错时返回 `None` 并释放游标
    pub async fn next<T: DeserializeOwned>(&mut self) -> Option<T> {
        let cursor = self.cursor.as_mut()?;

        let advanced = bounded("getMore", self.timeout, cursor.advance()).await;
        let document = match advanced {
            Ok(true) => cursor.deserialize_current(),
            Ok(false) => {
                self.release();
                return None;
            }
            Err(e) => {
                self.fail(e);
                return None;
            }
        };

        match document.map_err(MgoError::from).and_then(from_document) {
            Ok(value) => Some(value),
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    /// 迭代过程中遇到的错误
    pub fn err(&self) -> Option<&MgoError> {
        self.err.as_ref()
    }

    /// 游标是否已经释放
    pub fn done(&self) -> bool {
        self.cursor.is_none()
    }

    /// 释放游标并返回迭代过程中的错误
    ///
    /// 可以重复调用，每次都返回同一个错误
    pub fn close(&mut self) -> MgoResult<()> {
        self.release();
        match &self.err {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn fail(&mut self, err: MgoError) {
        crate::debug_log!("游标迭代失败: {}", err);
        self.err = Some(err);
        self.release();
    }

    fn release(&mut self) {
        // 驱动在游标析构时向服务器发送 killCursors
        drop(self.cursor.take());
    }
}

impl std::fmt::Debug for Iter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Iter")
            .field("done", &self.done())
            .field("err", &self.err)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_iter_yields_nothing() {
        let mut iter = Iter::failed(MgoError::SessionClosed);
        assert!(iter.done());
        assert!(iter.next::<Document>().await.is_none());
        assert!(iter.err().map(MgoError::is_closed).unwrap_or(false));
    }

    #[test]
    fn test_close_returns_stored_error_every_time() {
        let mut iter = Iter::failed(MgoError::NotFound);
        assert!(tokio_test::block_on(iter.next::<Document>()).is_none());
        assert!(iter.close().unwrap_err().is_not_found());
        assert!(iter.close().unwrap_err().is_not_found());
        assert!(iter.done());
    }
}
