//! 集合模块
//!
//! 把 mgo 风格的增删改查调用转换为驱动集合上的调用，
//! 所有文档在发送前先规整为有序文档

use crate::database::Database;
use crate::error::MgoResult;
use crate::query::Query;
use crate::session::connection::bounded;
use crate::types::{ChangeInfo, Index};
use crate::utils::bson_conversion::{
    id_selector, index_keys_document, index_name, is_operator_document, to_document,
};
use mongodb::bson::Document;
use mongodb::options::{ReplaceOptions, UpdateOptions};
use rat_logger::{debug, info};
use serde::Serialize;
use std::time::Duration;

/// 集合句柄
#[derive(Clone)]
pub struct Collection<'s> {
    database: Database<'s>,
    name: String,
}

impl<'s> Collection<'s> {
    pub(crate) fn new(database: Database<'s>, name: String) -> Self {
        Self { database, name }
    }

    /// 集合名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 完整名称 `数据库.集合`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.database.name(), self.name)
    }

    /// 所属数据库
    pub fn database(&self) -> &Database<'s> {
        &self.database
    }

    /// 当前会话设置下的驱动集合句柄和操作超时
    pub(crate) fn handle(&self) -> MgoResult<(mongodb::Collection<Document>, Duration)> {
        let handle = self
            .database
            .session()
            .collection_handle(self.database.name(), &self.name)?;
        if self.name.is_empty() {
            return Err(crate::quick_error!(
                validation,
                "collection",
                crate::i18n::t("error.empty_collection_name")
            ));
        }
        Ok(handle)
    }

    /// 插入文档，空列表直接返回
    pub async fn insert<I>(&self, docs: I) -> MgoResult<()>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let (collection, timeout) = self.handle()?;
        let documents = docs
            .into_iter()
            .map(|doc| to_document(&doc))
            .collect::<MgoResult<Vec<_>>>()?;

        if documents.is_empty() {
            return Ok(());
        }

        crate::debug_log!("插入MongoDB文档: 集合={}, 数量={}", self.full_name(), documents.len());
        bounded("insert", timeout, collection.insert_many(documents, None)).await?;
        Ok(())
    }

    /// 按条件查询，返回尚未执行的查询构建器
    pub fn find<F: Serialize + ?Sized>(&self, filter: &F) -> Query<'s> {
        Query::new(self.clone(), to_document(filter))
    }

    /// 按 `_id` 查询
    pub fn find_id<I: Serialize + ?Sized>(&self, id: &I) -> Query<'s> {
        Query::new(self.clone(), id_selector(id))
    }

    /// 更新或替换一个文档
    ///
    /// 首个键以 `$` 开头的更新文档按更新操作符执行，否则整体替换匹配到的文档
    async fn update_one(&self, selector: Document, update: Document, upsert: bool) -> MgoResult<ChangeInfo> {
        let (collection, timeout) = self.handle()?;
        crate::debug_log!(
            "更新MongoDB文档: 集合={}, 条件={:?}, 更新={:?}, upsert={}",
            self.full_name(),
            selector,
            update,
            upsert
        );

        let result = if is_operator_document(&update) {
            let mut options = UpdateOptions::default();
            if upsert {
                options.upsert = Some(true);
            }
            bounded("update", timeout, collection.update_one(selector, update, options)).await?
        } else {
            let mut options = ReplaceOptions::default();
            if upsert {
                options.upsert = Some(true);
            }
            bounded("update", timeout, collection.replace_one(selector, update, options)).await?
        };

        Ok(ChangeInfo::from(result))
    }

    /// 更新一个匹配的文档
    pub async fn update<S, U>(&self, selector: &S, update: &U) -> MgoResult<()>
    where
        S: Serialize + ?Sized,
        U: Serialize + ?Sized,
    {
        self.handle()?;
        let selector = to_document(selector)?;
        let update = to_document(update)?;
        self.update_one(selector, update, false).await.map(|_| ())
    }

    /// 按 `_id` 更新
    pub async fn update_id<I, U>(&self, id: &I, update: &U) -> MgoResult<()>
    where
        I: Serialize + ?Sized,
        U: Serialize + ?Sized,
    {
        self.handle()?;
        let selector = id_selector(id)?;
        let update = to_document(update)?;
        self.update_one(selector, update, false).await.map(|_| ())
    }

    /// 更新所有匹配的文档
    pub async fn update_all<S, U>(&self, selector: &S, update: &U) -> MgoResult<ChangeInfo>
    where
        S: Serialize + ?Sized,
        U: Serialize + ?Sized,
    {
        let (collection, timeout) = self.handle()?;
        let selector = to_document(selector)?;
        let update = to_document(update)?;

        crate::debug_log!("批量更新MongoDB文档: 集合={}, 条件={:?}", self.full_name(), selector);
        let result = bounded("update", timeout, collection.update_many(selector, update, None)).await?;
        Ok(ChangeInfo::from(result))
    }

    /// 更新一个匹配的文档，不存在时插入
    pub async fn upsert<S, U>(&self, selector: &S, update: &U) -> MgoResult<ChangeInfo>
    where
        S: Serialize + ?Sized,
        U: Serialize + ?Sized,
    {
        self.handle()?;
        let selector = to_document(selector)?;
        let update = to_document(update)?;
        self.update_one(selector, update, true).await
    }

    /// 按 `_id` upsert
    pub async fn upsert_id<I, U>(&self, id: &I, update: &U) -> MgoResult<ChangeInfo>
    where
        I: Serialize + ?Sized,
        U: Serialize + ?Sized,
    {
        self.handle()?;
        let selector = id_selector(id)?;
        let update = to_document(update)?;
        self.update_one(selector, update, true).await
    }

    /// 删除一个匹配的文档
    pub async fn remove<S: Serialize + ?Sized>(&self, selector: &S) -> MgoResult<()> {
        let (collection, timeout) = self.handle()?;
        let selector = to_document(selector)?;

        crate::debug_log!("删除MongoDB文档: 集合={}, 条件={:?}", self.full_name(), selector);
        bounded("remove", timeout, collection.delete_one(selector, None)).await?;
        Ok(())
    }

    /// 按 `_id` 删除
    pub async fn remove_id<I: Serialize + ?Sized>(&self, id: &I) -> MgoResult<()> {
        self.handle()?;
        let selector = id_selector(id)?;
        self.remove(&selector).await
    }

    /// 删除所有匹配的文档
    pub async fn remove_all<S: Serialize + ?Sized>(&self, selector: &S) -> MgoResult<ChangeInfo> {
        let (collection, timeout) = self.handle()?;
        let selector = to_document(selector)?;

        crate::debug_log!("批量删除MongoDB文档: 集合={}, 条件={:?}", self.full_name(), selector);
        let result = bounded("remove", timeout, collection.delete_many(selector, None)).await?;
        Ok(ChangeInfo::from(result))
    }

    /// 集合中的文档总数
    pub async fn count(&self) -> MgoResult<u64> {
        let (collection, timeout) = self.handle()?;
        bounded("count", timeout, collection.count_documents(Document::new(), None)).await
    }

    /// 创建索引
    pub async fn ensure_index(&self, index: &Index) -> MgoResult<()> {
        let (collection, timeout) = self.handle()?;
        let name = index.resolved_name()?;
        let model = index.to_model()?;

        debug!("创建MongoDB索引: 集合={}, 索引={}, 键={:?}", self.full_name(), name, model.keys);
        let result = bounded("createIndexes", timeout, collection.create_index(model, None)).await?;
        info!("MongoDB索引就绪: 集合={}, 索引={}", self.full_name(), result.index_name);
        Ok(())
    }

    /// 只按键创建普通索引
    pub async fn ensure_index_key<S: AsRef<str>>(&self, keys: &[S]) -> MgoResult<()> {
        let index = Index::new(keys.iter().map(|key| key.as_ref().to_string()));
        self.ensure_index(&index).await
    }

    /// 删除按键生成默认名的索引
    pub async fn drop_index<S: AsRef<str>>(&self, keys: &[S]) -> MgoResult<()> {
        let (collection, timeout) = self.handle()?;
        let name = index_name(&index_keys_document(keys)?);

        debug!("删除MongoDB索引: 集合={}, 索引={}", self.full_name(), name);
        bounded("dropIndexes", timeout, collection.drop_index(name, None)).await
    }

    /// 删除集合
    pub async fn drop_collection(&self) -> MgoResult<()> {
        let (collection, timeout) = self.handle()?;
        debug!("删除MongoDB集合: {}", self.full_name());
        bounded("drop", timeout, collection.drop(None)).await
    }
}

impl std::fmt::Debug for Collection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("full_name", &self.full_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MgoError;
    use crate::session::Session;
    use mongodb::bson::doc;

    async fn lazy_session() -> Session {
        Session::connect_lazy("mongodb://127.0.0.1:1/app", Duration::from_millis(200))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_conversion_error_precedes_network() {
        let session = lazy_session().await;
        let users = session.db("").c("users");

        // 服务器不可达，如果发生网络调用会得到超时而不是序列化错误
        let err = users.insert([1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, MgoError::SerializationError { .. }), "{:?}", err);

        let err = users.update(&doc! { "name": "a" }, &"not a document").await.unwrap_err();
        assert!(matches!(err, MgoError::SerializationError { .. }), "{:?}", err);

        let err = users.remove_all(&42).await.unwrap_err();
        assert!(matches!(err, MgoError::SerializationError { .. }), "{:?}", err);

        let err = users.ensure_index(&Index::default()).await.unwrap_err();
        assert!(matches!(err, MgoError::ValidationError { .. }), "{:?}", err);

        let err = users.drop_index(&["-"]).await.unwrap_err();
        assert!(matches!(err, MgoError::ValidationError { .. }), "{:?}", err);

        session.close().await;
    }

    #[tokio::test]
    async fn test_empty_insert_is_noop() {
        let session = lazy_session().await;
        let users = session.db("").c("users");
        users.insert(Vec::<Document>::new()).await.unwrap();
        session.close().await;
    }

    #[tokio::test]
    async fn test_empty_collection_name_rejected() {
        let session = lazy_session().await;
        let err = session.db("").c("").count().await.unwrap_err();
        assert!(matches!(err, MgoError::ValidationError { .. }), "{:?}", err);
        session.close().await;
    }

    #[tokio::test]
    async fn test_find_id_builds_id_filter() {
        let session = lazy_session().await;
        let users = session.db("").c("users");
        let query = users.find_id("u-1");
        assert_eq!(query.filter_document().unwrap(), doc! { "_id": "u-1" });
        session.close().await;
    }
}
