//! 查询构建器模块
//!
//! `Query` 只积累 skip、limit、排序和投影，不访问网络。
//! 每个终结调用（one、all、count、iter）都从构建器状态重新推导驱动选项，
//! 调用之间不缓存任何东西。

use crate::collection::Collection;
use crate::error::{MgoError, MgoResult};
use crate::iter::Iter;
use crate::session::connection::bounded;
use crate::utils::bson_conversion::{from_document, sort_document, to_document};
use mongodb::bson::Document;
use mongodb::options::{CountOptions, FindOneOptions, FindOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// 查询构建器
#[derive(Clone)]
pub struct Query<'s> {
    collection: Collection<'s>,
    filter: MgoResult<Document>,
    skip: u64,
    limit: u64,
    sort: Vec<String>,
    projection: Option<MgoResult<Document>>,
}

impl<'s> Query<'s> {
    pub(crate) fn new(collection: Collection<'s>, filter: MgoResult<Document>) -> Self {
        Self {
            collection,
            filter,
            skip: 0,
            limit: 0,
            sort: Vec::new(),
            projection: None,
        }
    }

    /// 所属集合
    pub fn collection(&self) -> &Collection<'s> {
        &self.collection
    }

    /// 跳过前 n 个文档
    pub fn skip(mut self, n: u64) -> Self {
        self.skip = n;
        self
    }

    /// 最多返回 n 个文档，0 表示不限制
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = n;
        self
    }

    /// 设置排序字段，`-field` 表示降序
    pub fn sort<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort = fields.into_iter().map(Into::into).collect();
        self
    }

    /// 设置投影
    pub fn select<P: Serialize + ?Sized>(mut self, selector: &P) -> Self {
        self.projection = Some(to_document(selector));
        self
    }

    pub(crate) fn filter_document(&self) -> MgoResult<Document> {
        self.filter.clone()
    }

    fn sort_option(&self) -> MgoResult<Option<Document>> {
        if self.sort.is_empty() {
            return Ok(None);
        }
        sort_document(&self.sort).map(Some)
    }

    fn projection_option(&self) -> MgoResult<Option<Document>> {
        self.projection.clone().transpose()
    }

    pub(crate) fn find_one_options(&self) -> MgoResult<FindOneOptions> {
        let mut options = FindOneOptions::default();
        options.skip = (self.skip > 0).then_some(self.skip);
        options.sort = self.sort_option()?;
        options.projection = self.projection_option()?;
        Ok(options)
    }

    pub(crate) fn find_options(&self) -> MgoResult<FindOptions> {
        let mut options = FindOptions::default();
        options.skip = (self.skip > 0).then_some(self.skip);
        if self.limit > 0 {
            options.limit = Some(i64::try_from(self.limit).unwrap_or(i64::MAX));
        }
        options.sort = self.sort_option()?;
        options.projection = self.projection_option()?;
        Ok(options)
    }

    /// 计数只关心过滤条件、skip 和 limit，忽略排序和投影
    pub(crate) fn count_options(&self) -> CountOptions {
        let mut options = CountOptions::default();
        options.skip = (self.skip > 0).then_some(self.skip);
        options.limit = (self.limit > 0).then_some(self.limit);
        options
    }

    /// 取第一个匹配的文档，没有匹配时返回 [`MgoError::NotFound`]
    pub async fn one<T: DeserializeOwned>(&self) -> MgoResult<T> {
        let (collection, timeout) = self.collection.handle()?;
        let filter = self.filter_document()?;
        let options = self.find_one_options()?;

        crate::debug_log!(
            "执行MongoDB单文档查询: 集合={}, 条件={:?}, 选项={:?}",
            self.collection.full_name(),
            filter,
            options
        );

        match bounded("find", timeout, collection.find_one(filter, options)).await? {
            Some(document) => from_document(document),
            None => Err(MgoError::NotFound),
        }
    }

    /// 取所有匹配的文档
    pub async fn all<T: DeserializeOwned>(&self) -> MgoResult<Vec<T>> {
        let (collection, timeout) = self.collection.handle()?;
        let filter = self.filter_document()?;
        let options = self.find_options()?;

        crate::debug_log!(
            "执行MongoDB查询: 集合={}, 条件={:?}, 选项={:?}",
            self.collection.full_name(),
            filter,
            options
        );

        let documents = bounded("find", timeout, async {
            let mut cursor = collection.find(filter, options).await?;
            let mut documents = Vec::new();
            while cursor.advance().await? {
                documents.push(cursor.deserialize_current()?);
            }
            Ok::<_, mongodb::error::Error>(documents)
        })
        .await?;

        documents.into_iter().map(from_document).collect()
    }

    /// 统计匹配的文档数，受 skip 和 limit 影响，排序和投影不参与也不校验
    pub async fn count(&self) -> MgoResult<u64> {
        let (collection, timeout) = self.collection.handle()?;
        let filter = self.filter_document()?;
        let options = self.count_options();

        crate::debug_log!(
            "执行MongoDB计数: 集合={}, 条件={:?}, skip={:?}, limit={:?}",
            self.collection.full_name(),
            filter,
            options.skip,
            options.limit
        );

        bounded("count", timeout, collection.count_documents(filter, options)).await
    }

    /// 统计所有匹配的文档数，忽略 skip 和 limit
    pub async fn count_all(&self) -> MgoResult<u64> {
        self.clone().skip(0).limit(0).count().await
    }

    /// 打开游标
    ///
    /// 失败时返回携带错误的迭代器，错误通过 [`Iter::err`] 或 [`Iter::close`] 取得
    pub async fn iter(&self) -> Iter {
        match self.open_cursor().await {
            Ok(iter) => iter,
            Err(e) => Iter::failed(e),
        }
    }

    async fn open_cursor(&self) -> MgoResult<Iter> {
        let (collection, timeout) = self.collection.handle()?;
        let filter = self.filter_document()?;
        let options = self.find_options()?;

        crate::debug_log!(
            "打开MongoDB游标: 集合={}, 条件={:?}, 选项={:?}",
            self.collection.full_name(),
            filter,
            options
        );

        let cursor = bounded("find", timeout, collection.find(filter, options)).await?;
        Ok(Iter::new(cursor, timeout))
    }
}

impl std::fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("collection", &self.collection.full_name())
            .field("filter", &self.filter)
            .field("skip", &self.skip)
            .field("limit", &self.limit)
            .field("sort", &self.sort)
            .field("projection", &self.projection)
            .finish()
    }
}
