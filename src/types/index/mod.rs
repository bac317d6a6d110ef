use mongodb::bson::Document;
use mongodb::options::IndexOptions;
use mongodb::IndexModel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::MgoResult;
use crate::utils::bson_conversion::{index_keys_document, index_name};

/// 索引定义
///
/// `key` 中的每一项可以带前缀：`-field` 降序，`+field` 或 `field` 升序，
/// `$text:field`、`$2dsphere:field` 等表示特殊索引类型
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// 索引键
    pub key: Vec<String>,
    /// 唯一索引
    pub unique: bool,
    /// 后台创建
    pub background: bool,
    /// 稀疏索引
    pub sparse: bool,
    /// 文档过期秒数，0 表示不过期
    pub expire_after_seconds: u64,
    /// 显式索引名，为空时由服务器按键生成
    pub name: Option<String>,
}

impl Index {
    /// 以给定键创建索引定义，其余选项保持默认
    pub fn new<I, S>(key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// 索引键文档
    pub fn keys_document(&self) -> MgoResult<Document> {
        index_keys_document(&self.key)
    }

    /// 索引名：显式设置的名字，否则按 mgo 的规则由键生成
    pub fn resolved_name(&self) -> MgoResult<String> {
        match &self.name {
            Some(name) if !name.is_empty() => Ok(name.clone()),
            _ => Ok(index_name(&self.keys_document()?)),
        }
    }

    /// 转换为驱动的索引模型
    pub fn to_model(&self) -> MgoResult<IndexModel> {
        let mut index_options = IndexOptions::default();
        if self.unique {
            index_options.unique = Some(true);
        }
        if self.background {
            index_options.background = Some(true);
        }
        if self.sparse {
            index_options.sparse = Some(true);
        }
        if self.expire_after_seconds > 0 {
            index_options.expire_after = Some(Duration::from_secs(self.expire_after_seconds));
        }
        if let Some(name) = self.name.as_ref().filter(|name| !name.is_empty()) {
            index_options.name = Some(name.clone());
        }

        Ok(IndexModel::builder()
            .keys(self.keys_document()?)
            .options(index_options)
            .build())
    }
}
