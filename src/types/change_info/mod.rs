use mongodb::bson::Bson;
use mongodb::results::{DeleteResult, UpdateResult};

/// 更新或删除操作的结果统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeInfo {
    /// 实际被修改的文档数量
    pub updated: u64,
    /// 被删除的文档数量
    pub removed: u64,
    /// 匹配到的文档数量（不一定被修改）
    pub matched: u64,
    /// upsert 插入的新文档 _id
    pub upserted_id: Option<Bson>,
}

impl From<UpdateResult> for ChangeInfo {
    fn from(result: UpdateResult) -> Self {
        Self {
            updated: result.modified_count,
            removed: 0,
            matched: result.matched_count,
            upserted_id: result.upserted_id,
        }
    }
}

impl From<DeleteResult> for ChangeInfo {
    fn from(result: DeleteResult) -> Self {
        Self {
            removed: result.deleted_count,
            ..Self::default()
        }
    }
}
