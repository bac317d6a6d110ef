//! 数据库模块
//!
//! `Database` 只保存数据库名和会话引用，所有操作直接委托给驱动

use crate::collection::Collection;
use crate::error::MgoResult;
use crate::session::connection::bounded;
use crate::session::Session;
use crate::utils::bson_conversion::{from_document, to_command_document};
use mongodb::bson::{doc, Document};
use rat_logger::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// 数据库句柄
#[derive(Clone)]
pub struct Database<'s> {
    session: &'s Session,
    name: String,
}

impl<'s> Database<'s> {
    pub(crate) fn new(session: &'s Session, name: String) -> Self {
        Self { session, name }
    }

    /// 获取集合句柄
    pub fn c(&self, name: &str) -> Collection<'s> {
        Collection::new(self.clone(), name.to_string())
    }

    /// 所属会话
    pub fn session(&self) -> &'s Session {
        self.session
    }

    /// 数据库名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 删除整个数据库
    pub async fn drop_database(&self) -> MgoResult<()> {
        let (db, timeout) = self.session.database_handle(&self.name)?;
        debug!("删除MongoDB数据库: {}", self.name);
        bounded("dropDatabase", timeout, db.drop(None)).await
    }

    /// 执行命令并把结果解码为目标类型
    ///
    /// 命令文档保持调用方的字段顺序；纯字符串命令展开为 `{name: 1}`
    pub async fn run<C, R>(&self, command: &C) -> MgoResult<R>
    where
        C: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let (db, timeout) = self.session.database_handle(&self.name)?;
        let command = to_command_document(command)?;
        let name = command.keys().next().cloned().unwrap_or_default();
        debug!("执行MongoDB命令: 数据库={}, 命令={}", self.name, name);

        let reply = bounded(&name, timeout, db.run_command(command, None)).await?;
        from_document(reply)
    }

    /// 创建用户，只读用户授予 `read` 角色，否则授予 `readWrite`
    pub async fn add_user(&self, username: &str, password: &str, read_only: bool) -> MgoResult<()> {
        let command = self.create_user_command(username, password, read_only);
        self.run::<_, Document>(&command).await.map(|_| ())
    }

    fn create_user_command(&self, username: &str, password: &str, read_only: bool) -> Document {
        let role = if read_only { "read" } else { "readWrite" };
        doc! {
            "createUser": username,
            "pwd": password,
            "roles": [{ "role": role, "db": self.name.as_str() }],
        }
    }

    /// 删除用户
    pub async fn remove_user(&self, username: &str) -> MgoResult<()> {
        self.run::<_, Document>(&doc! { "dropUser": username })
            .await
            .map(|_| ())
    }

    /// 数据库中的集合名列表
    pub async fn collection_names(&self) -> MgoResult<Vec<String>> {
        let (db, timeout) = self.session.database_handle(&self.name)?;
        bounded("listCollections", timeout, db.list_collection_names(None)).await
    }
}

impl std::fmt::Debug for Database<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_create_user_command_shape() {
        let session = Session::connect_lazy("mongodb://127.0.0.1:1/app", Duration::from_millis(200))
            .await
            .unwrap();
        let db = session.db("");

        let command = db.create_user_command("reader", "pw", true);
        assert_eq!(command.keys().next().map(String::as_str), Some("createUser"));
        assert_eq!(
            command,
            doc! {
                "createUser": "reader",
                "pwd": "pw",
                "roles": [{ "role": "read", "db": "app" }],
            }
        );

        let writer = db.create_user_command("writer", "pw", false);
        let roles = writer.get_array("roles").unwrap();
        assert_eq!(roles[0].as_document().unwrap().get_str("role").unwrap(), "readWrite");

        session.close().await;
    }

    #[tokio::test]
    async fn test_collection_handles_keep_back_references() {
        let session = Session::connect_lazy("mongodb://127.0.0.1:1/app", Duration::from_millis(200))
            .await
            .unwrap();
        let db = session.db("logs");
        let events = db.c("events");

        assert_eq!(events.name(), "events");
        assert_eq!(events.full_name(), "logs.events");
        assert_eq!(events.database().name(), "logs");
        assert!(std::ptr::eq(db.session(), &session));

        session.close().await;
    }
}
