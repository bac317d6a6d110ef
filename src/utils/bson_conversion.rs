//! BSON 形态转换工具函数
//!
//! 调用方传入的任意文档先规整成有序的 `Document` 再交给驱动，
//! 字段顺序与结构体声明顺序一致

use crate::error::MgoResult;
use mongodb::bson::{self, doc, Bson, Document};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// 将任意可序列化的值规整为有序文档
///
/// `None` 和 `()` 视为空文档（匹配全部），其余非文档类型报序列化错误
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> MgoResult<Document> {
    let bson_value = bson::to_bson(value)
        .map_err(|e| crate::quick_error!(serialization, e.to_string()))?;

    match bson_value {
        Bson::Document(document) => Ok(document),
        Bson::Null | Bson::Undefined => Ok(Document::new()),
        other => Err(crate::quick_error!(
            serialization,
            crate::i18n::tf(
                "error.not_document",
                &[("kind", format!("{:?}", other.element_type()).as_str())]
            )
        )),
    }
}

/// 将命令规整为有序文档
///
/// 纯字符串命令（如 `"ping"`）展开为 `{ping: 1}`
pub fn to_command_document<T: Serialize + ?Sized>(command: &T) -> MgoResult<Document> {
    match bson::to_bson(command) {
        Ok(Bson::String(name)) if !name.is_empty() => {
            let mut document = Document::new();
            document.insert(name, 1);
            Ok(document)
        }
        _ => to_document(command),
    }
}

/// 将文档解码为调用方的目标类型
pub fn from_document<T: DeserializeOwned>(document: Document) -> MgoResult<T> {
    bson::from_document(document)
        .map_err(|e| crate::quick_error!(deserialization, e.to_string()))
}

/// 构造 `{_id: id}` 选择器
pub fn id_selector<T: Serialize + ?Sized>(id: &T) -> MgoResult<Document> {
    let id = bson::to_bson(id).map_err(|e| crate::quick_error!(serialization, e.to_string()))?;
    Ok(doc! { "_id": id })
}

/// 更新文档是否使用了 `$` 操作符；否则按整文档替换处理
pub fn is_operator_document(document: &Document) -> bool {
    document
        .keys()
        .next()
        .map(|key| key.starts_with('$'))
        .unwrap_or(false)
}

/// 解析带方向前缀的字段名
fn parse_directed_field<'a>(raw: &'a str, field: &str, message_key: &str) -> MgoResult<(&'a str, i32)> {
    let (name, direction) = match raw.as_bytes().first() {
        Some(b'-') => (&raw[1..], -1),
        Some(b'+') => (&raw[1..], 1),
        _ => (raw, 1),
    };

    if name.is_empty() {
        return Err(crate::quick_error!(validation, field, crate::i18n::t(message_key)));
    }

    Ok((name, direction))
}

/// 由排序字段列表生成排序文档
///
/// `-age` 降序，`age` 或 `+age` 升序，字段按声明顺序作为次级排序键
pub fn sort_document<S: AsRef<str>>(fields: &[S]) -> MgoResult<Document> {
    let mut sort = Document::new();
    for raw in fields {
        let (name, direction) = parse_directed_field(raw.as_ref(), "sort", "error.empty_sort_field")?;
        sort.insert(name, direction);
    }
    Ok(sort)
}

/// 由索引键列表生成索引键文档
///
/// 除方向前缀外还支持 `$kind:field` 形式的特殊索引，例如 `$text:title`
pub fn index_keys_document<S: AsRef<str>>(keys: &[S]) -> MgoResult<Document> {
    if keys.is_empty() {
        return Err(crate::quick_error!(validation, "key", crate::i18n::t("error.empty_index_key")));
    }

    let mut document = Document::new();
    for raw in keys {
        let raw = raw.as_ref();
        if let Some((kind, name)) = raw.strip_prefix('$').and_then(|rest| rest.split_once(':')) {
            if kind.is_empty() || name.is_empty() {
                return Err(crate::quick_error!(validation, "key", crate::i18n::t("error.empty_index_key")));
            }
            document.insert(name, kind);
        } else {
            let (name, direction) = parse_directed_field(raw, "key", "error.empty_index_key")?;
            document.insert(name, direction);
        }
    }
    Ok(document)
}

/// 按 mgo 的规则由索引键文档生成索引名，例如 `age_-1_name_1`
pub fn index_name(keys: &Document) -> String {
    keys.iter()
        .map(|(name, value)| match value {
            Bson::String(kind) => format!("{}_{}", name, kind),
            Bson::Int32(direction) => format!("{}_{}", name, direction),
            other => format!("{}_{}", name, other),
        })
        .collect::<Vec<_>>()
        .join("_")
}
