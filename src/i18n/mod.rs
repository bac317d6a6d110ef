//! 多语言错误消息模块
//!
//! 使用rat_embed_lang框架提供统一的错误消息多语言支持

use std::collections::HashMap;
use once_cell::sync::OnceCell;
use rat_embed_lang::register_translations;

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// 错误消息翻译注册器
pub struct ErrorMessageI18n;

impl ErrorMessageI18n {
    /// 注册所有错误消息翻译
    pub fn register_all_translations() {
        let mut translations = HashMap::new();

        let entries: [(&str, [&str; 3]); 12] = [
            ("error.config", [
                "配置错误: {message}",
                "Configuration error: {message}",
                "設定エラー: {message}",
            ]),
            ("error.connection", [
                "MongoDB连接失败: {message}",
                "MongoDB connection failed: {message}",
                "MongoDB接続失敗: {message}",
            ]),
            ("error.serialization", [
                "文档序列化失败: {message}",
                "Document serialization failed: {message}",
                "ドキュメントのシリアライズが失敗しました: {message}",
            ]),
            ("error.deserialization", [
                "文档反序列化失败: {message}",
                "Document deserialization failed: {message}",
                "ドキュメントのデシリアライズが失敗しました: {message}",
            ]),
            ("error.validation", [
                "参数校验失败: {message}",
                "Validation failed: {message}",
                "パラメータ検証が失敗しました: {message}",
            ]),
            ("error.invalid_url", [
                "MongoDB连接串为空或格式不正确: {url}",
                "mongodb empty url or invalid url: {url}",
                "MongoDB接続文字列が空または不正です: {url}",
            ]),
            ("error.not_document", [
                "无法规整为文档，实际类型为 {kind}",
                "value cannot be normalized into a document, got {kind}",
                "ドキュメントに変換できません。実際の型: {kind}",
            ]),
            ("error.empty_sort_field", [
                "排序字段不能为空",
                "sort field name must not be empty",
                "ソートフィールド名は空にできません",
            ]),
            ("error.empty_index_key", [
                "索引键不能为空",
                "index key must not be empty",
                "インデックスキーは空にできません",
            ]),
            ("error.empty_collection_name", [
                "集合名不能为空",
                "collection name must not be empty",
                "コレクション名は空にできません",
            ]),
            ("error.required_field", [
                "{field} 必须设置",
                "{field} must be set",
                "{field} を設定する必要があります",
            ]),
            ("error.config_file", [
                "读取或解析配置文件失败: {message}",
                "Failed to read or parse config file: {message}",
                "設定ファイルの読み込みまたは解析に失敗しました: {message}",
            ]),
        ];

        for (key, [zh, en, ja]) in entries {
            let mut messages = HashMap::new();
            messages.insert("zh-CN".to_string(), zh.to_string());
            messages.insert("en-US".to_string(), en.to_string());
            messages.insert("ja-JP".to_string(), ja.to_string());
            translations.insert(key.to_string(), messages);
        }

        // 注册所有翻译
        register_translations(translations);
    }

    /// 初始化错误消息多语言支持
    ///
    /// 多次调用只生效一次
    pub fn init() {
        INITIALIZED.get_or_init(|| {
            Self::register_all_translations();

            // 从环境变量获取语言设置，默认为zh-CN
            let lang = std::env::var("RAT_LANG")
                .or_else(|_| std::env::var("LANG"))
                .unwrap_or_else(|_| "zh-CN".to_string());

            // 标准化语言代码
            use rat_embed_lang::normalize_language_code;
            let normalized_lang = normalize_language_code(&lang);
            rat_embed_lang::set_language(&normalized_lang);
        });
    }
}

/// 获取翻译文本，首次调用时自动注册翻译表
pub fn t(key: &str) -> String {
    ErrorMessageI18n::init();
    rat_embed_lang::t(key)
}

/// 获取带参数的翻译文本，首次调用时自动注册翻译表
pub fn tf(key: &str, args: &[(&str, &str)]) -> String {
    ErrorMessageI18n::init();
    rat_embed_lang::tf(key, args)
}

/// 重新导出rat_embed_lang的语言切换函数
pub use rat_embed_lang::{set_language, current_language};

