//! ハイライトルール定義
//!
//! パターン文字列の集合を構築時にコンパイルし、不正な設定は
//! `HighlightConfigError` で即座に失敗させる

use std::collections::HashSet;

use regex::Regex;

use crate::error::HighlightConfigError;

/// 字句カテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightCategory {
    /// キーワード
    Keyword,
    /// 文字列リテラル
    String,
    /// コメント
    Comment,
    /// 数値リテラル
    Number,
    /// クラス定義（キーワードと直後の識別子）
    Class,
    /// 関数定義（キーワードと直後の識別子）
    Function,
    /// 分類なし
    Plain,
}

/// ハイライトルールの設定値
///
/// パターンは正規表現文字列として保持し、`HighlightRules::new` が
/// 行頭アンカー付きでコンパイルする
#[derive(Debug, Clone)]
pub struct RuleSet {
    /// 一般キーワード
    pub keywords: Vec<String>,
    /// クラス定義キーワード（後続識別子もClass分類）
    pub class_keywords: Vec<String>,
    /// 関数定義キーワード（後続識別子もFunction分類）
    pub function_keywords: Vec<String>,
    /// 文字列リテラルのパターン
    pub string_pattern: String,
    /// 行コメントのパターン
    pub comment_pattern: String,
    /// 数値リテラルのパターン
    pub number_pattern: String,
    /// 識別子のパターン
    pub identifier_pattern: String,
}

impl RuleSet {
    /// Python向けの既定ルール
    pub fn python() -> Self {
        let keywords = [
            "def", "class", "if", "else", "elif", "while", "for", "in", "import", "from", "as",
            "return", "try", "except", "finally", "with", "pass", "break", "continue", "lambda",
            "global", "nonlocal", "assert", "yield",
        ];
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            class_keywords: vec!["class".to_string()],
            function_keywords: vec!["def".to_string()],
            // 閉じ引用符がない場合は行末まで文字列として扱う
            string_pattern: r#"'(?:\\.|[^'\\])*'?|"(?:\\.|[^"\\])*"?"#.to_string(),
            comment_pattern: "#.*".to_string(),
            number_pattern: r"\d+(?:\.\d+)?".to_string(),
            identifier_pattern: "[A-Za-z_][A-Za-z0-9_]*".to_string(),
        }
    }
}

/// コンパイル済みハイライトルール
#[derive(Debug)]
pub struct HighlightRules {
    keywords: HashSet<String>,
    class_keywords: HashSet<String>,
    function_keywords: HashSet<String>,
    string: Regex,
    comment: Regex,
    number: Regex,
    identifier: Regex,
}

impl HighlightRules {
    /// ルール設定からコンパイル
    pub fn new(config: &RuleSet) -> Result<Self, HighlightConfigError> {
        if config.string_pattern.is_empty()
            && config.comment_pattern.is_empty()
            && config.number_pattern.is_empty()
            && config.identifier_pattern.is_empty()
            && config.keywords.is_empty()
        {
            return Err(HighlightConfigError::EmptyRules);
        }

        Ok(Self {
            keywords: config.keywords.iter().cloned().collect(),
            class_keywords: config.class_keywords.iter().cloned().collect(),
            function_keywords: config.function_keywords.iter().cloned().collect(),
            string: compile("string", &config.string_pattern)?,
            comment: compile("comment", &config.comment_pattern)?,
            number: compile("number", &config.number_pattern)?,
            identifier: compile("identifier", &config.identifier_pattern)?,
        })
    }

    /// 既定のPythonルールでコンパイル
    pub fn python() -> Self {
        Self::new(&RuleSet::python()).expect("builtin python rules must compile")
    }

    /// 単語のキーワード分類を判定
    pub(crate) fn keyword_category(&self, word: &str) -> Option<HighlightCategory> {
        if self.class_keywords.contains(word) {
            Some(HighlightCategory::Class)
        } else if self.function_keywords.contains(word) {
            Some(HighlightCategory::Function)
        } else if self.keywords.contains(word) {
            Some(HighlightCategory::Keyword)
        } else {
            None
        }
    }

    pub(crate) fn string(&self) -> &Regex {
        &self.string
    }

    pub(crate) fn comment(&self) -> &Regex {
        &self.comment
    }

    pub(crate) fn number(&self) -> &Regex {
        &self.number
    }

    pub(crate) fn identifier(&self) -> &Regex {
        &self.identifier
    }
}

/// パターンを位置マッチ用にアンカー付きでコンパイル
fn compile(rule: &str, pattern: &str) -> Result<Regex, HighlightConfigError> {
    Regex::new(&format!("^(?:{})", pattern)).map_err(|err| HighlightConfigError::InvalidRule {
        rule: rule.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_rules_compile() {
        let rules = HighlightRules::python();
        assert_eq!(
            rules.keyword_category("class"),
            Some(HighlightCategory::Class)
        );
        assert_eq!(
            rules.keyword_category("def"),
            Some(HighlightCategory::Function)
        );
        assert_eq!(
            rules.keyword_category("return"),
            Some(HighlightCategory::Keyword)
        );
        assert_eq!(rules.keyword_category("foo"), None);
    }

    #[test]
    fn malformed_pattern_fails_at_construction() {
        let mut config = RuleSet::python();
        config.number_pattern = "(".to_string();
        let err = HighlightRules::new(&config).unwrap_err();
        assert!(matches!(
            err,
            HighlightConfigError::InvalidRule { ref rule, .. } if rule == "number"
        ));
    }

    #[test]
    fn string_pattern_matches_unterminated_quote() {
        let rules = HighlightRules::python();
        let m = rules.string().find("'open until end").unwrap();
        assert_eq!(m.end(), "'open until end".len());

        let closed = rules.string().find(r#""closed" rest"#).unwrap();
        assert_eq!(closed.as_str(), r#""closed""#);
    }

    #[test]
    fn string_pattern_honors_escapes() {
        let rules = HighlightRules::python();
        let m = rules.string().find(r#"'a\'b' tail"#).unwrap();
        assert_eq!(m.as_str(), r#"'a\'b'"#);
    }
}
