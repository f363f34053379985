//! 検索用マッチャー

use regex::Regex;

use crate::buffer::Document;
use crate::error::SearchError;
use crate::search::regex::compile_pattern;
use crate::search::types::SearchMatch;

/// 文字列マッチング戦略
pub trait StringMatcher {
    /// 文書内のすべてのマッチを昇順で返す
    fn find_matches(&self, document: &Document, pattern: &str)
        -> Result<Vec<SearchMatch>, SearchError>;
}

/// リテラルマッチャー（メタ文字をエスケープしてから照合）
#[derive(Debug, Clone)]
pub struct LiteralMatcher {
    case_sensitive: bool,
}

impl LiteralMatcher {
    /// 大文字小文字を区別するマッチャーを作成
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }
}

impl StringMatcher for LiteralMatcher {
    fn find_matches(
        &self,
        document: &Document,
        pattern: &str,
    ) -> Result<Vec<SearchMatch>, SearchError> {
        let regex = compile_pattern(pattern, false, self.case_sensitive)?;
        Ok(collect_matches(document, &regex))
    }
}

/// 正規表現マッチャー
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    case_sensitive: bool,
}

impl RegexMatcher {
    /// 大文字小文字を区別するマッチャーを作成
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }
}

impl StringMatcher for RegexMatcher {
    fn find_matches(
        &self,
        document: &Document,
        pattern: &str,
    ) -> Result<Vec<SearchMatch>, SearchError> {
        let regex = compile_pattern(pattern, true, self.case_sensitive)?;
        Ok(collect_matches(document, &regex))
    }
}

/// 文書スナップショット上の非重複マッチを収集する
pub(crate) fn collect_matches(document: &Document, regex: &Regex) -> Vec<SearchMatch> {
    let text = document.serialize();
    let mut converter = OffsetConverter::new(&text);
    let mut matches = Vec::new();

    for m in regex.find_iter(&text) {
        let start = converter.char_offset(m.start());
        let end = converter.char_offset(m.end());
        matches.push(SearchMatch {
            start,
            end,
            start_position: document.position_at_offset(start),
            end_position: document.position_at_offset(end),
        });
    }

    matches
}

/// バイト位置から文字位置への逐次変換
///
/// 呼び出しはバイト位置の昇順であること（find_iterの出力順）
struct OffsetConverter<'a> {
    text: &'a str,
    byte: usize,
    chars: usize,
}

impl<'a> OffsetConverter<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            byte: 0,
            chars: 0,
        }
    }

    fn char_offset(&mut self, byte_pos: usize) -> usize {
        debug_assert!(byte_pos >= self.byte);
        self.chars += self.text[self.byte..byte_pos].chars().count();
        self.byte = byte_pos;
        self.chars
    }
}
