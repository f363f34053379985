//! 検索用正規表現の構築と置換テンプレート

use regex::{Captures, Regex, RegexBuilder};

use crate::error::SearchError;

/// 検索パターンをコンパイルする
///
/// リテラルモードではメタ文字を全てエスケープしてからコンパイルする
pub(crate) fn compile_pattern(
    pattern: &str,
    is_regex: bool,
    case_sensitive: bool,
) -> Result<Regex, SearchError> {
    let source = if is_regex {
        pattern.to_string()
    } else {
        regex::escape(pattern)
    };

    RegexBuilder::new(&source)
        .case_insensitive(!case_sensitive)
        .multi_line(true)
        .dot_matches_new_line(false)
        .build()
        .map_err(|err| SearchError::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })
}

/// `$1` 形式のグループ参照を含む置換テンプレート
#[derive(Debug, Clone)]
pub(crate) struct ReplacementTemplate {
    parts: Vec<TemplatePart>,
}

#[derive(Debug, Clone)]
enum TemplatePart {
    Literal(String),
    Group(usize),
}

impl ReplacementTemplate {
    pub(crate) fn parse(template: &str) -> Result<Self, SearchError> {
        let mut chars = template.chars().peekable();
        let mut parts = Vec::new();
        let mut literal = String::new();

        while let Some(ch) = chars.next() {
            match ch {
                '$' => {
                    if let Some(&next) = chars.peek() {
                        if next == '$' {
                            literal.push('$');
                            chars.next();
                        } else if next.is_ascii_digit() {
                            if !literal.is_empty() {
                                parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                            }
                            let mut digits = String::new();
                            while let Some(&digit) = chars.peek() {
                                if digit.is_ascii_digit() {
                                    digits.push(digit);
                                    chars.next();
                                } else {
                                    break;
                                }
                            }
                            let index = digits.parse::<usize>().map_err(|_| {
                                SearchError::InvalidPattern {
                                    pattern: template.to_string(),
                                    message: format!("invalid group reference ${}", digits),
                                }
                            })?;
                            parts.push(TemplatePart::Group(index));
                        } else {
                            literal.push('$');
                        }
                    } else {
                        literal.push('$');
                    }
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        literal.push(next);
                    } else {
                        literal.push('\\');
                    }
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }

        Ok(Self { parts })
    }

    pub(crate) fn render(&self, captures: &Captures<'_>) -> String {
        let mut output = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => output.push_str(text),
                TemplatePart::Group(index) => {
                    if let Some(mat) = captures.get(*index) {
                        output.push_str(mat.as_str());
                    }
                }
            }
        }
        output
    }
}
