//! エラーハンドリングシステム
//!
//! tsuzuri 全体で使用される統一されたエラー型を定義
//! 回復可能エラーは呼び出し元へ型付きで返却し、コア側では握りつぶさない

use thiserror::Error;

use crate::buffer::Position;

/// アプリケーション全体のエラー型
#[derive(Error, Debug, Clone)]
pub enum TsuzuriError {
    /// バッファ操作エラー
    #[error("Buffer operation failed")]
    Buffer(#[from] BufferError),

    /// 検索エラー
    #[error("Search failed")]
    Search(#[from] SearchError),

    /// ハイライト設定エラー
    #[error("Highlight configuration failed")]
    Highlight(#[from] HighlightConfigError),

    /// ファイル操作エラー
    #[error("File operation failed")]
    File(#[from] FileError),

    /// パスエラー
    #[error("Path error: {0}")]
    Path(String),

    /// アプリケーション論理エラー
    #[error("Application error: {0}")]
    Application(String),
}

/// バッファ操作固有のエラー
///
/// 編集・アンドゥ・リドゥ・再生が文書範囲外を指した場合に返す。
/// 常に回復可能であり、`apply` は失敗時に文書を一切変更しない。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Position {line}:{column} is out of document bounds")]
    OutOfRange { line: usize, column: usize },

    #[error("Range start {start} is after end {end}")]
    InvertedRange { start: Position, end: Position },
}

impl BufferError {
    /// 範囲外エラーを位置から作成
    pub fn out_of_range(position: Position) -> Self {
        BufferError::OutOfRange {
            line: position.line,
            column: position.column,
        }
    }
}

/// 検索固有のエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Invalid search pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// ハイライトルール構築固有のエラー
///
/// 不正なルールは構築時に即座に失敗させ、描画時には決して発生させない
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HighlightConfigError {
    #[error("Invalid highlight rule {rule}: {message}")]
    InvalidRule { rule: String, message: String },

    #[error("Rule set has no matchers")]
    EmptyRules,
}

/// ファイル操作固有のエラー
#[derive(Error, Debug, Clone)]
pub enum FileError {
    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    #[error("IO error: {message}")]
    Io { message: String },
}

// std::io::Error から TsuzuriError への変換
impl From<std::io::Error> for TsuzuriError {
    fn from(error: std::io::Error) -> Self {
        TsuzuriError::File(FileError::Io {
            message: error.to_string(),
        })
    }
}

/// プロジェクト標準のResult型
pub type Result<T> = std::result::Result<T, TsuzuriError>;
