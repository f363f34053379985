//! tsuzuri - Notepad系エディタのテキスト編集コアエンジン
//!
//! バッファ・ハイライト・検索・マクロの4コンポーネント構成。
//! UIシェルは持たず、編集適用と変更通知のインターフェースだけを公開する。

// コアモジュール
pub mod error;

// データ層
pub mod buffer;
pub mod file;

// 編集層
pub mod highlight;
pub mod kmacro;
pub mod search;

// バックグラウンド
pub mod autosave;

// 公開API
pub use autosave::{AutosaveScheduler, SharedBuffer, SnapshotSource, SnapshotState};
pub use buffer::{Document, Edit, EditListener, EditRange, Position, TextBuffer};
pub use error::{Result, TsuzuriError};
pub use highlight::{HighlightCategory, HighlightRules, Highlighter, RuleSet};
pub use kmacro::{MacroPlayer, MacroRecorder, MacroTape, RecorderState};
pub use search::{SearchEngine, SearchMatch};
