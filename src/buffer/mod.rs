//! バッファ管理モジュール
//!
//! 文書の行ストレージ、編集値オブジェクト、編集履歴と変更通知を提供

pub mod document;
pub mod edit;
pub mod text_buffer;

// 公開API
pub use document::Document;
pub use edit::{Edit, EditRange, Position};
pub use text_buffer::{EditListener, EditNotifier, TextBuffer};
