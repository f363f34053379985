//! ファイルI/O操作
//!
//! UTF-8テキストの読み込みとアトミックな保存

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::buffer::TextBuffer;
use crate::error::{FileError, Result, TsuzuriError};
use crate::file::path::expand_path;

const UTF8_BOM: &str = "\u{feff}";

/// ファイル読み込み処理
pub struct FileReader;

impl FileReader {
    pub fn new() -> Self {
        Self
    }

    /// ファイル内容を読み込み
    ///
    /// 存在しないパスは新規ファイルとして空文字列を返す。
    /// BOMを除去し、改行コードをLFへ正規化する。
    pub fn read_file(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Ok(String::new());
        }

        if path.is_dir() {
            return Err(TsuzuriError::File(FileError::InvalidPath {
                path: path.display().to_string(),
            }));
        }

        let content = fs::read_to_string(path).map_err(|e| map_io_error(e, path))?;

        let without_bom = content.strip_prefix(UTF8_BOM).unwrap_or(&content);
        if without_bom.contains('\r') {
            log::debug!("normalizing line endings in {}", path.display());
        }

        Ok(crate::buffer::document::normalize_line_endings(without_bom))
    }
}

impl Default for FileReader {
    fn default() -> Self {
        Self
    }
}

/// ファイル保存処理（一時ファイル経由のアトミック保存）
pub struct FileSaver;

impl FileSaver {
    pub fn new() -> Self {
        Self
    }

    /// ファイルを保存
    ///
    /// 改行コードはLFに統一して書き出す
    pub fn save_file(&self, path: &Path, content: &str) -> Result<()> {
        if content.contains('\r') {
            log::warn!("non-LF line endings detected, will be normalized");
        }
        let content = crate::buffer::document::normalize_line_endings(content);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| map_io_error(e, parent))?;
            }
        }

        let temp_path = self.generate_temp_path(path)?;
        fs::write(&temp_path, content.as_bytes()).map_err(|e| map_io_error(e, &temp_path))?;

        fs::rename(&temp_path, path).map_err(|e| {
            // 失敗時は一時ファイルを残さない
            let _ = fs::remove_file(&temp_path);
            map_io_error(e, path)
        })?;

        Ok(())
    }

    fn generate_temp_path(&self, original: &Path) -> Result<PathBuf> {
        let parent = original.parent().ok_or_else(|| {
            TsuzuriError::File(FileError::InvalidPath {
                path: original.display().to_string(),
            })
        })?;

        let filename = original.file_name().ok_or_else(|| {
            TsuzuriError::File(FileError::InvalidPath {
                path: original.display().to_string(),
            })
        })?;

        let temp_name = format!(".{}_{}", filename.to_string_lossy(), std::process::id());
        Ok(parent.join(temp_name))
    }
}

impl Default for FileSaver {
    fn default() -> Self {
        Self
    }
}

/// パスからバッファを開く
///
/// パス展開後に読み込み、関連パス付きのバッファを返す。
/// 存在しないパスは空バッファ（新規ファイル）になる。
pub fn open_document<P: AsRef<Path>>(path: P) -> Result<TextBuffer> {
    let expanded = expand_path(path)?;
    let content = FileReader::new().read_file(&expanded)?;
    let mut buffer = TextBuffer::from_text(&content);
    buffer.set_file_path(expanded);
    Ok(buffer)
}

/// バッファを関連パスへ保存する
pub fn save_document(buffer: &mut TextBuffer) -> Result<()> {
    let path = buffer
        .file_path()
        .ok_or_else(|| {
            TsuzuriError::File(FileError::InvalidPath {
                path: "no file associated with buffer".to_string(),
            })
        })?
        .to_path_buf();

    FileSaver::new().save_file(&path, &buffer.serialize())?;
    buffer.mark_saved();
    Ok(())
}

/// バッファを別名で保存する
pub fn save_document_as<P: AsRef<Path>>(buffer: &mut TextBuffer, path: P) -> Result<()> {
    let expanded = expand_path(path)?;
    FileSaver::new().save_file(&expanded, &buffer.serialize())?;
    buffer.set_file_path(expanded);
    buffer.mark_saved();
    Ok(())
}

fn map_io_error(error: std::io::Error, path: &Path) -> TsuzuriError {
    match error.kind() {
        ErrorKind::NotFound => TsuzuriError::File(FileError::NotFound {
            path: path.display().to_string(),
        }),
        ErrorKind::PermissionDenied => TsuzuriError::File(FileError::PermissionDenied {
            path: path.display().to_string(),
        }),
        _ => TsuzuriError::File(FileError::Io {
            message: error.to_string(),
        }),
    }
}
