//! Whole-file read and write helpers for orchestrators.
//!
//! The patch engine never writes; callers persist `updated_content` with
//! [`write_file`].
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRead {
    pub ok: bool,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileWrite {
    pub ok: bool,
    pub file_path: String,
    pub bytes_written: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn read_file<P: AsRef<Path>>(path: P) -> FileRead {
    let path = path.as_ref();
    let file_path = path.to_string_lossy().to_string();
    match fs::read_to_string(path) {
        Ok(content) => FileRead {
            ok: true,
            file_path,
            content: Some(content),
            error: None,
        },
        Err(e) => {
            let code = if e.kind() == ErrorKind::NotFound {
                "file_not_found"
            } else {
                "io_error"
            };
            debug!("read_file {file_path}: {e}");
            FileRead {
                ok: false,
                file_path,
                content: None,
                error: Some(code.to_string()),
            }
        }
    }
}

/// Write `content`, creating parent directories as needed.
pub fn write_file<P: AsRef<Path>>(path: P, content: &str) -> FileWrite {
    let path = path.as_ref();
    let file_path = path.to_string_lossy().to_string();

    let result = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| fs::write(path, content));

    match result {
        Ok(()) => FileWrite {
            ok: true,
            file_path,
            bytes_written: content.len(),
            error: None,
        },
        Err(e) => {
            debug!("write_file {file_path}: {e}");
            FileWrite {
                ok: false,
                file_path,
                bytes_written: 0,
                error: Some("io_error".to_string()),
            }
        }
    }
}
