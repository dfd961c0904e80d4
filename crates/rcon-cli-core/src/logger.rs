//! Request/response log file
//!
//! Each executed command is appended as one record:
//!
//! ```text
//! [2024-01-02 15:04:05] 127.0.0.1:16260: players
//! Players connected (0):
//!
//! ```

use crate::error::LogError;
use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Timestamp layout used in log records
pub const TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Render one log record
pub fn format_record(address: &str, request: &str, response: &str) -> String {
    format!(
        "[{}] {}: {}\n{}\n\n",
        chrono::Local::now().format(TIME_LAYOUT),
        address,
        request,
        response
    )
}

/// Append a request/response pair to the log file.
///
/// `None` or an empty path disables logging: nothing is created and no error
/// is returned. Missing parent directories are created.
pub async fn write(
    path: Option<&Path>,
    address: &str,
    request: &str,
    response: &str,
) -> Result<(), LogError> {
    let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| LogError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|source| LogError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let record = format_record(address, request, response);
    file.write_all(record.as_bytes())
        .await
        .map_err(LogError::Write)?;
    file.flush().await.map_err(LogError::Write)?;

    Ok(())
}
