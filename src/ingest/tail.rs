use crate::parser;
use chrono::{DateTime, Utc};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{self, AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, BufReader};

/// The first line is short; anything longer is not a log header.
const OPEN_STAMP_MAX_LEN: u64 = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub text: String,
    /// Byte offset just past the line terminator.
    pub end_offset: u64,
}

/// Reads up to `max_lines` complete lines starting at `offset`. A trailing line
/// without terminator is still being written and is left for the next read.
pub async fn read_lines(path: &Path, offset: u64, max_lines: usize) -> io::Result<Vec<LogLine>> {
    let mut file = File::open(path).await?;
    file.seek(SeekFrom::Start(offset)).await?;
    let mut reader = BufReader::new(file);

    let mut lines = vec![];
    let mut buf = vec![];
    let mut position = offset;
    while lines.len() < max_lines {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).await?;
        if read == 0 || buf.last() != Some(&b'\n') {
            break;
        }
        position += read as u64;
        lines.push(LogLine {
            text: String::from_utf8_lossy(&buf).into_owned(),
            end_offset: position,
        });
    }
    Ok(lines)
}

pub async fn file_len(path: &Path) -> io::Result<u64> {
    Ok(tokio::fs::metadata(path).await?.len())
}

/// The `Log file open` timestamp of the current generation of the log.
pub async fn read_open_stamp(path: &Path) -> io::Result<Option<DateTime<Utc>>> {
    let file = File::open(path).await?;
    let mut reader = BufReader::new(file.take(OPEN_STAMP_MAX_LEN));
    let mut first_line = vec![];
    reader.read_until(b'\n', &mut first_line).await?;
    Ok(parser::log_open_timestamp(&String::from_utf8_lossy(
        &first_line,
    )))
}
