use crate::error::{Error, Result};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Number of lines returned when the caller does not ask for a specific count.
pub const DEFAULT_LOG_LINES: usize = 100;

const CHUNK_SIZE: usize = 8 * 1024;

/// Reads the last `max_lines` lines of server `id`'s console log.
///
/// Lines keep their original terminators and order. The file is scanned
/// backwards in fixed-size chunks, so memory use is bounded by the size of the
/// returned text rather than the size of the log.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the log file does not exist.
#[tracing::instrument(skip(base_path, log_file_name, id), fields(server_id = %id))]
pub async fn read_tail(
    id: &str,
    base_path: &Path,
    log_file_name: &str,
    max_lines: usize,
) -> Result<String> {
    let path: PathBuf = base_path.join(id).join(log_file_name);
    tokio::task::spawn_blocking(move || tail_file(&path, max_lines))
        .await
        .map_err(|e| Error::IoFailure(format!("Log reader task failed: {}", e)))?
}

/// Blocking variant of [`read_tail`] operating on a path.
pub fn tail_file(path: &Path, max_lines: usize) -> Result<String> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::NotFound(format!(
                "Log file not found: {}",
                path.display()
            )));
        }
        Err(e) => return Err(Error::io(format!("Failed to open {}", path.display()), e)),
    };

    // The server may still be appending; read only up to the length scanned.
    let read = |file: &mut File| -> io::Result<Vec<u8>> {
        let (start, end) = tail_offset(file, max_lines)?;
        file.seek(SeekFrom::Start(start))?;
        let mut buf = Vec::with_capacity((end - start) as usize);
        file.by_ref().take(end - start).read_to_end(&mut buf)?;
        Ok(buf)
    };

    let bytes = read(&mut file)
        .map_err(|e| Error::io(format!("Failed to read {}", path.display()), e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Byte range `(start, end)` holding the last `max_lines` lines, where `end`
/// is the length of the file when the scan began.
///
/// A terminator on the very last byte ends the final line rather than
/// starting an empty one.
fn tail_offset<R: Read + Seek>(reader: &mut R, max_lines: usize) -> io::Result<(u64, u64)> {
    let len = reader.seek(SeekFrom::End(0))?;
    if max_lines == 0 {
        return Ok((len, len));
    }

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut pos = len;
    let mut seen = 0usize;

    while pos > 0 {
        let chunk = (CHUNK_SIZE as u64).min(pos) as usize;
        pos -= chunk as u64;
        reader.seek(SeekFrom::Start(pos))?;
        reader.read_exact(&mut buf[..chunk])?;

        for i in (0..chunk).rev() {
            let offset = pos + i as u64;
            if buf[i] != b'\n' || offset + 1 == len {
                continue;
            }
            seen += 1;
            if seen == max_lines {
                return Ok((offset + 1, len));
            }
        }
    }

    Ok((0, len))
}
