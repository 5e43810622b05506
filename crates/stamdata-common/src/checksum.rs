//! MD5 checksum utilities for delivered files

use crate::error::{CommonError, Result};
use std::io::Read;
use std::path::Path;

/// Compute MD5 checksum of bytes
pub fn compute_md5(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Compute MD5 checksum for any readable source
pub fn compute_reader_md5<R: Read>(reader: &mut R) -> std::io::Result<String> {
    let mut context = md5::Context::new();
    let mut buffer = [0u8; 16384];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        context.consume(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", context.compute()))
}

/// Compute MD5 checksum of a file without loading it into memory
pub fn compute_file_md5(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| CommonError::file_read(path, e))?;
    compute_reader_md5(&mut file).map_err(|e| CommonError::file_read(path, e))
}
