use crate::error::{ManifestError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Read buffer size used while hashing. Bounds memory regardless of file size.
pub const HASH_CHUNK_SIZE: usize = 8192;

/// Computes the lowercase hex SHA-256 digest of a file, streaming it in
/// fixed-size chunks.
///
/// # Example
///
/// ```no_run
/// use cvec_db::manifest::sha256_file;
/// use std::path::Path;
///
/// let digest = sha256_file(Path::new("data/cves.parquet"))?;
/// assert_eq!(digest.len(), 64);
/// # Ok::<(), cvec_db::ManifestError>(())
/// ```
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| ManifestError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_CHUNK_SIZE];

    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ManifestError::io(path, e)),
        };
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
