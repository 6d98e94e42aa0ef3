//! Streaming file digests and lockstep byte comparison.
//!
//! # Overview
//!
//! Three operations back the match index, cheapest first:
//! - [`Hasher::partial_digest`]: xxHash32 over the first [`PARTIAL_SIZE`] bytes
//! - [`Hasher::full_digest`]: xxHash64 over the whole file, in [`BLOCK_SIZE`] blocks
//! - [`Hasher::bytes_equal`]: both files read in lockstep blocks
//!
//! With hashing disabled both digests are `0` and no file is opened. With
//! content comparison disabled, `bytes_equal` trusts the digests and answers
//! `true`; a 64-bit digest collision then counts as a duplicate.
//!
//! # Example
//!
//! ```no_run
//! use dedupe::scanner::Hasher;
//! use std::path::Path;
//!
//! let hasher = Hasher::new(true, true);
//! let head = hasher.partial_digest(Path::new("a.bin")).unwrap();
//! let full = hasher.full_digest(Path::new("a.bin")).unwrap();
//! println!("{head:08x} {full:016x}");
//! ```

use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read};
use std::path::Path;

use twox_hash::{XxHash32, XxHash64};

use super::HashError;

/// Number of leading bytes covered by the partial digest.
pub const PARTIAL_SIZE: usize = 1024;

/// Read block size for full digests and byte comparison.
pub const BLOCK_SIZE: usize = 8 * 1024;

/// Stateless file digester.
#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    hash: bool,
    contents: bool,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Hasher {
    /// Create a hasher.
    ///
    /// # Arguments
    ///
    /// * `hash` - Compute real digests (otherwise every digest is `0`)
    /// * `contents` - Verify candidates byte by byte
    #[must_use]
    pub fn new(hash: bool, contents: bool) -> Self {
        Self { hash, contents }
    }

    /// Whether digests are computed.
    #[must_use]
    pub fn hashes(&self) -> bool {
        self.hash
    }

    /// Whether [`bytes_equal`](Self::bytes_equal) reads file contents.
    #[must_use]
    pub fn compares_contents(&self) -> bool {
        self.contents
    }

    /// Digest of at most the first [`PARTIAL_SIZE`] bytes.
    ///
    /// Files shorter than the prefix are digested as-is.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn partial_digest(&self, path: &Path) -> Result<u32, HashError> {
        if !self.hash {
            return Ok(0);
        }
        let mut file = open(path)?;
        let mut buffer = [0u8; PARTIAL_SIZE];
        let len = fill_block(&mut file, &mut buffer).map_err(|e| HashError::from_io(path, e))?;

        let mut hasher = XxHash32::with_seed(0);
        hasher.write(&buffer[..len]);
        let digest = hasher.finish() as u32;
        log::trace!("Partial digest {:08x} ({} bytes): {}", digest, len, path.display());
        Ok(digest)
    }

    /// Digest of the whole file, streamed in [`BLOCK_SIZE`] blocks.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn full_digest(&self, path: &Path) -> Result<u64, HashError> {
        if !self.hash {
            return Ok(0);
        }
        let mut file = open(path)?;
        let mut buffer = vec![0u8; BLOCK_SIZE];
        let mut hasher = XxHash64::with_seed(0);
        let mut total = 0u64;

        loop {
            let len = fill_block(&mut file, &mut buffer).map_err(|e| HashError::from_io(path, e))?;
            if len == 0 {
                break;
            }
            hasher.write(&buffer[..len]);
            total += len as u64;
        }

        let digest = hasher.finish();
        log::trace!("Full digest {:016x} ({} bytes): {}", digest, total, path.display());
        Ok(digest)
    }

    /// Whether two files have identical contents.
    ///
    /// Always `true` when content comparison is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if either file cannot be opened or read.
    pub fn bytes_equal(&self, a: &Path, b: &Path) -> Result<bool, HashError> {
        if !self.contents {
            return Ok(true);
        }
        let mut file_a = open(a)?;
        let mut file_b = open(b)?;
        let mut block_a = vec![0u8; BLOCK_SIZE];
        let mut block_b = vec![0u8; BLOCK_SIZE];

        loop {
            let len_a = fill_block(&mut file_a, &mut block_a).map_err(|e| HashError::from_io(a, e))?;
            let len_b = fill_block(&mut file_b, &mut block_b).map_err(|e| HashError::from_io(b, e))?;

            if len_a != len_b {
                return Ok(false);
            }
            if len_a == 0 {
                return Ok(true);
            }
            if block_a[..len_a] != block_b[..len_b] {
                return Ok(false);
            }
        }
    }
}

fn open(path: &Path) -> Result<File, HashError> {
    File::open(path).map_err(|e| HashError::from_io(path, e))
}

/// Read until `buffer` is full or the stream ends.
///
/// A plain `read` may return short counts mid-file, which would desync
/// lockstep comparison.
fn fill_block<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
