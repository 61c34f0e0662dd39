use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::warn;

/// Produces a content token; equal tokens imply equal content.
pub trait Digester {
    fn digest(&self, path: &Path) -> io::Result<String>;
}

/// Streaming SHA-256, hex encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digester;

impl Digester for Sha256Digester {
    fn digest(&self, path: &Path) -> io::Result<String> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Compare a known digest against the digest of `candidate`. A digest
/// failure counts as unverified.
pub fn matches_digest(digester: &dyn Digester, expected: &str, candidate: &Path) -> bool {
    match digester.digest(candidate) {
        Ok(actual) => actual == expected,
        Err(e) => {
            warn!(path = %candidate.display(), error = %e, "digest failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn known_sha256() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            Sha256Digester.digest(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn one_byte_difference_fails() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, vec![7u8; 200_000]).unwrap();
        let mut other = vec![7u8; 200_000];
        other[123_456] = 8;
        fs::write(&b, &other).unwrap();
        let expected = Sha256Digester.digest(&a).unwrap();
        assert!(matches_digest(&Sha256Digester, &expected, &a));
        assert!(!matches_digest(&Sha256Digester, &expected, &b));
    }

    #[test]
    fn missing_file_is_unverified() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        fs::write(&a, b"data").unwrap();
        let expected = Sha256Digester.digest(&a).unwrap();
        assert!(!matches_digest(&Sha256Digester, &expected, &dir.path().join("gone")));
    }
}
