//! Supported content digests.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use sha2::{Digest, Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};

use crate::error::ExportError;

/// Bytes read per chunk while hashing.
pub const CHUNK_SIZE: usize = 8192;

/// Digest used to fingerprint attachment content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
    Sha512_224,
    Sha512_256,
}

impl HashAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [HashAlgorithm; 6] = [
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
        Self::Sha512_224,
        Self::Sha512_256,
    ];

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Sha512_224 => "sha512_224",
            Self::Sha512_256 => "sha512_256",
        }
    }

    /// Comma-separated list of supported names, for error messages and help.
    pub fn supported_names() -> String {
        Self::ALL
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Hash everything `reader` yields, `CHUNK_SIZE` bytes at a time.
    pub fn digest_reader<R: Read>(self, reader: R) -> std::io::Result<String> {
        match self {
            Self::Sha224 => stream::<Sha224, R>(reader),
            Self::Sha256 => stream::<Sha256, R>(reader),
            Self::Sha384 => stream::<Sha384, R>(reader),
            Self::Sha512 => stream::<Sha512, R>(reader),
            Self::Sha512_224 => stream::<Sha512_224, R>(reader),
            Self::Sha512_256 => stream::<Sha512_256, R>(reader),
        }
    }
}

fn stream<D: Digest, R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}

impl FromStr for HashAlgorithm {
    type Err = ExportError;

    /// Accepts the canonical names case-insensitively, with `-` for `_`
    /// and an optional dash after `sha` (`SHA-256`, `sha512-256`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        let normalized = normalized
            .strip_prefix("sha_")
            .map(|rest| format!("sha{rest}"))
            .unwrap_or(normalized);

        Self::ALL
            .into_iter()
            .find(|a| a.name() == normalized)
            .ok_or_else(|| ExportError::UnsupportedHashAlgorithm {
                name: s.to_string(),
                supported: Self::supported_names(),
            })
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha512_256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512_256);
        assert_eq!("sha512-224".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512_224);
    }

    #[test]
    fn test_unsupported_name() {
        let err = "md4".parse::<HashAlgorithm>().unwrap_err();
        match err {
            ExportError::UnsupportedHashAlgorithm { name, supported } => {
                assert_eq!(name, "md4");
                assert!(supported.contains("sha256"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_known_digest() {
        let hex = HashAlgorithm::Sha256.digest_reader(&b"abc"[..]).unwrap();
        assert_eq!(
            hex,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_lengths() {
        for algo in HashAlgorithm::ALL {
            let hex = algo.digest_reader(&b""[..]).unwrap();
            let expected = match algo {
                HashAlgorithm::Sha224 | HashAlgorithm::Sha512_224 => 56,
                HashAlgorithm::Sha256 | HashAlgorithm::Sha512_256 => 64,
                HashAlgorithm::Sha384 => 96,
                HashAlgorithm::Sha512 => 128,
            };
            assert_eq!(hex.len(), expected, "{algo}");
        }
    }

    #[test]
    fn test_multi_chunk_input_matches_single_update() {
        let data = vec![7u8; CHUNK_SIZE * 3 + 17];
        let streamed = HashAlgorithm::Sha256.digest_reader(&data[..]).unwrap();
        let mut hasher = Sha256::new();
        hasher.update(&data);
        let direct: String = hasher.finalize().iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(streamed, direct);
    }
}
