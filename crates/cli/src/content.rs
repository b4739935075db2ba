//! Local content summaries: BLAKE3 file digest, chunk count and the Merkle
//! root over chunk digests.

use anyhow::{Context, Result};
use soldrive_types::Digest;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSummary {
    pub file_size: u64,
    pub file_hash: Digest,
    pub chunk_count: u32,
    pub merkle_root: Digest,
}

/// Read `path` in `chunk_size` pieces and summarise it.
pub fn summarize(path: &Path, chunk_size: u64) -> Result<ContentSummary> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let chunk_size = usize::try_from(chunk_size).context("chunk size does not fit in memory")?;

    let mut whole = blake3::Hasher::new();
    let mut leaves = Vec::new();
    let mut file_size = 0u64;
    let mut buffer = vec![0u8; chunk_size];

    loop {
        let filled = read_chunk(&mut file, &mut buffer)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if filled == 0 {
            break;
        }
        let chunk = &buffer[..filled];
        whole.update(chunk);
        leaves.push(*blake3::hash(chunk).as_bytes());
        file_size += filled as u64;
        if filled < chunk_size {
            break;
        }
    }

    let chunk_count = u32::try_from(leaves.len()).context("file has too many chunks")?;
    Ok(ContentSummary {
        file_size,
        file_hash: Digest::from_bytes(*whole.finalize().as_bytes()),
        chunk_count,
        merkle_root: merkle_root(&leaves),
    })
}

/// Fill `buffer` as far as the reader allows.
fn read_chunk(reader: &mut impl Read, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let read = reader.read(&mut buffer[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

/// Binary Merkle root; an odd node at any level is paired with itself.
/// An empty leaf set yields the zero digest.
pub fn merkle_root(leaves: &[[u8; 32]]) -> Digest {
    if leaves.is_empty() {
        return Digest::ZERO;
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                let mut hasher = blake3::Hasher::new();
                hasher.update(left);
                hasher.update(right);
                *hasher.finalize().as_bytes()
            })
            .collect();
    }
    Digest::from_bytes(level[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn single_leaf_is_its_own_root() {
        let leaf = [3u8; 32];
        assert_eq!(merkle_root(&[leaf]), Digest::from_bytes(leaf));
        assert!(merkle_root(&[]).is_zero());
    }

    #[test]
    fn odd_leaf_is_duplicated() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let c = [3u8; 32];
        assert_eq!(merkle_root(&[a, b, c]), merkle_root(&[a, b, c, c]));
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }

    #[test]
    fn summary_counts_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        let data: Vec<u8> = (0..2_500u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();

        let summary = summarize(&path, 1_000).unwrap();
        assert_eq!(summary.file_size, 2_500);
        assert_eq!(summary.chunk_count, 3);
        assert_eq!(summary.file_hash, Digest::from_bytes(*blake3::hash(&data).as_bytes()));

        let leaves: Vec<[u8; 32]> = data
            .chunks(1_000)
            .map(|chunk| *blake3::hash(chunk).as_bytes())
            .collect();
        assert_eq!(summary.merkle_root, merkle_root(&leaves));
    }

    #[test]
    fn exact_multiple_has_no_trailing_chunk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("even.bin");
        fs::write(&path, vec![7u8; 2_000]).unwrap();

        let summary = summarize(&path, 1_000).unwrap();
        assert_eq!(summary.chunk_count, 2);
    }

    #[test]
    fn empty_file_has_no_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.bin");
        fs::write(&path, b"").unwrap();

        let summary = summarize(&path, 1_000).unwrap();
        assert_eq!(summary.file_size, 0);
        assert_eq!(summary.chunk_count, 0);
    }
}
