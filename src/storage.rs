//! Paired on-disk artifacts for a built index: `vectors.bin` and `chunks.json`.
//!
//! Both files live in one directory and are always written and read together.
//! Writes land in temporary files first and are renamed into place only once
//! both artifacts are complete. `vectors.bin` records a CRC32 of the exact
//! `chunks.json` bytes it was saved with, so a pair from different saves is
//! rejected on load instead of being joined by position.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher as Crc32;
use serde::{Deserialize, Serialize};

use crate::chunks::Chunk;
use crate::error::{RagError, Result};
use crate::vector_index::FlatIndex;

/// File name of the vector artifact.
pub const VECTORS_FILE: &str = "vectors.bin";
/// File name of the chunk metadata artifact.
pub const CHUNKS_FILE: &str = "chunks.json";

const MAGIC: u32 = 0x4D44_5247; // "MDRG"
const VERSION: u16 = 1;
const TMP_SUFFIX: &str = ".tmp";

#[derive(Serialize, Deserialize)]
struct VectorArtifact {
    magic: u32,
    version: u16,
    dim: u32,
    count: u64,
    chunks_crc: u32,
    data: Vec<f32>,
}

/// Persists `index` and `chunks` under `dir`, replacing any previous artifacts.
pub fn save(dir: &Path, index: Option<&FlatIndex>, chunks: &[Chunk]) -> Result<()> {
    let index = match index {
        Some(index) if !chunks.is_empty() => index,
        _ => return Err(RagError::NothingToSave),
    };
    if index.len() != chunks.len() {
        return Err(RagError::CorruptIndex(format!(
            "refusing to save {} vectors alongside {} chunks",
            index.len(),
            chunks.len()
        )));
    }
    fs::create_dir_all(dir)?;

    let vectors_path = dir.join(VECTORS_FILE);
    let chunks_path = dir.join(CHUNKS_FILE);
    let vectors_tmp = tmp_path(&vectors_path);
    let chunks_tmp = tmp_path(&chunks_path);

    let written = write_chunks(&chunks_tmp, chunks)
        .and_then(|chunks_crc| write_vectors(&vectors_tmp, index, chunks_crc));
    if let Err(err) = written {
        let _ = fs::remove_file(&vectors_tmp);
        let _ = fs::remove_file(&chunks_tmp);
        return Err(err);
    }
    fs::rename(&vectors_tmp, &vectors_path)?;
    fs::rename(&chunks_tmp, &chunks_path)?;

    tracing::info!(
        dir = %dir.display(),
        chunks = chunks.len(),
        dim = index.dim(),
        "saved index and chunks"
    );
    Ok(())
}

/// Loads the artifacts under `dir` and verifies they describe the same chunks.
pub fn load(dir: &Path) -> Result<(FlatIndex, Vec<Chunk>)> {
    let vectors_path = dir.join(VECTORS_FILE);
    let chunks_path = dir.join(CHUNKS_FILE);
    if !vectors_path.is_file() || !chunks_path.is_file() {
        return Err(RagError::IndexNotFound(dir.to_path_buf()));
    }

    let (index, chunks_crc) = read_vectors(&vectors_path)?;
    let chunks = read_chunks(&chunks_path, chunks_crc)?;
    if index.len() != chunks.len() {
        return Err(RagError::CorruptIndex(format!(
            "{} holds {} vectors but {} holds {} chunks",
            VECTORS_FILE,
            index.len(),
            CHUNKS_FILE,
            chunks.len()
        )));
    }

    tracing::info!(
        dir = %dir.display(),
        chunks = chunks.len(),
        dim = index.dim(),
        "loaded index and chunks"
    );
    Ok((index, chunks))
}

/// True when both artifacts are present under `dir`.
pub fn exists(dir: &Path) -> bool {
    dir.join(VECTORS_FILE).is_file() && dir.join(CHUNKS_FILE).is_file()
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

fn write_vectors(path: &Path, index: &FlatIndex, chunks_crc: u32) -> Result<()> {
    let artifact = VectorArtifact {
        magic: MAGIC,
        version: VERSION,
        dim: index.dim() as u32,
        count: index.len() as u64,
        chunks_crc,
        data: index.as_raw().to_vec(),
    };
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, &artifact)
        .map_err(|err| RagError::Serialization(format!("{VECTORS_FILE}: {err}")))?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Writes the chunk list and returns the checksum of the bytes written.
fn write_chunks(path: &Path, chunks: &[Chunk]) -> Result<u32> {
    let bytes = serde_json::to_vec_pretty(chunks)
        .map_err(|err| RagError::Serialization(format!("{CHUNKS_FILE}: {err}")))?;
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    Ok(checksum(&bytes))
}

fn checksum(bytes: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(bytes);
    hasher.finalize()
}

fn read_vectors(path: &Path) -> Result<(FlatIndex, u32)> {
    let reader = BufReader::new(File::open(path)?);
    let artifact: VectorArtifact = bincode::deserialize_from(reader)
        .map_err(|err| RagError::CorruptIndex(format!("{VECTORS_FILE}: {err}")))?;
    if artifact.magic != MAGIC {
        return Err(RagError::CorruptIndex(format!(
            "{VECTORS_FILE}: bad magic {:#010x}",
            artifact.magic
        )));
    }
    if artifact.version != VERSION {
        return Err(RagError::CorruptIndex(format!(
            "{VECTORS_FILE}: unsupported version {}",
            artifact.version
        )));
    }
    let dim = artifact.dim as usize;
    let expected = dim as u64 * artifact.count;
    if artifact.data.len() as u64 != expected {
        return Err(RagError::CorruptIndex(format!(
            "{VECTORS_FILE}: header declares {} vectors of dimension {} but holds {} floats",
            artifact.count,
            dim,
            artifact.data.len()
        )));
    }
    let index = FlatIndex::from_raw(dim, artifact.data)?;
    Ok((index, artifact.chunks_crc))
}

fn read_chunks(path: &Path, expected_crc: u32) -> Result<Vec<Chunk>> {
    let bytes = fs::read(path)?;
    let actual_crc = checksum(&bytes);
    if actual_crc != expected_crc {
        return Err(RagError::CorruptIndex(format!(
            "{CHUNKS_FILE} (crc {actual_crc:#010x}) was not saved with {VECTORS_FILE} (expects {expected_crc:#010x})"
        )));
    }
    serde_json::from_slice(&bytes)
        .map_err(|err| RagError::CorruptIndex(format!("{CHUNKS_FILE}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn fixture() -> (FlatIndex, Vec<Chunk>) {
        let index = FlatIndex::build(vec![vec![0.5, 1.5], vec![2.0, -1.0], vec![0.0, 0.0]]).unwrap();
        let chunks = vec![
            Chunk::new("a", "a.md", 0, "Hello world."),
            Chunk::new("a", "a.md", 1, "world. Again"),
            Chunk::new("b", "b.md", 0, "Ünïcödé survives"),
        ];
        (index, chunks)
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let (index, chunks) = fixture();
        save(dir.path(), Some(&index), &chunks).unwrap();
        assert!(exists(dir.path()));

        let (loaded_index, loaded_chunks) = load(dir.path()).unwrap();
        assert_eq!(loaded_index, index);
        assert_eq!(loaded_chunks, chunks);
        assert!(!dir.path().join("vectors.bin.tmp").exists());
    }

    #[test]
    fn chunk_artifact_is_readable_json() {
        let dir = TempDir::new().unwrap();
        let (index, chunks) = fixture();
        save(dir.path(), Some(&index), &chunks).unwrap();
        let raw = fs::read_to_string(dir.path().join(CHUNKS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[1]["id"], "a_1");
        assert_eq!(value[2]["title"], "b.md");
        assert!(raw.contains("Ünïcödé"));
    }

    #[test]
    fn nothing_to_save() {
        let dir = TempDir::new().unwrap();
        let (index, chunks) = fixture();
        assert_eq!(
            save(dir.path(), None, &chunks).unwrap_err().kind(),
            ErrorKind::NothingToSave
        );
        assert_eq!(
            save(dir.path(), Some(&index), &[]).unwrap_err().kind(),
            ErrorKind::NothingToSave
        );
        assert!(!exists(dir.path()));
    }

    #[test]
    fn missing_artifact_is_index_not_found() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load(dir.path()).unwrap_err().kind(), ErrorKind::IndexNotFound);

        let (index, chunks) = fixture();
        save(dir.path(), Some(&index), &chunks).unwrap();
        fs::remove_file(dir.path().join(CHUNKS_FILE)).unwrap();
        assert_eq!(load(dir.path()).unwrap_err().kind(), ErrorKind::IndexNotFound);
    }

    #[test]
    fn count_skew_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let (index, chunks) = fixture();
        save(dir.path(), Some(&index), &chunks).unwrap();
        let truncated = serde_json::to_string(&chunks[..2]).unwrap();
        fs::write(dir.path().join(CHUNKS_FILE), truncated).unwrap();
        assert_eq!(load(dir.path()).unwrap_err().kind(), ErrorKind::CorruptIndex);
    }

    #[test]
    fn chunks_from_another_save_are_corrupt_even_with_equal_counts() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let (index, chunks) = fixture();
        save(dir.path(), Some(&index), &chunks).unwrap();

        let renamed: Vec<Chunk> = chunks
            .iter()
            .map(|c| Chunk::new("z", "z.md", 0, c.text.to_uppercase()))
            .collect();
        save(other.path(), Some(&index), &renamed).unwrap();
        fs::copy(other.path().join(CHUNKS_FILE), dir.path().join(CHUNKS_FILE)).unwrap();

        let err = load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptIndex);
        assert!(err.to_string().contains("was not saved with"));
    }

    #[test]
    fn garbage_vector_artifact_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let (index, chunks) = fixture();
        save(dir.path(), Some(&index), &chunks).unwrap();
        fs::write(dir.path().join(VECTORS_FILE), b"not an index").unwrap();
        assert_eq!(load(dir.path()).unwrap_err().kind(), ErrorKind::CorruptIndex);
    }

    #[test]
    fn save_replaces_previous_artifacts() {
        let dir = TempDir::new().unwrap();
        let (index, chunks) = fixture();
        save(dir.path(), Some(&index), &chunks).unwrap();

        let smaller = FlatIndex::build(vec![vec![9.0, 9.0]]).unwrap();
        let one = vec![Chunk::new("c", "c.md", 0, "replacement")];
        save(dir.path(), Some(&smaller), &one).unwrap();

        let (loaded_index, loaded_chunks) = load(dir.path()).unwrap();
        assert_eq!(loaded_index.len(), 1);
        assert_eq!(loaded_chunks, one);
    }
}
