//! Temporary chunk files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::sort::SortError;
use crate::stream::{Record, RecordReader, RecordWriter};

/// Mints uniquely-named empty chunk files under a common path prefix.
///
/// Names are `<base><hex-random-suffix>` and creation is exclusive; a name collision is
/// retried with a fresh suffix. The platform's shared temp-file helpers are not used
/// here: a sort may need far more concurrently named files than they support.
pub struct ChunkFileFactory {
    base: PathBuf,
    rng: StdRng,
}

impl ChunkFileFactory {
    /// Creates a factory minting files whose names start with `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        ChunkFileFactory {
            base: base.into(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a new empty chunk file under a unique name.
    pub fn create(&mut self) -> Result<ChunkFile, SortError> {
        loop {
            let mut path = self.base.clone().into_os_string();
            path.push(format!("{:x}", self.rng.gen::<u64>()));
            let path = PathBuf::from(path);

            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    log::debug!("created chunk file {}", path.display());
                    return Ok(ChunkFile { path });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(SortError::TempDir(err)),
            }
        }
    }
}

/// A temporary file holding one sorted chunk of records.
///
/// Each chunk file has exactly one owner; ownership transfers by move, never by copy.
/// Its lifecycle is: created empty by the factory, opened for writing exactly once,
/// closed, opened for reading exactly once, then dropped. The backing file is removed
/// when the value drops, whether or not the sort succeeded.
pub struct ChunkFile {
    path: PathBuf,
}

impl ChunkFile {
    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the chunk for writing. Must not be called after [`reader`](Self::reader).
    pub fn writer<R: Record>(&self) -> Result<RecordWriter<R>, SortError> {
        RecordWriter::create(&self.path)
    }

    /// Opens the chunk for reading.
    pub fn reader<R: Record>(&self) -> Result<RecordReader<R>, SortError> {
        RecordReader::open(&self.path)
    }
}

impl Drop for ChunkFile {
    fn drop(&mut self) {
        // the chunk's data is no longer needed, so a failed removal is not fatal
        if let Err(err) = fs::remove_file(&self.path) {
            log::warn!("chunk file {} not removed: {}", self.path.display(), err);
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use rstest::*;

    use super::ChunkFileFactory;

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[rstest]
    fn test_factory_mints_distinct_empty_files(tmp_dir: tempfile::TempDir) {
        let mut factory = ChunkFileFactory::new(tmp_dir.path().join("chunk-"));

        let chunk_a = factory.create().unwrap();
        let chunk_b = factory.create().unwrap();

        assert_ne!(chunk_a.path(), chunk_b.path());
        assert!(chunk_a.path().starts_with(tmp_dir.path()));
        assert_eq!(fs::metadata(chunk_a.path()).unwrap().len(), 0);
        assert_eq!(fs::metadata(chunk_b.path()).unwrap().len(), 0);
    }

    #[rstest]
    fn test_backing_file_removed_on_drop(tmp_dir: tempfile::TempDir) {
        let mut factory = ChunkFileFactory::new(tmp_dir.path().join("chunk-"));

        let chunk = factory.create().unwrap();
        let path = chunk.path().to_path_buf();
        assert!(path.exists());

        drop(chunk);
        assert!(!path.exists());
    }

    #[rstest]
    fn test_chunk_write_then_read(tmp_dir: tempfile::TempDir) {
        let mut factory = ChunkFileFactory::new(tmp_dir.path().join("chunk-"));
        let chunk = factory.create().unwrap();

        let mut writer = chunk.writer::<u64>().unwrap();
        for record in [1u64, 2, 3] {
            writer.write(&record).unwrap();
        }
        writer.close().unwrap();

        let restored: Result<Vec<u64>, _> = chunk.reader::<u64>().unwrap().collect();
        assert_eq!(restored.unwrap(), vec![1, 2, 3]);
    }
}
