//! External merge sorter.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use log;

use crate::buffer::LimitedBuffer;
use crate::cancel::{Cancelled, CancellationToken};
use crate::chunk::{ChunkFile, ChunkFileFactory};
use crate::merger::{copy_records, merge_pass, merge_streams};
use crate::stream::{Record, RecordReader, RecordWriter};

/// Default number of records sorted in memory at a time.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

const CHUNK_FILE_PREFIX: &str = "chunk-";

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Temporary directory or file creation error.
    TempDir(io::Error),
    /// I/O failure on an input, output or chunk file, carrying the offending path.
    IO { path: PathBuf, source: io::Error },
    /// The sort was aborted through its cancellation token.
    Cancelled,
}

impl SortError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SortError::IO {
            path: path.into(),
            source,
        }
    }
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::TempDir(err) => Some(err),
            SortError::IO { source, .. } => Some(source),
            SortError::Cancelled => None,
        }
    }
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::TempDir(err) => write!(f, "temporary directory or file not created: {}", err),
            SortError::IO { path, source } => {
                write!(f, "I/O operation failed on {}: {}", path.display(), source)
            }
            SortError::Cancelled => write!(f, "sort cancelled"),
        }
    }
}

impl From<Cancelled> for SortError {
    fn from(_: Cancelled) -> Self {
        SortError::Cancelled
    }
}

/// External sorter builder. Provides methods for [`ExternalSorter`] initialization.
#[derive(Clone)]
pub struct ExternalSorterBuilder {
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// Number of records sorted in memory at a time.
    chunk_size: usize,
    /// Token consulted before each unit of output work.
    cancel_token: CancellationToken,
}

impl ExternalSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        ExternalSorterBuilder::default()
    }

    /// Builds an [`ExternalSorter`] instance using provided configuration.
    pub fn build(self) -> Result<ExternalSorter, SortError> {
        ExternalSorter::new(self.tmp_dir.as_deref(), self.chunk_size, self.cancel_token)
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> ExternalSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets the number of records sorted in memory at a time.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> ExternalSorterBuilder {
        self.chunk_size = chunk_size;
        return self;
    }

    /// Sets the cancellation token consulted during the sort.
    ///
    /// A sorter built without one uses a private token that is never triggered.
    pub fn with_cancellation_token(mut self, cancel_token: CancellationToken) -> ExternalSorterBuilder {
        self.cancel_token = cancel_token;
        return self;
    }
}

impl Default for ExternalSorterBuilder {
    fn default() -> Self {
        ExternalSorterBuilder {
            tmp_dir: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel_token: CancellationToken::new(),
        }
    }
}

/// External sorter.
///
/// Splits the input into sorted chunk files of at most `chunk_size` records, then merges
/// the chunks pairwise in passes until the result can be produced directly into the
/// output stream. Peak memory is bounded by one chunk; each pass rewrites roughly the
/// whole input once, giving `ceil(log2(chunk count))` passes overall.
pub struct ExternalSorter {
    /// Directory holding the temporary chunk files; removed when the sorter drops.
    tmp_dir: tempfile::TempDir,
    /// Number of records sorted in memory at a time.
    chunk_size: usize,
    /// Token consulted before each unit of output work.
    cancel_token: CancellationToken,
}

impl ExternalSorter {
    /// Creates a new external sorter instance.
    ///
    /// # Arguments
    /// * `tmp_path` - Directory to be used to store temporary data. If the parameter is
    ///   [`None`] the default OS temporary directory will be used.
    /// * `chunk_size` - Number of records sorted in memory at a time.
    /// * `cancel_token` - Token consulted before each unit of output work.
    ///
    /// # Panics
    /// Panics if `chunk_size` is zero; that is a caller contract violation, not a
    /// runtime-recoverable error.
    pub fn new(
        tmp_path: Option<&Path>,
        chunk_size: usize,
        cancel_token: CancellationToken,
    ) -> Result<Self, SortError> {
        assert!(chunk_size > 0, "chunk size must be positive");

        return Ok(ExternalSorter {
            tmp_dir: Self::init_tmp_directory(tmp_path)?,
            chunk_size,
            cancel_token,
        });
    }

    fn init_tmp_directory(tmp_path: Option<&Path>) -> Result<tempfile::TempDir, SortError> {
        let tmp_dir = if let Some(tmp_path) = tmp_path {
            tempfile::tempdir_in(tmp_path)
        } else {
            tempfile::tempdir()
        }
        .map_err(|err| SortError::TempDir(err))?;

        log::info!("using {} as a temporary directory", tmp_dir.path().display());

        return Ok(tmp_dir);
    }

    /// Sorts the records of `input` into `output`.
    ///
    /// The output receives exactly the multiset of input records in non-decreasing
    /// order; its byte length equals the input's. On any error, cancellation included,
    /// every temporary chunk file created along the way is removed before the error
    /// propagates. The caller closes `output`.
    ///
    /// # Arguments
    /// * `input` - Stream of records to be sorted
    /// * `output` - Stream the sorted result is written to
    pub fn sort<R: Record>(
        &self,
        input: &mut RecordReader<R>,
        output: &mut RecordWriter<R>,
    ) -> Result<(), SortError> {
        let mut chunk_files = ChunkFileFactory::new(self.tmp_dir.path().join(CHUNK_FILE_PREFIX));

        let mut chunks = self.split_into_chunks(input, &mut chunk_files)?;
        log::debug!("split produced {} sorted chunks", chunks.len());

        while chunks.len() > 2 {
            log::info!("chunk count: {}", chunks.len());
            chunks = merge_pass::<R>(chunks, &mut chunk_files, &self.cancel_token)?;
        }
        log::info!("chunk count: {}", chunks.len());

        let mut remaining = chunks.into_iter();
        match (remaining.next(), remaining.next()) {
            (Some(chunk_a), Some(chunk_b)) => {
                let mut reader_a = chunk_a.reader()?;
                let mut reader_b = chunk_b.reader()?;
                merge_streams(&mut reader_a, &mut reader_b, output, &self.cancel_token)?;
            }
            (Some(chunk), None) => {
                let mut reader = chunk.reader()?;
                copy_records(&mut reader, output, &self.cancel_token)?;
            }
            // empty input: the output stream is left empty
            (None, _) => {}
        }

        return Ok(());
    }

    /// Reads the input in chunks of up to `chunk_size` records, sorting each chunk in
    /// memory and persisting it as one chunk file; generation 0 of the merge.
    fn split_into_chunks<R: Record>(
        &self,
        input: &mut RecordReader<R>,
        chunk_files: &mut ChunkFileFactory,
    ) -> Result<Vec<ChunkFile>, SortError> {
        let mut chunks = Vec::new();
        let mut buffer = LimitedBuffer::new(self.chunk_size);

        loop {
            while !buffer.is_full() {
                self.cancel_token.check()?;
                match input.read_next()? {
                    Some(record) => buffer.push(record),
                    None => break,
                }
            }

            if buffer.is_empty() {
                break;
            }

            log::debug!("sorting chunk of {} records", buffer.len());
            buffer.sort();

            let chunk = chunk_files.create()?;
            let mut writer = chunk.writer()?;
            for record in buffer.drain() {
                self.cancel_token.check()?;
                writer.write(&record)?;
            }
            writer.close()?;
            chunks.push(chunk);
        }

        return Ok(chunks);
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::Path;

    use rand::seq::SliceRandom;
    use rstest::*;

    use super::{ExternalSorter, ExternalSorterBuilder, SortError};
    use crate::cancel::CancellationToken;
    use crate::chunk::ChunkFileFactory;
    use crate::stream::{RecordReader, RecordWriter};

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn write_records(path: &Path, records: &[u64]) {
        let mut writer: RecordWriter<u64> = RecordWriter::create(path).unwrap();
        for record in records {
            writer.write(record).unwrap();
        }
        writer.close().unwrap();
    }

    fn read_records(path: &Path) -> Vec<u64> {
        let reader: RecordReader<u64> = RecordReader::open(path).unwrap();
        let records: Result<Vec<u64>, _> = reader.collect();
        records.unwrap()
    }

    fn build_sorter(tmp_dir: &tempfile::TempDir, chunk_size: usize) -> ExternalSorter {
        ExternalSorterBuilder::new()
            .with_tmp_dir(tmp_dir.path())
            .with_chunk_size(chunk_size)
            .build()
            .unwrap()
    }

    fn run_sort(sorter: &ExternalSorter, input: &Path, output: &Path) -> Result<(), SortError> {
        let mut reader: RecordReader<u64> = RecordReader::open(input).unwrap();
        let mut writer: RecordWriter<u64> = RecordWriter::create(output).unwrap();
        sorter.sort(&mut reader, &mut writer)?;
        writer.close()
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(100)]
    fn test_sorted_output_is_chunk_size_invariant(tmp_dir: tempfile::TempDir, #[case] chunk_size: usize) {
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");

        let expected = Vec::from_iter(0..100u64);
        let mut shuffled = expected.clone();
        shuffled.shuffle(&mut rand::thread_rng());
        write_records(&input, &shuffled);

        let sorter = build_sorter(&tmp_dir, chunk_size);
        run_sort(&sorter, &input, &output).unwrap();

        assert_eq!(read_records(&output), expected);
        assert_eq!(
            fs::metadata(&output).unwrap().len(),
            fs::metadata(&input).unwrap().len(),
        );
    }

    #[rstest]
    fn test_duplicates_are_preserved(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");
        write_records(&input, &[2, 7, 2, 7, 2]);

        let sorter = build_sorter(&tmp_dir, 2);
        run_sort(&sorter, &input, &output).unwrap();

        assert_eq!(read_records(&output), vec![2, 2, 2, 7, 7]);
    }

    #[rstest]
    fn test_sorting_a_sorted_file_reproduces_it(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");
        write_records(&input, &Vec::from_iter(0..50u64));

        let sorter = build_sorter(&tmp_dir, 7);
        run_sort(&sorter, &input, &output).unwrap();

        assert_eq!(fs::read(&input).unwrap(), fs::read(&output).unwrap());
    }

    #[rstest]
    fn test_empty_input_produces_an_empty_output(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");
        write_records(&input, &[]);

        let sorter = build_sorter(&tmp_dir, 4);
        run_sort(&sorter, &input, &output).unwrap();

        assert_eq!(fs::metadata(&output).unwrap().len(), 0);
    }

    #[rstest]
    fn test_singleton_input_is_copied_through(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");
        write_records(&input, &[42]);

        let sorter = build_sorter(&tmp_dir, 4);
        run_sort(&sorter, &input, &output).unwrap();

        assert_eq!(read_records(&output), vec![42]);
    }

    #[rstest]
    fn test_split_generation_contents(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input");
        write_records(&input, &[5, 3, 1, 4, 2]);

        let sorter = build_sorter(&tmp_dir, 2);
        let mut chunk_files = ChunkFileFactory::new(sorter.tmp_dir.path().join("chunk-"));
        let mut reader: RecordReader<u64> = RecordReader::open(&input).unwrap();

        let chunks = sorter.split_into_chunks(&mut reader, &mut chunk_files).unwrap();

        let contents: Vec<Vec<u64>> = chunks
            .iter()
            .map(|chunk| {
                let records: Result<Vec<u64>, _> = chunk.reader().unwrap().collect();
                records.unwrap()
            })
            .collect();
        assert_eq!(contents, vec![vec![3, 5], vec![1, 4], vec![2]]);
    }

    #[rstest]
    fn test_end_to_end_scenario(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");
        write_records(&input, &[5, 3, 1, 4, 2]);

        let sorter = build_sorter(&tmp_dir, 2);
        run_sort(&sorter, &input, &output).unwrap();

        assert_eq!(read_records(&output), vec![1, 2, 3, 4, 5]);
    }

    #[rstest]
    fn test_cancelled_sort_fails_and_leaves_no_chunk_files(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");
        write_records(&input, &[3, 1, 2]);

        let cancel_token = CancellationToken::new();
        cancel_token.trigger();

        let sorter = ExternalSorterBuilder::new()
            .with_tmp_dir(tmp_dir.path())
            .with_chunk_size(2)
            .with_cancellation_token(cancel_token)
            .build()
            .unwrap();

        let result = run_sort(&sorter, &input, &output);
        assert!(matches!(result, Err(SortError::Cancelled)));

        assert_eq!(fs::read_dir(sorter.tmp_dir.path()).unwrap().count(), 0);
    }

    #[rstest]
    #[should_panic(expected = "chunk size must be positive")]
    fn test_zero_chunk_size_is_a_contract_violation(tmp_dir: tempfile::TempDir) {
        let _ = ExternalSorterBuilder::new()
            .with_tmp_dir(tmp_dir.path())
            .with_chunk_size(0)
            .build();
    }
}
