//! Fixed-width record streams.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::sort::SortError;

/// A fixed-width, totally-ordered value stored as its raw in-memory bytes.
///
/// The encoded form is exactly [`WIDTH`](Self::WIDTH) bytes with no framing: a record
/// file is a flat sequence of such values and its byte length is always an exact
/// multiple of the width. Integer implementations use the host's native byte order.
pub trait Record: Ord + Sized {
    /// Encoded record width in bytes.
    const WIDTH: usize;

    /// Writes the record's binary form into `buf`, which is exactly `WIDTH` bytes long.
    fn encode(&self, buf: &mut [u8]);

    /// Reconstructs a record from its binary form.
    fn decode(buf: &[u8]) -> Self;
}

macro_rules! impl_record_for_int {
    ($($int:ty),* $(,)?) => {
        $(
            impl Record for $int {
                const WIDTH: usize = std::mem::size_of::<$int>();

                fn encode(&self, buf: &mut [u8]) {
                    buf.copy_from_slice(&self.to_ne_bytes());
                }

                fn decode(buf: &[u8]) -> Self {
                    <$int>::from_ne_bytes(buf.try_into().expect("record buffer width mismatch"))
                }
            }
        )*
    };
}

impl_record_for_int!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

/// Forward-only reader over a file of fixed-width records.
///
/// The sequence is lazy, finite and not restartable except by reopening. A file whose
/// length is not a multiple of the record width yields an I/O error at its tail.
pub struct RecordReader<R: Record> {
    reader: io::BufReader<fs::File>,
    path: PathBuf,
    buf: Vec<u8>,

    record_type: PhantomData<R>,
}

impl<R: Record> RecordReader<R> {
    /// Opens a record file for reading.
    pub fn open(path: &Path) -> Result<Self, SortError> {
        let file = fs::File::open(path).map_err(|err| SortError::io(path, err))?;

        return Ok(RecordReader {
            reader: io::BufReader::new(file),
            path: path.to_path_buf(),
            buf: vec![0; R::WIDTH],
            record_type: PhantomData,
        });
    }

    /// Reads the next record, or `None` at end of file.
    ///
    /// A short read that is not at the true end of the file is an I/O error.
    pub fn read_next(&mut self) -> Result<Option<R>, SortError> {
        let mut filled = 0;
        while filled < R::WIDTH {
            match self.reader.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(SortError::io(&self.path, err)),
            }
        }

        match filled {
            0 => Ok(None),
            n if n == R::WIDTH => Ok(Some(R::decode(&self.buf))),
            _ => Err(SortError::io(
                &self.path,
                io::Error::new(io::ErrorKind::UnexpectedEof, "truncated record"),
            )),
        }
    }
}

impl<R: Record> Iterator for RecordReader<R> {
    type Item = Result<R, SortError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

/// Append-only writer producing a file of fixed-width records.
pub struct RecordWriter<R: Record> {
    writer: io::BufWriter<fs::File>,
    path: PathBuf,
    buf: Vec<u8>,

    record_type: PhantomData<R>,
}

impl<R: Record> RecordWriter<R> {
    /// Creates (or truncates) a record file for writing.
    pub fn create(path: &Path) -> Result<Self, SortError> {
        let file = fs::File::create(path).map_err(|err| SortError::io(path, err))?;

        return Ok(RecordWriter {
            writer: io::BufWriter::new(file),
            path: path.to_path_buf(),
            buf: vec![0; R::WIDTH],
            record_type: PhantomData,
        });
    }

    /// Appends one record. A short write is an I/O error.
    pub fn write(&mut self, record: &R) -> Result<(), SortError> {
        record.encode(&mut self.buf);
        self.writer
            .write_all(&self.buf)
            .map_err(|err| SortError::io(&self.path, err))
    }

    /// Flushes buffered records and releases the underlying file.
    ///
    /// Dropping the writer without calling `close` flushes on a best-effort basis and
    /// swallows the error; call `close` to have it reported.
    pub fn close(mut self) -> Result<(), SortError> {
        self.writer.flush().map_err(|err| SortError::io(&self.path, err))
    }
}
