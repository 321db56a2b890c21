//! `recsort` is an external merge sort for flat files of fixed-width binary records.
//!
//! External sorting is required when the data being sorted does not fit into the main
//! memory (RAM) of a computer and must instead stream through slower external memory,
//! usually a hard disk drive. `recsort` first splits the input into chunks of at most
//! `chunk_size` records, sorts each chunk in memory and persists it as a temporary
//! file; it then merges those files pairwise in passes until the sorted result can be
//! produced directly into the output file. Peak memory stays bounded by one chunk
//! regardless of input size.
//!
//! # Overview
//!
//! `recsort` supports the following features:
//!
//! * **Raw fixed-width records:**
//!   a record file is a flat sequence of fixed-width values with no header or padding;
//!   any type implementing the [`Record`] trait can be sorted, and the fixed-width
//!   integer types implement it out of the box.
//! * **Bounded memory:**
//!   at most `chunk_size` records are held in memory at a time, no matter how large
//!   the input is.
//! * **Cooperative cancellation:**
//!   a shared [`CancellationToken`] can be triggered from outside normal control flow
//!   (e.g. a signal handler) and is checked before each record of output work.
//! * **Temporary file hygiene:**
//!   every temporary chunk file is owned by exactly one handle and is removed when
//!   that handle drops, whether or not the sort succeeded.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use recsort::{ExternalSorterBuilder, RecordReader, RecordWriter};
//!
//! fn main() {
//!     let mut input: RecordReader<u64> = RecordReader::open(Path::new("input.bin")).unwrap();
//!     let mut output: RecordWriter<u64> = RecordWriter::create(Path::new("output.bin")).unwrap();
//!
//!     let sorter = ExternalSorterBuilder::new()
//!         .with_chunk_size(1024 * 1024)
//!         .build()
//!         .unwrap();
//!
//!     sorter.sort(&mut input, &mut output).unwrap();
//!     output.close().unwrap();
//! }
//! ```

pub mod buffer;
pub mod cancel;
pub mod chunk;
pub mod merger;
pub mod sort;
pub mod stream;

pub use buffer::LimitedBuffer;
pub use cancel::{Cancelled, CancellationToken};
pub use chunk::{ChunkFile, ChunkFileFactory};
pub use merger::{copy_records, merge_pass, merge_streams};
pub use sort::{ExternalSorter, ExternalSorterBuilder, SortError, DEFAULT_CHUNK_SIZE};
pub use stream::{Record, RecordReader, RecordWriter};
