//! Two-way chunk merging.

use crate::cancel::CancellationToken;
use crate::chunk::{ChunkFile, ChunkFileFactory};
use crate::sort::SortError;
use crate::stream::{Record, RecordReader, RecordWriter};

/// Merges two sorted record streams into `output`.
///
/// A classic two-pointer merge: the smaller head record is appended and its stream
/// advanced; ties take from `input_a`. Once one stream is exhausted the remainder of
/// the other is copied through. The token is checked before each record written, so the
/// output equals the multiset union of the inputs and is sorted whenever both inputs
/// are.
pub fn merge_streams<R: Record>(
    input_a: &mut RecordReader<R>,
    input_b: &mut RecordReader<R>,
    output: &mut RecordWriter<R>,
    cancel_token: &CancellationToken,
) -> Result<(), SortError> {
    let mut head_a = input_a.read_next()?;
    let mut head_b = input_b.read_next()?;

    loop {
        match (&head_a, &head_b) {
            (Some(a), Some(b)) => {
                cancel_token.check()?;
                if a <= b {
                    output.write(a)?;
                    head_a = input_a.read_next()?;
                } else {
                    output.write(b)?;
                    head_b = input_b.read_next()?;
                }
            }
            _ => break,
        }
    }

    // at most one of the two streams still has records
    drain_remainder(head_a, input_a, output, cancel_token)?;
    drain_remainder(head_b, input_b, output, cancel_token)?;

    return Ok(());
}

fn drain_remainder<R: Record>(
    head: Option<R>,
    input: &mut RecordReader<R>,
    output: &mut RecordWriter<R>,
    cancel_token: &CancellationToken,
) -> Result<(), SortError> {
    if let Some(record) = head {
        cancel_token.check()?;
        output.write(&record)?;
        copy_records(input, output, cancel_token)?;
    }

    return Ok(());
}

/// Copies the remaining records of `input` to `output` unchanged, checking the token
/// before each record written.
pub fn copy_records<R: Record>(
    input: &mut RecordReader<R>,
    output: &mut RecordWriter<R>,
    cancel_token: &CancellationToken,
) -> Result<(), SortError> {
    while let Some(record) = input.read_next()? {
        cancel_token.check()?;
        output.write(&record)?;
    }

    return Ok(());
}

/// Runs one merge pass over a generation of sorted chunks.
///
/// Chunks are paired front-to-back and each pair is merged into a freshly created
/// chunk; the pair's source files are consumed and removed as their handles go out of
/// scope. An odd final chunk is carried forward into the next generation unchanged.
pub fn merge_pass<R: Record>(
    chunks: Vec<ChunkFile>,
    chunk_files: &mut ChunkFileFactory,
    cancel_token: &CancellationToken,
) -> Result<Vec<ChunkFile>, SortError> {
    let mut merged = Vec::with_capacity((chunks.len() + 1) / 2);
    let mut pending = chunks.into_iter();

    while let Some(chunk_a) = pending.next() {
        let chunk_b = match pending.next() {
            Some(chunk_b) => chunk_b,
            None => {
                merged.push(chunk_a);
                break;
            }
        };

        let out_chunk = chunk_files.create()?;
        {
            let mut reader_a = chunk_a.reader::<R>()?;
            let mut reader_b = chunk_b.reader::<R>()?;
            let mut writer = out_chunk.writer()?;
            merge_streams(&mut reader_a, &mut reader_b, &mut writer, cancel_token)?;
            writer.close()?;
        }
        merged.push(out_chunk);
    }

    return Ok(merged);
}
