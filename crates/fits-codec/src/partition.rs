//! Splitting an output buffer into disjoint runs of lines for parallel work.
//!
//! A "line" is one run along axis 0 of the output, so lines are ordered by
//! the slower axes and a contiguous range of lines is a contiguous range of
//! the buffer. Workers own their chunk exclusively; nothing is shared on the
//! data path except the progress counter.

use rayon::prelude::*;
use tracing::debug;

use crate::progress::ProgressTracker;

/// Lines handed to the kernel between progress updates.
const BATCH_TARGET: usize = 64;

/// Run `kernel(first_line, lines)` over every line of `out`.
///
/// `out.len()` must be a multiple of `line_len`. With `degree <= 1` the lines
/// are walked on the calling thread; otherwise they are split into `degree`
/// contiguous chunks processed on the rayon pool. Within a chunk the kernel
/// sees batches of whole lines so that progress advances steadily.
pub(crate) fn for_each_line_batch<T, F>(
    out: &mut [T],
    line_len: usize,
    degree: usize,
    tracker: &ProgressTracker<'_>,
    kernel: F,
) where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    if out.is_empty() || line_len == 0 {
        return;
    }
    let line_count = out.len() / line_len;
    let batch_lines = batch_size(line_count);

    if degree <= 1 || line_count < 2 {
        walk(out, 0, line_len, batch_lines, tracker, &kernel);
        return;
    }

    let lines_per_chunk = line_count.div_ceil(degree);
    debug!(
        line_count,
        line_len, degree, lines_per_chunk, "partitioning lines across workers"
    );
    out.par_chunks_mut(lines_per_chunk * line_len)
        .enumerate()
        .for_each(|(chunk_index, chunk)| {
            walk(
                chunk,
                chunk_index * lines_per_chunk,
                line_len,
                batch_lines,
                tracker,
                &kernel,
            );
        });
}

fn walk<T, F>(
    chunk: &mut [T],
    first_line: usize,
    line_len: usize,
    batch_lines: usize,
    tracker: &ProgressTracker<'_>,
    kernel: &F,
) where
    F: Fn(usize, &mut [T]),
{
    for (batch_index, batch) in chunk.chunks_mut(batch_lines * line_len).enumerate() {
        kernel(first_line + batch_index * batch_lines, batch);
        tracker.advance(batch.len() / line_len);
    }
}

fn batch_size(line_count: usize) -> usize {
    (line_count / 100).clamp(1, BATCH_TARGET)
}
