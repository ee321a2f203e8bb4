//! Fixed 2880-byte block geometry and block-level stream helpers.

use std::io::{self, Read, Write};

/// FITS block size in bytes (each logical record is one block).
pub const BLOCK_SIZE: usize = 2880;

/// FITS card (keyword record) size in bytes.
pub const CARD_SIZE: usize = 80;

/// Number of cards that fit in a single block.
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Padding byte used for header blocks (ASCII space).
pub const HEADER_PAD_BYTE: u8 = 0x20;

/// Padding byte used for data blocks (zero).
pub const DATA_PAD_BYTE: u8 = 0x00;

/// Returns the number of FITS blocks required to hold `num_bytes` bytes.
///
/// 0 bytes requires 0 blocks, 1 byte requires 1 block, 2880 bytes requires
/// 1 block, 2881 bytes requires 2 blocks.
pub const fn blocks_needed(num_bytes: u64) -> u64 {
    num_bytes.div_ceil(BLOCK_SIZE as u64)
}

/// Returns `num_bytes` rounded up to a whole number of blocks.
pub const fn padded_byte_len(num_bytes: u64) -> u64 {
    blocks_needed(num_bytes) * BLOCK_SIZE as u64
}

/// Number of filler bytes that follow `num_bytes` of content in its last block.
pub const fn padding_len(num_bytes: u64) -> u64 {
    padded_byte_len(num_bytes) - num_bytes
}

/// Outcome of pulling one block from a sequential source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockFill {
    /// The whole block was read.
    Full,
    /// The source was already exhausted; nothing was read.
    Exhausted,
    /// The source ended part-way through the block.
    Truncated(usize),
}

/// Read exactly one block from `src` into `dest`, reporting how far it got.
///
/// Unlike `read_exact`, a clean end-of-stream at the block boundary is
/// distinguished from a truncated block.
pub(crate) fn fill_block<R: Read + ?Sized>(
    src: &mut R,
    dest: &mut [u8; BLOCK_SIZE],
) -> io::Result<BlockFill> {
    let mut filled = 0;
    while filled < BLOCK_SIZE {
        match src.read(&mut dest[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(match filled {
        0 => BlockFill::Exhausted,
        BLOCK_SIZE => BlockFill::Full,
        n => BlockFill::Truncated(n),
    })
}

/// Consume and discard `count` bytes from a sequential source.
///
/// Returns the number of bytes actually skipped, which is short only when
/// the source ends first.
pub(crate) fn skip_bytes<R: Read + ?Sized>(src: &mut R, count: u64) -> io::Result<u64> {
    io::copy(&mut src.take(count), &mut io::sink())
}

/// Write `count` copies of `pad_byte` to `sink`.
pub(crate) fn write_padding<W: Write + ?Sized>(
    sink: &mut W,
    count: u64,
    pad_byte: u8,
) -> io::Result<()> {
    let chunk = [pad_byte; BLOCK_SIZE];
    let mut remaining = count;
    while remaining > 0 {
        let n = remaining.min(BLOCK_SIZE as u64) as usize;
        sink.write_all(&chunk[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}
