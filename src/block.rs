use std::io::{Read as _, Write as _};

use crate::{BlockPosition, BlockReader, BlockWriter, CompressionOptions, WindowBits};

/// Compress all of `data` as a single stream using `options` as-is.
///
/// With default options this produces a standard Brotli stream. Setting
/// [`CompressionOptions::with_bare`] produces a segment without a header or
/// terminator instead; use [`CompressionOptions::bare_segment`] to get one
/// that can be concatenated with other bare segments.
pub fn compress(data: &[u8], options: CompressionOptions) -> std::io::Result<Vec<u8>> {
    let mut compressed = vec![];

    let mut writer = BlockWriter::builder(&mut compressed)
        .with_options(options)
        .build()?;
    writer.write_all(data)?;
    writer.finish()?;
    drop(writer);

    Ok(compressed)
}

/// Compress all of `data` as a block at `position`.
///
/// Concatenating the blocks for `First`, `Middle`..., `Last` (all
/// compressed with the same `window_bits`) gives a standard Brotli stream
/// of the concatenated data.
pub fn compress_block(
    data: &[u8],
    position: BlockPosition,
    window_bits: WindowBits,
) -> std::io::Result<Vec<u8>> {
    let mut compressed = vec![];

    let mut writer = BlockWriter::builder(&mut compressed)
        .with_position(position)
        .with_window_bits(window_bits)
        .build()?;
    writer.write_all(data)?;
    writer.finish()?;
    drop(writer);

    Ok(compressed)
}

/// Decompress a whole block compressed at `position`. `window_bits` must
/// match the value used to compress a `Middle` or `Last` block, and is
/// ignored for other positions.
pub fn decompress_block(
    data: &[u8],
    position: BlockPosition,
    window_bits: WindowBits,
) -> std::io::Result<Vec<u8>> {
    let reader = BlockReader::builder_buffered(data)
        .with_position(position)
        .with_window_bits(window_bits)
        .build();

    read_block(reader)
}

/// Like [`decompress_block`], but reading the block from `reader`.
pub fn decompress_block_from<R>(
    reader: R,
    position: BlockPosition,
    window_bits: WindowBits,
) -> std::io::Result<Vec<u8>>
where
    R: std::io::Read,
{
    let reader = BlockReader::builder(reader)
        .with_position(position)
        .with_window_bits(window_bits)
        .build();

    read_block(reader)
}

fn read_block<R>(mut reader: BlockReader<R>) -> std::io::Result<Vec<u8>>
where
    R: std::io::BufRead,
{
    let mut decompressed = vec![];
    reader.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}
