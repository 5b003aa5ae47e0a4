#![cfg(feature = "tokio")]

use std::{pin::Pin, task::Poll};

use assert_matches::assert_matches;
use brotli_block::{AsyncBlockWriter, BlockPosition, BlockStreamError, WindowBits};
use easy_hex::Hex;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tokio::io::{AsyncWrite, AsyncWriteExt as _};

mod test_utils;

proptest! {
    #[test]
    fn test_async_writer_tokio_encode_then_decode(
        data in test_utils::arb_data(),
        position in test_utils::arb_position(),
        window_bits in test_utils::arb_window_bits(),
    ) {
        let encoded = tokio::runtime::Runtime::new().unwrap().block_on({
            let data = data.clone();
            async move {
                let mut encoded = vec![];
                let mut writer = AsyncBlockWriter::builder(&mut encoded)
                    .with_position(position)
                    .with_window_bits(window_bits)
                    .build()
                    .unwrap();
                writer.write_all(&data[..]).await.unwrap();
                writer.shutdown().await.unwrap();

                encoded
            }
        });

        let decoded = brotli_block::decompress_block(&encoded, position, window_bits).unwrap();
        assert_eq!(Hex(decoded), data);
    }

    #[test]
    fn test_async_writer_tokio_encode_with_flush_then_decode(
        (data, pos) in test_utils::arb_data_with_pos(),
        window_bits in test_utils::arb_window_bits(),
    ) {
        let encoded = tokio::runtime::Runtime::new().unwrap().block_on({
            let data = data.clone();
            async move {
                let (first, second) = data.split_at(pos);

                let mut encoded = vec![];
                let mut writer = AsyncBlockWriter::builder(&mut encoded)
                    .with_window_bits(window_bits)
                    .build()
                    .unwrap();
                writer.write_all(first).await.unwrap();
                writer.flush().await.unwrap();
                writer.write_all(second).await.unwrap();
                writer.shutdown().await.unwrap();

                encoded
            }
        });

        let mut decoded = vec![];
        brotli::BrotliDecompress(&mut &encoded[..], &mut decoded).unwrap();
        assert_eq!(Hex(decoded), data);
    }

    #[test]
    fn test_async_writer_tokio_blocks_concat_to_stream(
        chunks in test_utils::arb_chunks(),
        window_bits in test_utils::arb_window_bits(),
    ) {
        let positions = test_utils::positions(chunks.len());

        let encoded = tokio::runtime::Runtime::new().unwrap().block_on({
            let chunks = chunks.clone();
            async move {
                let mut encoded = vec![];
                for (chunk, position) in chunks.iter().zip(positions) {
                    let mut writer = AsyncBlockWriter::builder(&mut encoded)
                        .with_position(position)
                        .with_window_bits(window_bits)
                        .build()
                        .unwrap();
                    writer.write_all(chunk).await.unwrap();
                    writer.shutdown().await.unwrap();
                }

                encoded
            }
        });

        let decoded =
            brotli_block::decompress_block(&encoded, BlockPosition::Single, WindowBits::DEFAULT)
                .unwrap();
        assert_eq!(Hex(decoded), test_utils::concat(&chunks));
    }
}

#[tokio::test]
async fn test_async_writer_tokio_large_stream_with_flushes() {
    test_utils::init_tracing();

    let window_bits = WindowBits::new(24).unwrap();
    let data: Vec<u8> = (0..2 * 1024 * 1024u32)
        .map(|n| u8::try_from((n / 7) % 251).unwrap())
        .collect();

    let (tx, mut rx) = tokio::io::duplex(4096);

    let write = async {
        let mut writer = AsyncBlockWriter::builder(tx)
            .with_position(BlockPosition::First)
            .with_window_bits(window_bits)
            .build()
            .unwrap();

        for chunk in data.chunks(100_000) {
            writer.write_all(chunk).await.unwrap();
            writer.flush().await.unwrap();
        }
        writer.shutdown().await.unwrap();
    };
    let read = async {
        let mut encoded = vec![];
        tokio::io::AsyncReadExt::read_to_end(&mut rx, &mut encoded)
            .await
            .unwrap();
        encoded
    };
    let ((), encoded) = tokio::join!(write, read);

    let decoded =
        brotli_block::decompress_block(&encoded, BlockPosition::First, window_bits).unwrap();
    assert!(decoded == data, "large stream should round-trip");
}

#[tokio::test]
async fn test_async_writer_tokio_write_after_shutdown() {
    let mut encoded = vec![];

    let mut writer = AsyncBlockWriter::builder(&mut encoded).build().unwrap();
    writer.write_all(b"closed soon").await.unwrap();
    writer.shutdown().await.unwrap();

    let error = writer.write_all(b"too late").await.unwrap_err();
    assert_matches!(
        BlockStreamError::from_io(&error),
        Some(BlockStreamError::Closed)
    );

    let sink = writer.into_inner();
    let decoded =
        brotli_block::decompress_block(sink, BlockPosition::Single, WindowBits::DEFAULT).unwrap();
    assert_eq!(decoded, b"closed soon");
}

/// A sink that stays pending while `blocked` is set.
#[derive(Default)]
struct BlockingSink {
    data: Vec<u8>,
    blocked: bool,
}

impl AsyncWrite for BlockingSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        if this.blocked {
            return Poll::Pending;
        }

        this.data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> Poll<std::io::Result<()>> {
        if self.blocked {
            Poll::Pending
        } else {
            Poll::Ready(Ok(()))
        }
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.poll_flush(cx)
    }
}

#[test]
fn test_async_writer_tokio_rejects_concurrent_operations() {
    let mut cx = std::task::Context::from_waker(futures::task::noop_waker_ref());

    let mut writer = AsyncBlockWriter::builder(BlockingSink {
        data: vec![],
        blocked: true,
    })
    .build()
    .unwrap();

    // Buffered data can't reach the sink yet, so the flush stays pending
    let poll = Pin::new(&mut writer).poll_write(&mut cx, b"pending data");
    assert_matches!(poll, Poll::Ready(Ok(12)));
    assert!(Pin::new(&mut writer).poll_flush(&mut cx).is_pending());

    // Any other operation is rejected while the flush is outstanding
    let poll = Pin::new(&mut writer).poll_write(&mut cx, b"more");
    assert_matches!(
        poll,
        Poll::Ready(Err(error))
            if BlockStreamError::from_io(&error) == Some(BlockStreamError::OperationInProgress)
    );
    let poll = Pin::new(&mut writer).poll_shutdown(&mut cx);
    assert_matches!(
        poll,
        Poll::Ready(Err(error))
            if BlockStreamError::from_io(&error) == Some(BlockStreamError::OperationInProgress)
    );

    // Continuing the outstanding flush is allowed
    writer.get_mut().blocked = false;
    assert_matches!(Pin::new(&mut writer).poll_flush(&mut cx), Poll::Ready(Ok(())));

    assert_matches!(
        Pin::new(&mut writer).poll_write(&mut cx, b" and more"),
        Poll::Ready(Ok(9))
    );
    assert_matches!(Pin::new(&mut writer).poll_shutdown(&mut cx), Poll::Ready(Ok(())));

    let decoded = brotli_block::decompress_block(
        &writer.get_ref().data,
        BlockPosition::Single,
        WindowBits::DEFAULT,
    )
    .unwrap();
    assert_eq!(decoded, b"pending data and more");
}
