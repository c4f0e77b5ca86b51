//! Streaming artifact body
//!
//! Pulls chunks from an [`ArtifactReader`] until the announced length has
//! been produced. The reader is released exactly once, whether the body
//! ends, fails or is dropped by the transport mid-stream.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use hyper::body::{Body, Bytes, Frame, SizeHint};
use tokio::io::{AsyncRead, ReadBuf};

use crate::fs::ArtifactReader;
use crate::logger;

const CHUNK_SIZE: usize = 64 * 1024;

pub struct ArtifactBody {
    reader: Option<ArtifactReader>,
    remaining: u64,
    buf: Box<[u8]>,
}

impl ArtifactBody {
    /// Stream exactly `len` bytes from `reader`
    pub fn new(reader: ArtifactReader, len: u64) -> Self {
        let chunk = usize::try_from(len).map_or(CHUNK_SIZE, |len| len.clamp(1, CHUNK_SIZE));
        Self {
            reader: (len > 0).then_some(reader),
            remaining: len,
            buf: vec![0; chunk].into_boxed_slice(),
        }
    }

    fn release(&mut self) {
        self.reader = None;
    }
}

impl Body for ArtifactBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let Some(reader) = this.reader.as_mut() else {
            return Poll::Ready(None);
        };

        let limit = usize::try_from(this.remaining).map_or(this.buf.len(), |r| r.min(this.buf.len()));
        let mut read_buf = ReadBuf::new(&mut this.buf[..limit]);

        match reader.as_mut().poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(err)) => {
                this.release();
                logger::log_stream_error(&err);
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(Ok(())) => {
                let filled = read_buf.filled();
                if filled.is_empty() {
                    this.release();
                    let err = io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("artifact ended {} bytes early", this.remaining),
                    );
                    logger::log_stream_error(&err);
                    return Poll::Ready(Some(Err(err)));
                }

                let chunk = Bytes::copy_from_slice(filled);
                this.remaining -= chunk.len() as u64;
                if this.remaining == 0 {
                    this.release();
                }
                Poll::Ready(Some(Ok(Frame::data(chunk))))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.reader.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(if self.reader.is_some() { self.remaining } else { 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Reader that records when it is dropped
    struct Tracked {
        inner: io::Cursor<Vec<u8>>,
        dropped: Arc<AtomicBool>,
        fail: bool,
    }

    impl AsyncRead for Tracked {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.fail {
                return Poll::Ready(Err(io::Error::other("disk on fire")));
            }
            Pin::new(&mut self.inner).poll_read(cx, buf)
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    fn tracked(data: &[u8], fail: bool) -> (ArtifactReader, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = Tracked {
            inner: io::Cursor::new(data.to_vec()),
            dropped: Arc::clone(&dropped),
            fail,
        };
        (Box::pin(reader), dropped)
    }

    #[tokio::test]
    async fn test_streams_exact_length() {
        let (reader, dropped) = tracked(b"hello world", false);
        let body = ArtifactBody::new(reader, 11);
        assert_eq!(body.size_hint().exact(), Some(11));

        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"hello world");
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_large_body_in_chunks() {
        let data = vec![7u8; CHUNK_SIZE * 2 + 10];
        let (reader, _) = tracked(&data, false);
        let bytes = ArtifactBody::new(reader, data.len() as u64)
            .collect()
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(bytes.len(), data.len());
    }

    #[tokio::test]
    async fn test_empty_body() {
        let (reader, dropped) = tracked(b"", false);
        let body = ArtifactBody::new(reader, 0);
        assert!(body.is_end_stream());
        assert!(dropped.load(Ordering::SeqCst));
        assert!(body.collect().await.unwrap().to_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_read_error_releases_reader() {
        let (reader, dropped) = tracked(b"data", true);
        let result = ArtifactBody::new(reader, 4).collect().await;
        assert!(result.is_err());
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_short_read_is_an_error() {
        let (reader, dropped) = tracked(b"abc", false);
        let err = ArtifactBody::new(reader, 10).collect().await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_drop_mid_stream_releases_once() {
        let data = vec![1u8; CHUNK_SIZE * 2];
        let (reader, dropped) = tracked(&data, false);
        let mut body = ArtifactBody::new(reader, data.len() as u64);

        let first = body.frame().await.unwrap().unwrap();
        assert_eq!(first.into_data().unwrap().len(), CHUNK_SIZE);
        assert!(!dropped.load(Ordering::SeqCst));

        drop(body);
        assert!(dropped.load(Ordering::SeqCst));
    }
}
