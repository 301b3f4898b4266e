use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

use crate::ProbeError;

/// Bytes discarded from a response body the caller does not keep.
pub(crate) const DRAIN_WINDOW: usize = 4096;

/// Response body stream that remembers whether end-of-data was reached.
pub(crate) struct ResponseBody<S> {
    stream: S,
    exhausted: bool,
}

impl<S, E> ResponseBody<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<ProbeError>,
{
    pub(crate) fn new(stream: S) -> Self {
        Self {
            stream,
            exhausted: false,
        }
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ProbeError> {
        if self.exhausted {
            return Ok(None);
        }
        match self.stream.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(err)) => Err(err.into()),
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    /// Reads the whole body, failing once more than `limit` bytes arrive.
    pub(crate) async fn read_all(&mut self, limit: usize) -> Result<Bytes, ProbeError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next_chunk().await? {
            if buf.len() + chunk.len() > limit {
                return Err(ProbeError::BodyTooLarge { limit });
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }

    /// Reads at most `limit` bytes, truncating instead of failing.
    ///
    /// The rest of a chunk that crosses `limit` is dropped with it.
    pub(crate) async fn read_prefix(&mut self, limit: usize) -> Result<Bytes, ProbeError> {
        let mut buf = BytesMut::new();
        while buf.len() < limit {
            match self.next_chunk().await? {
                Some(chunk) => {
                    let take = chunk.len().min(limit - buf.len());
                    buf.extend_from_slice(&chunk[..take]);
                }
                None => break,
            }
        }
        Ok(buf.freeze())
    }

    /// Discards up to `window` bytes and returns how many were counted.
    ///
    /// Chunks are pulled whole, so the chunk that crosses `window` is read
    /// off the wire in full; only its first bytes count toward the window.
    pub(crate) async fn drain(&mut self, window: usize) -> Result<usize, ProbeError> {
        let mut discarded = 0;
        while discarded < window {
            match self.next_chunk().await? {
                Some(chunk) => discarded += chunk.len().min(window - discarded),
                None => break,
            }
        }
        Ok(discarded)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use futures::stream;

    use super::*;

    pub(crate) type ChunkStream = stream::Iter<std::vec::IntoIter<Result<Bytes, ProbeError>>>;

    pub(crate) fn chunks(parts: &[&'static [u8]]) -> ResponseBody<ChunkStream> {
        let items: Vec<Result<Bytes, ProbeError>> =
            parts.iter().map(|part| Ok(Bytes::from_static(part))).collect();
        ResponseBody::new(stream::iter(items))
    }

    #[tokio::test]
    async fn read_all_concatenates_chunks() {
        let mut body = chunks(&[b"hello ", b"world"]);
        assert_eq!(body.read_all(64).await.unwrap(), Bytes::from_static(b"hello world"));
        assert!(body.is_exhausted());
    }

    #[tokio::test]
    async fn read_all_enforces_limit() {
        let mut body = chunks(&[b"0123456789", b"0123456789"]);
        let err = body.read_all(15).await.unwrap_err();
        assert!(matches!(err, ProbeError::BodyTooLarge { limit: 15 }));
    }

    #[tokio::test]
    async fn drain_stops_at_window() {
        static BIG: [u8; 3000] = [b'x'; 3000];
        let mut body = chunks(&[&BIG, &BIG, &BIG, &BIG]);

        let discarded = body.drain(DRAIN_WINDOW).await.unwrap();
        assert_eq!(discarded, DRAIN_WINDOW);
        assert!(!body.is_exhausted());

        // two chunks were pulled, two are left
        assert_eq!(body.read_all(usize::MAX).await.unwrap().len(), 6000);
    }

    #[tokio::test]
    async fn drain_of_exact_window_pulls_no_extra_chunk() {
        static HALF: [u8; 2048] = [b'x'; 2048];
        let mut body = chunks(&[&HALF, &HALF, b"tail"]);

        assert_eq!(body.drain(DRAIN_WINDOW).await.unwrap(), DRAIN_WINDOW);
        assert_eq!(body.read_all(64).await.unwrap(), Bytes::from_static(b"tail"));
    }

    #[tokio::test]
    async fn read_prefix_truncates_without_error() {
        let mut body = chunks(&[b"repository ", b"name not known"]);
        assert_eq!(body.read_prefix(4).await.unwrap(), Bytes::from_static(b"repo"));
        assert!(!body.is_exhausted());
    }

    #[tokio::test]
    async fn read_prefix_returns_short_body_whole() {
        let mut body = chunks(&[b"denied"]);
        assert_eq!(body.read_prefix(64).await.unwrap(), Bytes::from_static(b"denied"));
        assert!(body.is_exhausted());
    }

    #[tokio::test]
    async fn drain_reaches_end_of_small_body() {
        let mut body = chunks(&[b"abc"]);
        assert_eq!(body.drain(DRAIN_WINDOW).await.unwrap(), 3);
        assert!(body.is_exhausted());
    }

    #[tokio::test]
    async fn stream_error_propagates() {
        let items: Vec<Result<Bytes, ProbeError>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(ProbeError::Decode("broken stream".to_owned())),
        ];
        let mut body = ResponseBody::new(stream::iter(items));
        assert!(matches!(body.read_all(64).await, Err(ProbeError::Decode(_))));
    }
}
