use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Chunks(ChunksError),
    InvalidUtf8,
}

/// Reads the `data` payloads of server-sent events from a chunk stream.
///
/// Comment lines (`: keep-alive`) and fields other than `data` are
/// skipped. Multiple `data` lines in one event are joined with `\n`.
pub struct Sse {
    buf: String,
    // Bytes of a multi-byte character split across chunks.
    pending: Vec<u8>,
    chunks: Chunks,
    exhausted: bool,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: String::new(),
            pending: Vec::new(),
            chunks,
            exhausted: false,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Serve what is already buffered before reading more.
            if let Some(event) = self.take_event() {
                return Ok(Some(event));
            }
            if self.exhausted {
                return Ok(None);
            }

            match self.chunks.next_chunk().await.map_err(Error::Chunks)? {
                Some(bytes) => self.push_bytes(&bytes)?,
                None => {
                    self.exhausted = true;
                    if !self.pending.is_empty() {
                        return Err(Error::InvalidUtf8);
                    }
                }
            }
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.pending.extend_from_slice(bytes);
        let valid_up_to = match str::from_utf8(&self.pending) {
            Ok(s) => {
                self.buf.push_str(s);
                self.pending.clear();
                return Ok(());
            }
            Err(err) if err.error_len().is_some() => {
                return Err(Error::InvalidUtf8);
            }
            Err(err) => err.valid_up_to(),
        };
        let rest = self.pending.split_off(valid_up_to);
        // The prefix is known to be valid.
        let head = String::from_utf8_lossy(&self.pending).into_owned();
        self.buf.push_str(&head);
        self.pending = rest;
        Ok(())
    }

    fn take_event(&mut self) -> Option<String> {
        loop {
            if self.buf.contains('\r') {
                self.buf = self.buf.replace("\r\n", "\n");
            }
            let end = self.buf.find("\n\n")?;
            let block: String = self.buf.drain(..end + 2).collect();

            let mut data: Option<String> = None;
            for line in block.lines() {
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let (field, value) = match line.split_once(':') {
                    Some((field, value)) => {
                        (field, value.strip_prefix(' ').unwrap_or(value))
                    }
                    None => (line, ""),
                };
                if field != "data" {
                    continue;
                }
                match &mut data {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => data = Some(value.to_owned()),
                }
            }

            // Blocks made only of comments or other fields carry no event.
            if data.is_some() {
                return data;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_normal_events() {
        let chunks = Chunks::canned([
            b"data: {\"id\":1}\n\n".as_slice(),
            b"data: [DONE]\n\n".as_slice(),
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "{\"id\":1}");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "[DONE]");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_across_chunks() {
        let chunks = Chunks::canned([
            b"da".as_slice(),
            b"ta: hel".as_slice(),
            b"lo\n".as_slice(),
            b"\ndata: bye\n\n".as_slice(),
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_skips_comments_and_other_fields() {
        let chunks = Chunks::canned([
            b": keep-alive\n\n".as_slice(),
            b"event: message\r\nid: 7\r\ndata: first\r\ndata: second\r\n\r\n"
                .as_slice(),
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(
            sse.next_event().await.unwrap().unwrap(),
            "first\nsecond"
        );
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_multibyte_character_split() {
        // "é" is 0xC3 0xA9.
        let chunks = Chunks::canned([
            b"data: caf\xC3".as_slice(),
            b"\xA9\n\n".as_slice(),
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "café");
    }

    #[tokio::test]
    async fn test_incomplete_and_invalid_input() {
        let chunks = Chunks::canned([b"data: hello\n".as_slice()]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let chunks = Chunks::canned([b"data: \xFF\xFE\n\n".as_slice()]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidUtf8);
    }
}
