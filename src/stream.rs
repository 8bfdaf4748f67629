mod accumulator;
mod analysis;
mod chat;
mod frame;

use std::io::{self, ErrorKind, Read};

use crate::api::RequestError;

pub use accumulator::TokenAccumulator;
pub use analysis::{AnalysisEvent, AnalysisSession, Stage, StreamStatus};
pub use chat::{ChatMessage, ChatRejected, ChatSession, Role, FALLBACK_REPLY};
pub use frame::FrameDecoder;

const CHUNK_SIZE: usize = 8 * 1024;

/// Whether a consumer wants more input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The producer had nothing more to send.
    Eof,
    /// The consumer stopped reading.
    Closed,
}

/// Opens the two streaming endpoints.
pub trait StreamSource {
    fn open_analysis(&self) -> Result<Box<dyn Read + Send>, RequestError>;
    fn open_chat(&self, message: &str) -> Result<Box<dyn Read + Send>, RequestError>;
}

/// Pulls one chunk at a time, handing each to `on_chunk` before reading the next.
pub fn pump<R: Read>(
    mut reader: R,
    mut on_chunk: impl FnMut(&[u8]) -> Flow,
) -> io::Result<StreamEnd> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(StreamEnd::Eof),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        if on_chunk(&buf[..n]) == Flow::Close {
            return Ok(StreamEnd::Closed);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{
        collections::VecDeque,
        io::{self, Read},
    };

    /// Hands out one scripted chunk per `read`, optionally failing once drained.
    pub struct ChunkedReader {
        chunks: VecDeque<Vec<u8>>,
        fail_at_end: bool,
    }

    impl ChunkedReader {
        pub fn new<I, C>(chunks: I) -> Self
        where
            I: IntoIterator<Item = C>,
            C: AsRef<[u8]>,
        {
            Self {
                chunks: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
                fail_at_end: false,
            }
        }

        pub fn failing<I, C>(chunks: I) -> Self
        where
            I: IntoIterator<Item = C>,
            C: AsRef<[u8]>,
        {
            Self {
                fail_at_end: true,
                ..Self::new(chunks)
            }
        }
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None if self.fail_at_end => Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )),
                None => Ok(0),
            }
        }
    }

    pub fn frame(json: &str) -> String {
        format!("data: {}\n\n", json)
    }
}
