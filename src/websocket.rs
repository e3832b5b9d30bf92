use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::dev_print;
use crate::errors::{Error, Result};
use crate::helpers::common::{ChunkBuffer, CHUNK_SIZE, WINDOW_BITS};

/// Framing of the per-connection compressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeflateMode {
    /// Raw DEFLATE frames, as negotiated by permessage-deflate.
    Raw,
    /// zlib-wrapped frames.
    Zlib,
}

/// The four bytes a sync flush appends: an empty stored block. The sender
/// strips them from every message, the receiver feeds them back in before
/// inflating so the stream lands on a block boundary again.
const SYNC_FLUSH_TRAILER: [u8; 4] = [0x00, 0x00, 0xff, 0xff];

fn new_compress(mode: DeflateMode) -> Compress {
    match mode {
        DeflateMode::Raw => Compress::new_with_window_bits(Compression::fast(), false, WINDOW_BITS),
        DeflateMode::Zlib => Compress::new(Compression::fast(), true),
    }
}

fn new_decompress(mode: DeflateMode) -> Decompress {
    match mode {
        DeflateMode::Raw => Decompress::new_with_window_bits(false, WINDOW_BITS),
        DeflateMode::Zlib => Decompress::new(true),
    }
}

/// Outgoing side of a connection's per-message compression.
///
/// One deflater lives as long as its connection. With context takeover
/// enabled the primitive's sliding window survives from one message to
/// the next, so later messages may reference bytes of earlier ones;
/// without it the stream is rebuilt after every message and each message
/// compresses from a clean slate.
pub struct MessageDeflater {
    stream: Compress,
    mode: DeflateMode,
    context_takeover: bool,
}

impl MessageDeflater {
    pub fn new(mode: DeflateMode, context_takeover: bool) -> MessageDeflater {
        MessageDeflater {
            stream: new_compress(mode),
            mode,
            context_takeover,
        }
    }

    /// Prime the stream with a negotiated dictionary. Only meaningful
    /// before the first message of the connection.
    pub fn install_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        self.stream
            .set_dictionary(dictionary)
            .map(|_| ())
            .map_err(|e| Error::Codec(format!("deflate set_dictionary: {}", e)))
    }

    /// Compress one whole message into the bytes that go on the wire.
    pub fn compress_message(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        let result = self.compress_inner(message);
        if !self.context_takeover || result.is_err() {
            self.stream = new_compress(self.mode);
        }
        result
    }

    fn compress_inner(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        let mut out = ChunkBuffer::new();
        let mut pos = 0usize;

        loop {
            let end = usize::min(pos + CHUNK_SIZE, message.len());
            let last = end == message.len();
            // Everything before the final chunk may still depend on data
            // to come; only the final chunk forces the output out.
            let flush = match last {
                true => FlushCompress::Sync,
                false => FlushCompress::None,
            };

            loop {
                out.ensure_window()?;
                let before_in = self.stream.total_in();
                let before_out = self.stream.total_out();
                self.stream
                    .compress(&message[pos..end], &mut out.window()[..CHUNK_SIZE], flush)
                    .map_err(|e| Error::Codec(format!("deflate: {}", e)))?;
                let consumed = (self.stream.total_in() - before_in) as usize;
                let produced = (self.stream.total_out() - before_out) as usize;
                pos += consumed;
                out.advance(produced);

                if pos >= end {
                    if produced < CHUNK_SIZE {
                        break;
                    }
                    // Saturated window: drain the pending flush output.
                    continue;
                }
                if consumed == 0 && produced == 0 {
                    return Err(Error::Codec("deflate: no progress".to_owned()));
                }
            }

            if last {
                break;
            }
        }

        if out.is_empty() {
            // A second sync flush with nothing buffered emits no bytes at
            // all. The shortest equivalent message is the lone header
            // byte of the empty stored block the flush would have opened.
            return Ok(vec![0x00]);
        }
        if out.len() < SYNC_FLUSH_TRAILER.len() {
            return Err(Error::Codec(
                "deflate: sync flush shorter than its trailer".to_owned(),
            ));
        }
        out.truncate_tail(SYNC_FLUSH_TRAILER.len());
        dev_print!("compress_message: {} -> {} bytes", message.len(), out.len());
        Ok(out.into_bytes())
    }
}

/// Incoming side of a connection's per-message compression.
pub struct MessageInflater {
    stream: Decompress,
    mode: DeflateMode,
    context_takeover: bool,
}

impl MessageInflater {
    pub fn new(mode: DeflateMode, context_takeover: bool) -> MessageInflater {
        MessageInflater {
            stream: new_decompress(mode),
            mode,
            context_takeover,
        }
    }

    /// Prime the sliding window with a dictionary the peer compressed
    /// against before this stream existed. Raw streams accept it up
    /// front; a zlib stream announces the need itself and the connection
    /// is failed instead (see [`Error::DictionaryRequired`]).
    pub fn install_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        self.stream
            .set_dictionary(dictionary)
            .map(|_| ())
            .map_err(|e| Error::Codec(format!("inflate set_dictionary: {}", e)))
    }

    /// Decompress one whole message received from the wire.
    pub fn decompress_message(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        let result = self.inflate_inner(payload);
        if !self.context_takeover || result.is_err() {
            self.stream = new_decompress(self.mode);
        }
        result
    }

    fn inflate_inner(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        let mut out = ChunkBuffer::new();
        self.feed(payload, &mut out)?;
        // Restore the trailer the sender stripped; this closes the open
        // stored block so the stream is back on a block boundary for the
        // next message of the connection.
        self.feed(&SYNC_FLUSH_TRAILER, &mut out)?;
        dev_print!("decompress_message: {} -> {} bytes", payload.len(), out.len());
        Ok(out.into_bytes())
    }

    fn feed(&mut self, input: &[u8], out: &mut ChunkBuffer) -> Result<()> {
        let mut pos = 0usize;

        loop {
            let end = usize::min(pos + CHUNK_SIZE, input.len());

            loop {
                out.ensure_window()?;
                let before_in = self.stream.total_in();
                let before_out = self.stream.total_out();
                let status = self
                    .stream
                    .decompress(
                        &input[pos..end],
                        &mut out.window()[..CHUNK_SIZE],
                        FlushDecompress::None,
                    )
                    .map_err(|e| match e.needs_dictionary() {
                        Some(adler) => Error::DictionaryRequired(adler),
                        None => Error::Codec(format!("inflate: {}", e)),
                    })?;
                let consumed = (self.stream.total_in() - before_in) as usize;
                let produced = (self.stream.total_out() - before_out) as usize;
                pos += consumed;
                out.advance(produced);

                if status == Status::StreamEnd {
                    return Ok(());
                }
                if pos >= end {
                    if produced < CHUNK_SIZE {
                        break;
                    }
                    continue;
                }
                if consumed == 0 && produced == 0 {
                    return Err(Error::Codec("inflate: no progress".to_owned()));
                }
            }

            if end == input.len() {
                return Ok(());
            }
        }
    }
}
