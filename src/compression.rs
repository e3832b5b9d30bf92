use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::dev_print;
use crate::errors::{Error, Result};
use crate::helpers::common::{ChunkBuffer, CHUNK_SIZE, WINDOW_BITS};

/// Compress a complete buffer, gzip-wrapped or as a raw DEFLATE stream.
///
/// The primitive is driven in fixed windows of [`CHUNK_SIZE`] bytes; the
/// output buffer only ever grows by whole chunks and is shrunk to the
/// produced length at the end. Partial output is never returned.
pub fn gzip(src: &[u8], raw_deflate: bool) -> Result<Vec<u8>> {
    let mut stream = match raw_deflate {
        true => Compress::new_with_window_bits(Compression::fast(), false, WINDOW_BITS),
        false => Compress::new_gzip(Compression::fast(), WINDOW_BITS),
    };

    let mut out = ChunkBuffer::new();
    let mut consumed = 0usize;

    loop {
        out.ensure_window()?;
        let before_in = stream.total_in();
        let before_out = stream.total_out();
        let status = stream
            .compress(
                &src[consumed..],
                &mut out.window()[..CHUNK_SIZE],
                FlushCompress::Finish,
            )
            .map_err(|e| Error::Codec(format!("deflate: {}", e)))?;
        consumed += (stream.total_in() - before_in) as usize;
        let produced = (stream.total_out() - before_out) as usize;
        out.advance(produced);

        match status {
            Status::StreamEnd => break,
            // A finishing stream only pauses when its window is full.
            _ if produced == CHUNK_SIZE => continue,
            _ => return Err(Error::Codec("deflate: stream stalled".to_owned())),
        }
    }

    dev_print!("gzip: {} -> {} bytes", src.len(), out.len());
    Ok(out.into_bytes())
}

/// Decompress a complete gzip or raw DEFLATE buffer.
pub fn gunzip(src: &[u8], raw_deflate: bool) -> Result<Vec<u8>> {
    let mut stream = match raw_deflate {
        true => Decompress::new_with_window_bits(false, WINDOW_BITS),
        false => Decompress::new_gzip(WINDOW_BITS),
    };

    let mut out = ChunkBuffer::new();
    let mut consumed = 0usize;

    loop {
        out.ensure_window()?;
        let before_in = stream.total_in();
        let before_out = stream.total_out();
        let status = stream
            .decompress(
                &src[consumed..],
                &mut out.window()[..CHUNK_SIZE],
                FlushDecompress::None,
            )
            .map_err(|e| match e.needs_dictionary() {
                Some(adler) => Error::DictionaryRequired(adler),
                None => Error::Codec(format!("inflate: {}", e)),
            })?;
        consumed += (stream.total_in() - before_in) as usize;
        let produced = (stream.total_out() - before_out) as usize;
        out.advance(produced);

        match status {
            Status::StreamEnd => break,
            // An unsaturated window means the stream has nothing more to
            // give for the input we have.
            _ if produced < CHUNK_SIZE => break,
            _ => continue,
        }
    }

    dev_print!("gunzip: {} -> {} bytes", src.len(), out.len());
    Ok(out.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn random_bytes(len: usize) -> Vec<u8> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(len as u64);
        (0..len).map(|_| rng.gen()).collect()
    }

    #[test]
    fn round_trip_gzip() {
        for len in [0, 1, 100, CHUNK_SIZE - 1, CHUNK_SIZE, CHUNK_SIZE + 1, 3 * CHUNK_SIZE + 7] {
            let data = random_bytes(len);
            let compressed = gzip(&data, false).unwrap();
            assert_eq!(gunzip(&compressed, false).unwrap(), data, "len {}", len);
        }
    }

    #[test]
    fn round_trip_raw_deflate() {
        for len in [0, 1, CHUNK_SIZE, 2 * CHUNK_SIZE + 1] {
            let data = random_bytes(len);
            let compressed = gzip(&data, true).unwrap();
            assert_eq!(gunzip(&compressed, true).unwrap(), data, "len {}", len);
        }
    }

    #[test]
    fn repetitive_input_shrinks() {
        let data = vec![b'a'; 4 * CHUNK_SIZE];
        let compressed = gzip(&data, false).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(gunzip(&compressed, false).unwrap(), data);
    }

    #[test]
    fn gzip_output_carries_the_magic_header() {
        let compressed = gzip(b"hello", false).unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);

        let raw = gzip(b"hello", true).unwrap();
        assert_ne!(&raw[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn corrupt_input_is_a_codec_error() {
        let garbage = [0x1f, 0x8b, 0xff, 0xff, 0x00, 0x12, 0x34];
        assert!(matches!(
            gunzip(&garbage, false),
            Err(Error::Codec(_))
        ));
    }

    #[test]
    fn truncated_gzip_yields_no_partial_success() {
        let compressed = gzip(&random_bytes(3 * CHUNK_SIZE), false).unwrap();
        // Cutting into the middle of the stream either errors or, at
        // worst, stops before the trailer; it must never pretend the
        // whole buffer round-tripped.
        let cut = &compressed[..compressed.len() / 2];
        match gunzip(cut, false) {
            Ok(out) => assert!(out.len() < 3 * CHUNK_SIZE),
            Err(Error::Codec(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
