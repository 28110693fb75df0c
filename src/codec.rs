use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// Frames arbitrary-charset bytes into UTF-8 chunks.
///
/// Unmappable sequences become U+FFFD; the first occurrence is logged.
pub struct Utf8Transcoder {
    decoder: encoding_rs::Decoder,
    reported: bool,
}

impl Utf8Transcoder {
    pub fn new(encoding: &'static encoding_rs::Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder(),
            reported: false,
        }
    }

    fn transcode(&mut self, src: &[u8], last: bool) -> (usize, BytesMut) {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(src.len())
            .unwrap_or(src.len() * 3 + 16);
        let mut out = vec![0; capacity];
        let (_result, read, written, had_errors) = self.decoder.decode_to_utf8(src, &mut out, last);
        if had_errors && !self.reported {
            self.reported = true;
            tracing::warn!(encoding = self.decoder.encoding().name(), "input has unmappable bytes");
        }
        (read, BytesMut::from(&out[..written]))
    }
}

impl Decoder for Utf8Transcoder {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let (read, chunk) = self.transcode(&src[..], false);
        if read == 0 && chunk.is_empty() {
            return Ok(None);
        }
        src.advance(read);
        Ok(Some(chunk))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if buf.is_empty() {
            return Ok(None);
        }
        let (_read, chunk) = self.transcode(&buf[..], true);
        buf.clear();
        Ok((!chunk.is_empty()).then_some(chunk))
    }
}
