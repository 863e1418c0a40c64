//! # Frame Codec
//!
//! Splits the TCP byte stream into complete MU frames.
//!
//! ```text
//! C1/C3: [type][len:u8][...]       len counts the whole frame
//! C2/C4: [type][len:u16 BE][...]
//! ```
//!
//! The stream is expected unencrypted; C3/C4 bodies pass through untouched.

use bytes::{Buf, BytesMut};
use muclient_core::ClientError;
use muclient_protocol::HeaderType;
use tokio_util::codec::{Decoder, Encoder};

/// Length-prefixed MU frame delimiter
#[derive(Debug, Clone, Copy, Default)]
pub struct MuFrameCodec;

impl MuFrameCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for MuFrameCodec {
    type Item = BytesMut;
    type Error = ClientError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(&first) = src.first() else {
            return Ok(None);
        };
        let header = HeaderType::from_u8(first)
            .ok_or_else(|| ClientError::Protocol(format!("unknown frame header {:#04x}", first)))?;

        let header_size = header.header_size();
        if src.len() < header_size {
            return Ok(None);
        }

        let length = if header.has_long_length() {
            u16::from_be_bytes([src[1], src[2]]) as usize
        } else {
            src[1] as usize
        };
        if length <= header_size {
            return Err(ClientError::Protocol(format!(
                "frame length {} does not cover the {:?} header",
                length, header
            )));
        }

        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }
        Ok(Some(src.split_to(length)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => {
                tracing::debug!("Discarding {} trailing bytes at end of stream", src.len());
                src.advance(src.len());
                Ok(None)
            }
        }
    }
}

impl Encoder<BytesMut> for MuFrameCodec {
    type Error = ClientError;

    fn encode(&mut self, item: BytesMut, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_short_and_long_frames() {
        let mut codec = MuFrameCodec::new();
        let mut buf = BytesMut::from(&[0xC1, 0x04, 0x00, 0x01, 0xC2, 0x00, 0x05, 0xF4, 0x06][..]);

        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], &[0xC1, 0x04, 0x00, 0x01]);
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], &[0xC2, 0x00, 0x05, 0xF4, 0x06]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame_waits_for_more() {
        let mut codec = MuFrameCodec::new();
        let mut buf = BytesMut::from(&[0xC3, 0x06, 0x22][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 3);

        buf.extend_from_slice(&[0xFE, 0x00, 0x00]);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().len(), 6);

        // long header split across reads
        let mut buf = BytesMut::from(&[0xC2, 0x00][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_rejects_bad_headers() {
        let mut codec = MuFrameCodec::new();
        assert!(codec.decode(&mut BytesMut::from(&[0x00, 0x04, 0x00, 0x00][..])).is_err());
        assert!(codec.decode(&mut BytesMut::from(&[0xC1, 0x02, 0x00][..])).is_err());
        assert!(codec.decode(&mut BytesMut::from(&[0xC4, 0x00, 0x03, 0x00][..])).is_err());
    }

    #[test]
    fn test_encode_passes_frames_through() {
        let mut codec = MuFrameCodec::new();
        let mut dst = BytesMut::new();
        codec.encode(BytesMut::from(&[0xC1, 0x04, 0xF3, 0x00][..]), &mut dst).unwrap();
        assert_eq!(&dst[..], &[0xC1, 0x04, 0xF3, 0x00]);
    }
}
