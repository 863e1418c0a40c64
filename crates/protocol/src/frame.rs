//! # Frame Classifier
//!
//! Reads the header of a complete frame and extracts the packet key
//! (code plus optional sub-code) without interpreting the body.
//!
//! ## Header Types
//!
//! ```text
//! C1/C3: [type][len:u8][code][sub?]...
//! C2/C4: [type][len:u16 BE][code][sub?]...
//! ```
//!
//! C3/C4 frames are the encrypted variants on the wire. By the time a frame
//! reaches the classifier it has already been decrypted by the transport.

use crate::error::ClassifyError;
use crate::packets::{connect_server_has_sub_code, game_server_has_sub_code};

/// Which server the client is talking to; decides header rules and registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingMode {
    ConnectServer,
    GameServer,
}

/// Frame header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HeaderType {
    C1 = 0xC1,
    C2 = 0xC2,
    C3 = 0xC3,
    C4 = 0xC4,
}

impl HeaderType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0xC1 => Some(Self::C1),
            0xC2 => Some(Self::C2),
            0xC3 => Some(Self::C3),
            0xC4 => Some(Self::C4),
            _ => None,
        }
    }

    /// Bytes before the code: type byte plus the length field
    pub fn header_size(self) -> usize {
        match self {
            Self::C1 | Self::C3 => 2,
            Self::C2 | Self::C4 => 3,
        }
    }

    pub fn has_long_length(self) -> bool {
        matches!(self, Self::C2 | Self::C4)
    }
}

/// A classified frame, borrowing the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub header_type: HeaderType,
    pub code: u8,
    pub sub_code: Option<u8>,
    /// The complete frame, header included; decoder offsets index into this
    pub packet: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Bytes following the code and sub-code
    pub fn payload(&self) -> &'a [u8] {
        let start = self.header_type.header_size() + 1 + usize::from(self.sub_code.is_some());
        self.packet.get(start..).unwrap_or(&[])
    }
}

/// Classify `buffer` under the header rules of `mode`
///
/// # Game Server
/// - C1/C3: at least 3 bytes, code at 2, sub-code at 3
/// - C2/C4: at least 4 bytes, code at 3, sub-code at 4
///
/// # Connect Server
/// - at least 3 bytes; only C1 (code at 2) and C2 (code at 3)
///
/// A sub-code is only read for codes in the mode's sub-code table and only
/// when the frame actually contains that byte.
pub fn classify(buffer: &[u8], mode: RoutingMode) -> Result<Frame<'_>, ClassifyError> {
    const MIN_SHORT_FRAME: usize = 3;

    let Some(&first) = buffer.first() else {
        return Err(ClassifyError::FrameTooShort {
            length: 0,
            minimum: MIN_SHORT_FRAME,
        });
    };

    let header_type = match (mode, HeaderType::from_u8(first)) {
        (RoutingMode::GameServer, Some(header)) => header,
        (RoutingMode::ConnectServer, Some(header @ (HeaderType::C1 | HeaderType::C2))) => header,
        _ => return Err(ClassifyError::UnknownHeaderType(first)),
    };

    if buffer.len() < MIN_SHORT_FRAME {
        return Err(ClassifyError::FrameTooShort {
            length: buffer.len(),
            minimum: MIN_SHORT_FRAME,
        });
    }

    let code_offset = header_type.header_size();
    let minimum = code_offset + 1;
    if buffer.len() < minimum {
        return Err(ClassifyError::FrameTooShort {
            length: buffer.len(),
            minimum,
        });
    }

    let code = buffer[code_offset];
    let has_sub_code = match mode {
        RoutingMode::GameServer => game_server_has_sub_code(code),
        RoutingMode::ConnectServer => connect_server_has_sub_code(code),
    };
    let sub_code = if has_sub_code {
        buffer.get(code_offset + 1).copied()
    } else {
        None
    };

    Ok(Frame {
        header_type,
        code,
        sub_code,
        packet: buffer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_server_short_header() {
        let frame = classify(&[0xC1, 0x08, 0x15, 0x00, 0x10, 0x20, 0x30, 0x00], RoutingMode::GameServer).unwrap();
        assert_eq!(frame.header_type, HeaderType::C1);
        assert_eq!(frame.code, 0x15);
        assert_eq!(frame.sub_code, None);
        assert_eq!(frame.payload(), &[0x00, 0x10, 0x20, 0x30, 0x00]);
    }

    #[test]
    fn test_game_server_sub_code() {
        let frame = classify(&[0xC3, 0x05, 0xF3, 0x03, 0x99], RoutingMode::GameServer).unwrap();
        assert_eq!(frame.code, 0xF3);
        assert_eq!(frame.sub_code, Some(0x03));
        assert_eq!(frame.payload(), &[0x99]);
    }

    #[test]
    fn test_game_server_long_header() {
        let frame = classify(&[0xC2, 0x00, 0x06, 0x12, 0x01, 0xFF], RoutingMode::GameServer).unwrap();
        assert_eq!(frame.code, 0x12);
        assert_eq!(frame.sub_code, None);

        let frame = classify(&[0xC4, 0x00, 0x05, 0xF3, 0x11], RoutingMode::GameServer).unwrap();
        assert_eq!(frame.code, 0xF3);
        assert_eq!(frame.sub_code, Some(0x11));
    }

    #[test]
    fn test_sub_code_missing_from_short_frame() {
        let frame = classify(&[0xC1, 0x03, 0xF1], RoutingMode::GameServer).unwrap();
        assert_eq!(frame.code, 0xF1);
        assert_eq!(frame.sub_code, None);
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            classify(&[], RoutingMode::GameServer),
            Err(ClassifyError::FrameTooShort { length: 0, minimum: 3 })
        );
        assert_eq!(
            classify(&[0xC1, 0x02], RoutingMode::GameServer),
            Err(ClassifyError::FrameTooShort { length: 2, minimum: 3 })
        );
        assert_eq!(
            classify(&[0xC2, 0x00, 0x03], RoutingMode::GameServer),
            Err(ClassifyError::FrameTooShort { length: 3, minimum: 4 })
        );
        assert_eq!(
            classify(&[0xC1, 0x02], RoutingMode::ConnectServer),
            Err(ClassifyError::FrameTooShort { length: 2, minimum: 3 })
        );
    }

    #[test]
    fn test_unknown_header() {
        assert_eq!(
            classify(&[0xAA, 0x04, 0x00, 0x01], RoutingMode::GameServer),
            Err(ClassifyError::UnknownHeaderType(0xAA))
        );
        assert_eq!(
            classify(&[0xC3, 0x04, 0x00, 0x01], RoutingMode::ConnectServer),
            Err(ClassifyError::UnknownHeaderType(0xC3))
        );
    }

    #[test]
    fn test_connect_server_tables() {
        let hello = classify(&[0xC1, 0x04, 0x00, 0x01], RoutingMode::ConnectServer).unwrap();
        assert_eq!((hello.code, hello.sub_code), (0x00, Some(0x01)));

        // 0x00 is chat on a game server and carries no sub-code there
        let chat = classify(&[0xC1, 0x04, 0x00, 0x01], RoutingMode::GameServer).unwrap();
        assert_eq!((chat.code, chat.sub_code), (0x00, None));

        let list = classify(&[0xC2, 0x00, 0x07, 0xF4, 0x06, 0x00, 0x00], RoutingMode::ConnectServer).unwrap();
        assert_eq!((list.code, list.sub_code), (0xF4, Some(0x06)));
    }
}
