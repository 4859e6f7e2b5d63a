use std::fmt::Write as _;

use thiserror::Error;

use core_types::{ByteBounds, ChannelBuffer, Ranged};

/// Line separator of the wire protocol.
pub const SEPARATOR: &str = "\r\n";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("handshake not numeric")]
    BadHandshake,
    #[error("message not made up of {expected} six digit hex colors")]
    WrongLength { expected: usize },
    #[error("message contains a malformed hex color")]
    BadHex,
}

/// Formats a strip image as the frame payload: two lowercase hex digits
/// per channel, six per LED, no delimiters. The separator is appended by
/// the transport.
pub fn encode_frame(values: &ChannelBuffer) -> String {
    let mut frame = String::with_capacity(values.len() * 2);
    for value in values.iter() {
        let byte = Ranged::<ByteBounds>::from(value).get().round() as u8;
        let _ = write!(frame, "{byte:02x}");
    }
    frame
}

/// Parses a frame payload into one 24-bit color per LED.
pub fn parse_frame(payload: &str, led_count: usize) -> Result<Vec<u32>, ProtocolError> {
    if payload.len() != led_count * 6 {
        return Err(ProtocolError::WrongLength {
            expected: led_count,
        });
    }
    payload
        .as_bytes()
        .chunks(6)
        .map(|chunk| {
            let text = std::str::from_utf8(chunk).map_err(|_| ProtocolError::BadHex)?;
            u32::from_str_radix(text, 16).map_err(|_| ProtocolError::BadHex)
        })
        .collect()
}

/// Parses the helper's `{n}` handshake into the LED count.
pub fn parse_handshake(line: &str) -> Result<usize, ProtocolError> {
    line.parse().map_err(|_| ProtocolError::BadHandshake)
}
