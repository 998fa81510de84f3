use bytes::{Buf, BufMut, BytesMut};
use tracing::{debug, trace};

use crate::ascii::parse_ascii;
use crate::error::{FrameError, Result};
use crate::format::{ByteOrder, Precision, ValueFormat};

/// Default block marker sent by the HP 4195A in `FMT3` mode.
pub const DEFAULT_HEADER: &[u8] = b"#A";

/// Size of the big-endian payload length that follows the marker.
pub const LENGTH_FIELD_SIZE: usize = 2;

/// Largest payload a 16-bit length field can declare.
pub const MAX_BLOCK_PAYLOAD: usize = u16::MAX as usize;

/// Decode a reply according to `format`.
///
/// ASCII formats go through [`parse_ascii`]; binary formats go through
/// [`decode_block`] with the given `header`.
pub fn decode_reply(raw: &[u8], format: &ValueFormat, header: &[u8]) -> Result<Vec<f64>> {
    if format.is_ascii() {
        return Ok(parse_ascii(&String::from_utf8_lossy(raw)));
    }
    decode_block(raw, format, header)
}

/// Decode a binary trace block.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────┬──────────────┬──────────────────────┐
/// │ Garbage      │ Marker       │ Length       │ Payload              │
/// │ (optional)   │ "#A"         │ (2B BE)      │ (Length bytes)       │
/// └──────────────┴──────────────┴──────────────┴──────────────────────┘
/// ```
///
/// The length is always big-endian; `format` only governs the payload.
/// Bytes past the payload (terminators) are ignored. A payload length that
/// is not a multiple of the element width decodes `length / width` values and
/// drops the remainder.
pub fn decode_block(raw: &[u8], format: &ValueFormat, header: &[u8]) -> Result<Vec<f64>> {
    let start = find_header(raw, header).ok_or(FrameError::HeaderNotFound)?;
    let mut body = &raw[start + header.len()..];
    if body.len() < LENGTH_FIELD_SIZE {
        return Err(FrameError::HeaderNotFound);
    }
    if start > 0 {
        debug!(skipped = start, "resynchronized on block header");
    }

    let declared = body.get_u16() as usize;
    if body.len() < declared {
        return Err(FrameError::Truncated {
            declared,
            available: body.len(),
        });
    }

    let width = format.precision.width();
    let count = declared / width;
    if declared % width != 0 {
        trace!(
            declared,
            width,
            dropped = declared % width,
            "block length not a multiple of element width"
        );
    }

    let mut payload = &body[..count * width];
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let value = match (format.precision, format.byte_order) {
            (Precision::Single, ByteOrder::Little) => f64::from(payload.get_f32_le()),
            (Precision::Single, ByteOrder::Big) => f64::from(payload.get_f32()),
            (Precision::Double, ByteOrder::Little) => payload.get_f64_le(),
            (Precision::Double, ByteOrder::Big) => payload.get_f64(),
        };
        values.push(value);
    }

    trace!(values = values.len(), "decoded trace block");
    Ok(values)
}

/// Encode values as a binary trace block.
///
/// Single-precision formats narrow each value to `f32`.
pub fn encode_block(
    values: &[f64],
    format: &ValueFormat,
    header: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let size = values.len() * format.precision.width();
    if size > MAX_BLOCK_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size,
            max: MAX_BLOCK_PAYLOAD,
        });
    }

    dst.reserve(header.len() + LENGTH_FIELD_SIZE + size);
    dst.put_slice(header);
    dst.put_u16(size as u16);
    for &value in values {
        match (format.precision, format.byte_order) {
            (Precision::Single, ByteOrder::Little) => dst.put_f32_le(value as f32),
            (Precision::Single, ByteOrder::Big) => dst.put_f32(value as f32),
            (Precision::Double, ByteOrder::Little) => dst.put_f64_le(value),
            (Precision::Double, ByteOrder::Big) => dst.put_f64(value),
        }
    }
    Ok(())
}

fn find_header(raw: &[u8], header: &[u8]) -> Option<usize> {
    if header.is_empty() {
        return Some(0);
    }
    raw.windows(header.len())
        .position(|window| window == header)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(header: &[u8], length: u16, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_slice(header);
        buf.put_u16(length);
        buf.put_slice(payload);
        buf.to_vec()
    }

    #[test]
    fn single_little_endian_roundtrip_is_exact() {
        let values: Vec<f64> = (0..8191)
            .map(|i| f64::from((i as f32) * 0.25 - 1000.5))
            .collect();
        let mut buf = BytesMut::new();
        encode_block(&values, &ValueFormat::single(), DEFAULT_HEADER, &mut buf).unwrap();

        let decoded = decode_block(&buf, &ValueFormat::single(), DEFAULT_HEADER).unwrap();
        assert_eq!(decoded.len(), values.len());
        for (a, b) in decoded.iter().zip(values.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn big_endian_single_block_from_analyzer() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&(-12.5f32).to_be_bytes());
        payload.extend_from_slice(&(3.0f32).to_be_bytes());
        let mut raw = block(b"#A", 8, &payload);
        raw.extend_from_slice(b"\r\n");

        let fmt = ValueFormat::single().big_endian();
        let values = decode_block(&raw, &fmt, DEFAULT_HEADER).unwrap();
        assert_eq!(values, vec![-12.5, 3.0]);
    }

    #[test]
    fn double_precision_both_orders() {
        let values = [1.0e9, -0.125, 42.0];
        for fmt in [ValueFormat::double(), ValueFormat::double().big_endian()] {
            let mut buf = BytesMut::new();
            encode_block(&values, &fmt, DEFAULT_HEADER, &mut buf).unwrap();
            assert_eq!(decode_block(&buf, &fmt, DEFAULT_HEADER).unwrap(), values);
        }
    }

    #[test]
    fn leading_garbage_is_skipped() {
        let mut clean = BytesMut::new();
        encode_block(&[1.5, 2.5], &ValueFormat::single(), DEFAULT_HEADER, &mut clean).unwrap();
        let mut noisy = b"garbage-bytes".to_vec();
        noisy.extend_from_slice(&clean);

        let fmt = ValueFormat::single();
        assert_eq!(
            decode_block(&noisy, &fmt, DEFAULT_HEADER).unwrap(),
            decode_block(&clean, &fmt, DEFAULT_HEADER).unwrap()
        );
    }

    #[test]
    fn length_field_is_big_endian_regardless_of_format() {
        // 0x0004 read big-endian is 4 bytes; read little-endian it would be 1024.
        let raw = block(b"#A", 4, &2.0f32.to_le_bytes());
        let values = decode_block(&raw, &ValueFormat::single(), DEFAULT_HEADER).unwrap();
        assert_eq!(values, vec![2.0]);
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let raw = block(b"#A", 16, &[0u8; 12]);
        let err = decode_block(&raw, &ValueFormat::single(), DEFAULT_HEADER).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                declared: 16,
                available: 12
            }
        ));
    }

    #[test]
    fn partial_element_is_dropped() {
        let raw = block(b"#A", 6, &[0xAA; 6]);
        let values = decode_block(&raw, &ValueFormat::double(), DEFAULT_HEADER).unwrap();
        assert!(values.is_empty());

        let raw = block(b"#A", 6, &[0u8; 6]);
        let values = decode_block(&raw, &ValueFormat::single(), DEFAULT_HEADER).unwrap();
        assert_eq!(values, vec![0.0]);
    }

    #[test]
    fn missing_header_is_an_error() {
        let err = decode_block(b"no marker here", &ValueFormat::single(), DEFAULT_HEADER)
            .unwrap_err();
        assert!(matches!(err, FrameError::HeaderNotFound));
    }

    #[test]
    fn header_without_length_field_is_an_error() {
        let err = decode_block(b"xx#A\x00", &ValueFormat::single(), DEFAULT_HEADER).unwrap_err();
        assert!(matches!(err, FrameError::HeaderNotFound));
    }

    #[test]
    fn empty_block_decodes_to_nothing() {
        let raw = block(b"#A", 0, &[]);
        let values = decode_block(&raw, &ValueFormat::single(), DEFAULT_HEADER).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn custom_header() {
        let raw = block(b"#", 4, &7.0f32.to_le_bytes());
        let values = decode_block(&raw, &ValueFormat::single(), b"#").unwrap();
        assert_eq!(values, vec![7.0]);
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let values = vec![0.0; MAX_BLOCK_PAYLOAD / 8 + 1];
        let mut buf = BytesMut::new();
        let err = encode_block(&values, &ValueFormat::double(), DEFAULT_HEADER, &mut buf)
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn reply_routing_follows_encoding() {
        let text = b"FREQ=1.23e6 Hz; PWR=-10.0 dBm";
        let values = decode_reply(text, &ValueFormat::ascii(), DEFAULT_HEADER).unwrap();
        assert_eq!(values, vec![1.23e6, -10.0]);

        let err = decode_reply(text, &ValueFormat::single(), DEFAULT_HEADER).unwrap_err();
        assert!(matches!(err, FrameError::HeaderNotFound));
    }

    #[test]
    fn ascii_reply_ignores_binary_axes() {
        let text = b"1.5,2.5";
        let plain = decode_reply(text, &ValueFormat::ascii(), DEFAULT_HEADER).unwrap();
        let odd = ValueFormat {
            precision: Precision::Double,
            byte_order: ByteOrder::Big,
            ..ValueFormat::ascii()
        };
        assert_eq!(decode_reply(text, &odd, DEFAULT_HEADER).unwrap(), plain);
    }
}
