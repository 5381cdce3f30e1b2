//! Low-level SCALE helpers shared by the payload and extrinsic codecs

use crate::error::WasmPolyxError;
use crate::types::Era;
use blake2::{digest::consts::U32, Blake2b, Digest};
use parity_scale_codec::{Compact, Decode, Encode};

/// Append a compact-encoded integer. The encoding depends only on the value,
/// so every width goes through `Compact<u128>`.
pub fn encode_compact_to(value: impl Into<u128>, dest: &mut Vec<u8>) {
    Compact::<u128>(value.into()).encode_to(dest);
}

/// Read a compact-encoded integer, advancing the cursor. Fails when the value
/// does not fit in `T`.
pub fn decode_compact<T: TryFrom<u128>>(input: &mut &[u8]) -> Result<T, WasmPolyxError> {
    let value = Compact::<u128>::decode(input)?.0;
    T::try_from(value).map_err(|_| {
        WasmPolyxError::ScaleDecodeError(format!(
            "Compact value {} overflows {}",
            value,
            core::any::type_name::<T>()
        ))
    })
}

/// Append the wire form of an era
pub fn encode_era_to(era: &Era, dest: &mut Vec<u8>) {
    match *era {
        Era::Immortal => dest.push(0x00),
        Era::Mortal { period, phase } => {
            let quantize_factor = (period >> 12).max(1);
            let encoded = (period.trailing_zeros().saturating_sub(1)).clamp(1, 15) as u16
                | ((phase / quantize_factor) << 4) as u16;
            dest.extend_from_slice(&encoded.to_le_bytes());
        }
    }
}

/// Read an era, advancing the cursor
pub fn decode_era(input: &mut &[u8]) -> Result<Era, WasmPolyxError> {
    let first = take(input, 1, "era")?[0];
    if first == 0 {
        return Ok(Era::Immortal);
    }
    let second = take(input, 1, "mortal era")?[0];
    let encoded = first as u64 + ((second as u64) << 8);
    let period = 2u64 << (encoded % (1 << 4));
    let quantize_factor = (period >> 12).max(1);
    let phase = (encoded >> 4) * quantize_factor;
    if period >= 4 && phase < period {
        Ok(Era::Mortal { period, phase })
    } else {
        Err(WasmPolyxError::ScaleDecodeError(format!(
            "Invalid mortal era: period {}, phase {}",
            period, phase
        )))
    }
}

/// Split `len` bytes off the front of the cursor
pub fn take<'a>(input: &mut &'a [u8], len: usize, what: &str) -> Result<&'a [u8], WasmPolyxError> {
    if input.len() < len {
        return Err(WasmPolyxError::ScaleDecodeError(format!(
            "Truncated {}: need {} bytes, have {}",
            what,
            len,
            input.len()
        )));
    }
    let (head, tail) = input.split_at(len);
    *input = tail;
    Ok(head)
}

/// Read a fixed 32-byte hash, advancing the cursor
pub fn take_hash(input: &mut &[u8], what: &str) -> Result<[u8; 32], WasmPolyxError> {
    let bytes = take(input, 32, what)?;
    let mut hash = [0u8; 32];
    hash.copy_from_slice(bytes);
    Ok(hash)
}

/// Read a little-endian u32, advancing the cursor
pub fn take_u32(input: &mut &[u8], what: &str) -> Result<u32, WasmPolyxError> {
    let bytes = take(input, 4, what)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Parse hex string to 32-byte hash
pub fn parse_hex_hash(hex_str: &str) -> Result<[u8; 32], WasmPolyxError> {
    let bytes = parse_hex(hex_str)?;
    if bytes.len() != 32 {
        return Err(WasmPolyxError::InvalidInput(format!(
            "Hash must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut result = [0u8; 32];
    result.copy_from_slice(&bytes);
    Ok(result)
}

/// Decode a hex string with or without the 0x prefix
pub fn parse_hex(hex_str: &str) -> Result<Vec<u8>, WasmPolyxError> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    Ok(hex::decode(hex_str)?)
}

/// 0x-prefixed lowercase hex
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Blake2-256 hash
pub fn blake2_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}
