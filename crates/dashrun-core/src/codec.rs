use serde::Serialize;
use serde::de::DeserializeOwned;

/// Maximum encoded snapshot size in bytes.
pub const MAX_SNAPSHOT_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum CodecError {
    EmptyPayload,
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "empty payload"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_SNAPSHOT_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Encode a value as MessagePack, rejecting payloads over [`MAX_SNAPSHOT_SIZE`].
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    encode_into(value, &mut buf)?;
    Ok(buf)
}

/// Encode into a caller-owned buffer so per-tick broadcasts can reuse it.
pub fn encode_into<T: Serialize>(value: &T, buf: &mut Vec<u8>) -> Result<(), CodecError> {
    buf.clear();
    rmp_serde::encode::write(buf, value)
        .map_err(|e| CodecError::SerializeError(e.to_string()))?;
    if buf.len() > MAX_SNAPSHOT_SIZE {
        return Err(CodecError::PayloadTooLarge(buf.len()));
    }
    Ok(())
}

/// Decode a MessagePack payload produced by [`encode`].
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, CodecError> {
    if data.is_empty() {
        return Err(CodecError::EmptyPayload);
    }
    if data.len() > MAX_SNAPSHOT_SIZE {
        return Err(CodecError::PayloadTooLarge(data.len()));
    }
    rmp_serde::from_slice(data).map_err(|e| CodecError::DeserializeError(e.to_string()))
}
