//! Framed binary encoding.
//!
//! A frame is `magic (4 bytes) | schema version (6 bytes) | bincode payload`.
//! Readers reject frames with foreign magic or a different major version.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{FrameError, FrameResult};
use crate::version::{MagicBytes, SchemaVersion};

const HEADER_LEN: usize = 4 + SchemaVersion::ENCODED_LEN;

/// Encodes `value` behind a magic/version header.
pub fn encode_framed<T: Serialize>(
    magic: MagicBytes,
    version: SchemaVersion,
    value: &T,
) -> FrameResult<Vec<u8>> {
    let payload =
        bincode::serialize(value).map_err(|e| FrameError::Serialization(e.to_string()))?;

    let mut buffer = Vec::with_capacity(HEADER_LEN + payload.len());
    buffer.extend_from_slice(&magic.0);
    buffer.extend_from_slice(&version.to_le_bytes());
    buffer.extend(payload);
    Ok(buffer)
}

/// Decodes a frame produced by [`encode_framed`].
///
/// Returns the payload together with the version it was written with.
pub fn decode_framed<T: DeserializeOwned>(
    magic: MagicBytes,
    reader_version: SchemaVersion,
    bytes: &[u8],
) -> FrameResult<(T, SchemaVersion)> {
    if bytes.len() < HEADER_LEN {
        return Err(FrameError::Truncated { len: bytes.len() });
    }
    if bytes[0..4] != magic.0 {
        return Err(FrameError::InvalidFormat { expected: magic.0 });
    }

    let mut raw_version = [0u8; SchemaVersion::ENCODED_LEN];
    raw_version.copy_from_slice(&bytes[4..HEADER_LEN]);
    let data_version = SchemaVersion::from_le_bytes(raw_version);

    if !reader_version.can_read(&data_version) {
        warn!(
            "Refusing frame written with schema {} (reader is {})",
            data_version, reader_version
        );
        return Err(FrameError::VersionMismatch {
            expected: reader_version.to_string(),
            actual: data_version.to_string(),
        });
    }

    if !reader_version.is_compatible_with(&data_version) {
        warn!(
            "Decoding frame from newer schema {} (reader is {})",
            data_version, reader_version
        );
    }

    let value = bincode::deserialize(&bytes[HEADER_LEN..])
        .map_err(|e| FrameError::Corrupted(e.to_string()))?;
    Ok((value, data_version))
}
