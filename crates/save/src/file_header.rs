// ---------------------------------------------------------------------------
// file_header – Map file header with magic bytes, version, and checksum
// ---------------------------------------------------------------------------
//
// Header format (28 bytes, fixed-size, little-endian):
//   [0..4]   Magic bytes: "RDNT" (0x52444E54)
//   [4..8]   Header format version (u32)
//   [8..12]  Flags (u32: bit 0 = LZ4 compressed payload)
//   [12..20] Timestamp (Unix epoch, u64)
//   [20..24] Uncompressed payload size (u32)
//   [24..28] xxHash32 checksum of the payload as stored (after compression)
//
// On save: encode SaveMap -> optionally compress -> prepend header
// On load: check magic -> validate checksum -> strip header -> decompress

use xxhash_rust::xxh32::xxh32;

use crate::save_error::SaveError;

/// Magic bytes identifying a road network map file.
pub const MAGIC: [u8; 4] = [0x52, 0x44, 0x4E, 0x54]; // "RDNT"

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 28;

/// Header layout version. Distinct from the map schema version carried
/// inside the payload.
pub const HEADER_FORMAT_VERSION: u32 = 1;

/// Payload is LZ4 block-compressed with a prepended size.
pub const FLAG_COMPRESSED: u32 = 1;

const XXHASH_SEED: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub format_version: u32,
    pub flags: u32,
    pub timestamp: u64,
    pub uncompressed_size: u32,
    pub checksum: u32,
}

impl FileHeader {
    /// Header for `stored` bytes that decode to `uncompressed_size` bytes.
    fn new(stored: &[u8], uncompressed_size: usize, flags: u32) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            format_version: HEADER_FORMAT_VERSION,
            flags,
            timestamp,
            uncompressed_size: uncompressed_size as u32,
            checksum: xxh32(stored, XXHASH_SEED),
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&self.format_version.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&self.checksum.to_le_bytes());
    }
}

/// Returns bytes: [header (28 bytes)] ++ [data].
pub fn wrap_with_header(data: &[u8]) -> Vec<u8> {
    let header = FileHeader::new(data, data.len(), 0);
    let mut out = Vec::with_capacity(HEADER_SIZE + data.len());
    header.write_to(&mut out);
    out.extend_from_slice(data);
    out
}

/// Like [`wrap_with_header`] but stores the data LZ4-compressed.
pub fn wrap_with_header_compressed(data: &[u8]) -> Vec<u8> {
    let compressed = lz4_flex::compress_prepend_size(data);
    let header = FileHeader::new(&compressed, data.len(), FLAG_COMPRESSED);
    let mut out = Vec::with_capacity(HEADER_SIZE + compressed.len());
    header.write_to(&mut out);
    out.extend_from_slice(&compressed);
    out
}

/// Parse and validate the header, returning it with the stored payload.
///
/// # Errors
///
/// Returns [`SaveError::InvalidHeader`] if the magic bytes are missing, the
/// file is shorter than a header, the header format is from a newer build,
/// or the checksum does not match.
pub fn unwrap_header(bytes: &[u8]) -> Result<(FileHeader, &[u8]), SaveError> {
    if bytes.len() < 4 || bytes[..4] != MAGIC {
        return Err(SaveError::InvalidHeader(
            "missing RDNT magic bytes, not a road network map file".to_string(),
        ));
    }
    if bytes.len() < HEADER_SIZE {
        return Err(SaveError::InvalidHeader(format!(
            "file is too short ({} bytes, need at least {HEADER_SIZE} for header)",
            bytes.len()
        )));
    }

    let u32_at =
        |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    let format_version = u32_at(4);
    let flags = u32_at(8);
    let timestamp = u64::from_le_bytes([
        bytes[12], bytes[13], bytes[14], bytes[15], bytes[16], bytes[17], bytes[18], bytes[19],
    ]);
    let uncompressed_size = u32_at(20);
    let checksum = u32_at(24);

    if format_version > HEADER_FORMAT_VERSION {
        return Err(SaveError::InvalidHeader(format!(
            "header format version {format_version} is newer than supported version \
             {HEADER_FORMAT_VERSION}"
        )));
    }

    let payload = &bytes[HEADER_SIZE..];
    let computed = xxh32(payload, XXHASH_SEED);
    if computed != checksum {
        return Err(SaveError::InvalidHeader(format!(
            "file is corrupted: checksum mismatch (expected {checksum:#010X}, got {computed:#010X})"
        )));
    }

    Ok((
        FileHeader {
            format_version,
            flags,
            timestamp,
            uncompressed_size,
            checksum,
        },
        payload,
    ))
}

pub fn decompress_payload(payload: &[u8]) -> Result<Vec<u8>, SaveError> {
    lz4_flex::decompress_size_prepended(payload)
        .map_err(|e| SaveError::Decode(format!("LZ4 decompression failed: {e}")))
}

/// Validate the header and return the plain payload, decompressing if the
/// header says so.
pub fn read_payload(bytes: &[u8]) -> Result<(FileHeader, Vec<u8>), SaveError> {
    let (header, payload) = unwrap_header(bytes)?;
    let data = if header.is_compressed() {
        decompress_payload(payload)?
    } else {
        payload.to_vec()
    };
    if data.len() != header.uncompressed_size as usize {
        return Err(SaveError::Decode(format!(
            "payload is {} bytes, header says {}",
            data.len(),
            header.uncompressed_size
        )));
    }
    Ok((header, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_and_unwrap_roundtrip() {
        let data = b"road network payload";
        let wrapped = wrap_with_header(data);

        assert_eq!(&wrapped[..4], &MAGIC);
        assert_eq!(wrapped.len(), HEADER_SIZE + data.len());

        let (header, payload) = unwrap_header(&wrapped).expect("unwrap should succeed");
        assert_eq!(header.format_version, HEADER_FORMAT_VERSION);
        assert!(!header.is_compressed());
        assert_eq!(header.uncompressed_size, data.len() as u32);
        assert_eq!(payload, data);
    }

    #[test]
    fn test_compressed_roundtrip() {
        let data = vec![7u8; 4096];
        let wrapped = wrap_with_header_compressed(&data);
        assert!(wrapped.len() < HEADER_SIZE + data.len());

        let (header, payload) = unwrap_header(&wrapped).expect("unwrap");
        assert!(header.is_compressed());
        assert_eq!(header.flags & FLAG_COMPRESSED, FLAG_COMPRESSED);
        assert_eq!(header.uncompressed_size, 4096);
        assert_ne!(payload, data.as_slice());

        let (_, plain) = read_payload(&wrapped).expect("read");
        assert_eq!(plain, data);
    }

    #[test]
    fn test_missing_magic_rejected() {
        let err = unwrap_header(b"\x00\x01\x02\x03 not a map").unwrap_err();
        assert!(matches!(err, SaveError::InvalidHeader(_)));
        assert!(unwrap_header(b"").is_err());
    }

    #[test]
    fn test_truncated_header_rejected() {
        let wrapped = wrap_with_header(b"abc");
        let err = unwrap_header(&wrapped[..10]).unwrap_err();
        assert!(format!("{err}").contains("too short"), "{err}");
    }

    #[test]
    fn test_corrupted_checksum_detected() {
        let mut wrapped = wrap_with_header(b"test payload");
        let last = wrapped.len() - 1;
        wrapped[last] ^= 0xFF;

        let err = unwrap_header(&wrapped).unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("corrupted"), "{msg}");
        assert!(msg.contains("checksum mismatch"), "{msg}");
    }

    #[test]
    fn test_future_header_version_rejected() {
        let mut wrapped = wrap_with_header(b"test payload");
        wrapped[4..8].copy_from_slice(&999u32.to_le_bytes());

        let err = unwrap_header(&wrapped).unwrap_err();
        assert!(format!("{err}").contains("999"), "{err}");
    }

    #[test]
    fn test_size_mismatch_detected() {
        let mut wrapped = wrap_with_header(b"twelve bytes");
        wrapped[20..24].copy_from_slice(&99u32.to_le_bytes());
        let err = read_payload(&wrapped).unwrap_err();
        assert!(matches!(err, SaveError::Decode(_)), "{err}");
    }

    #[test]
    fn test_garbage_compressed_payload_fails_cleanly() {
        let err = decompress_payload(&[10, 0, 0, 0, 0xF0]).unwrap_err();
        assert!(format!("{err}").contains("LZ4"), "{err}");
    }
}
