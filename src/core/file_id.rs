//! Decoder for Bot API `file_id` strings.
//!
//! Layout after base64url + zero-run expansion:
//! `type:i32 | dc_id:i32 | [file_reference:bytes] | id:i64 | access_hash:i64 | .. | [minor] major`

use crate::utils::error::{BotError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::fmt;

const WEB_LOCATION_FLAG: i32 = 1 << 24;
const FILE_REFERENCE_FLAG: i32 = 1 << 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Thumbnail,
    ChatPhoto,
    Photo,
    Voice,
    Video,
    Document,
    Encrypted,
    Temp,
    Sticker,
    Audio,
    Animation,
    EncryptedThumbnail,
    Wallpaper,
    VideoNote,
    SecureRaw,
    Secure,
    Background,
    DocumentAsFile,
    Unknown(i32),
}

impl From<i32> for FileType {
    fn from(value: i32) -> Self {
        match value {
            0 => FileType::Thumbnail,
            1 => FileType::ChatPhoto,
            2 => FileType::Photo,
            3 => FileType::Voice,
            4 => FileType::Video,
            5 => FileType::Document,
            6 => FileType::Encrypted,
            7 => FileType::Temp,
            8 => FileType::Sticker,
            9 => FileType::Audio,
            10 => FileType::Animation,
            11 => FileType::EncryptedThumbnail,
            12 => FileType::Wallpaper,
            13 => FileType::VideoNote,
            14 => FileType::SecureRaw,
            15 => FileType::Secure,
            16 => FileType::Background,
            17 => FileType::DocumentAsFile,
            other => FileType::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdInfo {
    pub file_type: FileType,
    pub dc_id: i32,
    pub file_reference: Option<Vec<u8>>,
    pub media_id: i64,
    pub access_hash: i64,
    pub major_version: u8,
    pub minor_version: u8,
    pub raw_length: usize,
}

impl fmt::Display for FileIdInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type={:?} dc={} id={} access_hash={} version={}.{}",
            self.file_type,
            self.dc_id,
            self.media_id,
            self.access_hash,
            self.major_version,
            self.minor_version
        )
    }
}

fn invalid(reason: impl Into<String>) -> BotError {
    BotError::InvalidFileId {
        reason: reason.into(),
    }
}

/// `0x00 n` expands to n zero bytes.
fn rle_decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut after_zero = false;
    for &byte in data {
        if after_zero {
            out.extend(std::iter::repeat(0u8).take(byte as usize));
            after_zero = false;
        } else if byte == 0 {
            after_zero = true;
        } else {
            out.push(byte);
        }
    }
    out
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| invalid("payload is truncated"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(i32::from_le_bytes(buf))
    }

    fn i64(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(buf))
    }

    /// TL `bytes`: 1-byte length (or 0xfe + 3-byte length), padded to 4.
    fn tl_bytes(&mut self) -> Result<Vec<u8>> {
        let first = self.take(1)?[0] as usize;
        let (len, header) = if first <= 253 {
            (first, 1)
        } else {
            let ext = self.take(3)?;
            (
                ext[0] as usize | (ext[1] as usize) << 8 | (ext[2] as usize) << 16,
                4,
            )
        };
        let value = self.take(len)?.to_vec();
        let padding = (4 - (header + len) % 4) % 4;
        self.take(padding)?;
        Ok(value)
    }
}

pub fn decode(file_id: &str) -> Result<FileIdInfo> {
    let trimmed = file_id.trim().trim_end_matches('=');
    if trimmed.is_empty() {
        return Err(invalid("file_id is empty"));
    }

    let raw = URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|e| invalid(format!("not base64url: {}", e)))?;
    let decoded = rle_decode(&raw);

    let (&major, rest) = decoded
        .split_last()
        .ok_or_else(|| invalid("payload is empty"))?;
    let (minor, body) = if major < 4 {
        (0, rest)
    } else {
        let (&minor, body) = rest
            .split_last()
            .ok_or_else(|| invalid("payload is truncated"))?;
        (minor, body)
    };

    let mut reader = Reader { data: body, pos: 0 };
    let type_field = reader.i32()?;
    let dc_id = reader.i32()?;

    if type_field & WEB_LOCATION_FLAG != 0 {
        return Err(invalid("web location file ids carry no media id"));
    }

    let file_reference = if type_field & FILE_REFERENCE_FLAG != 0 {
        Some(reader.tl_bytes()?)
    } else {
        None
    };

    let media_id = reader.i64()?;
    let access_hash = reader.i64()?;

    Ok(FileIdInfo {
        file_type: FileType::from(type_field & !(WEB_LOCATION_FLAG | FILE_REFERENCE_FLAG)),
        dc_id,
        file_reference,
        media_id,
        access_hash,
        major_version: major,
        minor_version: minor,
        raw_length: decoded.len(),
    })
}
