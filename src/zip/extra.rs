//! Extra-field sub-records and the ZIP64 extended information merge.
//!
//! Both central directory and local headers carry an extra field made of
//! `(id: u16, size: u16, data[size])` sub-records. They are decoded into a
//! side list first; [`Zip64Fields::merge`] then produces the final widened
//! sizes and offsets as a pure step.

use tracing::trace;

use super::bytes::FieldReader;

/// Value stored in a 32-bit header field when the real value lives in ZIP64 data.
pub const ZIP64_SENTINEL_U32: u32 = 0xFFFF_FFFF;

/// Value stored in a 16-bit header field when the real value lives in ZIP64 data.
pub const ZIP64_SENTINEL_U16: u16 = 0xFFFF;

/// ZIP64 extra block carrying sizes and offset.
const ZIP64_SIZES_AND_OFFSET: usize = 24;

/// ZIP64 extra block carrying sizes, offset and disk number.
const ZIP64_FULL: usize = 28;

/// Known extra field header IDs.
///
/// Everything except [`ExtraFieldId::Zip64`] is recognized for display only;
/// the data is passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtraFieldId {
    Zip64,
    AvInfo,
    Os2,
    Ntfs,
    OpenVms,
    Unix,
    PatchDescriptor,
    Pkcs7Store,
    X509File,
    X509CentralDirectory,
    StrongEncryption,
    RecordManagement,
    Pkcs7RecipientList,
    IbmAttributes,
    IbmAttributesCompressed,
    ExtendedTimestamp,
    InfoZipUnixOld,
    UnicodeComment,
    UnicodePath,
    InfoZipUnix,
    InfoZipUnixUidGid,
    WinZipAes,
    AndroidAlignment,
    JarMarker,
    Unknown(u16),
}

impl ExtraFieldId {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0001 => Self::Zip64,
            0x0007 => Self::AvInfo,
            0x0009 => Self::Os2,
            0x000a => Self::Ntfs,
            0x000c => Self::OpenVms,
            0x000d => Self::Unix,
            0x000f => Self::PatchDescriptor,
            0x0014 => Self::Pkcs7Store,
            0x0015 => Self::X509File,
            0x0016 => Self::X509CentralDirectory,
            0x0017 => Self::StrongEncryption,
            0x0018 => Self::RecordManagement,
            0x0019 => Self::Pkcs7RecipientList,
            0x0065 => Self::IbmAttributes,
            0x0066 => Self::IbmAttributesCompressed,
            0x5455 => Self::ExtendedTimestamp,
            0x5855 => Self::InfoZipUnixOld,
            0x6375 => Self::UnicodeComment,
            0x7075 => Self::UnicodePath,
            0x7855 => Self::InfoZipUnix,
            0x7875 => Self::InfoZipUnixUidGid,
            0x9901 => Self::WinZipAes,
            0xd935 => Self::AndroidAlignment,
            0xcafe => Self::JarMarker,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            Self::Zip64 => 0x0001,
            Self::AvInfo => 0x0007,
            Self::Os2 => 0x0009,
            Self::Ntfs => 0x000a,
            Self::OpenVms => 0x000c,
            Self::Unix => 0x000d,
            Self::PatchDescriptor => 0x000f,
            Self::Pkcs7Store => 0x0014,
            Self::X509File => 0x0015,
            Self::X509CentralDirectory => 0x0016,
            Self::StrongEncryption => 0x0017,
            Self::RecordManagement => 0x0018,
            Self::Pkcs7RecipientList => 0x0019,
            Self::IbmAttributes => 0x0065,
            Self::IbmAttributesCompressed => 0x0066,
            Self::ExtendedTimestamp => 0x5455,
            Self::InfoZipUnixOld => 0x5855,
            Self::UnicodeComment => 0x6375,
            Self::UnicodePath => 0x7075,
            Self::InfoZipUnix => 0x7855,
            Self::InfoZipUnixUidGid => 0x7875,
            Self::WinZipAes => 0x9901,
            Self::AndroidAlignment => 0xd935,
            Self::JarMarker => 0xcafe,
            Self::Unknown(v) => *v,
        }
    }
}

/// One `(id, size, data)` sub-record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraField {
    pub id: ExtraFieldId,
    pub data: Vec<u8>,
}

/// Split an extra field into its sub-records.
///
/// A sub-record whose declared size runs past the end stops the walk; the
/// well-formed sub-records before it are still returned.
pub fn parse_extra_fields(data: &[u8]) -> Vec<ExtraField> {
    let mut fields = Vec::new();
    let mut r = FieldReader::new(data);

    while r.remaining() >= 4 {
        let id = r.u16();
        let size = r.u16() as usize;
        if size > r.remaining() {
            trace!(
                id,
                size,
                remaining = r.remaining(),
                "extra field overruns its container, ignoring the rest"
            );
            break;
        }

        fields.push(ExtraField {
            id: ExtraFieldId::from_u16(id),
            data: r.bytes(size).to_vec(),
        });
    }

    fields
}

/// The header fields a ZIP64 extra block can widen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Zip64Fields {
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub lfh_offset: u64,
    pub disk_number: u32,
}

impl Zip64Fields {
    /// Apply the first ZIP64 sub-record in `extras`, if any.
    ///
    /// A 24-byte block replaces both sizes and the local header offset; a
    /// 28-byte block also replaces the disk number. These replace the header
    /// values whatever they were. Blocks of any other size hold only the
    /// fields whose header value is the sentinel, in the order uncompressed
    /// size, compressed size, offset, disk.
    pub fn merge(self, extras: &[ExtraField]) -> Self {
        let Some(zip64) = extras.iter().find(|f| f.id == ExtraFieldId::Zip64) else {
            return self;
        };

        let data = zip64.data.as_slice();
        let mut r = FieldReader::new(data);

        match data.len() {
            ZIP64_SIZES_AND_OFFSET | ZIP64_FULL => {
                let mut merged = Self {
                    uncompressed_size: r.u64(),
                    compressed_size: r.u64(),
                    lfh_offset: r.u64(),
                    disk_number: self.disk_number,
                };
                if data.len() == ZIP64_FULL {
                    merged.disk_number = r.u32();
                }
                merged
            }
            _ => {
                let sentinel = u64::from(ZIP64_SENTINEL_U32);
                let mut merged = self;
                if self.uncompressed_size == sentinel && r.remaining() >= 8 {
                    merged.uncompressed_size = r.u64();
                }
                if self.compressed_size == sentinel && r.remaining() >= 8 {
                    merged.compressed_size = r.u64();
                }
                if self.lfh_offset == sentinel && r.remaining() >= 8 {
                    merged.lfh_offset = r.u64();
                }
                if self.disk_number == u32::from(ZIP64_SENTINEL_U16) && r.remaining() >= 4 {
                    merged.disk_number = r.u32();
                }
                merged
            }
        }
    }
}
