use std::fmt;

use crate::error::RecordError;

use super::bytes::{self, FieldReader};
use super::extra::{
    ExtraField, ZIP64_SENTINEL_U16, ZIP64_SENTINEL_U32, Zip64Fields, parse_extra_fields,
};

/// ZIP compression methods
///
/// Only [`CompressionMethod::Stored`] and [`CompressionMethod::Deflated`] can
/// be extracted; the rest are named so errors and listings can say what an
/// entry uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    Stored,
    Shrunk,
    Reduced1,
    Reduced2,
    Reduced3,
    Reduced4,
    Imploded,
    Tokenized,
    Deflated,
    Deflate64,
    PkwareImploded,
    Bzip2,
    Lzma,
    IbmCmpsc,
    IbmTerse,
    IbmLz77z,
    ZstdDeprecated,
    Zstd,
    Mp3,
    Xz,
    Jpeg,
    WavPack,
    Ppmd,
    Aex,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::Stored,
            1 => Self::Shrunk,
            2 => Self::Reduced1,
            3 => Self::Reduced2,
            4 => Self::Reduced3,
            5 => Self::Reduced4,
            6 => Self::Imploded,
            7 => Self::Tokenized,
            8 => Self::Deflated,
            9 => Self::Deflate64,
            10 => Self::PkwareImploded,
            12 => Self::Bzip2,
            14 => Self::Lzma,
            16 => Self::IbmCmpsc,
            18 => Self::IbmTerse,
            19 => Self::IbmLz77z,
            20 => Self::ZstdDeprecated,
            93 => Self::Zstd,
            94 => Self::Mp3,
            95 => Self::Xz,
            96 => Self::Jpeg,
            97 => Self::WavPack,
            98 => Self::Ppmd,
            99 => Self::Aex,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            Self::Stored => 0,
            Self::Shrunk => 1,
            Self::Reduced1 => 2,
            Self::Reduced2 => 3,
            Self::Reduced3 => 4,
            Self::Reduced4 => 5,
            Self::Imploded => 6,
            Self::Tokenized => 7,
            Self::Deflated => 8,
            Self::Deflate64 => 9,
            Self::PkwareImploded => 10,
            Self::Bzip2 => 12,
            Self::Lzma => 14,
            Self::IbmCmpsc => 16,
            Self::IbmTerse => 18,
            Self::IbmLz77z => 19,
            Self::ZstdDeprecated => 20,
            Self::Zstd => 93,
            Self::Mp3 => 94,
            Self::Xz => 95,
            Self::Jpeg => 96,
            Self::WavPack => 97,
            Self::Ppmd => 98,
            Self::Aex => 99,
            Self::Unknown(v) => *v,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Shrunk => "shrunk",
            Self::Reduced1 => "reduced-1",
            Self::Reduced2 => "reduced-2",
            Self::Reduced3 => "reduced-3",
            Self::Reduced4 => "reduced-4",
            Self::Imploded => "imploded",
            Self::Tokenized => "tokenized",
            Self::Deflated => "deflated",
            Self::Deflate64 => "deflate64",
            Self::PkwareImploded => "pkware-imploded",
            Self::Bzip2 => "bzip2",
            Self::Lzma => "lzma",
            Self::IbmCmpsc => "ibm-cmpsc",
            Self::IbmTerse => "ibm-terse",
            Self::IbmLz77z => "ibm-lz77z",
            Self::ZstdDeprecated | Self::Zstd => "zstd",
            Self::Mp3 => "mp3",
            Self::Xz => "xz",
            Self::Jpeg => "jpeg",
            Self::WavPack => "wavpack",
            Self::Ppmd => "ppmd",
            Self::Aex => "ae-x",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u16())
    }
}

fn check_len(record: &'static str, data: &[u8], needed: usize) -> Result<(), RecordError> {
    if data.len() < needed {
        return Err(RecordError::Truncated {
            record,
            needed,
            available: data.len(),
        });
    }
    Ok(())
}

fn check_signature(record: &'static str, actual: u32, expected: u32) -> Result<(), RecordError> {
    if actual != expected {
        return Err(RecordError::BadSignature {
            record,
            expected,
            actual,
        });
    }
    Ok(())
}

/// End of Central Directory (EOCD) - 22 bytes plus comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EocdRecord {
    pub signature: u32,
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
    pub comment: String,
}

impl EocdRecord {
    pub const SIGNATURE: u32 = 0x06054b50;
    pub const SIZE: usize = 22;

    /// Decode an EOCD starting at `data[0]`, comment included.
    pub fn parse(data: &[u8]) -> Result<Self, RecordError> {
        check_len("EOCD", data, Self::SIZE)?;

        let mut r = FieldReader::new(data);
        let signature = r.u32();
        check_signature("EOCD", signature, Self::SIGNATURE)?;

        let disk_number = r.u16();
        let disk_with_cd = r.u16();
        let disk_entries = r.u16();
        let total_entries = r.u16();
        let cd_size = r.u32();
        let cd_offset = r.u32();
        let comment_len = r.u16();

        check_len("EOCD", data, Self::SIZE + comment_len as usize)?;
        let comment = bytes::text_at(data, Self::SIZE, comment_len as usize).unwrap_or_default();

        Ok(Self {
            signature,
            disk_number,
            disk_with_cd,
            disk_entries,
            total_entries,
            cd_size,
            cd_offset,
            comment_len,
            comment,
        })
    }

    /// Fixed header plus comment.
    pub fn record_size(&self) -> usize {
        Self::SIZE + self.comment_len as usize
    }

    /// Whether any count, size or offset field holds the ZIP64 sentinel.
    pub fn is_zip64(&self) -> bool {
        self.disk_entries == ZIP64_SENTINEL_U16
            || self.total_entries == ZIP64_SENTINEL_U16
            || self.cd_size == ZIP64_SENTINEL_U32
            || self.cd_offset == ZIP64_SENTINEL_U32
    }
}

/// Trailing "zip64 extensible data sector" of an EOCD64 record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensibleData {
    Parsed(Vec<u8>),
    /// Declared larger than this reader is willing to buffer; kept opaque.
    Oversized { declared: u64 },
}

impl ExtensibleData {
    pub fn declared_len(&self) -> u64 {
        match self {
            Self::Parsed(data) => data.len() as u64,
            Self::Oversized { declared } => *declared,
        }
    }
}

/// ZIP64 End of Central Directory - 56 bytes plus extensible data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eocd64Record {
    pub signature: u32,
    pub record_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
    pub extensible_data: ExtensibleData,
}

impl Eocd64Record {
    pub const SIGNATURE: u32 = 0x06064b50;
    pub const SIZE: usize = 56;

    /// Bytes of `record_size` that belong to the fixed part.
    const FIXED_REPORTED: u64 = 44;

    /// Length of the extensible data sector declared by a `record_size`.
    pub fn extensible_len(record_size: u64) -> u64 {
        record_size.saturating_sub(Self::FIXED_REPORTED)
    }

    /// Decode an EOCD64 starting at `data[0]`.
    ///
    /// An extensible sector longer than `max_extensible` is not read and is
    /// reported as [`ExtensibleData::Oversized`].
    pub fn parse(data: &[u8], max_extensible: u64) -> Result<Self, RecordError> {
        check_len("ZIP64 EOCD", data, Self::SIZE)?;

        let mut r = FieldReader::new(data);
        let signature = r.u32();
        check_signature("ZIP64 EOCD", signature, Self::SIGNATURE)?;

        let record_size = r.u64();
        let version_made_by = r.u16();
        let version_needed = r.u16();
        let disk_number = r.u32();
        let disk_with_cd = r.u32();
        let disk_entries = r.u64();
        let total_entries = r.u64();
        let cd_size = r.u64();
        let cd_offset = r.u64();

        let declared = Self::extensible_len(record_size);
        let extensible_data = match usize::try_from(declared) {
            Ok(len) if declared <= max_extensible => {
                check_len("ZIP64 EOCD", data, Self::SIZE + len)?;
                ExtensibleData::Parsed(r.bytes(len).to_vec())
            }
            _ => ExtensibleData::Oversized { declared },
        };

        Ok(Self {
            signature,
            record_size,
            version_made_by,
            version_needed,
            disk_number,
            disk_with_cd,
            disk_entries,
            total_entries,
            cd_size,
            cd_offset,
            extensible_data,
        })
    }
}

/// The archive trailer as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trailer {
    Zip32(EocdRecord),
    Zip64 {
        eocd: EocdRecord,
        eocd64: Eocd64Record,
    },
}

impl Trailer {
    pub fn eocd(&self) -> &EocdRecord {
        match self {
            Self::Zip32(eocd) | Self::Zip64 { eocd, .. } => eocd,
        }
    }

    /// Collapse into one canonical record, ZIP64 values taking precedence.
    pub fn resolve(&self) -> EndOfCentralDirectory {
        match self {
            Self::Zip32(eocd) => EndOfCentralDirectory {
                disk_number: u32::from(eocd.disk_number),
                disk_with_cd: u32::from(eocd.disk_with_cd),
                disk_entries: u64::from(eocd.disk_entries),
                total_entries: u64::from(eocd.total_entries),
                cd_size: u64::from(eocd.cd_size),
                cd_offset: u64::from(eocd.cd_offset),
                comment: eocd.comment.clone(),
                is_zip64: eocd.is_zip64(),
                zip64: None,
            },
            Self::Zip64 { eocd, eocd64 } => EndOfCentralDirectory {
                disk_number: eocd64.disk_number,
                disk_with_cd: eocd64.disk_with_cd,
                disk_entries: eocd64.disk_entries,
                total_entries: eocd64.total_entries,
                cd_size: eocd64.cd_size,
                cd_offset: eocd64.cd_offset,
                comment: eocd.comment.clone(),
                is_zip64: true,
                zip64: Some(Zip64Info {
                    version_made_by: eocd64.version_made_by,
                    version_needed: eocd64.version_needed,
                    extensible_data: eocd64.extensible_data.clone(),
                }),
            },
        }
    }
}

/// ZIP64-only trailer fields that have no 32-bit counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zip64Info {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub extensible_data: ExtensibleData,
}

/// The archive trailer with ZIP64 values merged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
    pub comment: String,
    pub is_zip64: bool,
    pub zip64: Option<Zip64Info>,
}

impl EndOfCentralDirectory {
    /// Offset one past the last central directory byte.
    pub fn cd_end(&self) -> Option<u64> {
        self.cd_offset.checked_add(self.cd_size)
    }
}

/// Central Directory File Header (CDFH) - 46 bytes plus name, extra and comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdirRecord {
    pub signature: u32,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub file_name_len: u16,
    pub file_name: String,
    pub extra_len: u16,
    pub extra_fields: Vec<ExtraField>,
    pub comment_len: u16,
    pub comment: String,
    pub disk_number: u32,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub lfh_offset: u64,
    /// Fixed header plus name, extra and comment.
    pub record_size: usize,
}

impl CdirRecord {
    pub const SIGNATURE: u32 = 0x02014b50;
    pub const SIZE: usize = 46;

    /// Largest possible record: every variable field at its 16-bit maximum.
    pub const MAX_SIZE: usize = Self::SIZE + 3 * u16::MAX as usize;

    /// Decode a record starting at `data[0]`.
    pub fn parse(data: &[u8]) -> Result<Self, RecordError> {
        check_len("central directory record", data, Self::SIZE)?;

        let mut r = FieldReader::new(data);
        let signature = r.u32();
        check_signature("central directory record", signature, Self::SIGNATURE)?;

        let version_made_by = r.u16();
        let version_needed = r.u16();
        let flags = r.u16();
        let compression_method = CompressionMethod::from_u16(r.u16());
        let last_mod_time = r.u16();
        let last_mod_date = r.u16();
        let crc32 = r.u32();
        let compressed_size = r.u32();
        let uncompressed_size = r.u32();
        let file_name_len = r.u16();
        let extra_len = r.u16();
        let comment_len = r.u16();
        let disk_number = r.u16();
        let internal_attrs = r.u16();
        let external_attrs = r.u32();
        let lfh_offset = r.u32();

        let record_size =
            Self::SIZE + file_name_len as usize + extra_len as usize + comment_len as usize;
        check_len("central directory record", data, record_size)?;

        let file_name = String::from_utf8_lossy(r.bytes(file_name_len as usize)).into_owned();
        let extra_fields = parse_extra_fields(r.bytes(extra_len as usize));
        let comment = String::from_utf8_lossy(r.bytes(comment_len as usize)).into_owned();

        let widened = Zip64Fields {
            uncompressed_size: u64::from(uncompressed_size),
            compressed_size: u64::from(compressed_size),
            lfh_offset: u64::from(lfh_offset),
            disk_number: u32::from(disk_number),
        }
        .merge(&extra_fields);

        Ok(Self {
            signature,
            version_made_by,
            version_needed,
            flags,
            compression_method,
            last_mod_time,
            last_mod_date,
            crc32,
            compressed_size: widened.compressed_size,
            uncompressed_size: widened.uncompressed_size,
            file_name_len,
            file_name,
            extra_len,
            extra_fields,
            comment_len,
            comment,
            disk_number: widened.disk_number,
            internal_attrs,
            external_attrs,
            lfh_offset: widened.lfh_offset,
            record_size,
        })
    }

    /// Directory entries end with '/'
    pub fn is_directory(&self) -> bool {
        self.file_name.ends_with('/')
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

/// General purpose flag: entry is encrypted.
pub const FLAG_ENCRYPTED: u16 = 0x0001;

/// General purpose flag: CRC and sizes follow the data in a data descriptor.
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// Local File Header (LFH) - 30 bytes plus name and extra
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocRecord {
    pub signature: u32,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub file_name_len: u16,
    pub extra_len: u16,
    pub file_name: String,
    pub extra_fields: Vec<ExtraField>,
    /// Local offset from a ZIP64 block; zero when the block does not carry one.
    pub lfh_offset: u64,
    /// Disk number from a ZIP64 block; zero when the block does not carry one.
    pub disk_number: u32,
    /// Fixed header plus name and extra; the payload starts here.
    pub header_size: usize,
}

impl LocRecord {
    pub const SIGNATURE: u32 = 0x04034b50;
    pub const SIZE: usize = 30;

    /// Decode a local header starting at `data[0]`.
    ///
    /// The signature is decoded but not checked; callers decide how a
    /// mismatch is reported.
    pub fn parse(data: &[u8]) -> Result<Self, RecordError> {
        check_len("local file header", data, Self::SIZE)?;

        let mut r = FieldReader::new(data);
        let signature = r.u32();
        let version_needed = r.u16();
        let flags = r.u16();
        let compression_method = CompressionMethod::from_u16(r.u16());
        let last_mod_time = r.u16();
        let last_mod_date = r.u16();
        let crc32 = r.u32();
        let compressed_size = r.u32();
        let uncompressed_size = r.u32();
        let file_name_len = r.u16();
        let extra_len = r.u16();

        let header_size = Self::SIZE + file_name_len as usize + extra_len as usize;
        check_len("local file header", data, header_size)?;

        let file_name = String::from_utf8_lossy(r.bytes(file_name_len as usize)).into_owned();
        let extra_fields = parse_extra_fields(r.bytes(extra_len as usize));

        let widened = Zip64Fields {
            uncompressed_size: u64::from(uncompressed_size),
            compressed_size: u64::from(compressed_size),
            lfh_offset: 0,
            disk_number: 0,
        }
        .merge(&extra_fields);

        Ok(Self {
            signature,
            version_needed,
            flags,
            compression_method,
            last_mod_time,
            last_mod_date,
            crc32,
            compressed_size: widened.compressed_size,
            uncompressed_size: widened.uncompressed_size,
            file_name_len,
            extra_len,
            file_name,
            extra_fields,
            lfh_offset: widened.lfh_offset,
            disk_number: widened.disk_number,
            header_size,
        })
    }

    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eocd_bytes(disk: u16, entries: u16, cd_size: u32, cd_offset: u32, comment: &[u8]) -> Vec<u8> {
        let mut b = EocdRecord::SIGNATURE.to_le_bytes().to_vec();
        b.extend_from_slice(&disk.to_le_bytes());
        b.extend_from_slice(&0u16.to_le_bytes());
        b.extend_from_slice(&entries.to_le_bytes());
        b.extend_from_slice(&entries.to_le_bytes());
        b.extend_from_slice(&cd_size.to_le_bytes());
        b.extend_from_slice(&cd_offset.to_le_bytes());
        b.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        b.extend_from_slice(comment);
        b
    }

    fn cdir_bytes(name: &[u8], extra: &[u8], comment: &[u8]) -> Vec<u8> {
        let mut b = CdirRecord::SIGNATURE.to_le_bytes().to_vec();
        b.extend_from_slice(&0x031eu16.to_le_bytes()); // made by
        b.extend_from_slice(&20u16.to_le_bytes()); // needed
        b.extend_from_slice(&0u16.to_le_bytes()); // flags
        b.extend_from_slice(&8u16.to_le_bytes()); // method
        b.extend_from_slice(&0x6000u16.to_le_bytes()); // time
        b.extend_from_slice(&0x5821u16.to_le_bytes()); // date
        b.extend_from_slice(&0xdeadbeefu32.to_le_bytes()); // crc
        b.extend_from_slice(&111u32.to_le_bytes()); // compressed
        b.extend_from_slice(&222u32.to_le_bytes()); // uncompressed
        b.extend_from_slice(&(name.len() as u16).to_le_bytes());
        b.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        b.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        b.extend_from_slice(&3u16.to_le_bytes()); // disk
        b.extend_from_slice(&1u16.to_le_bytes()); // internal
        b.extend_from_slice(&0x81a40000u32.to_le_bytes()); // external
        b.extend_from_slice(&333u32.to_le_bytes()); // lfh offset
        b.extend_from_slice(name);
        b.extend_from_slice(extra);
        b.extend_from_slice(comment);
        b
    }

    #[test]
    fn eocd_decodes_with_comment() {
        let eocd = EocdRecord::parse(&eocd_bytes(0, 3, 150, 1000, b"hello")).unwrap();
        assert_eq!(eocd.total_entries, 3);
        assert_eq!(eocd.cd_size, 150);
        assert_eq!(eocd.cd_offset, 1000);
        assert_eq!(eocd.comment, "hello");
        assert_eq!(eocd.record_size(), 27);
        assert!(!eocd.is_zip64());
    }

    #[test]
    fn eocd_missing_comment_bytes_is_truncated() {
        let mut raw = eocd_bytes(0, 1, 10, 10, b"abcdef");
        raw.truncate(24);
        assert_eq!(
            EocdRecord::parse(&raw),
            Err(RecordError::Truncated {
                record: "EOCD",
                needed: 28,
                available: 24
            })
        );
    }

    #[test]
    fn eocd_sentinels_flag_zip64() {
        for raw in [
            eocd_bytes(0, 0xFFFF, 10, 10, b""),
            eocd_bytes(0, 1, 0xFFFF_FFFF, 10, b""),
            eocd_bytes(0, 1, 10, 0xFFFF_FFFF, b""),
        ] {
            assert!(EocdRecord::parse(&raw).unwrap().is_zip64());
        }
    }

    #[test]
    fn trailer_resolves_zip64_values() {
        let eocd = EocdRecord::parse(&eocd_bytes(0, 0xFFFF, 0xFFFF_FFFF, 0xFFFF_FFFF, b"c")).unwrap();
        let eocd64 = Eocd64Record {
            signature: Eocd64Record::SIGNATURE,
            record_size: 44,
            version_made_by: 45,
            version_needed: 45,
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: 70_000,
            total_entries: 70_000,
            cd_size: 5_000_000_000,
            cd_offset: 6_000_000_000,
            extensible_data: ExtensibleData::Parsed(Vec::new()),
        };

        let resolved = Trailer::Zip64 { eocd, eocd64 }.resolve();
        assert!(resolved.is_zip64);
        assert_eq!(resolved.total_entries, 70_000);
        assert_eq!(resolved.cd_size, 5_000_000_000);
        assert_eq!(resolved.cd_offset, 6_000_000_000);
        assert_eq!(resolved.cd_end(), Some(11_000_000_000));
        assert_eq!(resolved.comment, "c");
    }

    #[test]
    fn eocd64_oversized_extensible_sector_stays_opaque() {
        let mut raw = Eocd64Record::SIGNATURE.to_le_bytes().to_vec();
        raw.extend_from_slice(&(44u64 + 1_000_000).to_le_bytes());
        raw.resize(Eocd64Record::SIZE, 0);

        let rec = Eocd64Record::parse(&raw, 1024).unwrap();
        assert_eq!(rec.extensible_data, ExtensibleData::Oversized { declared: 1_000_000 });

        let mut raw = Eocd64Record::SIGNATURE.to_le_bytes().to_vec();
        raw.extend_from_slice(&u64::MAX.to_le_bytes());
        raw.resize(Eocd64Record::SIZE, 0);
        let rec = Eocd64Record::parse(&raw, 4 * 1024 * 1024).unwrap();
        assert_eq!(rec.extensible_data.declared_len(), u64::MAX - 44);
    }

    #[test]
    fn eocd64_reads_extensible_sector() {
        let mut raw = Eocd64Record::SIGNATURE.to_le_bytes().to_vec();
        raw.extend_from_slice(&(44u64 + 3).to_le_bytes());
        raw.resize(Eocd64Record::SIZE, 0);
        raw.extend_from_slice(&[7, 8, 9]);
        let rec = Eocd64Record::parse(&raw, 1024).unwrap();
        assert_eq!(rec.extensible_data, ExtensibleData::Parsed(vec![7, 8, 9]));
    }

    #[test]
    fn cdir_decodes_distinct_comment_and_disk_fields() {
        let rec = CdirRecord::parse(&cdir_bytes(b"dir/file.txt", &[], b"note")).unwrap();
        assert_eq!(rec.file_name, "dir/file.txt");
        assert_eq!(rec.comment, "note");
        assert_eq!(rec.comment_len, 4);
        assert_eq!(rec.disk_number, 3);
        assert_eq!(rec.compression_method, CompressionMethod::Deflated);
        assert_eq!(rec.compressed_size, 111);
        assert_eq!(rec.uncompressed_size, 222);
        assert_eq!(rec.lfh_offset, 333);
        assert_eq!(rec.record_size, 46 + 12 + 4);
        assert_eq!(rec.mod_date(), (2024, 1, 1));
        assert_eq!(rec.mod_time(), (12, 0, 0));
        assert!(!rec.is_directory());
    }

    #[test]
    fn cdir_zip64_extra_overrides_non_sentinel_fields() {
        let mut extra = 0x0001u16.to_le_bytes().to_vec();
        extra.extend_from_slice(&28u16.to_le_bytes());
        extra.extend_from_slice(&5_000_000_000u64.to_le_bytes());
        extra.extend_from_slice(&4_000_000_000u64.to_le_bytes());
        extra.extend_from_slice(&7_000_000_000u64.to_le_bytes());
        extra.extend_from_slice(&0u32.to_le_bytes());

        let rec = CdirRecord::parse(&cdir_bytes(b"big.bin", &extra, b"")).unwrap();
        assert_eq!(rec.uncompressed_size, 5_000_000_000);
        assert_eq!(rec.compressed_size, 4_000_000_000);
        assert_eq!(rec.lfh_offset, 7_000_000_000);
        assert_eq!(rec.disk_number, 0);
    }

    #[test]
    fn cdir_malformed_extra_keeps_rest_of_record() {
        let extra = [0x01, 0x00, 0xff, 0x00, 1, 2];
        let rec = CdirRecord::parse(&cdir_bytes(b"x", &extra, b"kept")).unwrap();
        assert!(rec.extra_fields.is_empty());
        assert_eq!(rec.comment, "kept");
        assert_eq!(rec.compressed_size, 111);
    }

    #[test]
    fn cdir_rejects_wrong_signature_and_short_data() {
        let mut raw = cdir_bytes(b"a", &[], b"");
        assert!(matches!(
            CdirRecord::parse(&raw[..40]),
            Err(RecordError::Truncated { .. })
        ));
        raw[0] = 0;
        assert!(matches!(
            CdirRecord::parse(&raw),
            Err(RecordError::BadSignature { .. })
        ));
    }

    #[test]
    fn compression_method_names() {
        assert_eq!(CompressionMethod::from_u16(14), CompressionMethod::Lzma);
        assert_eq!(CompressionMethod::from_u16(200).as_u16(), 200);
        assert_eq!(CompressionMethod::Deflate64.to_string(), "deflate64 (9)");
    }
}
