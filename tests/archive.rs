mod common;

use std::io::Write;
use std::sync::Arc;

use common::{ArchiveBuilder, Entry, HeaderOverride, Method, noise, zip64_extra};
use zipseek::{CompressionMethod, LocalFileReader, MemoryReader, ZipArchive, ZipError};

fn sample() -> (ArchiveBuilder, Vec<u8>) {
    let text = b"All work and no play makes Jack a dull boy.\n".repeat(200);
    let builder = ArchiveBuilder::new()
        .entry(Entry::stored("docs/", Vec::new()))
        .entry(Entry::stored("docs/stored.txt", text.clone()))
        .entry(Entry::deflated("docs/deflated.txt", text.clone()))
        .entry(Entry::deflated("bin/noise.bin", noise(4096, 42)))
        .comment(b"sample archive".to_vec());
    (builder, text)
}

async fn open_memory(bytes: Vec<u8>) -> ZipArchive<MemoryReader> {
    ZipArchive::open(Arc::new(MemoryReader::from(bytes)))
        .await
        .unwrap()
}

#[tokio::test]
async fn stored_and_deflated_entries_extract_identically() {
    let (builder, text) = sample();
    let archive = open_memory(builder.build().bytes).await;

    let stored = archive.find("docs/stored.txt").unwrap();
    let deflated = archive.find("docs/deflated.txt").unwrap();
    assert_eq!(stored.compression_method, CompressionMethod::Stored);
    assert_eq!(deflated.compression_method, CompressionMethod::Deflated);
    assert!(deflated.compressed_size < deflated.uncompressed_size);

    assert_eq!(archive.extract(stored).await.unwrap(), text);
    assert_eq!(archive.extract(deflated).await.unwrap(), text);

    let noise_entry = archive.find("bin/noise.bin").unwrap();
    assert_eq!(archive.extract(noise_entry).await.unwrap(), noise(4096, 42));
}

#[tokio::test]
async fn listing_matches_the_archive() {
    let (builder, _) = sample();
    let archive = open_memory(builder.build().bytes).await;

    let names: Vec<_> = archive.entries().iter().map(|e| e.file_name.as_str()).collect();
    assert_eq!(
        names,
        ["docs/", "docs/stored.txt", "docs/deflated.txt", "bin/noise.bin"]
    );
    assert!(archive.entries()[0].is_directory());
    assert_eq!(archive.eocd().comment, "sample archive");
    assert_eq!(archive.extract(&archive.entries()[0]).await.unwrap(), b"");
}

#[tokio::test]
async fn corrupted_stored_payload_fails_only_that_entry() {
    let (builder, text) = sample();
    let built = builder.build();
    let mut bytes = built.bytes;
    bytes[built.data_offsets[1] as usize + 10] ^= 0x40;

    let archive = open_memory(bytes).await;
    let err = archive
        .extract(archive.find("docs/stored.txt").unwrap())
        .await
        .unwrap_err();
    assert!(
        matches!(&err, ZipError::ChecksumMismatch { name, .. } if name == "docs/stored.txt"),
        "{err}"
    );

    // The listing and the other entries are unaffected.
    assert_eq!(archive.entries().len(), 4);
    let deflated = archive.find("docs/deflated.txt").unwrap();
    assert_eq!(archive.extract(deflated).await.unwrap(), text);
}

#[tokio::test]
async fn corrupted_deflate_payload_is_detected() {
    let (builder, _) = sample();
    let built = builder.build();
    let mut bytes = built.bytes;
    bytes[built.data_offsets[2] as usize + 5] ^= 0x10;

    let archive = open_memory(bytes).await;
    let err = archive
        .extract(archive.find("docs/deflated.txt").unwrap())
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            ZipError::ChecksumMismatch { .. } | ZipError::Decompression { .. }
        ),
        "{err}"
    );
}

#[tokio::test]
async fn unsupported_methods_are_named() {
    let built = ArchiveBuilder::new()
        .entry(Entry::new("a.lzma", b"not really lzma".to_vec(), Method::Raw(14)))
        .entry(Entry::new("b.odd", b"?".to_vec(), Method::Raw(250)))
        .build();
    let archive = open_memory(built.bytes).await;

    let err = archive.extract(&archive.entries()[0]).await.unwrap_err();
    assert!(matches!(
        err,
        ZipError::UnsupportedCompressionMethod(CompressionMethod::Lzma)
    ));
    assert_eq!(err.to_string(), "unsupported compression method: lzma (14)");

    let err = archive.extract(&archive.entries()[1]).await.unwrap_err();
    assert!(matches!(
        err,
        ZipError::UnsupportedCompressionMethod(CompressionMethod::Unknown(250))
    ));
}

#[tokio::test]
async fn encrypted_entry_is_refused() {
    let mut secret = Entry::stored("secret.txt", b"ciphertext".to_vec());
    secret.flags = 0x0001;
    let archive = open_memory(ArchiveBuilder::new().entry(secret).build().bytes).await;

    let err = archive.extract(&archive.entries()[0]).await.unwrap_err();
    assert!(matches!(err, ZipError::EncryptedEntry { .. }), "{err}");
}

#[tokio::test]
async fn local_header_mismatch_is_reported() {
    let built = ArchiveBuilder::new()
        .entry(Entry::stored("a.txt", b"alpha".to_vec()))
        .build();
    let mut bytes = built.bytes;
    bytes[0] = b'X';

    let archive = open_memory(bytes).await;
    let err = archive.extract(&archive.entries()[0]).await.unwrap_err();
    assert!(matches!(err, ZipError::BadLocalHeader { offset: 0, .. }), "{err}");
}

#[tokio::test]
async fn reads_from_a_local_file() {
    let (builder, text) = sample();
    let built = builder.prefix(b"#!/bin/sh\nexit 0\n".to_vec()).build();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&built.bytes).unwrap();
    file.flush().unwrap();

    let reader = LocalFileReader::new(file.path()).unwrap();
    let archive = ZipArchive::open(Arc::new(reader)).await.unwrap();

    assert_eq!(archive.entries().len(), 4);
    let deflated = archive.find("docs/deflated.txt").unwrap();
    assert_eq!(archive.extract(deflated).await.unwrap(), text);

    let reader = archive.close();
    assert_eq!(zipseek::ReadAt::size(reader.as_ref()), built.bytes.len() as u64);
}

#[tokio::test]
async fn extract_to_file_creates_parent_directories() {
    let (builder, text) = sample();
    let archive = open_memory(builder.build().bytes).await;
    let dir = tempfile::tempdir().unwrap();

    let target = dir.path().join("out/nested/stored.txt");
    archive
        .extract_to_file(archive.find("docs/stored.txt").unwrap(), &target)
        .await
        .unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), text);
}

#[tokio::test]
async fn entry_claiming_more_than_the_source_fails_alone() {
    let huge = 1u64 << 46;
    let mut giant = Entry::stored("giant.bin", b"tiny".to_vec()).with_header_override(HeaderOverride {
        compressed_size: 0xFFFF_FFFF,
        uncompressed_size: 0xFFFF_FFFF,
        lfh_offset: 0xFFFF_FFFF,
        disk_number: 0,
    });
    giant.cd_extra = zip64_extra(huge, huge, 0, None);

    let built = ArchiveBuilder::new()
        .entry(giant)
        .entry(Entry::stored("small.txt", b"still fine".to_vec()))
        .build();
    let archive = open_memory(built.bytes).await;

    let entry = archive.find("giant.bin").unwrap();
    assert_eq!(entry.compressed_size, huge);
    let err = archive.extract(entry).await.unwrap_err();
    assert!(matches!(err, ZipError::UnexpectedEof { expected, .. } if expected == huge), "{err}");

    let small = archive.find("small.txt").unwrap();
    assert_eq!(archive.extract(small).await.unwrap(), b"still fine");
}
