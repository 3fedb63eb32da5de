use relic::fs::{
    FileAttribute, FilesystemKind, identify_filesystem, parse_fat_directory, parse_ntfs_mft,
};

const SECTOR: usize = 512;
const FAT_ROOT_OFFSET: usize = 1536;

/// FAT16 volume image: 512-byte sectors, one sector per cluster, one
/// reserved sector, two FATs of one sector each, a 16-slot root directory.
fn fat16_image(entries: &[[u8; 32]]) -> Vec<u8> {
    let mut image = vec![0u8; FAT_ROOT_OFFSET + SECTOR];
    image[11..13].copy_from_slice(&(SECTOR as u16).to_le_bytes());
    image[13] = 1;
    image[14..16].copy_from_slice(&1u16.to_le_bytes());
    image[16] = 2;
    image[17..19].copy_from_slice(&16u16.to_le_bytes());
    image[22..24].copy_from_slice(&1u16.to_le_bytes());
    image[54..59].copy_from_slice(b"FAT16");

    for (index, entry) in entries.iter().enumerate() {
        let base = FAT_ROOT_OFFSET + index * 32;
        image[base..base + 32].copy_from_slice(entry);
    }
    image
}

fn dir_entry(name: &[u8; 8], ext: &[u8; 3], attributes: u8, cluster: u16, size: u32) -> [u8; 32] {
    let mut entry = [0u8; 32];
    entry[..8].copy_from_slice(name);
    entry[8..11].copy_from_slice(ext);
    entry[11] = attributes;
    entry[26..28].copy_from_slice(&cluster.to_le_bytes());
    entry[28..32].copy_from_slice(&size.to_le_bytes());
    entry
}

#[test]
fn test_fat_active_and_deleted_split() {
    let mut deleted = dir_entry(b"SECRET  ", b"TXT", 0x20, 9, 999);
    deleted[0] = 0xE5;

    let image = fat16_image(&[
        dir_entry(b"README  ", b"TXT", 0x20, 5, 1234),
        deleted,
        dir_entry(b"PHOTOS  ", b"   ", 0x10, 7, 0),
    ]);

    assert_eq!(identify_filesystem(&image), FilesystemKind::Fat16);

    let listing = parse_fat_directory(&image);
    assert_eq!(listing.active.len(), 2);
    assert_eq!(listing.deleted.len(), 1);

    let readme = &listing.active[0];
    assert_eq!(readme.name, "README.TXT");
    assert_eq!(readme.size_bytes, 1234);
    assert_eq!(readme.start_cluster, 5);
    assert!(!readme.is_directory);
    assert_eq!(readme.attributes, vec![FileAttribute::Archive]);

    let photos = &listing.active[1];
    assert_eq!(photos.name, "PHOTOS");
    assert!(photos.is_directory);
    assert_eq!(photos.attributes, vec![FileAttribute::Directory]);

    // The deletion marker destroyed the first character.
    let gone = &listing.deleted[0];
    assert_eq!(gone.name, "_ECRET.TXT");
    assert!(gone.is_deleted);
    assert_eq!(gone.size_bytes, 999);
}

#[test]
fn test_fat_single_deleted_slot() {
    let mut deleted = dir_entry(b"LOG     ", b"DAT", 0x20, 3, 4096);
    deleted[0] = 0xE5;

    let listing = parse_fat_directory(&fat16_image(&[deleted]));
    assert_eq!(listing.deleted.len(), 1);
    assert!(listing.active.is_empty());
}

#[test]
fn test_fat_terminator_stops_walk() {
    let image = fat16_image(&[
        dir_entry(b"A       ", b"BIN", 0x20, 2, 10),
        [0u8; 32],
        dir_entry(b"B       ", b"BIN", 0x20, 3, 10),
    ]);

    let listing = parse_fat_directory(&image);
    assert_eq!(listing.len(), 1);
}

#[test]
fn test_fat_skips_lfn_and_volume_label() {
    let mut lfn = [0u8; 32];
    lfn[0] = 0x41;
    lfn[11] = 0x0F;
    let label = dir_entry(b"MYDISK  ", b"   ", 0x08, 0, 0);

    let image = fat16_image(&[lfn, label, dir_entry(b"DATA    ", b"BIN", 0x20, 2, 200)]);
    let listing = parse_fat_directory(&image);
    assert_eq!(listing.len(), 1);
    assert_eq!(listing.active[0].name, "DATA.BIN");
}

#[test]
fn test_fat_truncated_directory_returns_partial() {
    let image = fat16_image(&[
        dir_entry(b"FIRST   ", b"TXT", 0x20, 2, 100),
        dir_entry(b"SECOND  ", b"TXT", 0x20, 3, 100),
    ]);
    // Keep the first entry and eight bytes of the second.
    let truncated = &image[..FAT_ROOT_OFFSET + 40];

    let listing = parse_fat_directory(truncated);
    assert_eq!(listing.len(), 1);
    assert_eq!(listing.active[0].name, "FIRST.TXT");
}

const MFT_OFFSET: usize = 2048;
const MFT_RECORD_SIZE: usize = 1024;

/// NTFS volume image with the MFT at cluster 4 (offset 2048) and room for
/// `records` 1024-byte records.
fn ntfs_image(records: usize) -> Vec<u8> {
    let mut image = vec![0u8; MFT_OFFSET + records * MFT_RECORD_SIZE];
    image[3..7].copy_from_slice(b"NTFS");
    image[11..13].copy_from_slice(&(SECTOR as u16).to_le_bytes());
    image[13] = 1;
    image[48..52].copy_from_slice(&4u32.to_le_bytes());
    image
}

fn write_mft_record(image: &mut [u8], slot: usize, name: &str, in_use: bool, directory: bool, size: u64) {
    let base = MFT_OFFSET + slot * MFT_RECORD_SIZE;
    let attr = base + 56;

    image[base..base + 4].copy_from_slice(b"FILE");
    image[base + 20..base + 22].copy_from_slice(&56u16.to_le_bytes());
    let mut flags = 0u16;
    if in_use {
        flags |= 0x0001;
    }
    if directory {
        flags |= 0x0002;
    }
    image[base + 22..base + 24].copy_from_slice(&flags.to_le_bytes());

    // Resident $FILE_NAME attribute.
    image[attr..attr + 4].copy_from_slice(&0x30u32.to_le_bytes());
    image[attr + 4..attr + 8].copy_from_slice(&256u32.to_le_bytes());
    image[attr + 72..attr + 80].copy_from_slice(&size.to_le_bytes());
    image[attr + 88] = name.len() as u8;

    let mut cursor = attr + 90;
    for unit in name.encode_utf16() {
        image[cursor..cursor + 2].copy_from_slice(&unit.to_le_bytes());
        cursor += 2;
    }

    let end = attr + 256;
    image[end..end + 4].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
}

#[test]
fn test_ntfs_active_and_deleted_records() {
    let mut image = ntfs_image(3);
    write_mft_record(&mut image, 0, "report.docx", true, false, 2048);
    write_mft_record(&mut image, 1, "secret.pdf", false, false, 4096);
    write_mft_record(&mut image, 2, "Projects", true, true, 0);

    assert_eq!(identify_filesystem(&image), FilesystemKind::Ntfs);

    let listing = parse_ntfs_mft(&image);
    assert_eq!(listing.active.len(), 2);
    assert_eq!(listing.deleted.len(), 1);

    let report = &listing.active[0];
    assert_eq!(report.name, "report.docx");
    assert_eq!(report.size_bytes, 2048);
    assert_eq!(report.start_cluster, 0);
    assert!(!report.is_directory);

    let projects = &listing.active[1];
    assert_eq!(projects.name, "Projects");
    assert!(projects.is_directory);
    assert_eq!(projects.attributes, vec![FileAttribute::Directory]);

    let secret = &listing.deleted[0];
    assert_eq!(secret.name, "secret.pdf");
    assert!(secret.is_deleted);
    assert_eq!(secret.start_cluster, 1);
}

#[test]
fn test_ntfs_non_file_records_are_skipped() {
    let mut image = ntfs_image(3);
    write_mft_record(&mut image, 0, "kept.txt", true, false, 100);
    image[MFT_OFFSET + MFT_RECORD_SIZE..MFT_OFFSET + MFT_RECORD_SIZE + 4]
        .copy_from_slice(b"BAAD");
    write_mft_record(&mut image, 2, "also.txt", true, false, 100);

    let listing = parse_ntfs_mft(&image);
    assert_eq!(listing.active.len(), 2);
    assert_eq!(listing.active[1].start_cluster, 2);
}

#[test]
fn test_ntfs_truncated_mft_returns_partial() {
    let mut image = ntfs_image(2);
    write_mft_record(&mut image, 0, "whole.txt", true, false, 100);
    write_mft_record(&mut image, 1, "cut.txt", true, false, 100);
    // Drop half of the second record.
    image.truncate(MFT_OFFSET + MFT_RECORD_SIZE + 512);

    let listing = parse_ntfs_mft(&image);
    assert_eq!(listing.len(), 1);
    assert_eq!(listing.active[0].name, "whole.txt");
}

#[test]
fn test_parsers_tolerate_garbage() {
    assert!(parse_fat_directory(&[0xFF; 512]).is_empty());
    assert!(parse_ntfs_mft(&[0xFF; 512]).is_empty());
    assert!(parse_fat_directory(&[]).is_empty());
    assert!(parse_ntfs_mft(&[]).is_empty());
}

#[test]
fn test_identify_unknown() {
    assert_eq!(identify_filesystem(&[0u8; 512]), FilesystemKind::Unknown);
    assert_eq!(identify_filesystem(&[]), FilesystemKind::Unknown);
}
