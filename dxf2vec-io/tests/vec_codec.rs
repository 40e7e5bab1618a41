use std::fs;

use dxf2vec_core::record::PolylineRecord;
use dxf2vec_io::vec::MAGIC_TAG;
use dxf2vec_io::{IoError, VecFile, VecReader, VecSaver, VecWriter};
use glam::Vec3;

fn drawing() -> VecFile {
    let square = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(10.0, 0.0, 0.0),
        Vec3::new(10.0, 10.0, 0.0),
        Vec3::new(0.0, 10.0, 0.0),
        Vec3::new(0.0, 0.0, 0.0),
    ];
    VecFile::new(
        vec![
            PolylineRecord::new(1, 0xFFFFFF, true, true, square),
            PolylineRecord::new(
                2,
                0x00FF00,
                false,
                false,
                vec![Vec3::new(-1.5, 2.25, 0.125), Vec3::new(3.0, 4.0, 5.0)],
            ),
        ],
        4,
        1.0,
    )
}

#[test]
fn save_then_load_preserves_records() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let path = dir.path().join("drawing.vec");
    let file = drawing();

    VecWriter::new().save(&file, &path).expect("写出 vec");
    assert!(!dir.path().join("drawing.vec.tmp").exists(), "临时文件应已被重命名");

    let loaded = VecReader::new().load(&path).expect("读取 vec");
    assert_eq!(loaded, file);
    assert_eq!(loaded.records[0].point_count(), 5);
}

#[test]
fn save_overwrites_existing_file() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let path = dir.path().join("out.vec");
    fs::write(&path, b"stale").expect("写入旧文件");

    VecWriter::new().save(&drawing(), &path).expect("写出 vec");
    let bytes = fs::read(&path).expect("读取 vec");
    assert_eq!(&bytes[0..4], &MAGIC_TAG.to_be_bytes());
}

#[test]
fn save_into_missing_directory_fails() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let path = dir.path().join("missing").join("out.vec");
    let err = VecWriter::new().save(&drawing(), &path).unwrap_err();
    assert!(matches!(err, IoError::WriteError { .. }), "{err:?}");
    assert!(!path.exists());
}

#[test]
fn empty_drawing_is_header_and_footer_only() {
    let file = VecFile::new(Vec::new(), 0, 2.0);
    let bytes = VecWriter::new().to_bytes(&file).expect("编码");
    assert_eq!(bytes.len(), 4 + 4 + 4 + 8);
    assert_eq!(&bytes[4..8], &0u32.to_be_bytes());
}

#[test]
fn failed_rename_leaves_no_temporary_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    // 目标是非空目录，临时文件写入成功但无法重命名覆盖。
    let target = dir.path().join("occupied.vec");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("keep"), b"x").unwrap();

    let err = VecWriter::new().save(&drawing(), &target).unwrap_err();
    assert!(matches!(err, IoError::WriteError { .. }));
    assert!(!dir.path().join("occupied.vec.tmp").exists());
    assert!(target.join("keep").exists());
}
