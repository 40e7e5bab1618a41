//! `.vec` 二进制格式：全部字段按大端序写出。
//!
//! ```text
//! u32 tag (MAGIC_BASE + FORMAT_VERSION)
//! u32 record_count
//! 每条记录：u32 id, i32 color, u32 point_count, i16 保留, u8 visible, u8 closed,
//!          point_count × (f32 x, f32 y, f32 z)
//! u32 unit_code
//! f64 paper_scale
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;
use tracing::{debug, warn};
use dxf2vec_core::record::PolylineRecord;

use crate::{IoError, VecSaver};

pub const MAGIC_BASE: u32 = 1_127_433_216;
pub const FORMAT_VERSION: u32 = 1;
pub const MAGIC_TAG: u32 = MAGIC_BASE + FORMAT_VERSION;

/// 单次转换的完整输出。
#[derive(Debug, Clone, PartialEq)]
pub struct VecFile {
    pub records: Vec<PolylineRecord>,
    pub unit_code: u32,
    pub paper_scale: f64,
}

impl VecFile {
    pub fn new(records: Vec<PolylineRecord>, unit_code: u32, paper_scale: f64) -> Self {
        Self {
            records,
            unit_code,
            paper_scale,
        }
    }

    pub fn total_points(&self) -> usize {
        self.records.iter().map(|record| record.points.len()).sum()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VecWriter;

impl VecWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_to<W: Write>(&self, file: &VecFile, writer: &mut W) -> io::Result<()> {
        let record_count = u32::try_from(file.records.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "记录数量超出 u32 范围"))?;
        writer.write_u32::<BigEndian>(MAGIC_TAG)?;
        writer.write_u32::<BigEndian>(record_count)?;
        for record in &file.records {
            write_record(writer, record)?;
        }
        writer.write_u32::<BigEndian>(file.unit_code)?;
        writer.write_f64::<BigEndian>(file.paper_scale)?;
        Ok(())
    }

    pub fn to_bytes(&self, file: &VecFile) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(16 + file.records.len() * 16 + file.total_points() * 12);
        self.write_to(file, &mut buffer)?;
        Ok(buffer)
    }
}

fn write_record<W: Write>(writer: &mut W, record: &PolylineRecord) -> io::Result<()> {
    let point_count = u32::try_from(record.points.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "点数量超出 u32 范围"))?;
    writer.write_u32::<BigEndian>(record.id)?;
    writer.write_i32::<BigEndian>(record.color)?;
    writer.write_u32::<BigEndian>(point_count)?;
    writer.write_i16::<BigEndian>(0)?;
    writer.write_u8(u8::from(record.visible))?;
    writer.write_u8(u8::from(record.closed))?;
    for point in &record.points {
        writer.write_f32::<BigEndian>(point.x)?;
        writer.write_f32::<BigEndian>(point.y)?;
        writer.write_f32::<BigEndian>(point.z)?;
    }
    Ok(())
}

fn remove_temporary(temp: &Path) {
    if let Err(cleanup) = fs::remove_file(temp) {
        if cleanup.kind() != io::ErrorKind::NotFound {
            warn!(path = %temp.display(), error = %cleanup, "清理临时文件失败");
        }
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl VecSaver for VecWriter {
    /// 先写入同目录下的 `<name>.tmp`，成功后再重命名覆盖目标文件。
    fn save(&self, file: &VecFile, path: &Path) -> Result<(), IoError> {
        let temp = temporary_path(path);
        let write_error = |source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        };

        let result = File::create(&temp).and_then(|handle| {
            let mut writer = BufWriter::new(handle);
            self.write_to(file, &mut writer)?;
            writer.flush()
        });
        if let Err(source) = result {
            remove_temporary(&temp);
            return Err(write_error(source));
        }

        fs::rename(&temp, path).map_err(|source| {
            remove_temporary(&temp);
            write_error(source)
        })?;
        debug!(
            path = %path.display(),
            records = file.records.len(),
            points = file.total_points(),
            "已写出 vec 文件"
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VecReader;

impl VecReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_from<R: Read>(&self, reader: &mut R) -> Result<VecFile, IoError> {
        let tag = reader.read_u32::<BigEndian>().map_err(truncated("文件头"))?;
        if tag.wrapping_sub(MAGIC_BASE) > 0xFFFF {
            return Err(IoError::InvalidDocument(format!(
                "不是 vec 文件：文件头标记 {tag:#010x} 无法识别"
            )));
        }
        let version = tag - MAGIC_BASE;
        if version != FORMAT_VERSION {
            return Err(IoError::UnsupportedFeature(format!(
                "vec 格式版本 {version}（当前仅支持 {FORMAT_VERSION}）"
            )));
        }

        let record_count = reader
            .read_u32::<BigEndian>()
            .map_err(truncated("记录数量"))?;
        // 记录数来自文件内容，预分配时设上限
        let mut records = Vec::with_capacity(record_count.min(4096) as usize);
        for index in 0..record_count {
            records.push(read_record(reader, index)?);
        }

        let unit_code = reader
            .read_u32::<BigEndian>()
            .map_err(truncated("单位编码"))?;
        let paper_scale = reader
            .read_f64::<BigEndian>()
            .map_err(truncated("图纸比例"))?;

        Ok(VecFile {
            records,
            unit_code,
            paper_scale,
        })
    }

    pub fn load(&self, path: &Path) -> Result<VecFile, IoError> {
        let handle = File::open(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        self.read_from(&mut BufReader::new(handle))
    }
}

fn read_record<R: Read>(reader: &mut R, index: u32) -> Result<PolylineRecord, IoError> {
    let context = "记录头";
    let id = reader.read_u32::<BigEndian>().map_err(truncated(context))?;
    let color = reader.read_i32::<BigEndian>().map_err(truncated(context))?;
    let point_count = reader.read_u32::<BigEndian>().map_err(truncated(context))?;
    let _reserved = reader.read_i16::<BigEndian>().map_err(truncated(context))?;
    let visible = reader.read_u8().map_err(truncated(context))? != 0;
    let closed = reader.read_u8().map_err(truncated(context))? != 0;

    let mut points = Vec::with_capacity(point_count.min(65_536) as usize);
    for _ in 0..point_count {
        let point = read_point(reader).map_err(|_| {
            IoError::InvalidDocument(format!("第 {index} 条记录的点数据不完整"))
        })?;
        points.push(point);
    }

    Ok(PolylineRecord::new(id, color, visible, closed, points))
}

fn read_point<R: Read>(reader: &mut R) -> io::Result<Vec3> {
    let x = reader.read_f32::<BigEndian>()?;
    let y = reader.read_f32::<BigEndian>()?;
    let z = reader.read_f32::<BigEndian>()?;
    Ok(Vec3::new(x, y, z))
}

fn truncated(context: &'static str) -> impl Fn(io::Error) -> IoError {
    move |err| IoError::InvalidDocument(format!("vec 数据在{context}处提前结束：{err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> VecFile {
        VecFile::new(
            vec![
                PolylineRecord::new(
                    7,
                    0xFF0000,
                    true,
                    false,
                    vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0)],
                ),
                PolylineRecord::new(8, -1, false, true, Vec::new()),
            ],
            4,
            0.5,
        )
    }

    #[test]
    fn header_and_record_layout_is_big_endian() {
        let bytes = VecWriter::new().to_bytes(&sample()).expect("encode");
        assert_eq!(&bytes[0..4], &MAGIC_TAG.to_be_bytes());
        assert_eq!(&bytes[0..4], &[0x43, 0x33, 0x44, 0x01]);
        assert_eq!(&bytes[4..8], &2u32.to_be_bytes());
        // 第一条记录
        assert_eq!(&bytes[8..12], &7u32.to_be_bytes());
        assert_eq!(&bytes[12..16], &0xFF0000i32.to_be_bytes());
        assert_eq!(&bytes[16..20], &2u32.to_be_bytes());
        assert_eq!(&bytes[20..22], &[0, 0]);
        assert_eq!(bytes[22], 1);
        assert_eq!(bytes[23], 0);
        assert_eq!(&bytes[24..28], &0.0f32.to_be_bytes());
        assert_eq!(&bytes[36..40], &10.0f32.to_be_bytes());
        // 第二条记录从 24 + 2 * 12 = 48 开始
        assert_eq!(&bytes[48..52], &8u32.to_be_bytes());
        assert_eq!(&bytes[52..56], &(-1i32).to_be_bytes());
        assert_eq!(&bytes[56..60], &0u32.to_be_bytes());
        assert_eq!(bytes[62], 0);
        assert_eq!(bytes[63], 1);
        // 文件尾
        assert_eq!(&bytes[64..68], &4u32.to_be_bytes());
        assert_eq!(&bytes[68..76], &0.5f64.to_be_bytes());
        assert_eq!(bytes.len(), 76);
    }

    #[test]
    fn decode_restores_written_records() {
        let file = sample();
        let bytes = VecWriter::new().to_bytes(&file).expect("encode");
        let decoded = VecReader::new()
            .read_from(&mut Cursor::new(bytes))
            .expect("decode");
        assert_eq!(decoded, file);
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut bytes = VecWriter::new().to_bytes(&sample()).expect("encode");
        bytes[0] = 0x00;
        let err = VecReader::new()
            .read_from(&mut Cursor::new(bytes))
            .unwrap_err();
        assert!(matches!(err, IoError::InvalidDocument(_)), "{err:?}");
    }

    #[test]
    fn future_version_is_unsupported() {
        let mut bytes = VecWriter::new().to_bytes(&sample()).expect("encode");
        bytes[0..4].copy_from_slice(&(MAGIC_BASE + 2).to_be_bytes());
        let err = VecReader::new()
            .read_from(&mut Cursor::new(bytes))
            .unwrap_err();
        assert!(matches!(err, IoError::UnsupportedFeature(_)), "{err:?}");
    }

    #[test]
    fn truncated_stream_is_invalid() {
        let bytes = VecWriter::new().to_bytes(&sample()).expect("encode");
        for cut in [2, 6, 30, 70] {
            let err = VecReader::new()
                .read_from(&mut Cursor::new(&bytes[..cut]))
                .unwrap_err();
            assert!(matches!(err, IoError::InvalidDocument(_)), "cut {cut}: {err:?}");
        }
    }

    #[test]
    fn temporary_path_is_a_sibling() {
        let temp = temporary_path(Path::new("/tmp/out/drawing.vec"));
        assert_eq!(temp, PathBuf::from("/tmp/out/drawing.vec.tmp"));
    }
}
