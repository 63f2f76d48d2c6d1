// ============================================================
// Layer 4 — Dataset Archive Reader
// ============================================================
// Reads the prepared CIFAR-10 archive: a NumPy .npz file,
// which is a ZIP whose entries are .npy arrays.
//
// Layout of one .npy entry:
//   \x93NUMPY  (magic, 6 bytes)
//   major, minor version (1 byte each)
//   header length (u16 LE for v1, u32 LE for v2/v3)
//   header: a Python dict literal, e.g.
//     {'descr': '|u1', 'fortran_order': False, 'shape': (50000, 3, 32, 32), }
//   raw little-endian data, C order
//
// Expected arrays (names configurable through ArchiveLayout):
//   x_train  (N, 3, 32, 32) uint8
//   y_train  (N,)           any integer dtype
//   x_test   (M, 3, 32, 32) uint8
//
// Reference: NumPy NEP 1 (npy format)

use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use anyhow::{bail, ensure, Context, Result};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};

use crate::domain::image::{ImageRecord, Label, CHANNELS, HEIGHT, IMAGE_LEN, WIDTH};

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
const NPY_SUFFIX: &str = ".npy";

// ─── Archive layout ───────────────────────────────────────────────────────────
/// Names of the three arrays inside the archive (without `.npy`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveLayout {
    pub train_images: String,
    pub train_labels: String,
    pub test_images:  String,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self {
            train_images: "x_train".to_string(),
            train_labels: "y_train".to_string(),
            test_images:  "x_test".to_string(),
        }
    }
}

/// Everything the archive holds, validated.
#[derive(Debug)]
pub struct CifarArchive {
    pub train_images: Vec<ImageRecord>,
    pub train_labels: Vec<Label>,
    pub test_images:  Vec<ImageRecord>,
}

// ─── NpzLoader ────────────────────────────────────────────────────────────────
pub struct NpzLoader {
    path:   PathBuf,
    layout: ArchiveLayout,
}

impl NpzLoader {
    pub fn new(path: impl Into<PathBuf>, layout: ArchiveLayout) -> Self {
        Self { path: path.into(), layout }
    }

    pub fn load(&self) -> Result<CifarArchive> {
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open archive '{}'", self.path.display()))?;
        let mut zip = zip::ZipArchive::new(BufReader::new(file))
            .with_context(|| format!("'{}' is not a valid .npz archive", self.path.display()))?;

        let train_images = images_from(read_entry(&mut zip, &self.path, &self.layout.train_images)?)?;
        let train_labels = labels_from(read_entry(&mut zip, &self.path, &self.layout.train_labels)?)?;
        let test_images  = images_from(read_entry(&mut zip, &self.path, &self.layout.test_images)?)?;

        ensure!(
            train_images.len() == train_labels.len(),
            "archive has {} training images but {} labels",
            train_images.len(),
            train_labels.len()
        );

        tracing::info!(
            "Loaded archive '{}': {} training images, {} test images",
            self.path.display(),
            train_images.len(),
            test_images.len()
        );

        Ok(CifarArchive { train_images, train_labels, test_images })
    }
}

fn read_entry<R: Read + std::io::Seek>(
    zip:  &mut zip::ZipArchive<R>,
    path: &Path,
    name: &str,
) -> Result<NpyArray> {
    let mut entry = zip
        .by_name(&format!("{name}{NPY_SUFFIX}"))
        .with_context(|| format!("No array '{}' in '{}'", name, path.display()))?;
    let size = entry.size();
    read_npy(&mut entry, size).with_context(|| format!("Malformed array '{name}'"))
}

// ─── .npy parsing ─────────────────────────────────────────────────────────────
/// One decoded .npy entry; `data` is still raw bytes.
#[derive(Debug, PartialEq)]
struct NpyArray {
    descr: Descr,
    shape: Vec<usize>,
    data:  Vec<u8>,
}

/// Element kind and byte width, e.g. '<i8' → (Signed, 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Descr {
    kind: Kind,
    size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Signed,
    Unsigned,
}

impl Descr {
    fn parse(descr: &str) -> Result<Self> {
        let (order, body) = match descr.chars().next() {
            Some(c @ ('<' | '>' | '|' | '=')) => (c, &descr[1..]),
            _ => ('=', descr),
        };
        let kind = match body.chars().next() {
            Some('i') => Kind::Signed,
            Some('u') => Kind::Unsigned,
            _ => bail!("unsupported dtype '{}'", descr),
        };
        let size: usize = body[1..]
            .parse()
            .with_context(|| format!("bad dtype width in '{descr}'"))?;
        ensure!(matches!(size, 1 | 2 | 4 | 8), "unsupported dtype width in '{}'", descr);
        ensure!(order != '>' || size == 1, "big-endian dtype '{}' not supported", descr);
        Ok(Self { kind, size })
    }

    fn is_u8(self) -> bool {
        self.kind == Kind::Unsigned && self.size == 1
    }

    /// Decode one element to i64.
    fn read(self, bytes: &[u8]) -> i64 {
        match (self.kind, self.size) {
            (Kind::Signed, 1)   => bytes[0] as i8 as i64,
            (Kind::Unsigned, 1) => bytes[0] as i64,
            (Kind::Signed, 2)   => LittleEndian::read_i16(bytes) as i64,
            (Kind::Unsigned, 2) => LittleEndian::read_u16(bytes) as i64,
            (Kind::Signed, 4)   => LittleEndian::read_i32(bytes) as i64,
            (Kind::Unsigned, 4) => LittleEndian::read_u32(bytes) as i64,
            (Kind::Signed, _)   => LittleEndian::read_i64(bytes),
            (Kind::Unsigned, _) => LittleEndian::read_u64(bytes) as i64,
        }
    }
}

/// `available` is the entry's uncompressed size; the data the header
/// claims must fit in it before anything is allocated.
fn read_npy<R: Read>(reader: &mut R, available: u64) -> Result<NpyArray> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    ensure!(magic == NPY_MAGIC, "npy magic string mismatch");

    let major = reader.read_u8()?;
    let _minor = reader.read_u8()?;
    let header_len = match major {
        1 => reader.read_u16::<LittleEndian>()? as usize,
        2 | 3 => reader.read_u32::<LittleEndian>()? as usize,
        other => bail!("unsupported npy version {}", other),
    };
    let mut header = vec![0u8; header_len];
    reader.read_exact(&mut header)?;
    let header = String::from_utf8_lossy(&header);

    let (descr, fortran_order, shape) = parse_header(&header)?;
    ensure!(!fortran_order, "fortran-ordered arrays are not supported");

    let data_len = shape
        .iter()
        .try_fold(descr.size, |acc, &dim| acc.checked_mul(dim))
        .with_context(|| format!("npy shape {shape:?} overflows"))?;
    ensure!(
        data_len as u64 <= available,
        "npy header claims {} data bytes but the entry holds only {}",
        data_len,
        available
    );
    let mut data = vec![0u8; data_len];
    reader.read_exact(&mut data).context("npy data shorter than its header claims")?;

    Ok(NpyArray { descr, shape, data })
}

fn parse_header(header: &str) -> Result<(Descr, bool, Vec<usize>)> {
    let descr_src = field_after(header, "descr")?.trim_start();
    let descr = descr_src
        .strip_prefix('\'')
        .and_then(|s| s.split('\'').next())
        .context("npy header has an unquoted descr")?;

    let fortran_order = field_after(header, "fortran_order")?.trim_start().starts_with("True");

    let shape_src = field_after(header, "shape")?.trim_start();
    let inner = shape_src
        .strip_prefix('(')
        .and_then(|s| s.split(')').next())
        .context("npy header has a malformed shape")?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().with_context(|| format!("bad shape dimension '{s}'")))
        .collect::<Result<Vec<_>>>()?;

    Ok((Descr::parse(descr)?, fortran_order, shape))
}

fn field_after<'a>(header: &'a str, key: &str) -> Result<&'a str> {
    let pattern = format!("'{key}':");
    let start = header
        .find(&pattern)
        .with_context(|| format!("npy header has no '{key}' field"))?;
    Ok(&header[start + pattern.len()..])
}

// ─── Array → domain conversion ────────────────────────────────────────────────
fn images_from(array: NpyArray) -> Result<Vec<ImageRecord>> {
    ensure!(array.descr.is_u8(), "image array must be uint8");
    ensure!(
        array.shape.len() == 4 && array.shape[1..] == [CHANNELS, HEIGHT, WIDTH],
        "image array must have shape (N, {}, {}, {}), got {:?}",
        CHANNELS,
        HEIGHT,
        WIDTH,
        array.shape
    );
    array
        .data
        .chunks_exact(IMAGE_LEN)
        .map(|chunk| ImageRecord::new(chunk.to_vec()))
        .collect()
}

fn labels_from(array: NpyArray) -> Result<Vec<Label>> {
    // (N,) or a column vector (N, 1)
    ensure!(
        array.shape.len() == 1 || (array.shape.len() == 2 && array.shape[1] == 1),
        "label array must have shape (N,), got {:?}",
        array.shape
    );
    array
        .data
        .chunks_exact(array.descr.size)
        .map(|bytes| Label::new(array.descr.read(bytes)))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::{npy_bytes, write_npz};
    use super::*;

    #[test]
    fn test_parse_header() {
        let (descr, fortran, shape) =
            parse_header("{'descr': '<i8', 'fortran_order': False, 'shape': (4, 3, 32, 32), }").unwrap();
        assert_eq!(descr, Descr { kind: Kind::Signed, size: 8 });
        assert!(!fortran);
        assert_eq!(shape, vec![4, 3, 32, 32]);
    }

    #[test]
    fn test_parse_header_one_dimensional() {
        let (_, _, shape) =
            parse_header("{'descr': '|u1', 'fortran_order': False, 'shape': (7,), }").unwrap();
        assert_eq!(shape, vec![7]);
    }

    #[test]
    fn test_rejects_unsupported_dtypes() {
        assert!(Descr::parse("<f4").is_err());
        assert!(Descr::parse(">i4").is_err());
        assert!(Descr::parse("<i3").is_err());
    }

    #[test]
    fn test_overflowing_shape_is_an_error() {
        let bytes = npy_bytes("|u1", &[4611686018427387904, 3, 32, 32], &[]);
        let len = bytes.len() as u64;
        let err = read_npy(&mut bytes.as_slice(), len).unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_shape_larger_than_entry_is_an_error() {
        let bytes = npy_bytes("|u1", &[1000, 3, 32, 32], &[0; 16]);
        let len = bytes.len() as u64;
        assert!(read_npy(&mut bytes.as_slice(), len).is_err());
    }

    #[test]
    fn test_huge_shape_in_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.npz");
        write_npz(&path, &[
            ("x_train", npy_bytes("|u1", &[1 << 40, 3, 32, 32], &[])),
            ("y_train", npy_bytes("|u1", &[0], &[])),
            ("x_test",  npy_bytes("|u1", &[0, 3, 32, 32], &[])),
        ]);
        assert!(NpzLoader::new(&path, ArchiveLayout::default()).load().is_err());
    }

    #[test]
    fn test_descr_read_widths() {
        let d = Descr::parse("<i4").unwrap();
        assert_eq!(d.read(&(-3i32).to_le_bytes()), -3);
        let d = Descr::parse("<u2").unwrap();
        assert_eq!(d.read(&9u16.to_le_bytes()), 9);
    }

    #[test]
    fn test_load_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cifar.npz");

        let train: Vec<u8> = (0..2 * IMAGE_LEN).map(|i| (i % 251) as u8).collect();
        let labels: Vec<u8> = [3i64, 9].iter().flat_map(|l| l.to_le_bytes()).collect();
        let test: Vec<u8> = vec![17; IMAGE_LEN];

        write_npz(&path, &[
            ("x_train", npy_bytes("|u1", &[2, 3, 32, 32], &train)),
            ("y_train", npy_bytes("<i8", &[2], &labels)),
            ("x_test",  npy_bytes("|u1", &[1, 3, 32, 32], &test)),
        ]);

        let archive = NpzLoader::new(&path, ArchiveLayout::default()).load().unwrap();
        assert_eq!(archive.train_images.len(), 2);
        assert_eq!(archive.train_images[1].pixels(), &train[IMAGE_LEN..]);
        assert_eq!(
            archive.train_labels.iter().map(|l| l.index()).collect::<Vec<_>>(),
            vec![3, 9]
        );
        assert_eq!(archive.test_images.len(), 1);
    }

    #[test]
    fn test_missing_array_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.npz");
        write_npz(&path, &[("x_train", npy_bytes("|u1", &[0, 3, 32, 32], &[]))]);

        let err = NpzLoader::new(&path, ArchiveLayout::default()).load().unwrap_err();
        assert!(err.to_string().contains("y_train"));
    }

    #[test]
    fn test_out_of_range_label_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.npz");
        write_npz(&path, &[
            ("x_train", npy_bytes("|u1", &[1, 3, 32, 32], &vec![0; IMAGE_LEN])),
            ("y_train", npy_bytes("|u1", &[1], &[12])),
            ("x_test",  npy_bytes("|u1", &[0, 3, 32, 32], &[])),
        ]);
        assert!(NpzLoader::new(&path, ArchiveLayout::default()).load().is_err());
    }

    #[test]
    fn test_wrong_image_shape_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hwc.npz");
        write_npz(&path, &[
            ("x_train", npy_bytes("|u1", &[1, 32, 32, 3], &vec![0; IMAGE_LEN])),
            ("y_train", npy_bytes("|u1", &[1], &[1])),
            ("x_test",  npy_bytes("|u1", &[0, 3, 32, 32], &[])),
        ]);
        assert!(NpzLoader::new(&path, ArchiveLayout::default()).load().is_err());
    }
}
