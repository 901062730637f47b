use crate::error::IoError;
use flate2::read::GzDecoder;
use ndarray::{Array1, Array3};
use std::io::Read;
use std::path::{Path, PathBuf};

pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
pub const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
pub const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

/// Magic number of an IDX file holding unsigned bytes in 3 dimensions.
pub const IMAGE_MAGIC: u32 = 0x0000_0803;
/// Magic number of an IDX file holding unsigned bytes in 1 dimension.
pub const LABEL_MAGIC: u32 = 0x0000_0801;

const IMAGE_HEADER_LEN: usize = 16;
const LABEL_HEADER_LEN: usize = 8;

/// The four arrays of the MNIST dataset.
///
/// # Fields
///
/// - `train_images` - 60000 images of 28x28 pixels
/// - `train_labels` - Digit (0-9) of every training image
/// - `test_images` - 10000 images of 28x28 pixels
/// - `test_labels` - Digit (0-9) of every test image
#[derive(Debug, Clone, PartialEq)]
pub struct MnistData {
    pub train_images: Array3<u8>,
    pub train_labels: Array1<u8>,
    pub test_images: Array3<u8>,
    pub test_labels: Array1<u8>,
}

/// Reads a whole file, gunzipping it when the name ends in `.gz`.
fn read_file_bytes(path: &Path) -> Result<Vec<u8>, IoError> {
    let mut reader = IoError::load_in_buf_reader(path)?;
    let mut bytes = Vec::new();

    if path.extension().is_some_and(|ext| ext == "gz") {
        GzDecoder::new(reader).read_to_end(&mut bytes)?;
    } else {
        reader.read_to_end(&mut bytes)?;
    }

    Ok(bytes)
}

/// Reads the big-endian u32 header field starting at `offset`.
fn read_u32_be(bytes: &[u8], offset: usize) -> Result<u32, IoError> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_be_bytes)
        .ok_or_else(|| IoError::InvalidData(format!("IDX header truncated at byte {}", offset)))
}

fn check_magic(bytes: &[u8], expected: u32) -> Result<(), IoError> {
    let magic = read_u32_be(bytes, 0)?;
    if magic != expected {
        return Err(IoError::InvalidData(format!(
            "Bad IDX magic number 0x{:08x}, expected 0x{:08x}",
            magic, expected
        )));
    }
    Ok(())
}

fn payload(bytes: &[u8], header_len: usize, expected: usize) -> Result<&[u8], IoError> {
    let end = header_len.checked_add(expected);
    end.and_then(|end| bytes.get(header_len..end)).ok_or_else(|| {
        IoError::InvalidData(format!(
            "IDX payload truncated: expected {} bytes, found {}",
            expected,
            bytes.len().saturating_sub(header_len)
        ))
    })
}

/// Parses the content of an IDX image file.
///
/// # Returns
///
/// - `Ok(Array3<u8>)` - Images of shape (count, rows, cols)
/// - `Err(IoError::InvalidData)` - Wrong magic number or truncated content
pub fn parse_idx_images(bytes: &[u8]) -> Result<Array3<u8>, IoError> {
    check_magic(bytes, IMAGE_MAGIC)?;

    let count = read_u32_be(bytes, 4)? as usize;
    let rows = read_u32_be(bytes, 8)? as usize;
    let cols = read_u32_be(bytes, 12)? as usize;

    let len = count
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .ok_or_else(|| IoError::InvalidData(format!("IDX dimensions {}x{}x{} overflow", count, rows, cols)))?;

    let data = payload(bytes, IMAGE_HEADER_LEN, len)?;
    Array3::from_shape_vec((count, rows, cols), data.to_vec())
        .map_err(|e| IoError::InvalidData(e.to_string()))
}

/// Parses the content of an IDX label file.
///
/// # Returns
///
/// - `Ok(Array1<u8>)` - One label per item
/// - `Err(IoError::InvalidData)` - Wrong magic number or truncated content
pub fn parse_idx_labels(bytes: &[u8]) -> Result<Array1<u8>, IoError> {
    check_magic(bytes, LABEL_MAGIC)?;

    let count = read_u32_be(bytes, 4)? as usize;
    let data = payload(bytes, LABEL_HEADER_LEN, count)?;
    Ok(Array1::from(data.to_vec()))
}

/// Reads an IDX image file (`.gz` files are decompressed on the fly).
///
/// # Parameters
///
/// - `path` - Location of e.g. `train-images-idx3-ubyte`
///
/// # Returns
///
/// - `Ok(Array3<u8>)` - Images of shape (count, rows, cols)
/// - `Err(IoError)` - The file cannot be read or is not a valid image file
pub fn read_idx_images<P: AsRef<Path>>(path: P) -> Result<Array3<u8>, IoError> {
    parse_idx_images(&read_file_bytes(path.as_ref())?)
}

/// Reads an IDX label file (`.gz` files are decompressed on the fly).
pub fn read_idx_labels<P: AsRef<Path>>(path: P) -> Result<Array1<u8>, IoError> {
    parse_idx_labels(&read_file_bytes(path.as_ref())?)
}

/// Finds `name` or `name.gz` inside `dir`.
fn resolve_file(dir: &Path, name: &str) -> Result<PathBuf, IoError> {
    let plain = dir.join(name);
    if plain.is_file() {
        return Ok(plain);
    }

    let gz = dir.join(format!("{}.gz", name));
    if gz.is_file() {
        return Ok(gz);
    }

    Err(IoError::StdIoError(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("Neither {} nor {} exists", plain.display(), gz.display()),
    )))
}

/// Loads the four MNIST files from `dir`.
///
/// # Parameters
///
/// - `dir` - Directory containing `train-images-idx3-ubyte`, `train-labels-idx1-ubyte`,
///   `t10k-images-idx3-ubyte` and `t10k-labels-idx1-ubyte`, each optionally gzipped
///
/// # Returns
///
/// - `Ok(MnistData)` - All four arrays
/// - `Err(IoError)` - A file is missing or malformed, or image and label counts differ
pub fn load_data<P: AsRef<Path>>(dir: P) -> Result<MnistData, IoError> {
    let dir = dir.as_ref();
    log::info!("Loading MNIST from {}", dir.display());

    let train_images = read_idx_images(resolve_file(dir, TRAIN_IMAGES)?)?;
    let train_labels = read_idx_labels(resolve_file(dir, TRAIN_LABELS)?)?;
    let test_images = read_idx_images(resolve_file(dir, TEST_IMAGES)?)?;
    let test_labels = read_idx_labels(resolve_file(dir, TEST_LABELS)?)?;

    for (split, images, labels) in [
        ("train", train_images.shape()[0], train_labels.len()),
        ("test", test_images.shape()[0], test_labels.len()),
    ] {
        if images != labels {
            return Err(IoError::InvalidData(format!(
                "The {} split has {} images but {} labels",
                split, images, labels
            )));
        }
    }

    log::debug!(
        "Loaded {} training and {} test images",
        train_labels.len(),
        test_labels.len()
    );

    Ok(MnistData {
        train_images,
        train_labels,
        test_images,
        test_labels,
    })
}
