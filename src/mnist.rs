//! MNIST images and the IDX file reader.
//!
//! IDX headers are big-endian `u32`s: the images file carries magic 2051,
//! count, rows and columns, the labels file magic 2049 and count. Both
//! payloads are raw bytes, one per pixel or label.

use crate::error::{NetError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use log::info;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

pub const IMAGE_SIDE_LENGTH: usize = 28;
pub const IMAGE_AREA: usize = IMAGE_SIDE_LENGTH * IMAGE_SIDE_LENGTH;
pub const LABEL_VALUES_NUMBER: usize = 10;

const IMAGES_MAGIC: u32 = 2051;
const LABELS_MAGIC: u32 = 2049;

/// One labelled image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    index: usize,
    intensities: Vec<u8>,
    label: u8,
}

impl Image {
    /// `index` is the image's position within its dataset file.
    pub fn new(index: usize, intensities: Vec<u8>, label: u8) -> Self {
        Self {
            index,
            intensities,
            label,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Row-major pixel intensities.
    pub fn intensities(&self) -> &[u8] {
        &self.intensities
    }

    /// Intensity at column `x`, row `y` of a 28x28 image; 0 outside the image.
    pub fn intensity(&self, x: usize, y: usize) -> u8 {
        if x >= IMAGE_SIDE_LENGTH {
            return 0;
        }
        self.intensities
            .get(IMAGE_SIDE_LENGTH * y + x)
            .copied()
            .unwrap_or(0)
    }

    pub fn label(&self) -> u8 {
        self.label
    }
}

fn read_header(reader: &mut impl Read, what: &str) -> Result<u32> {
    reader.read_u32::<BigEndian>().map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => NetError::dataset(format!("{} header is truncated", what)),
        _ => e.into(),
    })
}

/// Read exactly `len` bytes. The buffer grows with the data actually read, so
/// a corrupt header count cannot force a huge allocation up front.
fn read_payload(reader: &mut impl Read, len: usize, what: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(NetError::dataset(format!(
            "{} payload is truncated: expected {} bytes, read {}",
            what,
            len,
            buf.len()
        )));
    }
    Ok(buf)
}

/// Read a whole images/labels pair.
pub fn read_mnist<I: Read, L: Read>(mut images: I, mut labels: L) -> Result<Vec<Image>> {
    let magic = read_header(&mut images, "images")?;
    if magic != IMAGES_MAGIC {
        return Err(NetError::dataset(format!(
            "images magic number is {}, expected {}",
            magic, IMAGES_MAGIC
        )));
    }
    let count = read_header(&mut images, "images")? as usize;
    let rows = read_header(&mut images, "images")? as usize;
    let cols = read_header(&mut images, "images")? as usize;
    if rows != IMAGE_SIDE_LENGTH || cols != IMAGE_SIDE_LENGTH {
        return Err(NetError::dataset(format!(
            "images are {}x{}, expected {}x{}",
            cols, rows, IMAGE_SIDE_LENGTH, IMAGE_SIDE_LENGTH
        )));
    }

    let magic = read_header(&mut labels, "labels")?;
    if magic != LABELS_MAGIC {
        return Err(NetError::dataset(format!(
            "labels magic number is {}, expected {}",
            magic, LABELS_MAGIC
        )));
    }
    let label_count = read_header(&mut labels, "labels")? as usize;
    if label_count != count {
        return Err(NetError::dataset(format!(
            "{} images but {} labels",
            count, label_count
        )));
    }

    let pixels_len = count
        .checked_mul(IMAGE_AREA)
        .ok_or_else(|| NetError::dataset(format!("image count {} is too large", count)))?;
    let pixels = read_payload(&mut images, pixels_len, "images")?;
    let label_bytes = read_payload(&mut labels, count, "labels")?;

    if let Some((i, &label)) = label_bytes
        .iter()
        .enumerate()
        .find(|(_, l)| usize::from(**l) >= LABEL_VALUES_NUMBER)
    {
        return Err(NetError::dataset(format!(
            "label {} of image {} is out of range",
            label, i
        )));
    }

    Ok(pixels
        .chunks_exact(IMAGE_AREA)
        .zip(label_bytes)
        .enumerate()
        .map(|(i, (chunk, label))| Image::new(i, chunk.to_vec(), label))
        .collect())
}

pub fn load_mnist<P: AsRef<Path>, Q: AsRef<Path>>(images_path: P, labels_path: Q) -> Result<Vec<Image>> {
    let images = BufReader::new(File::open(images_path.as_ref())?);
    let labels = BufReader::new(File::open(labels_path.as_ref())?);
    let mnist = read_mnist(images, labels)?;
    info!(
        "loaded {} images from {}",
        mnist.len(),
        images_path.as_ref().display()
    );
    Ok(mnist)
}

/// `number` images starting at `offset`, or a `Config` error if the range
/// runs past the end of the dataset.
pub fn slice(images: &[Image], offset: usize, number: usize) -> Result<&[Image]> {
    offset
        .checked_add(number)
        .and_then(|end| images.get(offset..end))
        .ok_or_else(|| {
            NetError::config(format!(
                "images {}..{} requested but the dataset holds {}",
                offset,
                offset.saturating_add(number),
                images.len()
            ))
        })
}
