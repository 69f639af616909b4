use super::*;
use crate::Error;
use byteorder::BE;
use byteorder::ReadBytesExt;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;

/// Which half of the MNIST distribution to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Test => "t10k",
        }
    }
}

impl Images {
    /// Read the uncompressed IDX pair for `split` from `dir`.
    pub fn mnist(dir: &Path, split: Split) -> crate::Result<Self> {
        let images = dir.join(format!("{}-images-idx3-ubyte", split.prefix()));
        let labels = dir.join(format!("{}-labels-idx1-ubyte", split.prefix()));
        let (raw, width) = Self::read_images(&images)?;
        let labels = Self::read_labels(&labels)?;
        match raw.len() == labels.len() * width {
            true => Ok(Self::from_raw(&raw, labels, width)),
            false => Err(Error::Dataset {
                path: images,
                reason: format!("image count disagrees with {} labels", labels.len()),
            }),
        }
    }

    fn read_images(path: &Path) -> crate::Result<(Vec<u8>, usize)> {
        let fail = |reason: String| Error::Dataset {
            path: path.to_path_buf(),
            reason,
        };
        let ref mut reader = File::open(path).map(BufReader::new).map_err(|e| fail(e.to_string()))?;
        let header = (0..4)
            .map(|_| reader.read_u32::<BE>())
            .collect::<std::io::Result<Vec<u32>>>()
            .map_err(|e| fail(e.to_string()))?;
        if header[0] != IMAGES_MAGIC {
            return Err(fail(format!("bad magic {:#010x}", header[0])));
        }
        let (count, rows, cols) = (header[1] as usize, header[2] as usize, header[3] as usize);
        let mut raw = vec![0u8; count * rows * cols];
        reader.read_exact(&mut raw).map_err(|e| fail(e.to_string()))?;
        Ok((raw, rows * cols))
    }

    fn read_labels(path: &Path) -> crate::Result<Vec<u8>> {
        let fail = |reason: String| Error::Dataset {
            path: path.to_path_buf(),
            reason,
        };
        let ref mut reader = File::open(path).map(BufReader::new).map_err(|e| fail(e.to_string()))?;
        let magic = reader.read_u32::<BE>().map_err(|e| fail(e.to_string()))?;
        if magic != LABELS_MAGIC {
            return Err(fail(format!("bad magic {:#010x}", magic)));
        }
        let count = reader.read_u32::<BE>().map_err(|e| fail(e.to_string()))? as usize;
        let mut labels = vec![0u8; count];
        reader.read_exact(&mut labels).map_err(|e| fail(e.to_string()))?;
        match labels.iter().position(|l| *l as usize >= crate::CLASSES) {
            Some(i) => Err(fail(format!("label {} at index {} is not a class", labels[i], i))),
            None => Ok(labels),
        }
    }
}
