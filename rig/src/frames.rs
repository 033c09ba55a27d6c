use image::codecs::bmp::BmpEncoder;
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, ImageEncoder, ImageError};
use rig_traits::{Frame, PixelFormat, Timestamp};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use strum_macros::{Display, EnumString};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ImageFormat {
    /// Binary graymap (`P5`)
    Pgm,
    Bmp,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Pgm => "pgm",
            ImageFormat::Bmp => "bmp",
        }
    }
}

#[derive(Debug, Error)]
pub enum FrameSaveError {
    #[error("frame {sequence} holds {actual} bytes, expected {expected}")]
    Incomplete {
        sequence: u64,
        expected: usize,
        actual: usize,
    },
    #[error("{pixel_format} frames cannot be stored as {image_format}")]
    Unsupported {
        pixel_format: PixelFormat,
        image_format: ImageFormat,
    },
    #[error("{} already exists, refusing to overwrite it", .0.display())]
    Exists(PathBuf),
    #[error("failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

/// `Image-<seconds>-<nanoseconds>.<ext>`, zero padded so that names sort in
/// capture order.
pub fn frame_file_name(ts: Timestamp, format: ImageFormat) -> String {
    format!(
        "Image-{:010}-{:09}.{}",
        ts.seconds,
        ts.nanoseconds,
        format.extension()
    )
}

/// Writes captured frames into one directory, named by capture time.
///
/// Existing files are never replaced.
#[derive(Debug, Clone)]
pub struct FrameStore {
    dir: PathBuf,
    format: ImageFormat,
}

impl FrameStore {
    pub fn new(dir: impl Into<PathBuf>, format: ImageFormat) -> Self {
        FrameStore {
            dir: dir.into(),
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn path_for(&self, ts: Timestamp) -> PathBuf {
        self.dir.join(frame_file_name(ts, self.format))
    }

    pub fn save(&self, frame: &Frame, ts: Timestamp) -> Result<PathBuf, FrameSaveError> {
        if !frame.is_complete() {
            return Err(FrameSaveError::Incomplete {
                sequence: frame.sequence,
                expected: frame.width as usize
                    * frame.height as usize
                    * frame.format.bytes_per_pixel(),
                actual: frame.data.len(),
            });
        }

        let color = match (frame.format, self.format) {
            (PixelFormat::Mono8, _) => ExtendedColorType::L8,
            (PixelFormat::Rgb8, ImageFormat::Bmp) => ExtendedColorType::Rgb8,
            (pixel_format, image_format) => {
                return Err(FrameSaveError::Unsupported {
                    pixel_format,
                    image_format,
                })
            }
        };

        let path = self.path_for(ts);
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(FrameSaveError::Exists(path))
            }
            Err(source) => return Err(FrameSaveError::Create { path, source }),
        };

        let mut writer = BufWriter::new(file);
        let encoded = match self.format {
            ImageFormat::Pgm => PnmEncoder::new(&mut writer)
                .with_subtype(PnmSubtype::Graymap(SampleEncoding::Binary))
                .write_image(&frame.data, frame.width, frame.height, color),
            ImageFormat::Bmp => BmpEncoder::new(&mut writer).write_image(
                &frame.data,
                frame.width,
                frame.height,
                color,
            ),
        };
        encoded
            .and_then(|()| writer.flush().map_err(ImageError::IoError))
            .map_err(|source| FrameSaveError::Encode {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}
