//! TIFF volume reading and mask writing.
//!
//! Multiplexed acquisitions arrive as multi-page OME-TIFF files: one
//! grayscale page per channel (and per Z-slice or timepoint in hyperstack
//! layouts). The reader stacks equal-sized pages along a new leading axis
//! and leaves interpreting that axis to the geometry resolver. Masks are
//! written back as single-page 16-bit grayscale TIFFs.

use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::traits::VolumeReader;
use crate::domain::{CellMask, ImageVolume};
use ndarray::{Array2, Axis};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::ColorType;
use tracing::debug;

/// Reads multi-page grayscale TIFF files into image volumes.
///
/// Pages must all share the same dimensions and a grayscale color type;
/// sample values are widened to `f32`. A single-page file decodes to a 2D
/// volume, a multi-page file to a 3D volume with the page index as the
/// leading axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffVolumeReader;

impl TiffVolumeReader {
    /// Creates a new reader instance.
    pub const fn new() -> Self {
        Self
    }

    fn decode_page(
        decoder: &mut Decoder<BufReader<File>>,
        path: &Path,
    ) -> PipelineResult<Array2<f32>> {
        let (width, height) = decoder
            .dimensions()
            .map_err(|e| PipelineError::volume_read(path, e.to_string()))?;
        let color_type = decoder
            .colortype()
            .map_err(|e| PipelineError::volume_read(path, e.to_string()))?;

        if !matches!(color_type, ColorType::Gray(_)) {
            return Err(PipelineError::volume_read(
                path,
                format!(
                    "unsupported color type {:?}: expected one grayscale page per channel",
                    color_type
                ),
            ));
        }

        let samples: Vec<f32> = match decoder
            .read_image()
            .map_err(|e| PipelineError::volume_read(path, e.to_string()))?
        {
            DecodingResult::U8(data) => data.into_iter().map(f32::from).collect(),
            DecodingResult::U16(data) => data.into_iter().map(f32::from).collect(),
            DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
            DecodingResult::F32(data) => data,
            other => {
                return Err(PipelineError::volume_read(
                    path,
                    format!("unsupported sample format {}", sample_format_name(&other)),
                ));
            }
        };

        Array2::from_shape_vec((height as usize, width as usize), samples).map_err(|e| {
            PipelineError::volume_read(path, format!("page buffer does not match dimensions: {e}"))
        })
    }
}

fn sample_format_name(result: &DecodingResult) -> &'static str {
    match result {
        DecodingResult::U8(_) => "u8",
        DecodingResult::U16(_) => "u16",
        DecodingResult::U32(_) => "u32",
        DecodingResult::U64(_) => "u64",
        DecodingResult::F32(_) => "f32",
        DecodingResult::F64(_) => "f64",
        _ => "signed integer",
    }
}

impl VolumeReader for TiffVolumeReader {
    fn read_volume(&self, path: &Path) -> PipelineResult<ImageVolume> {
        let file =
            File::open(path).map_err(|e| PipelineError::volume_read(path, e.to_string()))?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| PipelineError::volume_read(path, e.to_string()))?;

        let mut pages: Vec<Array2<f32>> = Vec::new();
        loop {
            let page = Self::decode_page(&mut decoder, path)?;
            if let Some(first) = pages.first() {
                if first.dim() != page.dim() {
                    return Err(PipelineError::volume_read(
                        path,
                        format!(
                            "page {} has dimensions {:?}, expected {:?}",
                            pages.len(),
                            page.dim(),
                            first.dim()
                        ),
                    ));
                }
            }
            pages.push(page);

            if !decoder.more_images() {
                break;
            }
            decoder
                .next_image()
                .map_err(|e| PipelineError::volume_read(path, e.to_string()))?;
        }

        debug!(pages = pages.len(), ?path, "decoded TIFF volume");

        let data = if pages.len() == 1 {
            pages.pop().expect("one page").into_dyn()
        } else {
            let views: Vec<_> = pages.iter().map(Array2::view).collect();
            ndarray::stack(Axis(0), &views)
                .map_err(|e| PipelineError::volume_read(path, e.to_string()))?
                .into_dyn()
        };

        ImageVolume::new(data).ok_or_else(|| {
            PipelineError::volume_read(path, "decoded volume has unsupported dimensionality")
        })
    }
}

/// Writes a cell mask as a single-page 16-bit grayscale TIFF.
///
/// # Arguments
///
/// * `mask` - The mask to write.
/// * `path` - Destination path.
///
/// # Returns
///
/// Ok on success; an error if the mask holds more cells than 16 bits can
/// label (refused rather than silently truncated) or if encoding fails.
pub fn write_mask_tiff(mask: &CellMask, path: &Path) -> PipelineResult<()> {
    let max_label = mask.cell_count();
    if max_label > u32::from(u16::MAX) {
        return Err(PipelineError::tiff_write(
            path,
            format!("mask holds {} cells, exceeding 16-bit labels", max_label),
        ));
    }

    let (height, width) = mask.dimensions();
    let samples: Vec<u16> = mask.labels().iter().map(|&v| v as u16).collect();

    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))
        .map_err(|e| PipelineError::tiff_write(path, e.to_string()))?;
    encoder
        .write_image::<colortype::Gray16>(width as u32, height as u32, &samples)
        .map_err(|e| PipelineError::tiff_write(path, e.to_string()))?;

    Ok(())
}

/// Reads a cell mask back from a grayscale TIFF.
///
/// # Arguments
///
/// * `path` - Path of the mask file.
///
/// # Returns
///
/// The decoded mask, or an error if the file is not a single-page
/// grayscale integer image.
pub fn read_mask_tiff(path: &Path) -> PipelineResult<CellMask> {
    let file = File::open(path).map_err(|e| PipelineError::volume_read(path, e.to_string()))?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| PipelineError::volume_read(path, e.to_string()))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| PipelineError::volume_read(path, e.to_string()))?;
    let labels: Vec<u32> = match decoder
        .read_image()
        .map_err(|e| PipelineError::volume_read(path, e.to_string()))?
    {
        DecodingResult::U8(data) => data.into_iter().map(u32::from).collect(),
        DecodingResult::U16(data) => data.into_iter().map(u32::from).collect(),
        DecodingResult::U32(data) => data,
        other => {
            return Err(PipelineError::volume_read(
                path,
                format!(
                    "mask must use integer samples, got {}",
                    sample_format_name(&other)
                ),
            ));
        }
    };

    let labels = Array2::from_shape_vec((height as usize, width as usize), labels)
        .map_err(|e| PipelineError::volume_read(path, e.to_string()))?;
    Ok(CellMask::new(labels))
}

/// Writes a composite image as a single-page interleaved 32-bit float RGB
/// TIFF, the file handed to the segmentation model command.
///
/// # Arguments
///
/// * `composite` - The composite to write.
/// * `path` - Destination path.
pub fn write_composite_tiff(
    composite: &crate::processors::CompositeImage,
    path: &Path,
) -> PipelineResult<()> {
    let (height, width) = composite.dimensions();
    let samples: Vec<f32> = composite.data().iter().copied().collect();

    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))
        .map_err(|e| PipelineError::tiff_write(path, e.to_string()))?;
    encoder
        .write_image::<colortype::RGB32Float>(width as u32, height as u32, &samples)
        .map_err(|e| PipelineError::tiff_write(path, e.to_string()))?;
    Ok(())
}

/// Writes an image volume as a multi-page 32-bit float grayscale TIFF, the
/// file handed to the annotation model command.
///
/// Leading axes are flattened into the page sequence; the trailing two
/// axes become the page dimensions.
///
/// # Arguments
///
/// * `volume` - The volume to write.
/// * `path` - Destination path.
pub fn write_volume_tiff(volume: &ImageVolume, path: &Path) -> PipelineResult<()> {
    let shape = volume.shape();
    let (height, width) = (shape[shape.len() - 2], shape[shape.len() - 1]);
    let page_len = height * width;

    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))
        .map_err(|e| PipelineError::tiff_write(path, e.to_string()))?;

    let samples: Vec<f32> = volume.data().iter().copied().collect();
    for page in samples.chunks(page_len) {
        encoder
            .write_image::<colortype::Gray32Float>(width as u32, height as u32, page)
            .map_err(|e| PipelineError::tiff_write(path, e.to_string()))?;
    }
    Ok(())
}
