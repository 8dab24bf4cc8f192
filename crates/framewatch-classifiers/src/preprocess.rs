//! Frame preprocessing
//!
//! Turns a raw frame into the `(1, S, S)` or `(1, S, S, C)` batch a model
//! consumes: derive the row-major shape, resize each channel bilinearly to the
//! model's edge length, then scale by the resized frame's own maximum.

use candle_core::{Device, Tensor};
use framewatch_core::{Error, Frame, FrameShape, Result};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, LumaA, Pixel, Rgb, Rgba};
use tracing::trace;

/// Preprocess a frame into a batch tensor of edge length `target_size`
pub fn prepare(frame: &Frame, target_size: usize) -> Result<Tensor> {
    let shape = frame.processing_shape()?;
    trace!(
        source = %frame.source(),
        shape = ?shape.dims(),
        target_size,
        "Preprocessing frame"
    );

    let mut resized = resize(frame.data(), shape, target_size)?;
    normalize_by_max(&mut resized)?;
    to_batch(resized, target_size, shape.channels)
}

/// Bilinear resize of a row-major `(H, W[, C])` buffer to `size x size`
///
/// Values keep their original range; constant frames are returned as-is.
pub fn resize(data: &[f32], shape: FrameShape, size: usize) -> Result<Vec<f32>> {
    if size == 0 {
        return Err(Error::config("target size must be positive"));
    }
    if data.len() != shape.len() {
        return Err(Error::shape(format!(
            "buffer holds {} samples, shape {:?} needs {}",
            data.len(),
            shape.dims(),
            shape.len()
        )));
    }

    let channels = shape.channel_count();
    if !(1..=4).contains(&channels) {
        return Err(Error::shape(format!(
            "cannot resize frames with {} components",
            channels
        )));
    }

    let (lo, hi) = value_range(data)?;
    if hi == lo {
        return Ok(vec![lo; size * size * channels]);
    }

    // The image crate clamps float samples to [0, 1], so resample in that space.
    let span = hi - lo;
    let unit: Vec<f32> = data.iter().map(|v| (v - lo) / span).collect();

    let width = to_u32(shape.width)?;
    let height = to_u32(shape.height)?;
    let edge = to_u32(size)?;

    let resized = match channels {
        1 => resample::<Luma<f32>>(unit, width, height, edge)?,
        2 => resample::<LumaA<f32>>(unit, width, height, edge)?,
        3 => resample::<Rgb<f32>>(unit, width, height, edge)?,
        _ => resample::<Rgba<f32>>(unit, width, height, edge)?,
    };

    Ok(resized.into_iter().map(|v| v * span + lo).collect())
}

/// Scale values in place so the maximum becomes 1.0
///
/// All-zero input is left untouched.
pub fn normalize_by_max(values: &mut [f32]) -> Result<()> {
    let max = values
        .iter()
        .copied()
        .reduce(f32::max)
        .ok_or_else(|| Error::inference("cannot normalize an empty frame"))?;

    if !max.is_finite() || max < 0.0 {
        return Err(Error::inference(format!(
            "frame maximum {} cannot be used as a scale",
            max
        )));
    }
    if max == 0.0 {
        return Ok(());
    }

    for v in values.iter_mut() {
        *v /= max;
    }
    Ok(())
}

/// Add the leading batch axis
pub fn to_batch(data: Vec<f32>, size: usize, channels: Option<usize>) -> Result<Tensor> {
    let dims = match channels {
        Some(c) => vec![1, size, size, c],
        None => vec![1, size, size],
    };

    Tensor::from_vec(data, dims, &Device::Cpu)
        .map_err(|e| Error::inference(format!("Failed to build input tensor: {}", e)))
}

fn resample<P>(data: Vec<f32>, width: u32, height: u32, edge: u32) -> Result<Vec<f32>>
where
    P: Pixel<Subpixel = f32> + 'static,
{
    let image: ImageBuffer<P, Vec<f32>> = ImageBuffer::from_raw(width, height, data)
        .ok_or_else(|| Error::shape("buffer does not match image dimensions"))?;

    Ok(imageops::resize(&image, edge, edge, FilterType::Triangle).into_raw())
}

fn value_range(data: &[f32]) -> Result<(f32, f32)> {
    if data.iter().any(|v| !v.is_finite()) {
        return Err(Error::inference("frame contains non-finite samples"));
    }

    data.iter()
        .fold(None, |range, &v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f32::min(lo, v), f32::max(hi, v))),
        })
        .ok_or_else(|| Error::inference("frame is empty"))
}

fn to_u32(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| Error::shape(format!("axis length {} is too large", n)))
}
