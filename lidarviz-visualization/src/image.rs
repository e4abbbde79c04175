//! 2D image overlay

use std::sync::{Arc, Mutex};

use lidarviz_core::{row_major_slice, ArraySpec, Error, Layout, Result};
use ndarray::{ArrayView, Dimension};

use crate::lock;

/// Placement rectangle of an image, normalized viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePosition {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

impl Default for ImagePosition {
    fn default() -> Self {
        Self {
            x_min: -1.0,
            x_max: 1.0,
            y_min: -1.0,
            y_max: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Buffer {
    width: usize,
    height: usize,
    data: Arc<Vec<f32>>,
}

impl Buffer {
    fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Arc::new(Vec::new()),
        }
    }
}

#[derive(Debug, Clone)]
struct ImageState {
    image: Buffer,
    mask: Option<Buffer>,
    position: ImagePosition,
    hshift: f32,
}

/// Manages the state of a monochrome image with an optional RGBA mask
#[derive(Debug)]
pub struct Image {
    state: Mutex<ImageState>,
}

impl Image {
    /// Empty image covering the whole viewport
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ImageState {
                image: Buffer::empty(),
                mask: None,
                position: ImagePosition::default(),
                hshift: 0.0,
            }),
        }
    }

    /// Image initialized from a `h x w` buffer
    pub fn from_array<D: Dimension>(image: ArrayView<'_, f32, D>) -> Result<Self> {
        let img = Self::new();
        img.set_image(image)?;
        Ok(img)
    }

    /// Set the image data from a C-contiguous `h x w` array of values in `[0, 1]`
    ///
    /// The size may differ from the previous image. A mask set earlier is
    /// kept as is.
    pub fn set_image<D: Dimension>(&self, image: ArrayView<'_, f32, D>) -> Result<()> {
        ArraySpec::any().ndim(2).layout(Layout::RowMajor).check(&image)?;
        let shape = image.shape();
        let (height, width) = (shape[0], shape[1]);
        let data = row_major_slice(&image)?.to_vec();

        lock(&self.state).image = Buffer {
            width,
            height,
            data: Arc::new(data),
        };
        Ok(())
    }

    /// Set the RGBA mask from a C-contiguous `h x w x 4` array
    pub fn set_mask<D: Dimension>(&self, mask: ArrayView<'_, f32, D>) -> Result<()> {
        ArraySpec::any().ndim(3).layout(Layout::RowMajor).check(&mask)?;
        let shape = mask.shape();
        if shape[2] != 4 {
            return Err(Error::ShapeMismatch(format!(
                "Expected a h x w x 4 mask, got {} x {} x {}",
                shape[0], shape[1], shape[2]
            )));
        }
        let (height, width) = (shape[0], shape[1]);
        let data = row_major_slice(&mask)?.to_vec();

        lock(&self.state).mask = Some(Buffer {
            width,
            height,
            data: Arc::new(data),
        });
        Ok(())
    }

    /// Set the display rectangle; x spans left to right, y bottom to top
    ///
    /// Both axes use the vertical viewport scale: y covers `[-1, 1]` and x is
    /// measured in the same units, so the window width is ignored and the
    /// image keeps its aspect ratio when the window is resized.
    pub fn set_position(&self, x_min: f32, x_max: f32, y_min: f32, y_max: f32) {
        lock(&self.state).position = ImagePosition {
            x_min,
            x_max,
            y_min,
            y_max,
        };
    }

    pub fn position(&self) -> ImagePosition {
        lock(&self.state).position
    }

    /// Shift the image horizontally in normalized viewport width units
    ///
    /// `0` leaves the image centered, `-1` moves it left by half the viewport
    /// and `1` moves it right by half the viewport, which snaps an image to a
    /// screen edge.
    pub fn set_hshift(&self, shift: f32) {
        lock(&self.state).hshift = shift;
    }

    pub fn hshift(&self) -> f32 {
        lock(&self.state).hshift
    }

    /// Image dimensions as `(width, height)`
    pub fn size(&self) -> (usize, usize) {
        let state = lock(&self.state);
        (state.image.width, state.image.height)
    }

    pub fn snapshot(&self) -> ImageFrame {
        let state = lock(&self.state).clone();
        ImageFrame { state }
    }
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

/// Published state of an image
#[derive(Debug, Clone)]
pub struct ImageFrame {
    state: ImageState,
}

impl ImageFrame {
    pub fn width(&self) -> usize {
        self.state.image.width
    }

    pub fn height(&self) -> usize {
        self.state.image.height
    }

    pub fn position(&self) -> ImagePosition {
        self.state.position
    }

    pub fn hshift(&self) -> f32 {
        self.state.hshift
    }

    pub fn data(&self) -> &[f32] {
        &self.state.image.data
    }

    pub fn has_mask(&self) -> bool {
        self.state.mask.is_some()
    }

    /// Color at texture coordinates `u, v` in `[0, 1]`, top left origin
    ///
    /// The mask is sampled with the same coordinates even if its size differs
    /// from the image.
    pub fn sample(&self, u: f32, v: f32) -> Option<[f32; 4]> {
        let image = &self.state.image;
        if image.width == 0 || image.height == 0 {
            return None;
        }
        let u = u.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);

        let value = texel(image, u, v, 1)[0].clamp(0.0, 1.0);
        let mut rgba = [value, value, value, 1.0];

        if let Some(mask) = self.state.mask.as_ref().filter(|m| m.width > 0 && m.height > 0) {
            let m = texel(mask, u, v, 4);
            let a = m[3].clamp(0.0, 1.0);
            for c in 0..3 {
                rgba[c] = rgba[c] * (1.0 - a) + m[c] * a;
            }
        }
        Some(rgba)
    }
}

fn texel(buffer: &Buffer, u: f32, v: f32, channels: usize) -> &[f32] {
    let x = ((u * buffer.width as f32) as usize).min(buffer.width - 1);
    let y = ((v * buffer.height as f32) as usize).min(buffer.height - 1);
    let start = (y * buffer.width + x) * channels;
    &buffer.data[start..start + channels]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, ShapeBuilder};

    #[test]
    fn test_position_echo() {
        let image = Image::from_array(Array2::<f32>::zeros((3, 5)).view()).unwrap();
        assert_eq!(image.size(), (5, 3));
        image.set_position(-1.0, 1.0, -1.0, 1.0);
        assert_eq!(
            image.position(),
            ImagePosition {
                x_min: -1.0,
                x_max: 1.0,
                y_min: -1.0,
                y_max: 1.0
            }
        );
        image.set_position(-0.5, 0.25, 0.0, 0.75);
        let p = image.position();
        assert_eq!((p.x_min, p.x_max, p.y_min, p.y_max), (-0.5, 0.25, 0.0, 0.75));
    }

    #[test]
    fn test_validation_keeps_previous_image() {
        let image = Image::from_array(Array2::<f32>::zeros((3, 5)).view()).unwrap();
        let fortran = Array2::<f32>::zeros((4, 4).f());
        assert!(image.set_image(fortran.view()).is_err());
        assert!(image.set_image(Array3::<f32>::zeros((2, 2, 1)).view()).is_err());
        assert_eq!(image.size(), (5, 3));

        assert!(image.set_mask(Array3::<f32>::zeros((3, 5, 3)).view()).is_err());
        assert!(image.set_mask(Array2::<f32>::zeros((3, 20)).view()).is_err());
        assert!(!image.snapshot().has_mask());
    }

    #[test]
    fn test_resize_keeps_mask() {
        let image = Image::from_array(Array2::<f32>::zeros((3, 5)).view()).unwrap();
        image.set_mask(Array3::<f32>::zeros((3, 5, 4)).view()).unwrap();
        image.set_image(Array2::<f32>::zeros((8, 8)).view()).unwrap();
        let frame = image.snapshot();
        assert_eq!((frame.width(), frame.height()), (8, 8));
        assert!(frame.has_mask());
        assert!(frame.sample(0.99, 0.99).is_some());
    }

    #[test]
    fn test_hshift_leaves_texture_coordinates() {
        let data = Array2::from_shape_vec((1, 4), vec![0.0f32, 0.25, 0.5, 1.0]).unwrap();
        let image = Image::from_array(data.view()).unwrap();
        image.set_hshift(-1.0);
        assert_eq!(image.hshift(), -1.0);

        let frame = image.snapshot();
        assert_eq!(frame.hshift(), -1.0);
        assert_eq!(frame.sample(0.0, 0.0).map(|c| c[0]), Some(0.0));
        assert_eq!(frame.sample(0.99, 0.0).map(|c| c[0]), Some(1.0));
    }

    #[test]
    fn test_mask_blends_over_image() {
        let image = Image::from_array(Array2::from_elem((2, 2), 1.0f32).view()).unwrap();
        let mut mask = Array3::<f32>::zeros((2, 2, 4));
        mask[[0, 0, 0]] = 1.0;
        mask[[0, 0, 3]] = 1.0;
        image.set_mask(mask.view()).unwrap();

        let frame = image.snapshot();
        assert_eq!(frame.sample(0.0, 0.0), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(frame.sample(0.9, 0.9), Some([1.0, 1.0, 1.0, 1.0]));
        assert_eq!(Image::new().snapshot().sample(0.5, 0.5), None);
    }
}
