//! Image type with physical metadata and coordinate transformations.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use crate::error::{ImageError, Result};
use crate::spatial::{Direction, Point, Spacing};
use super::metadata::ImageMetadata;
use super::pixel::PixelType;
use super::region::BoundingBox;

/// Medical image with physical metadata.
///
/// Voxel values live in a tensor shaped `[Z, Y, X]` (for 3D). Origin,
/// spacing and direction use index order (x, y, z), so `size()` is the
/// reversed tensor shape. A physical point is
/// `origin + direction * (index ∘ spacing)`.
///
/// # Examples
/// ```rust
/// use bonereg_core::Image;
/// use bonereg_core::spatial::{Point3, Spacing3, Direction3};
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let data = Tensor::<Backend, 3>::zeros([8, 10, 12], &device);
/// let image = Image::new(data, Point3::origin(), Spacing3::uniform(1.0), Direction3::identity()).unwrap();
/// assert_eq!(image.size(), [12, 10, 8]);
/// ```
#[derive(Debug, Clone)]
pub struct Image<B: Backend, const D: usize> {
    data: Tensor<B, D>,
    origin: Point<D>,
    spacing: Spacing<D>,
    direction: Direction<D>,
    pixel_type: PixelType,
}

impl<B: Backend, const D: usize> Image<B, D> {
    /// Create a new Float32 image with the given data and metadata.
    ///
    /// Fails when the spacing is not positive or the direction is singular.
    pub fn new(
        data: Tensor<B, D>,
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Result<Self> {
        let image = Self {
            data,
            origin,
            spacing,
            direction,
            pixel_type: PixelType::Float32,
        };
        image.metadata().validate()?;
        Ok(image)
    }

    /// Build an image from raster-ordered voxel values (x fastest).
    pub fn from_voxels(
        voxels: Vec<f32>,
        metadata: &ImageMetadata<D>,
        pixel_type: PixelType,
        device: &B::Device,
    ) -> Result<Self> {
        metadata.validate()?;
        if voxels.len() != metadata.num_voxels() {
            return Err(ImageError::shape_mismatch(&[metadata.num_voxels()], &[voxels.len()]));
        }
        let data = Tensor::<B, D>::from_data(
            TensorData::new(voxels, Shape::new(metadata.shape())),
            device,
        );
        Ok(Self {
            data,
            origin: metadata.origin,
            spacing: metadata.spacing,
            direction: metadata.direction,
            pixel_type,
        })
    }

    /// Tag the image with a pixel type without touching the values.
    pub fn with_pixel_type(mut self, pixel_type: PixelType) -> Self {
        self.pixel_type = pixel_type;
        self
    }

    /// New image on the same grid with different voxel values.
    pub fn with_data(&self, data: Tensor<B, D>) -> Self {
        Self {
            data,
            origin: self.origin,
            spacing: self.spacing,
            direction: self.direction,
            pixel_type: self.pixel_type,
        }
    }

    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    pub fn into_tensor(self) -> Tensor<B, D> {
        self.data
    }

    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    pub fn device(&self) -> B::Device {
        self.data.device()
    }

    /// Tensor shape (`[Z, Y, X]` for 3D).
    pub fn shape(&self) -> [usize; D] {
        self.data.dims()
    }

    /// Voxel count per index axis (x, y, z).
    pub fn size(&self) -> [usize; D] {
        let shape = self.shape();
        std::array::from_fn(|i| shape[D - 1 - i])
    }

    pub fn num_voxels(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn metadata(&self) -> ImageMetadata<D> {
        ImageMetadata::new(self.size(), self.origin, self.spacing, self.direction)
    }

    /// Whether `other` has the same voxel grid.
    pub fn is_same_grid<B2: Backend>(&self, other: &Image<B2, D>) -> bool {
        self.metadata().is_same_grid(&other.metadata())
    }

    /// Voxel values in raster order (x fastest).
    pub fn to_vec(&self) -> Result<Vec<f32>> {
        self.data
            .clone()
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| ImageError::Data(format!("{:?}", e)))
    }

    /// Convert values to another pixel type (clamp, then truncate for integer types).
    pub fn cast(&self, pixel_type: PixelType) -> Result<Self> {
        if !pixel_type.is_integer() {
            return Ok(self.clone().with_pixel_type(pixel_type));
        }
        let voxels = self.to_vec()?.into_iter().map(|v| pixel_type.cast(v)).collect();
        Self::from_voxels(voxels, &self.metadata(), pixel_type, &self.device())
    }

    /// Physical position of the geometric centre of the voxel grid.
    pub fn physical_center(&self) -> Point<D> {
        let size = self.size();
        let mut index = Point::<D>::origin();
        for i in 0..D {
            index[i] = (size[i] as f64 - 1.0) / 2.0;
        }
        self.transform_continuous_index_to_physical_point(&index)
    }

    /// Extract a sub-image.
    ///
    /// The crop keeps spacing and direction; its origin is the physical
    /// position of `region.start`, so every voxel keeps its physical location.
    pub fn region_of_interest(&self, region: &BoundingBox<D>) -> Result<Self> {
        region.check_within(self.size())?;
        let end = region.end();
        let ranges: [std::ops::Range<usize>; D] =
            std::array::from_fn(|i| region.start[D - 1 - i]..end[D - 1 - i]);
        let mut start_index = Point::<D>::origin();
        for i in 0..D {
            start_index[i] = region.start[i] as f64;
        }
        Ok(Self {
            data: self.data.clone().slice(ranges),
            origin: self.transform_continuous_index_to_physical_point(&start_index),
            spacing: self.spacing,
            direction: self.direction,
            pixel_type: self.pixel_type,
        })
    }

    /// Convert a physical point to a continuous index.
    pub fn transform_physical_point_to_continuous_index(&self, point: &Point<D>) -> Point<D> {
        self.metadata().physical_to_index(point)
    }

    /// Convert a continuous index to a physical point.
    pub fn transform_continuous_index_to_physical_point(&self, index: &Point<D>) -> Point<D> {
        self.metadata().index_to_physical(index)
    }

    /// Batch physical-to-index mapping for a `[N, D]` tensor of points.
    pub fn world_to_index_tensor(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        self.metadata().world_to_index_tensor(points)
    }

    /// Batch index-to-physical mapping for a `[N, D]` tensor of indices.
    pub fn index_to_world_tensor(&self, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        self.metadata().index_to_world_tensor(indices)
    }
}
