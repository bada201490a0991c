//! Typed, strided element access over buffer views.
//!
//! [`Accessor::read_element`] is the only place where raw buffer bytes are
//! turned into numbers: it applies strides, sparse overrides, component
//! decoding and integer normalization. Meshes, skins and animations read
//! their data through it.

use std::fmt::{self, Display, Formatter};

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};
use serde_json::Value;

use crate::{
    buffer::{view_bytes, Buffer, BufferView},
    error::LoadError,
    extension::Extensions,
    index::Index,
    math::BoundingBox,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            5120 => Some(Self::I8),
            5121 => Some(Self::U8),
            5122 => Some(Self::I16),
            5123 => Some(Self::U16),
            5125 => Some(Self::U32),
            5126 => Some(Self::F32),
            _ => None,
        }
    }

    pub fn size(self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }

    pub fn is_float(self) -> bool {
        self == ComponentType::F32
    }

    /// Decode one component. `bytes` holds exactly [`ComponentType::size`]
    /// little-endian bytes.
    #[inline]
    fn decode(self, bytes: &[u8], normalized: bool) -> f32 {
        let value = match self {
            ComponentType::I8 => bytes[0] as i8 as f32,
            ComponentType::U8 => bytes[0] as f32,
            ComponentType::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            ComponentType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            ComponentType::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            ComponentType::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        };
        if normalized {
            self.normalize(value)
        } else {
            value
        }
    }

    /// Map a raw integer value into `[0, 1]` or `[-1, 1]`. Wider types are
    /// never normalized and pass through.
    #[inline]
    pub fn normalize(self, value: f32) -> f32 {
        match self {
            ComponentType::I8 => (value / i8::MAX as f32).max(-1.0),
            ComponentType::U8 => value / u8::MAX as f32,
            ComponentType::I16 => (value / i16::MAX as f32).max(-1.0),
            ComponentType::U16 => value / u16::MAX as f32,
            ComponentType::U32 | ComponentType::F32 => value,
        }
    }

    #[inline]
    pub(crate) fn decode_u32(self, bytes: &[u8]) -> Option<u32> {
        match self {
            ComponentType::U8 => Some(bytes[0] as u32),
            ComponentType::U16 => Some(u16::from_le_bytes([bytes[0], bytes[1]]) as u32),
            ComponentType::U32 => Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            _ => None,
        }
    }
}

impl Display for ComponentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentType::I8 => "BYTE",
            ComponentType::U8 => "UNSIGNED_BYTE",
            ComponentType::I16 => "SHORT",
            ComponentType::U16 => "UNSIGNED_SHORT",
            ComponentType::U32 => "UNSIGNED_INT",
            ComponentType::F32 => "FLOAT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimensions {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl Dimensions {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SCALAR" => Some(Self::Scalar),
            "VEC2" => Some(Self::Vec2),
            "VEC3" => Some(Self::Vec3),
            "VEC4" => Some(Self::Vec4),
            "MAT2" => Some(Self::Mat2),
            "MAT3" => Some(Self::Mat3),
            "MAT4" => Some(Self::Mat4),
            _ => None,
        }
    }

    pub fn component_count(self) -> usize {
        match self {
            Dimensions::Scalar => 1,
            Dimensions::Vec2 => 2,
            Dimensions::Vec3 => 3,
            Dimensions::Vec4 => 4,
            Dimensions::Mat2 => 4,
            Dimensions::Mat3 => 9,
            Dimensions::Mat4 => 16,
        }
    }

    pub fn is_matrix(self) -> bool {
        matches!(self, Dimensions::Mat2 | Dimensions::Mat3 | Dimensions::Mat4)
    }
}

impl Display for Dimensions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimensions::Scalar => "SCALAR",
            Dimensions::Vec2 => "VEC2",
            Dimensions::Vec3 => "VEC3",
            Dimensions::Vec4 => "VEC4",
            Dimensions::Mat2 => "MAT2",
            Dimensions::Mat3 => "MAT3",
            Dimensions::Mat4 => "MAT4",
        };
        f.write_str(name)
    }
}

/// Whether the element layout of this combination is implemented.
///
/// Small-component matrices pad every column to four bytes; that layout is
/// not read, and normalization only applies to 8 and 16 bit integers.
pub fn is_supported_layout(
    component_type: ComponentType,
    dimensions: Dimensions,
    normalized: bool,
) -> bool {
    let padded_matrix =
        matches!(dimensions, Dimensions::Mat2 | Dimensions::Mat3) && component_type.size() < 4;
    let bad_normalization =
        normalized && matches!(component_type, ComponentType::U32 | ComponentType::F32);
    !padded_matrix && !bad_normalization
}

/// One decoded element. The variant always matches the accessor's
/// dimensions; integer components are converted to `f32`, normalized ones
/// into `[0, 1]` or `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Element {
    Scalar(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl Element {
    fn from_components(dimensions: Dimensions, components: &[f32; 16]) -> Self {
        match dimensions {
            Dimensions::Scalar => Element::Scalar(components[0]),
            Dimensions::Vec2 => Element::Vec2(Vec2::from_slice(&components[..2])),
            Dimensions::Vec3 => Element::Vec3(Vec3::from_slice(&components[..3])),
            Dimensions::Vec4 => Element::Vec4(Vec4::from_slice(&components[..4])),
            Dimensions::Mat2 => Element::Mat2(Mat2::from_cols_slice(&components[..4])),
            Dimensions::Mat3 => Element::Mat3(Mat3::from_cols_slice(&components[..9])),
            Dimensions::Mat4 => Element::Mat4(Mat4::from_cols_slice(components)),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        match self {
            Element::Scalar(_) => Dimensions::Scalar,
            Element::Vec2(_) => Dimensions::Vec2,
            Element::Vec3(_) => Dimensions::Vec3,
            Element::Vec4(_) => Dimensions::Vec4,
            Element::Mat2(_) => Dimensions::Mat2,
            Element::Mat3(_) => Dimensions::Mat3,
            Element::Mat4(_) => Dimensions::Mat4,
        }
    }

    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            Element::Scalar(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            Element::Vec2(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Element::Vec3(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_vec4(&self) -> Option<Vec4> {
        match self {
            Element::Vec4(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_mat4(&self) -> Option<Mat4> {
        match self {
            Element::Mat4(value) => Some(*value),
            _ => None,
        }
    }

    /// Components in column-major order.
    pub fn to_vec(&self) -> Vec<f32> {
        match self {
            Element::Scalar(value) => vec![*value],
            Element::Vec2(value) => value.to_array().to_vec(),
            Element::Vec3(value) => value.to_array().to_vec(),
            Element::Vec4(value) => value.to_array().to_vec(),
            Element::Mat2(value) => value.to_cols_array().to_vec(),
            Element::Mat3(value) => value.to_cols_array().to_vec(),
            Element::Mat4(value) => value.to_cols_array().to_vec(),
        }
    }
}

/// Sparse storage: `count` element indices in one view and as many
/// tightly packed replacement values in another.
#[derive(Debug, Clone)]
pub struct Sparse {
    pub count: usize,
    pub indices_view: Index<BufferView>,
    pub indices_byte_offset: usize,
    pub indices_component_type: ComponentType,
    pub values_view: Index<BufferView>,
    pub values_byte_offset: usize,
    /// `(element, value slot)` pairs sorted by element. When an element is
    /// listed twice the later slot wins.
    pub(crate) overrides: Vec<(u32, u32)>,
}

impl Sparse {
    pub(crate) fn new(
        count: usize,
        indices_view: Index<BufferView>,
        indices_byte_offset: usize,
        indices_component_type: ComponentType,
        values_view: Index<BufferView>,
        values_byte_offset: usize,
        indices: Vec<u32>,
    ) -> Self {
        let mut overrides: Vec<(u32, u32)> = indices
            .into_iter()
            .enumerate()
            .map(|(slot, element)| (element, slot as u32))
            .collect();
        overrides.sort_by_key(|(element, _)| *element);
        overrides.dedup_by(|later, earlier| {
            if later.0 == earlier.0 {
                earlier.1 = later.1;
                true
            } else {
                false
            }
        });
        Self {
            count,
            indices_view,
            indices_byte_offset,
            indices_component_type,
            values_view,
            values_byte_offset,
            overrides,
        }
    }

    fn slot(&self, element: usize) -> Option<usize> {
        self.overrides
            .binary_search_by_key(&(element as u32), |(element, _)| *element)
            .ok()
            .map(|position| self.overrides[position].1 as usize)
    }

    /// Overridden element indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.overrides.iter().map(|(element, _)| *element as usize)
    }
}

#[derive(Debug, Clone)]
pub struct Accessor {
    pub name: Option<String>,
    pub view: Option<Index<BufferView>>,
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub normalized: bool,
    pub dimensions: Dimensions,
    pub count: usize,
    /// Declared per-component bounds, if the document provides them.
    pub min: Option<Vec<f32>>,
    pub max: Option<Vec<f32>>,
    pub sparse: Option<Sparse>,
    /// Distance between element starts. Equals the element size for tightly
    /// packed data and for sparse-only accessors.
    pub stride: usize,
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

impl Accessor {
    pub fn element_size(&self) -> usize {
        self.component_type.size() * self.dimensions.component_count()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Declared bounds as a box, for 3-component accessors that carry both
    /// `min` and `max`. Declared values are in raw component units and are
    /// normalized the same way elements are.
    pub fn declared_bounds(&self) -> Option<BoundingBox> {
        if self.dimensions != Dimensions::Vec3 {
            return None;
        }
        let component = |value: f32| {
            if self.normalized {
                self.component_type.normalize(value)
            } else {
                value
            }
        };
        let corner = |values: &[f32]| {
            Vec3::new(
                component(values[0]),
                component(values[1]),
                component(values[2]),
            )
        };
        match (&self.min, &self.max) {
            (Some(min), Some(max)) if min.len() >= 3 && max.len() >= 3 => {
                Some(BoundingBox::new(corner(min), corner(max)))
            }
            _ => None,
        }
    }

    /// Raw bytes of element `index`, or `None` for an all-zero element of a
    /// sparse-only accessor.
    fn element_bytes<'a>(
        &self,
        buffers: &'a [Buffer],
        views: &'a [BufferView],
        index: usize,
    ) -> Result<Option<&'a [u8]>, LoadError> {
        if index >= self.count {
            return Err(LoadError::range(
                "accessor element",
                format!("index {} of {} elements", index, self.count),
            ));
        }
        let size = self.element_size();

        if let Some(sparse) = &self.sparse {
            if let Some(slot) = sparse.slot(index) {
                let values = view_bytes(buffers, views, sparse.values_view)?;
                return element_span(values, sparse.values_byte_offset, slot, size, size).map(Some);
            }
        }

        match self.view {
            Some(view) => {
                let data = view_bytes(buffers, views, view)?;
                element_span(data, self.byte_offset, index, self.stride, size).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn read_element(
        &self,
        buffers: &[Buffer],
        views: &[BufferView],
        index: usize,
    ) -> Result<Element, LoadError> {
        let mut components = [0.0f32; 16];
        if let Some(bytes) = self.element_bytes(buffers, views, index)? {
            let size = self.component_type.size();
            for (component, chunk) in components
                .iter_mut()
                .zip(bytes.chunks_exact(size))
            {
                *component = self.component_type.decode(chunk, self.normalized);
            }
        }
        Ok(Element::from_components(self.dimensions, &components))
    }

    /// Exact integer value of a scalar unsigned accessor, as used by index
    /// buffers and joint indices.
    pub fn read_u32(
        &self,
        buffers: &[Buffer],
        views: &[BufferView],
        index: usize,
    ) -> Result<u32, LoadError> {
        if self.dimensions != Dimensions::Scalar || self.normalized {
            return Err(LoadError::Unsupported(format!(
                "integer read of {} {} accessor",
                self.component_type, self.dimensions
            )));
        }
        let Some(bytes) = self.element_bytes(buffers, views, index)? else {
            return Ok(0);
        };
        self.component_type.decode_u32(bytes).ok_or_else(|| {
            LoadError::Unsupported(format!("integer read of {} accessor", self.component_type))
        })
    }

    pub fn iter<'a>(&'a self, buffers: &'a [Buffer], views: &'a [BufferView]) -> AccessorIter<'a> {
        AccessorIter {
            accessor: self,
            buffers,
            views,
            next: 0,
        }
    }

    /// Bounds of every element, read one by one. Only 3-component accessors
    /// produce a non-empty box.
    pub fn scan_bounds(
        &self,
        buffers: &[Buffer],
        views: &[BufferView],
    ) -> Result<BoundingBox, LoadError> {
        if self.view.is_none() {
            return self.scan_sparse_bounds(buffers, views);
        }
        let mut bounds = BoundingBox::EMPTY;
        for element in self.iter(buffers, views) {
            if let Some(point) = element?.as_vec3() {
                bounds = bounds.including(point);
            }
        }
        Ok(bounds)
    }

    /// Without a view every element missing from the overrides is zero, so
    /// only the overridden elements are read.
    fn scan_sparse_bounds(
        &self,
        buffers: &[Buffer],
        views: &[BufferView],
    ) -> Result<BoundingBox, LoadError> {
        if self.dimensions != Dimensions::Vec3 || self.count == 0 {
            return Ok(BoundingBox::EMPTY);
        }
        let overrides = self
            .sparse
            .as_ref()
            .map(|sparse| sparse.overrides.as_slice())
            .unwrap_or_default();
        let mut bounds = if overrides.len() < self.count {
            BoundingBox::EMPTY.including(Vec3::ZERO)
        } else {
            BoundingBox::EMPTY
        };
        for (element, _) in overrides {
            if let Some(point) = self.read_element(buffers, views, *element as usize)?.as_vec3() {
                bounds = bounds.including(point);
            }
        }
        Ok(bounds)
    }

    /// Declared bounds when present, scanned bounds otherwise.
    pub fn bounds(&self, buffers: &[Buffer], views: &[BufferView]) -> Result<BoundingBox, LoadError> {
        match self.declared_bounds() {
            Some(bounds) => Ok(bounds),
            None => self.scan_bounds(buffers, views),
        }
    }
}

/// `size` bytes of element `index` in `data`. Decoded accessors always fit
/// their views; a hand-built one that does not fails instead of panicking.
fn element_span(
    data: &[u8],
    offset: usize,
    index: usize,
    stride: usize,
    size: usize,
) -> Result<&[u8], LoadError> {
    index
        .checked_mul(stride)
        .and_then(|start| start.checked_add(offset))
        .and_then(|start| data.get(start..start.checked_add(size)?))
        .ok_or_else(|| {
            LoadError::range(
                "accessor element",
                format!("element {} lies outside its {} byte view", index, data.len()),
            )
        })
}

/// Elements of one accessor in order.
pub struct AccessorIter<'a> {
    accessor: &'a Accessor,
    buffers: &'a [Buffer],
    views: &'a [BufferView],
    next: usize,
}

impl Iterator for AccessorIter<'_> {
    type Item = Result<Element, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.accessor.count {
            return None;
        }
        let element = self
            .accessor
            .read_element(self.buffers, self.views, self.next);
        self.next += 1;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.accessor.count.saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for AccessorIter<'_> {}
