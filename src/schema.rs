//! Schema describing the row layout of a segment.
//!
//! The segment only needs enough of a schema to size rows and split them
//! into columns: each field has a fixed byte width, and rows are the fields
//! concatenated in declaration order.

use std::collections::HashSet;
use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegcoreError};
use crate::search::DistanceMetric;

/// User-facing field identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub i64);

/// Position of a field within the schema (and within a row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldOffset(pub usize);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FieldOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fixed-width field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    /// Dense `f32` vector with `dim` components.
    FloatVector { dim: usize },
    /// Packed binary vector; `dim` counts bits.
    BinaryVector { dim: usize },
}

impl DataType {
    /// Bytes occupied by one value of this type.
    pub fn size_of(&self) -> usize {
        match self {
            DataType::Bool | DataType::Int8 => 1,
            DataType::Int16 => 2,
            DataType::Int32 | DataType::Float => 4,
            DataType::Int64 | DataType::Double => 8,
            DataType::FloatVector { dim } => dim * std::mem::size_of::<f32>(),
            DataType::BinaryVector { dim } => dim / 8,
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(
            self,
            DataType::FloatVector { .. } | DataType::BinaryVector { .. }
        )
    }

    /// Vector dimension, if this is a vector type.
    pub fn dimension(&self) -> Option<usize> {
        match self {
            DataType::FloatVector { dim } | DataType::BinaryVector { dim } => Some(*dim),
            _ => None,
        }
    }
}

/// Definition of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub id: FieldId,
    pub name: String,
    pub data_type: DataType,
    /// Default metric for vector fields.
    pub metric: Option<DistanceMetric>,
}

impl FieldMeta {
    pub fn size_of(&self) -> usize {
        self.data_type.size_of()
    }

    pub fn is_vector(&self) -> bool {
        self.data_type.is_vector()
    }
}

/// Immutable, validated schema.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldMeta>,
    offsets_by_id: AHashMap<FieldId, FieldOffset>,
    /// Byte offset of each field inside a row, plus the total row size at the end.
    row_offsets: Vec<usize>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn field(&self, offset: FieldOffset) -> Option<&FieldMeta> {
        self.fields.get(offset.0)
    }

    pub fn get_offset(&self, id: FieldId) -> Option<FieldOffset> {
        self.offsets_by_id.get(&id).copied()
    }

    /// Resolve a field id, failing with [`SegcoreError::FieldNotFound`].
    pub fn resolve(&self, id: FieldId) -> Result<(FieldOffset, &FieldMeta)> {
        let offset = self
            .get_offset(id)
            .ok_or_else(|| SegcoreError::field_not_found(format!("field id {id}")))?;
        Ok((offset, &self.fields[offset.0]))
    }

    /// Byte width of each field, in schema order.
    pub fn sizeof_infos(&self) -> Vec<usize> {
        self.fields.iter().map(FieldMeta::size_of).collect()
    }

    /// Byte offset of `offset`'s value inside a row.
    pub fn row_offset(&self, offset: FieldOffset) -> usize {
        self.row_offsets[offset.0]
    }

    /// Total bytes per row.
    pub fn total_sizeof(&self) -> usize {
        self.row_offsets.last().copied().unwrap_or(0)
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldMeta>,
}

impl SchemaBuilder {
    /// Add a scalar field.
    pub fn add_field(mut self, id: i64, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(FieldMeta {
            id: FieldId(id),
            name: name.into(),
            data_type,
            metric: None,
        });
        self
    }

    /// Add a dense float vector field with its default metric.
    pub fn add_vector_field(
        mut self,
        id: i64,
        name: impl Into<String>,
        dim: usize,
        metric: DistanceMetric,
    ) -> Self {
        self.fields.push(FieldMeta {
            id: FieldId(id),
            name: name.into(),
            data_type: DataType::FloatVector { dim },
            metric: Some(metric),
        });
        self
    }

    pub fn build(self) -> Result<Schema> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(SegcoreError::schema("Field name cannot be empty"));
            }
            if !ids.insert(field.id) {
                return Err(SegcoreError::schema(format!(
                    "Field id {} already exists",
                    field.id
                )));
            }
            if !names.insert(field.name.as_str()) {
                return Err(SegcoreError::schema(format!(
                    "Field '{}' already exists",
                    field.name
                )));
            }
            match field.data_type {
                DataType::FloatVector { dim: 0 } | DataType::BinaryVector { dim: 0 } => {
                    return Err(SegcoreError::schema(format!(
                        "Vector field '{}' must have a positive dimension",
                        field.name
                    )));
                }
                DataType::BinaryVector { dim } if dim % 8 != 0 => {
                    return Err(SegcoreError::schema(format!(
                        "Binary vector field '{}' dimension {dim} is not a multiple of 8",
                        field.name
                    )));
                }
                _ => {}
            }
        }

        let mut row_offsets = Vec::with_capacity(self.fields.len() + 1);
        row_offsets.push(0);
        for field in &self.fields {
            let last = row_offsets[row_offsets.len() - 1];
            row_offsets.push(last + field.size_of());
        }

        let offsets_by_id = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| (field.id, FieldOffset(i)))
            .collect();

        Ok(Schema {
            fields: self.fields,
            offsets_by_id,
            row_offsets,
        })
    }
}
