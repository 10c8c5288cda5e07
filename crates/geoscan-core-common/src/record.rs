//! Records, attribute values and collection schemas.

use std::collections::BTreeMap;
use std::fmt;

use crate::geometry::{Shape, ShapeType};

/// 2^63: whole doubles at or beyond this magnitude do not fit in an `i64`.
const I64_FLOAT_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Type of a field in a collection schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// The object identifier field.
    ObjectId,
    /// The shape field of a feature class.
    Geometry,
    Integer,
    Double,
    Text,
    Boolean,
}

/// A single field definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    /// Whether values can be written to this field through an insert.
    pub editable: bool,
    pub nullable: bool,
}

impl Field {
    /// Creates a nullable field; identifier and shape fields are not editable.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            editable: !matches!(field_type, FieldType::ObjectId),
            nullable: true,
        }
    }

    /// Returns the field with its editability overridden.
    #[must_use]
    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    /// Returns `true` for the identifier and shape fields.
    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self.field_type, FieldType::ObjectId | FieldType::Geometry)
    }
}

/// Ordered field list of a collection plus the names of its system fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
    oid_field: String,
    shape_field: Option<String>,
    has_z: bool,
    has_m: bool,
}

impl Schema {
    /// Creates a table schema holding only the identifier field.
    #[must_use]
    pub fn table(oid_field: impl Into<String>) -> Self {
        let oid_field = oid_field.into();
        Self {
            fields: vec![Field::new(oid_field.clone(), FieldType::ObjectId)],
            oid_field,
            shape_field: None,
            has_z: false,
            has_m: false,
        }
    }

    /// Creates a feature class schema holding the identifier and shape fields.
    #[must_use]
    pub fn feature_class(oid_field: impl Into<String>, shape_field: impl Into<String>) -> Self {
        let mut schema = Self::table(oid_field);
        let shape_field = shape_field.into();
        schema
            .fields
            .push(Field::new(shape_field.clone(), FieldType::Geometry));
        schema.shape_field = Some(shape_field);
        schema
    }

    /// Appends a field.
    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Marks the shape field as carrying elevations and/or measures.
    #[must_use]
    pub fn with_zm(mut self, has_z: bool, has_m: bool) -> Self {
        self.has_z = has_z;
        self.has_m = has_m;
        self
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Finds a field index by name, ignoring ASCII case.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn oid_field(&self) -> &str {
        &self.oid_field
    }

    #[must_use]
    pub fn shape_field(&self) -> Option<&str> {
        self.shape_field.as_deref()
    }

    /// Returns `true` when the shape field stores neither z nor m.
    #[must_use]
    pub fn is_planar(&self) -> bool {
        !self.has_z && !self.has_m
    }

    #[must_use]
    pub fn has_z(&self) -> bool {
        self.has_z
    }

    #[must_use]
    pub fn has_m(&self) -> bool {
        self.has_m
    }
}

/// Whether a collection stores shapes, resolved once per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    FeatureClass { shape_type: ShapeType },
    Table,
}

impl CollectionKind {
    /// Returns the shape type for feature classes.
    #[must_use]
    pub fn shape_type(&self) -> Option<ShapeType> {
        match self {
            CollectionKind::FeatureClass { shape_type } => Some(*shape_type),
            CollectionKind::Table => None,
        }
    }

    #[must_use]
    pub fn is_feature_class(&self) -> bool {
        matches!(self, CollectionKind::FeatureClass { .. })
    }
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Integer(i64),
    Double(f64),
    Text(String),
    Boolean(bool),
}

impl FieldValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns the value as an integer when it holds a whole number that fits in `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            #[allow(clippy::cast_possible_truncation)]
            FieldValue::Double(v) if v.fract() == 0.0 && v.abs() < I64_FLOAT_BOUND => Some(*v as i64),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as a float for numeric values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("<null>"),
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Double(v) => write!(f, "{v}"),
            FieldValue::Text(v) => f.write_str(v),
            FieldValue::Boolean(v) => write!(f, "{v}"),
        }
    }
}

/// One element of a feature collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Object identifier; `None` for rows without one.
    pub oid: Option<i64>,
    pub shape: Option<Shape>,
    pub attributes: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Creates a record with a shape and no attributes.
    #[must_use]
    pub fn new(oid: i64, shape: Option<Shape>) -> Self {
        Self {
            oid: Some(oid),
            shape,
            attributes: BTreeMap::new(),
        }
    }

    /// Returns the record with an attribute set.
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Returns the shape only when it is present and not empty.
    #[must_use]
    pub fn geometry(&self) -> Option<&Shape> {
        self.shape.as_ref().filter(|shape| !shape.is_empty())
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.attributes.get(name)
    }
}

/// A row under construction for insertion into a target collection.
///
/// Holds one slot per target schema field, initialised to `Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBuffer {
    pub shape: Option<Shape>,
    values: Vec<FieldValue>,
}

impl FeatureBuffer {
    /// Creates an empty buffer shaped for `schema`.
    #[must_use]
    pub fn for_schema(schema: &Schema) -> Self {
        Self {
            shape: None,
            values: vec![FieldValue::Null; schema.fields().len()],
        }
    }

    /// Sets the value at a target field index; out-of-range indices are ignored.
    pub fn set_value(&mut self, index: usize, value: FieldValue) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    #[must_use]
    pub fn value(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    #[must_use]
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }
}
