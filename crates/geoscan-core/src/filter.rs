//! Construction of spatial query filters.
//!
//! The builder is bound to the schema of the collection being queried so the default
//! projection can name that collection's identifier and shape fields.

use geoscan_core_common::{QueryFilter, Schema, Shape, SpatialPredicate, SpatialRelation};

use crate::error::{ConfigError, Result};
use crate::geometry;

/// Builds [`QueryFilter`]s with a spatial predicate for one collection.
#[derive(Debug, Clone)]
pub struct SpatialFilterBuilder<'a> {
    schema: &'a Schema,
    projection: Option<Vec<String>>,
}

impl<'a> SpatialFilterBuilder<'a> {
    /// Creates a builder for the collection described by `schema`.
    #[must_use]
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            projection: None,
        }
    }

    /// Overrides the default `{identifier, shape}` projection.
    #[must_use]
    pub fn with_projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Builds a filter selecting the records related to `reference`.
    ///
    /// When `buffer_distance` is greater than zero the filter geometry is the buffer of
    /// `reference`; otherwise `reference` is used as is. The caller's geometry is never
    /// modified. `where_clause` is stored verbatim; it is validated by the provider
    /// when the cursor is opened.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for a NaN or infinite buffer distance and
    /// a geometry error if buffering an empty reference is requested.
    pub fn build(
        &self,
        reference: &Shape,
        relation: SpatialRelation,
        buffer_distance: f64,
        where_clause: Option<&str>,
    ) -> Result<QueryFilter> {
        if !buffer_distance.is_finite() {
            return Err(ConfigError::InvalidOption {
                option: "buffer distance".to_string(),
                message: format!("{buffer_distance} is not a finite number"),
            }
            .into());
        }

        let geometry = if buffer_distance > 0.0 {
            geometry::buffer(reference, buffer_distance)?
        } else {
            reference.clone()
        };

        let sub_fields = self.projection.clone().unwrap_or_else(|| {
            std::iter::once(self.schema.oid_field().to_string())
                .chain(self.schema.shape_field().map(str::to_string))
                .collect()
        });

        let mut filter = QueryFilter::with_where(where_clause).with_sub_fields(sub_fields);
        filter.spatial = Some(SpatialPredicate { relation, geometry });
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoscan_core_common::{Field, FieldType, Geometry, ShapeType};

    fn schema() -> Schema {
        Schema::feature_class("FID", "Geom").with_field(Field::new("name", FieldType::Text))
    }

    #[test]
    fn test_default_projection_is_oid_and_shape() {
        let schema = schema();
        let filter = SpatialFilterBuilder::new(&schema)
            .build(&Shape::point(0.0, 0.0), SpatialRelation::Intersects, 0.0, None)
            .unwrap();

        assert_eq!(filter.sub_fields, vec!["FID".to_string(), "Geom".to_string()]);
        assert_eq!(filter.where_clause, None);
    }

    #[test]
    fn test_projection_override() {
        let schema = schema();
        let filter = SpatialFilterBuilder::new(&schema)
            .with_projection(["name"])
            .build(&Shape::point(0.0, 0.0), SpatialRelation::Within, 0.0, None)
            .unwrap();
        assert_eq!(filter.sub_fields, vec!["name".to_string()]);
    }

    #[test]
    fn test_positive_buffer_replaces_geometry() {
        let schema = schema();
        let reference = Shape::point(1.0, 1.0);
        let filter = SpatialFilterBuilder::new(&schema)
            .build(&reference, SpatialRelation::Intersects, 5.0, Some("name = 'x'"))
            .unwrap();

        let spatial = filter.spatial.unwrap();
        assert_eq!(spatial.relation, SpatialRelation::Intersects);
        assert_eq!(spatial.geometry.shape_type(), ShapeType::Polygon);
        assert_eq!(filter.where_clause.as_deref(), Some("name = 'x'"));
        // The caller's geometry is untouched.
        assert_eq!(reference, Shape::point(1.0, 1.0));
    }

    #[test]
    fn test_non_positive_buffer_is_ignored() {
        let schema = schema();
        let reference = Shape::point(1.0, 1.0);
        for distance in [0.0, -3.0] {
            let filter = SpatialFilterBuilder::new(&schema)
                .build(&reference, SpatialRelation::Intersects, distance, None)
                .unwrap();
            assert_eq!(filter.spatial.unwrap().geometry, reference);
        }
    }

    #[test]
    fn test_nan_buffer_is_rejected() {
        let schema = schema();
        let result = SpatialFilterBuilder::new(&schema).build(
            &Shape::new(Geometry::Point(geoscan_core_common::Vertex::new(0.0, 0.0))),
            SpatialRelation::Intersects,
            f64::NAN,
            None,
        );
        assert!(result.is_err());
    }
}
