//! Query descriptions handed to providers when opening a cursor.

use crate::geometry::Shape;

/// Spatial relationship a record's shape must have with the filter geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialRelation {
    /// Shapes share at least one point.
    Intersects,
    /// Bounding envelopes share at least one point.
    EnvelopeIntersects,
    /// The record's shape lies within the filter geometry.
    Contains,
    /// The filter geometry lies within the record's shape.
    Within,
}

impl SpatialRelation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SpatialRelation::Intersects => "intersects",
            SpatialRelation::EnvelopeIntersects => "envelope-intersects",
            SpatialRelation::Contains => "contains",
            SpatialRelation::Within => "within",
        }
    }
}

/// The spatial half of a filter; relation and geometry always travel together.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialPredicate {
    pub relation: SpatialRelation,
    pub geometry: Shape,
}

/// Description of a scan: optional spatial predicate, optional attribute predicate and
/// the projected field names (empty means every field).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryFilter {
    pub spatial: Option<SpatialPredicate>,
    /// Provider-specific where clause, passed through verbatim.
    pub where_clause: Option<String>,
    pub sub_fields: Vec<String>,
}

impl QueryFilter {
    /// Attribute-only filter; blank clauses are treated as no clause.
    #[must_use]
    pub fn with_where(where_clause: Option<&str>) -> Self {
        Self {
            where_clause: where_clause
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(str::to_string),
            ..Self::default()
        }
    }

    /// Returns the filter projecting only the given fields.
    #[must_use]
    pub fn with_sub_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` if `field` is part of the projection.
    #[must_use]
    pub fn projects(&self, field: &str) -> bool {
        self.sub_fields.is_empty()
            || self
                .sub_fields
                .iter()
                .any(|f| f.eq_ignore_ascii_case(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_where_is_dropped() {
        assert_eq!(QueryFilter::with_where(Some("   ")).where_clause, None);
        assert_eq!(
            QueryFilter::with_where(Some(" a = 1 ")).where_clause.as_deref(),
            Some("a = 1")
        );
    }

    #[test]
    fn test_projection() {
        let filter = QueryFilter::default();
        assert!(filter.projects("anything"));

        let filter = filter.with_sub_fields(["OBJECTID", "Shape"]);
        assert!(filter.projects("objectid"));
        assert!(!filter.projects("name"));
    }
}
