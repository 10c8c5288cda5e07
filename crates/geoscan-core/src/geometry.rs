//! Geometry operations used by the scan utilities.
//!
//! The geometric math (distance, relational tests, buffering) is delegated to the
//! [`geo`] crate; this module defines the comparison, flattening and envelope
//! semantics on top of it.

use geo::{Buffer, Contains, Distance, Euclidean};
use geoscan_core_common::{Envelope, Geometry, Shape, SpatialReference};

use crate::error::{GeometryError, Result};

fn non_empty<'a>(shape: &'a Shape, operation: &'static str) -> Result<&'a Shape> {
    if shape.is_empty() {
        Err(GeometryError::Empty { operation }.into())
    } else {
        Ok(shape)
    }
}

fn check_spatial_references(a: &Shape, b: &Shape) -> Result<()> {
    match (a.spatial_reference, b.spatial_reference) {
        (Some(SpatialReference(left)), Some(SpatialReference(right))) if left != right => {
            Err(GeometryError::SpatialReferenceMismatch { left, right }.into())
        },
        _ => Ok(()),
    }
}

/// Returns the planar Euclidean distance between two shapes.
///
/// The measure is symmetric and zero when the shapes touch or overlap. Both shapes
/// are flattened before measuring, so z and m values never influence the result.
///
/// # Errors
///
/// Returns [`GeometryError::Empty`] if either shape is empty and
/// [`GeometryError::SpatialReferenceMismatch`] if both carry different spatial
/// references.
pub fn distance_between(a: &Shape, b: &Shape) -> Result<f64> {
    let a = non_empty(a, "distance")?;
    let b = non_empty(b, "distance")?;
    check_spatial_references(a, b)?;

    let a = flatten(a).geometry.to_geo();
    let b = flatten(b).geometry.to_geo();
    Ok(Euclidean.distance(&a, &b))
}

/// Returns `true` iff `b` lies entirely within `a`.
///
/// # Errors
///
/// Returns [`GeometryError::Empty`] if either shape is empty and
/// [`GeometryError::SpatialReferenceMismatch`] if both carry different spatial
/// references.
pub fn contains(a: &Shape, b: &Shape) -> Result<bool> {
    let a = non_empty(a, "contains")?;
    let b = non_empty(b, "contains")?;
    check_spatial_references(a, b)?;

    Ok(a.geometry.to_geo().contains(&b.geometry.to_geo()))
}

/// Produces a planar copy of a shape.
///
/// The copy keeps the shape type, the ordered vertex sequence of every part and the
/// spatial reference; elevations and measures are dropped. Points keep X/Y, polylines
/// and polygons are rebuilt from the same paths, envelopes keep their four planar
/// bounds. `Other` geometries pass through unchanged.
///
/// Flattening is idempotent.
///
/// # Examples
///
/// ```
/// use geoscan_core::geometry::flatten;
/// use geoscan_core_common::{Geometry, Shape, Vertex};
///
/// let shape = Shape::new(Geometry::Point(Vertex::with_z(1.0, 2.0, 30.0)));
/// let flat = flatten(&shape);
/// assert_eq!(flat.geometry, Geometry::Point(Vertex::new(1.0, 2.0)));
/// assert_eq!(flatten(&flat), flat);
/// ```
#[must_use]
pub fn flatten(shape: &Shape) -> Shape {
    let geometry = match &shape.geometry {
        Geometry::Point(_) | Geometry::Polyline(_) | Geometry::Polygon(_) | Geometry::Envelope(_) => {
            shape.geometry.planar()
        },
        Geometry::Other(_) => shape.geometry.clone(),
    };
    Shape {
        geometry,
        spatial_reference: shape.spatial_reference,
    }
}

/// Returns the smallest envelope containing both envelopes.
#[must_use]
pub fn union(a: &Envelope, b: &Envelope) -> Envelope {
    a.union(b)
}

/// Buffers a shape by `distance` using the geometry engine.
///
/// The result is a polygon carrying the input's spatial reference. The input shape
/// is not modified.
///
/// # Errors
///
/// Returns [`GeometryError::Empty`] if the shape is empty.
pub fn buffer(shape: &Shape, distance: f64) -> Result<Shape> {
    let shape = non_empty(shape, "buffer")?;
    let buffered = shape.geometry.to_geo().buffer(distance);
    Ok(Shape {
        geometry: Geometry::from_geo(buffered.into()),
        spatial_reference: shape.spatial_reference,
    })
}

/// Converts a rectangular polygon into an envelope.
///
/// A polygon made of a single closed ring with four corners becomes the envelope
/// spanned by its first and third vertices; any other polygon yields its bounding
/// extent. Empty polygons yield `None`.
///
/// # Errors
///
/// Returns [`GeometryError::UnsupportedType`] for non-polygon shapes.
pub fn polygon_to_envelope(shape: &Shape) -> Result<Option<Envelope>> {
    let Geometry::Polygon(surfaces) = &shape.geometry else {
        return Err(GeometryError::unsupported("polygon_to_envelope", shape.shape_type()).into());
    };
    if shape.is_empty() {
        return Ok(None);
    }

    if let [surface] = surfaces.as_slice()
        && surface.interiors.is_empty()
        && surface.exterior.vertices().len() == 5
    {
        let corners = surface.exterior.vertices();
        return Ok(Some(Envelope::new(
            corners[0].x,
            corners[0].y,
            corners[2].x,
            corners[2].y,
        )));
    }

    Ok(shape.envelope())
}
