//! Geometry model shared by providers and the scan utilities.
//!
//! Geometries are a tagged union over the shape kinds a feature class can hold. Vertices
//! keep optional elevation (`z`) and measure (`m`) values so that providers can hand over
//! augmented geometries unchanged; the planar math itself is done on `geo-types` values
//! produced by [`Geometry::to_geo`].

use geo::{BoundingRect, CoordsIter};
use geo_types::{Coord, LineString, MultiLineString, MultiPolygon, Point, Polygon, Rect};

/// Well-known identifier (WKID) of a spatial reference, e.g. `4326`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpatialReference(pub u32);

impl SpatialReference {
    /// Returns the numeric well-known identifier.
    #[must_use]
    pub const fn wkid(self) -> u32 {
        self.0
    }
}

/// Kind of shape stored in a feature class or carried by a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeType {
    /// Single point.
    Point,
    /// One or more paths.
    Polyline,
    /// One or more surfaces, each with an exterior ring and optional holes.
    Polygon,
    /// Axis-aligned rectangle.
    Envelope,
    /// Anything else (multipoints, collections).
    Other,
}

impl ShapeType {
    /// Returns the display name of this shape type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeType::Point => "Point",
            ShapeType::Polyline => "Polyline",
            ShapeType::Polygon => "Polygon",
            ShapeType::Envelope => "Envelope",
            ShapeType::Other => "Other",
        }
    }
}

/// A vertex with planar coordinates and optional z/m augmentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub m: Option<f64>,
}

impl Vertex {
    /// Creates a planar vertex.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: None,
        }
    }

    /// Creates a vertex with an elevation.
    #[must_use]
    pub const fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z: Some(z),
            m: None,
        }
    }

    /// Returns a copy carrying the given measure.
    #[must_use]
    pub const fn with_m(mut self, m: f64) -> Self {
        self.m = Some(m);
        self
    }

    /// Returns `true` when the vertex carries neither z nor m.
    #[must_use]
    pub fn is_planar(&self) -> bool {
        self.z.is_none() && self.m.is_none()
    }

    /// Returns the vertex without z and m.
    #[must_use]
    pub const fn planar(&self) -> Self {
        Self::new(self.x, self.y)
    }

    fn is_nan(&self) -> bool {
        self.x.is_nan() || self.y.is_nan()
    }

    fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }
}

impl From<Coord<f64>> for Vertex {
    fn from(coord: Coord<f64>) -> Self {
        Self::new(coord.x, coord.y)
    }
}

/// Ordered vertex sequence of a polyline part or polygon ring.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path(pub Vec<Vertex>);

impl Path {
    /// Returns the vertices of this path in order.
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.0
    }

    /// Returns `true` if the path has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if no vertex carries z or m.
    #[must_use]
    pub fn is_planar(&self) -> bool {
        self.0.iter().all(Vertex::is_planar)
    }

    /// Returns the same ordered vertex sequence without z and m.
    #[must_use]
    pub fn planar(&self) -> Self {
        Self(self.0.iter().map(Vertex::planar).collect())
    }

    fn to_line_string(&self) -> LineString<f64> {
        LineString::new(self.0.iter().map(Vertex::coord).collect())
    }
}

impl From<&LineString<f64>> for Path {
    fn from(line: &LineString<f64>) -> Self {
        Self(line.coords().copied().map(Vertex::from).collect())
    }
}

/// One polygon part: an exterior ring and its holes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Surface {
    pub exterior: Path,
    pub interiors: Vec<Path>,
}

impl Surface {
    /// Creates a surface without holes.
    #[must_use]
    pub fn new(exterior: Path) -> Self {
        Self {
            exterior,
            interiors: Vec::new(),
        }
    }

    fn rings(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }

    fn planar(&self) -> Self {
        Self {
            exterior: self.exterior.planar(),
            interiors: self.interiors.iter().map(Path::planar).collect(),
        }
    }

    fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(
            self.exterior.to_line_string(),
            self.interiors.iter().map(Path::to_line_string).collect(),
        )
    }
}

impl From<&Polygon<f64>> for Surface {
    fn from(polygon: &Polygon<f64>) -> Self {
        Self {
            exterior: Path::from(polygon.exterior()),
            interiors: polygon.interiors().iter().map(Path::from).collect(),
        }
    }
}

/// Axis-aligned bounding rectangle with an optional elevation range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub z_range: Option<(f64, f64)>,
}

impl Envelope {
    /// Creates a planar envelope, normalising the corner order.
    #[must_use]
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            xmin: x1.min(x2),
            ymin: y1.min(y2),
            xmax: x1.max(x2),
            ymax: y1.max(y2),
            z_range: None,
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Returns the centre of the envelope.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.xmin + self.xmax) / 2.0,
            (self.ymin + self.ymax) / 2.0,
        )
    }

    /// Returns `true` if any bound is NaN.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.xmin.is_nan() || self.ymin.is_nan() || self.xmax.is_nan() || self.ymax.is_nan()
    }

    /// Returns the smallest envelope containing both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Envelope) -> Envelope {
        let z_range = match (self.z_range, other.z_range) {
            (Some((a_lo, a_hi)), Some((b_lo, b_hi))) => Some((a_lo.min(b_lo), a_hi.max(b_hi))),
            (Some(range), None) | (None, Some(range)) => Some(range),
            (None, None) => None,
        };
        Envelope {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
            z_range,
        }
    }

    /// Scales the envelope about its centre by `fx` horizontally and `fy` vertically.
    #[must_use]
    pub fn expand_by_factor(&self, fx: f64, fy: f64) -> Envelope {
        let (cx, cy) = self.center();
        let half_w = self.width() * fx / 2.0;
        let half_h = self.height() * fy / 2.0;
        Envelope {
            xmin: cx - half_w,
            ymin: cy - half_h,
            xmax: cx + half_w,
            ymax: cy + half_h,
            z_range: self.z_range,
        }
    }

    /// Returns `true` if the two envelopes share at least one point.
    #[must_use]
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.xmin <= other.xmax
            && self.xmax >= other.xmin
            && self.ymin <= other.ymax
            && self.ymax >= other.ymin
    }

    /// Returns the four planar bounds only.
    #[must_use]
    pub fn planar(&self) -> Envelope {
        Envelope::new(self.xmin, self.ymin, self.xmax, self.ymax)
    }

    fn to_rect(self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.xmin,
                y: self.ymin,
            },
            Coord {
                x: self.xmax,
                y: self.ymax,
            },
        )
    }
}

impl From<Rect<f64>> for Envelope {
    fn from(rect: Rect<f64>) -> Self {
        Envelope::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// A geometry value, tagged by shape kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Vertex),
    Polyline(Vec<Path>),
    Polygon(Vec<Surface>),
    Envelope(Envelope),
    /// Any other planar geometry, handed through untouched.
    Other(geo_types::Geometry<f64>),
}

impl Geometry {
    /// Returns the shape kind of this geometry.
    #[must_use]
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Geometry::Point(_) => ShapeType::Point,
            Geometry::Polyline(_) => ShapeType::Polyline,
            Geometry::Polygon(_) => ShapeType::Polygon,
            Geometry::Envelope(_) => ShapeType::Envelope,
            Geometry::Other(_) => ShapeType::Other,
        }
    }

    /// Returns `true` if the geometry has no coordinates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(vertex) => vertex.is_nan(),
            Geometry::Polyline(paths) => paths.iter().all(Path::is_empty),
            Geometry::Polygon(surfaces) => surfaces.iter().all(|s| s.exterior.is_empty()),
            Geometry::Envelope(envelope) => envelope.is_empty(),
            Geometry::Other(geometry) => geometry.coords_count() == 0,
        }
    }

    /// Returns `true` if no part of the geometry carries z or m values.
    #[must_use]
    pub fn is_planar(&self) -> bool {
        match self {
            Geometry::Point(vertex) => vertex.is_planar(),
            Geometry::Polyline(paths) => paths.iter().all(Path::is_planar),
            Geometry::Polygon(surfaces) => surfaces
                .iter()
                .all(|s| s.rings().all(Path::is_planar)),
            Geometry::Envelope(envelope) => envelope.z_range.is_none(),
            Geometry::Other(_) => true,
        }
    }

    /// Returns the geometry rebuilt from the same parts with z and m dropped.
    ///
    /// `Other` geometries are returned unchanged.
    #[must_use]
    pub fn planar(&self) -> Geometry {
        match self {
            Geometry::Point(vertex) => Geometry::Point(vertex.planar()),
            Geometry::Polyline(paths) => Geometry::Polyline(paths.iter().map(Path::planar).collect()),
            Geometry::Polygon(surfaces) => {
                Geometry::Polygon(surfaces.iter().map(Surface::planar).collect())
            },
            Geometry::Envelope(envelope) => Geometry::Envelope(envelope.planar()),
            Geometry::Other(geometry) => Geometry::Other(geometry.clone()),
        }
    }

    /// Converts to a planar `geo-types` geometry for the geometry engine.
    #[must_use]
    pub fn to_geo(&self) -> geo_types::Geometry<f64> {
        match self {
            Geometry::Point(vertex) => Point::from(vertex.coord()).into(),
            Geometry::Polyline(paths) => {
                MultiLineString::new(paths.iter().map(Path::to_line_string).collect()).into()
            },
            Geometry::Polygon(surfaces) => {
                MultiPolygon::new(surfaces.iter().map(Surface::to_polygon).collect()).into()
            },
            Geometry::Envelope(envelope) => envelope.to_rect().into(),
            Geometry::Other(geometry) => geometry.clone(),
        }
    }

    /// Converts a `geo-types` geometry into the matching tagged variant.
    #[must_use]
    pub fn from_geo(geometry: geo_types::Geometry<f64>) -> Geometry {
        match geometry {
            geo_types::Geometry::Point(point) => Geometry::Point(Vertex::from(point.0)),
            geo_types::Geometry::Line(line) => Geometry::Polyline(vec![Path(vec![
                Vertex::from(line.start),
                Vertex::from(line.end),
            ])]),
            geo_types::Geometry::LineString(line) => Geometry::Polyline(vec![Path::from(&line)]),
            geo_types::Geometry::MultiLineString(lines) => {
                Geometry::Polyline(lines.iter().map(Path::from).collect())
            },
            geo_types::Geometry::Polygon(polygon) => {
                Geometry::Polygon(vec![Surface::from(&polygon)])
            },
            geo_types::Geometry::MultiPolygon(polygons) => {
                Geometry::Polygon(polygons.iter().map(Surface::from).collect())
            },
            geo_types::Geometry::Triangle(triangle) => {
                Geometry::Polygon(vec![Surface::from(&triangle.to_polygon())])
            },
            geo_types::Geometry::Rect(rect) => Geometry::Envelope(Envelope::from(rect)),
            other @ (geo_types::Geometry::MultiPoint(_)
            | geo_types::Geometry::GeometryCollection(_)) => Geometry::Other(other),
        }
    }

    /// Computes the planar bounding envelope, or `None` for an empty geometry.
    #[must_use]
    pub fn bounding_envelope(&self) -> Option<Envelope> {
        match self {
            Geometry::Envelope(envelope) if !envelope.is_empty() => Some(envelope.planar()),
            Geometry::Envelope(_) => None,
            _ if self.is_empty() => None,
            _ => self.to_geo().bounding_rect().map(Envelope::from),
        }
    }
}

/// A geometry together with its spatial reference, the unit stored on a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub geometry: Geometry,
    pub spatial_reference: Option<SpatialReference>,
}

impl Shape {
    /// Creates a shape without a spatial reference.
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            spatial_reference: None,
        }
    }

    /// Returns the shape tagged with the given spatial reference.
    #[must_use]
    pub fn with_spatial_reference(mut self, spatial_reference: SpatialReference) -> Self {
        self.spatial_reference = Some(spatial_reference);
        self
    }

    /// Convenience constructor for a planar point.
    #[must_use]
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(Geometry::Point(Vertex::new(x, y)))
    }

    #[must_use]
    pub fn shape_type(&self) -> ShapeType {
        self.geometry.shape_type()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    /// Planar bounding envelope of the shape.
    #[must_use]
    pub fn envelope(&self) -> Option<Envelope> {
        self.geometry.bounding_envelope()
    }
}
