//! In-memory feature classes with pooled cursors and buffered inserts.
//!
//! A [`MemoryFeatureClass`] keeps its records in a shared, copy-on-write vector. Cursors
//! scan a snapshot of that vector, so a flush that happens while a scan is open does
//! not disturb it. Cursor handles come from a fixed-size pool; a cursor holds its slot
//! until [`RecordCursor::release`] is called.

use std::cell::{Cell, RefCell};
use std::path::{Path as FsPath, PathBuf};
use std::rc::Rc;

use geo::{Contains, Intersects};
use geoscan_core_common::{
    CollectionKind, Envelope, FeatureBuffer, FeatureCollection, InsertSink, ProviderError,
    ProviderResult, QueryFilter, Record, RecordCursor, Schema, Shape, ShapeType, SpatialReference,
    SpatialRelation,
};
use log::debug;

use crate::parser::LayerData;
use crate::predicate::WhereClause;

/// Number of cursors a collection can have open at once unless configured otherwise.
pub const DEFAULT_HANDLE_LIMIT: usize = 8;

#[derive(Debug)]
struct HandlePool {
    in_use: Cell<usize>,
    limit: usize,
}

impl HandlePool {
    fn new(limit: usize) -> Self {
        Self {
            in_use: Cell::new(0),
            limit,
        }
    }

    fn acquire(&self, collection: &str) -> ProviderResult<()> {
        let in_use = self.in_use.get();
        if in_use >= self.limit {
            return Err(ProviderError::ResourceExhausted {
                collection: collection.to_string(),
                in_use,
                limit: self.limit,
            });
        }
        self.in_use.set(in_use + 1);
        Ok(())
    }

    fn release(&self) {
        self.in_use.set(self.in_use.get().saturating_sub(1));
    }
}

/// A feature class or table held in memory.
#[derive(Debug)]
pub struct MemoryFeatureClass {
    name: String,
    kind: CollectionKind,
    schema: Schema,
    spatial_reference: Option<SpatialReference>,
    records: RefCell<Rc<Vec<Record>>>,
    extent: Cell<Option<Envelope>>,
    handles: HandlePool,
    dirty: Cell<bool>,
    source: Option<PathBuf>,
}

fn records_extent(records: &[Record]) -> Option<Envelope> {
    records
        .iter()
        .filter_map(|r| r.shape.as_ref().and_then(Shape::envelope))
        .reduce(|a, b| a.union(&b))
}

impl MemoryFeatureClass {
    /// Creates a collection from parsed layer contents.
    #[must_use]
    pub fn new(name: impl Into<String>, layer: LayerData) -> Self {
        let extent = if layer.kind.is_feature_class() {
            records_extent(&layer.records)
        } else {
            None
        };
        Self {
            name: name.into(),
            kind: layer.kind,
            schema: layer.schema,
            spatial_reference: layer.spatial_reference,
            records: RefCell::new(Rc::new(layer.records)),
            extent: Cell::new(extent),
            handles: HandlePool::new(DEFAULT_HANDLE_LIMIT),
            dirty: Cell::new(false),
            source: None,
        }
    }

    /// Returns the collection with a different cursor pool size.
    #[must_use]
    pub fn with_handle_limit(mut self, limit: usize) -> Self {
        self.handles = HandlePool::new(limit);
        self
    }

    /// Records the file the collection was loaded from.
    #[must_use]
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    #[must_use]
    pub fn source(&self) -> Option<&FsPath> {
        self.source.as_deref()
    }

    /// Number of cursors currently holding a handle.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.handles.in_use.get()
    }

    /// Returns `true` once rows have been flushed since loading or the last save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn mark_saved(&self) {
        self.dirty.set(false);
    }

    /// Snapshot of the current contents, suitable for writing.
    #[must_use]
    pub fn to_layer(&self) -> LayerData {
        LayerData {
            kind: self.kind,
            schema: self.schema.clone(),
            spatial_reference: self.spatial_reference,
            records: self.records.borrow().as_ref().clone(),
        }
    }

    fn parse_where(&self, where_clause: Option<&str>) -> ProviderResult<Option<WhereClause>> {
        match where_clause.map(str::trim).filter(|w| !w.is_empty()) {
            Some(clause) => WhereClause::parse(clause, &self.schema).map(Some),
            None => Ok(None),
        }
    }

    fn spatial_test(&self, filter: &QueryFilter) -> ProviderResult<Option<SpatialTest>> {
        let Some(predicate) = &filter.spatial else {
            return Ok(None);
        };
        if let (Some(ours), Some(theirs)) = (self.spatial_reference, predicate.geometry.spatial_reference)
            && ours != theirs
        {
            return Err(ProviderError::Format {
                format: "GeoJSON".to_string(),
                message: format!(
                    "filter spatial reference {} does not match '{}' ({})",
                    theirs.wkid(),
                    self.name,
                    ours.wkid()
                ),
            });
        }
        Ok(Some(SpatialTest {
            relation: predicate.relation,
            geometry: predicate.geometry.geometry.to_geo(),
            envelope: predicate.geometry.envelope(),
        }))
    }
}

struct SpatialTest {
    relation: SpatialRelation,
    geometry: geo_types::Geometry<f64>,
    envelope: Option<Envelope>,
}

impl SpatialTest {
    fn matches(&self, shape: &Shape) -> bool {
        if shape.is_empty() {
            return false;
        }
        match self.relation {
            SpatialRelation::EnvelopeIntersects => match (shape.envelope(), self.envelope) {
                (Some(a), Some(b)) => a.intersects(&b),
                _ => false,
            },
            SpatialRelation::Intersects => shape.geometry.to_geo().intersects(&self.geometry),
            SpatialRelation::Contains => self.geometry.contains(&shape.geometry.to_geo()),
            SpatialRelation::Within => shape.geometry.to_geo().contains(&self.geometry),
        }
    }
}

struct MemoryCursor<'a> {
    class: &'a MemoryFeatureClass,
    records: Rc<Vec<Record>>,
    position: usize,
    spatial: Option<SpatialTest>,
    predicate: Option<WhereClause>,
    sub_fields: Vec<String>,
    holds_handle: bool,
}

impl MemoryCursor<'_> {
    fn project(&self, record: &Record) -> Record {
        if self.sub_fields.is_empty() {
            return record.clone();
        }
        let projects = |name: &str| self.sub_fields.iter().any(|f| f.eq_ignore_ascii_case(name));
        Record {
            oid: record.oid,
            shape: self
                .class
                .schema
                .shape_field()
                .filter(|shape_field| projects(shape_field))
                .and(record.shape.clone()),
            attributes: record
                .attributes
                .iter()
                .filter(|(name, _)| projects(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }
}

impl RecordCursor for MemoryCursor<'_> {
    fn next_record(&mut self) -> ProviderResult<Option<Record>> {
        while let Some(record) = self.records.get(self.position) {
            self.position += 1;
            let spatial_ok = match (&self.spatial, &record.shape) {
                (None, _) => true,
                (Some(test), Some(shape)) => test.matches(shape),
                (Some(_), None) => false,
            };
            if spatial_ok && self.predicate.as_ref().is_none_or(|p| p.matches(record)) {
                return Ok(Some(self.project(record)));
            }
        }
        Ok(None)
    }

    fn release(&mut self) {
        if std::mem::take(&mut self.holds_handle) {
            self.class.handles.release();
        }
    }
}

struct MemoryInsertSink<'a> {
    class: &'a MemoryFeatureClass,
    pending: Vec<Record>,
}

impl MemoryInsertSink<'_> {
    fn to_record(&self, row: FeatureBuffer) -> ProviderResult<Record> {
        let class = self.class;
        let attributes = class
            .schema
            .fields()
            .iter()
            .zip(row.values())
            .filter(|(field, _)| !field.is_system())
            .map(|(field, value)| (field.name.clone(), value.clone()))
            .collect();

        let shape = match (class.kind, row.shape) {
            (CollectionKind::Table, _) | (_, None) => None,
            (CollectionKind::FeatureClass { shape_type }, Some(shape)) => {
                if shape_type != ShapeType::Other && !shape.is_empty() && shape.shape_type() != shape_type {
                    return Err(ProviderError::Format {
                        format: "GeoJSON".to_string(),
                        message: format!(
                            "cannot insert a {} shape into {} feature class '{}'",
                            shape.shape_type().as_str(),
                            shape_type.as_str(),
                            class.name
                        ),
                    });
                }
                Some(Shape {
                    spatial_reference: shape.spatial_reference.or(class.spatial_reference),
                    geometry: shape.geometry,
                })
            },
        };

        Ok(Record {
            oid: None,
            shape,
            attributes,
        })
    }
}

impl InsertSink for MemoryInsertSink<'_> {
    fn insert(&mut self, row: FeatureBuffer) -> ProviderResult<()> {
        let record = self.to_record(row)?;
        self.pending.push(record);
        Ok(())
    }

    fn flush(&mut self) -> ProviderResult<usize> {
        let class = self.class;
        let count = self.pending.len();
        if count == 0 {
            return Ok(0);
        }

        let mut slot = class.records.borrow_mut();
        let records = Rc::make_mut(&mut slot);
        let mut next_oid = records.iter().filter_map(|r| r.oid).max().unwrap_or(0) + 1;
        for mut record in self.pending.drain(..) {
            record.oid = Some(next_oid);
            next_oid += 1;
            if let Some(envelope) = record.shape.as_ref().and_then(Shape::envelope) {
                let extent = class.extent.get().map_or(envelope, |e| e.union(&envelope));
                class.extent.set(Some(extent));
            }
            records.push(record);
        }
        class.dirty.set(true);
        debug!("Flushed {count} rows into '{}'", class.name);
        Ok(count)
    }
}

impl FeatureCollection for MemoryFeatureClass {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> CollectionKind {
        self.kind
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn extent(&self) -> Option<Envelope> {
        self.extent.get()
    }

    fn spatial_reference(&self) -> Option<SpatialReference> {
        self.spatial_reference
    }

    fn open_cursor(&self, filter: Option<&QueryFilter>) -> ProviderResult<Box<dyn RecordCursor + '_>> {
        let default_filter = QueryFilter::default();
        let filter = filter.unwrap_or(&default_filter);

        let predicate = self.parse_where(filter.where_clause.as_deref())?;
        let spatial = self.spatial_test(filter)?;
        self.handles.acquire(&self.name)?;

        Ok(Box::new(MemoryCursor {
            class: self,
            records: Rc::clone(&self.records.borrow()),
            position: 0,
            spatial,
            predicate,
            sub_fields: filter.sub_fields.clone(),
            holds_handle: true,
        }))
    }

    fn feature_count(&self, where_clause: Option<&str>) -> ProviderResult<usize> {
        let predicate = self.parse_where(where_clause)?;
        let records = self.records.borrow();
        Ok(match predicate {
            Some(predicate) => records.iter().filter(|r| predicate.matches(r)).count(),
            None => records.len(),
        })
    }

    fn open_insert(&self) -> ProviderResult<Box<dyn InsertSink + '_>> {
        Ok(Box::new(MemoryInsertSink {
            class: self,
            pending: Vec::new(),
        }))
    }
}
