//! In-memory provider doubles for unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use geoscan_core_common::{
    CollectionKind, Envelope, FeatureBuffer, FeatureCollection, InsertSink, ProviderError,
    ProviderResult, QueryFilter, Record, RecordCursor, Schema, ShapeType, SpatialReference,
    Workspace,
};

/// Handle bookkeeping shared between a collection and its cursors.
#[derive(Debug, Default)]
pub struct Handles {
    pub opened: Cell<usize>,
    pub released: Cell<usize>,
}

impl Handles {
    pub fn in_use(&self) -> usize {
        self.opened.get() - self.released.get()
    }
}

/// Collection serving a fixed record list, with optional failure injection.
pub struct FakeCollection {
    pub name: String,
    pub schema: Schema,
    pub kind: CollectionKind,
    pub records: Vec<Record>,
    pub extent: Option<Envelope>,
    pub handles: Rc<Handles>,
    pub limit: usize,
    /// Index of the record whose read fails.
    pub fail_at: Option<usize>,
    pub inserted: RefCell<Vec<FeatureBuffer>>,
}

impl FakeCollection {
    pub fn new(name: &str, records: Vec<Record>) -> Self {
        Self {
            name: name.to_string(),
            schema: Schema::feature_class("OBJECTID", "Shape"),
            kind: CollectionKind::FeatureClass {
                shape_type: ShapeType::Point,
            },
            records,
            extent: None,
            handles: Rc::new(Handles::default()),
            limit: usize::MAX,
            fail_at: None,
            inserted: RefCell::new(Vec::new()),
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_extent(mut self, extent: Envelope) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn with_shape_type(mut self, shape_type: ShapeType) -> Self {
        self.kind = CollectionKind::FeatureClass { shape_type };
        self
    }

    pub fn as_table(mut self) -> Self {
        self.kind = CollectionKind::Table;
        self
    }

    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }
}

struct FakeCursor {
    records: Vec<Record>,
    position: usize,
    fail_at: Option<usize>,
    handles: Rc<Handles>,
}

impl RecordCursor for FakeCursor {
    fn next_record(&mut self) -> ProviderResult<Option<Record>> {
        if self.fail_at == Some(self.position) {
            return Err(ProviderError::Format {
                format: "fake".to_string(),
                message: format!("record {} is unreadable", self.position),
            });
        }
        let record = self.records.get(self.position).cloned();
        self.position += 1;
        Ok(record)
    }

    fn release(&mut self) {
        self.handles.released.set(self.handles.released.get() + 1);
    }
}

struct FakeSink<'a> {
    pending: Vec<FeatureBuffer>,
    target: &'a RefCell<Vec<FeatureBuffer>>,
}

impl InsertSink for FakeSink<'_> {
    fn insert(&mut self, row: FeatureBuffer) -> ProviderResult<()> {
        self.pending.push(row);
        Ok(())
    }

    fn flush(&mut self) -> ProviderResult<usize> {
        let count = self.pending.len();
        self.target.borrow_mut().append(&mut self.pending);
        Ok(count)
    }
}

impl FeatureCollection for FakeCollection {
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
        self.extent
    }

    fn spatial_reference(&self) -> Option<SpatialReference> {
        None
    }

    fn open_cursor(&self, _filter: Option<&QueryFilter>) -> ProviderResult<Box<dyn RecordCursor + '_>> {
        if self.handles.in_use() >= self.limit {
            return Err(ProviderError::ResourceExhausted {
                collection: self.name.clone(),
                in_use: self.handles.in_use(),
                limit: self.limit,
            });
        }
        self.handles.opened.set(self.handles.opened.get() + 1);
        Ok(Box::new(FakeCursor {
            records: self.records.clone(),
            position: 0,
            fail_at: self.fail_at,
            handles: Rc::clone(&self.handles),
        }))
    }

    fn feature_count(&self, _where_clause: Option<&str>) -> ProviderResult<usize> {
        Ok(self.records.len())
    }

    fn open_insert(&self) -> ProviderResult<Box<dyn InsertSink + '_>> {
        Ok(Box::new(FakeSink {
            pending: Vec::new(),
            target: &self.inserted,
        }))
    }
}

/// Workspace with root collections and named datasets.
#[derive(Default)]
pub struct FakeWorkspace {
    pub root: Vec<FakeCollection>,
    pub datasets: Vec<(String, Vec<FakeCollection>)>,
}

impl Workspace for FakeWorkspace {
    fn path_name(&self) -> &str {
        "memory://fake"
    }

    fn dataset_names(&self) -> Vec<String> {
        self.datasets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn collections(&self, dataset: Option<&str>) -> ProviderResult<Vec<&dyn FeatureCollection>> {
        let members = match dataset {
            None => &self.root,
            Some(name) => self
                .datasets
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, members)| members)
                .ok_or_else(|| ProviderError::NotFound {
                    name: name.to_string(),
                })?,
        };
        Ok(members.iter().map(|c| c as &dyn FeatureCollection).collect())
    }

    fn open_collection(&self, name: &str) -> ProviderResult<&dyn FeatureCollection> {
        self.root
            .iter()
            .chain(self.datasets.iter().flat_map(|(_, members)| members))
            .find(|c| c.name == name)
            .map(|c| c as &dyn FeatureCollection)
            .ok_or_else(|| ProviderError::NotFound {
                name: name.to_string(),
            })
    }
}
