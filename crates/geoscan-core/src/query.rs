//! Attribute queries over a single collection.

use geoscan_core_common::{FeatureCollection, QueryFilter};

use crate::cursor::{ScopedCursor, with_cursor};
use crate::error::Result;

/// Opens a cursor over the records of `collection` matching `where_clause`.
///
/// # Errors
///
/// Returns a cursor error when no handle is available and a query error when the
/// where clause is rejected.
pub fn search<'a>(collection: &'a dyn FeatureCollection, where_clause: Option<&str>) -> Result<ScopedCursor<'a>> {
    ScopedCursor::open(collection, Some(&QueryFilter::with_where(where_clause)))
}

/// Collects identifiers of the records matching `where_clause`, in scan order.
///
/// With `id_field` set the values of that field are collected instead of the object
/// identifiers; records whose value is null or not a whole number are skipped. An
/// `id_field` missing from the schema falls back to the object identifiers.
///
/// # Errors
///
/// Returns the errors raised while opening or advancing the cursor.
pub fn get_ids(
    collection: &dyn FeatureCollection,
    where_clause: Option<&str>,
    id_field: Option<&str>,
) -> Result<Vec<i64>> {
    let schema = collection.schema();
    let field = id_field
        .and_then(|name| schema.find_field(name))
        .and_then(|index| schema.field(index))
        .map(|f| f.name.clone())
        .filter(|name| name != schema.oid_field());

    let sub_fields: Vec<String> = std::iter::once(schema.oid_field().to_string())
        .chain(field.clone())
        .collect();
    let filter = QueryFilter::with_where(where_clause).with_sub_fields(sub_fields);

    with_cursor(collection, Some(&filter), |cursor| {
        let mut ids = Vec::new();
        while let Some(record) = cursor.next_record()? {
            let id = match &field {
                Some(name) => record.value(name).and_then(|v| v.as_i64()),
                None => record.oid,
            };
            ids.extend(id);
        }
        Ok(ids)
    })
}
