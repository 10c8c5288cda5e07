//! `GeoJSON` provider for `GeoScan`.
//!
//! Serves a directory of `GeoJSON` files as a [`Workspace`](geoscan_core_common::Workspace):
//! every file is loaded into a [`MemoryFeatureClass`] that implements the cursor and
//! insert contracts of `geoscan-core-common`, including a bounded cursor pool and a
//! small where-clause dialect.
//!
//! # Examples
//!
//! ```no_run
//! use geoscan_core_common::Workspace;
//! use geoscan_geojson::DirectoryWorkspace;
//!
//! let workspace = DirectoryWorkspace::open("data/city")?;
//! let hydrants = workspace.open_collection("hydrants")?;
//! println!("{} features", hydrants.feature_count(Some("status = 'active'"))?);
//! # Ok::<(), geoscan_core_common::ProviderError>(())
//! ```

pub mod collection;
pub mod parser;
pub mod predicate;
pub mod workspace;
pub mod writer;

pub use collection::{DEFAULT_HANDLE_LIMIT, MemoryFeatureClass};
pub use parser::{LayerData, parse_geojson_bytes};
pub use predicate::WhereClause;
pub use workspace::{DirectoryWorkspace, load_collection, save_collection};
pub use writer::{GeoJsonWriterOptions, write_geojson};
