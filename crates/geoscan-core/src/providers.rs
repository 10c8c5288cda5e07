//! Registry of workspace providers and the operations each one serves.
//!
//! A provider is a backend that exposes a [`Workspace`](geoscan_core_common::Workspace):
//! a directory of `GeoJSON` files, a file geodatabase, a spatial database. The registry
//! records, per provider, whether cursor scans, buffered inserts and stored extents are
//! available, planned, or out of reach.
//!
//! # Examples
//!
//! ```
//! use geoscan_core::providers::{find_provider, get_available_providers};
//!
//! let geojson = find_provider("geojson").expect("GeoJSON provider should exist");
//! assert!(geojson.capabilities.search.is_supported());
//!
//! for provider in get_available_providers() {
//!     println!("{}: {}", provider.short_name, provider.long_name);
//! }
//! ```

/// Support status for a specific provider operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportStatus {
    /// The operation is implemented.
    Supported,
    /// The provider cannot serve the operation.
    NotSupported,
    /// The operation is planned.
    Planned,
}

impl SupportStatus {
    /// Returns `true` if the operation is implemented.
    ///
    /// # Examples
    ///
    /// ```
    /// use geoscan_core::providers::SupportStatus;
    ///
    /// assert!(SupportStatus::Supported.is_supported());
    /// assert!(!SupportStatus::Planned.is_supported());
    /// ```
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, SupportStatus::Supported)
    }

    /// Returns `true` if the operation is supported or planned.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self, SupportStatus::NotSupported)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            SupportStatus::Supported => "Supported",
            SupportStatus::NotSupported => "Not Supported",
            SupportStatus::Planned => "Planned",
        }
    }
}

/// Operations a provider can serve.
#[derive(Debug, Clone, Copy)]
pub struct ProviderCapabilities {
    /// Filtered cursor scans (nearest search, identifier listing).
    pub search: SupportStatus,
    /// Buffered inserts (feature copy).
    pub insert: SupportStatus,
    /// Stored collection extents (extent aggregation).
    pub extent: SupportStatus,
}

impl ProviderCapabilities {
    /// Returns `true` if at least one operation is implemented.
    #[must_use]
    pub fn has_supported_operation(&self) -> bool {
        self.search.is_supported() || self.insert.is_supported() || self.extent.is_supported()
    }
}

/// A workspace provider definition.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Name used on the command line (e.g., `"GeoJSON"`).
    pub short_name: &'static str,
    /// Descriptive name for display.
    pub long_name: &'static str,
    pub capabilities: ProviderCapabilities,
}

impl Provider {
    #[must_use]
    pub const fn new(
        short_name: &'static str,
        long_name: &'static str,
        search: SupportStatus,
        insert: SupportStatus,
        extent: SupportStatus,
    ) -> Self {
        Self {
            short_name,
            long_name,
            capabilities: ProviderCapabilities {
                search,
                insert,
                extent,
            },
        }
    }
}

/// Returns every known provider, whatever its status.
#[must_use]
pub fn get_providers() -> Vec<Provider> {
    use SupportStatus::{NotSupported, Planned, Supported};

    vec![
        Provider::new(
            "GeoJSON",
            "Directory of GeoJSON feature collections",
            Supported,
            Supported,
            Supported,
        ),
        Provider::new("GPKG", "GeoPackage", Planned, Planned, Planned),
        Provider::new("Shapefile", "ESRI Shapefile directory", Planned, Planned, Planned),
        Provider::new("PostGIS", "PostgreSQL/PostGIS", Planned, Planned, Planned),
        Provider::new("FlatGeobuf", "FlatGeobuf", Planned, NotSupported, Planned),
        Provider::new("FileGDB", "ESRI File Geodatabase", NotSupported, NotSupported, NotSupported),
        Provider::new(
            "PGeo",
            "ESRI Personal Geodatabase",
            NotSupported,
            NotSupported,
            NotSupported,
        ),
    ]
}

/// Returns the providers with at least one implemented operation.
#[must_use]
pub fn get_available_providers() -> Vec<Provider> {
    get_providers()
        .into_iter()
        .filter(|p| p.capabilities.has_supported_operation())
        .collect()
}

/// Finds a provider by short name, ignoring case.
///
/// # Examples
///
/// ```
/// use geoscan_core::providers::find_provider;
///
/// assert_eq!(find_provider("GEOJSON").unwrap().short_name, "GeoJSON");
/// assert!(find_provider("Excel").is_none());
/// ```
#[must_use]
pub fn find_provider(name: &str) -> Option<Provider> {
    get_providers()
        .into_iter()
        .find(|p| p.short_name.eq_ignore_ascii_case(name))
}

/// Returns every provider short name, sorted.
#[must_use]
pub fn get_provider_names() -> Vec<&'static str> {
    let mut names: Vec<_> = get_providers().iter().map(|p| p.short_name).collect();
    names.sort_unstable();
    names
}
