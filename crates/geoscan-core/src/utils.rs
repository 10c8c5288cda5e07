//! Formatting helpers for schema and extent display.

use geoscan_core_common::{Envelope, FieldType};

/// Extension trait for formatting a [`FieldType`] into a human-readable label.
///
/// # Examples
///
/// ```
/// use geoscan_core::utils::FieldTypeExt;
/// use geoscan_core_common::FieldType;
///
/// assert_eq!(FieldType::Text.format(), "String");
/// assert_eq!(FieldType::ObjectId.format(), "ObjectID");
/// ```
pub trait FieldTypeExt {
    /// Format the field type for display.
    fn format(&self) -> String;
}

impl FieldTypeExt for FieldType {
    fn format(&self) -> String {
        match self {
            FieldType::ObjectId => "ObjectID",
            FieldType::Geometry => "Geometry",
            FieldType::Integer => "Integer",
            FieldType::Double => "Double",
            FieldType::Text => "String",
            FieldType::Boolean => "Boolean",
        }
        .to_string()
    }
}

/// Formats an envelope as `xmin, ymin : xmax, ymax` with `precision` decimals.
#[must_use]
pub fn format_envelope(envelope: &Envelope, precision: usize) -> String {
    format!(
        "{:.p$}, {:.p$} : {:.p$}, {:.p$}",
        envelope.xmin,
        envelope.ymin,
        envelope.xmax,
        envelope.ymax,
        p = precision
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_field_types() {
        assert_eq!(FieldType::Integer.format(), "Integer");
        assert_eq!(FieldType::Double.format(), "Double");
        assert_eq!(FieldType::Geometry.format(), "Geometry");
        assert_eq!(FieldType::Boolean.format(), "Boolean");
    }

    #[test]
    fn test_format_envelope() {
        let envelope = Envelope::new(-1.0, 2.5, 3.0, 4.75);
        assert_eq!(format_envelope(&envelope, 2), "-1.00, 2.50 : 3.00, 4.75");
    }
}
