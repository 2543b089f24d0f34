//! Record schemas: the ordered field accessors used to turn records into rows.
//!
//! A schema is declared once per record shape and read-only afterwards. Each
//! field carries its display name, its value kind and an extractor closure.

use std::fmt;

/// Declared kind of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFieldKind {
    /// Rendered through the yes/no tokens.
    Boolean,
    /// Raw image payload, embedded as a picture.
    Binary,
    /// Anything else, rendered as text or number.
    Other,
}

/// Value produced by one field extractor.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumFieldValue {
    /// Empty value; the cell stays blank.
    None,
    /// Boolean value.
    Boolean(bool),
    /// Image bytes.
    Binary(Vec<u8>),
    /// Stringified value.
    Text(String),
}

impl EnumFieldValue {
    /// Stringify any displayable value.
    pub fn text(value: impl ToString) -> Self {
        Self::Text(value.to_string())
    }
}

/// Extractor closure for one field.
pub type FnFieldExtractor<T> = Box<dyn Fn(&T) -> Result<EnumFieldValue, String> + Send + Sync>;

/// One schema field: display name, kind, extractor.
pub struct SpecFieldAccessor<T> {
    name: String,
    kind: EnumFieldKind,
    extractor: FnFieldExtractor<T>,
}

impl<T> SpecFieldAccessor<T> {
    /// Field name, also the default header text.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared field kind.
    pub fn kind(&self) -> EnumFieldKind {
        self.kind
    }

    /// Read this field from `record`.
    pub fn extract(&self, record: &T) -> Result<EnumFieldValue, String> {
        (self.extractor)(record)
    }
}

impl<T> fmt::Debug for SpecFieldAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecFieldAccessor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Ordered field accessors for records of type `T`.
pub struct SpecRecordSchema<T> {
    fields: Vec<SpecFieldAccessor<T>>,
}

impl<T> SpecRecordSchema<T> {
    /// Empty schema.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field with a fallible extractor.
    pub fn with_field<F>(mut self, name: impl Into<String>, kind: EnumFieldKind, extractor: F) -> Self
    where
        F: Fn(&T) -> Result<EnumFieldValue, String> + Send + Sync + 'static,
    {
        self.fields.push(SpecFieldAccessor {
            name: name.into(),
            kind,
            extractor: Box::new(extractor),
        });
        self
    }

    /// Append a boolean field.
    pub fn with_bool<F>(self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.with_field(name, EnumFieldKind::Boolean, move |record| {
            Ok(EnumFieldValue::Boolean(getter(record)))
        })
    }

    /// Append a field rendered through `ToString`.
    pub fn with_text<F, V>(self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: ToString,
    {
        self.with_field(name, EnumFieldKind::Other, move |record| {
            Ok(EnumFieldValue::text(getter(record)))
        })
    }

    /// Append an optional field; `None` leaves the cell blank.
    pub fn with_optional_text<F, V>(self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&T) -> Option<V> + Send + Sync + 'static,
        V: ToString,
    {
        self.with_field(name, EnumFieldKind::Other, move |record| {
            Ok(getter(record).map_or(EnumFieldValue::None, EnumFieldValue::text))
        })
    }

    /// Append an image field; `None` leaves the cell blank.
    pub fn with_binary<F>(self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&T) -> Option<&[u8]> + Send + Sync + 'static,
    {
        self.with_field(name, EnumFieldKind::Binary, move |record| {
            Ok(getter(record).map_or(EnumFieldValue::None, |v| {
                EnumFieldValue::Binary(v.to_vec())
            }))
        })
    }

    /// Fields in column order.
    pub fn fields(&self) -> &[SpecFieldAccessor<T>] {
        &self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in column order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

impl<T> Default for SpecRecordSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SpecRecordSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fields.iter()).finish()
    }
}

/// Record types with a statically declared schema.
pub trait TabularRecord: Sized {
    /// Field accessors in column order.
    fn schema() -> SpecRecordSchema<Self>;
}
