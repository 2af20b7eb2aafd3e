use crate::{
    error::EngineError,
    field::{Field, FieldDef, default_label},
    fields::{
        BooleanKind, DateArrayKind, DateKind, FieldContext, FieldKind, GeoPointKind,
        NumberArrayKind, NumberKind, PasswordKind, RelationshipKind, SelectKind, TextArrayKind,
        TextKind,
    },
};
use std::{collections::BTreeMap, sync::Arc};

///
/// NativeType
///
/// Shortcut aliases for the common scalar types, so a definition can
/// say "this is a date" without naming the canonical type id.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NativeType {
    Text,
    Number,
    Boolean,
    Date,
}

impl NativeType {
    #[must_use]
    pub const fn type_id(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }
}

///
/// TypeRef
/// How a field definition names its type.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TypeRef {
    Id(String),
    Native(NativeType),
}

impl TypeRef {
    #[must_use]
    pub fn type_id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Native(native) => native.type_id(),
        }
    }
}

impl From<&str> for TypeRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for TypeRef {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<NativeType> for TypeRef {
    fn from(native: NativeType) -> Self {
        Self::Native(native)
    }
}

///
/// FieldTypeDescriptor
/// Canonical name + factory for one field type.
///

pub type BuildFn = fn(&FieldContext<'_>) -> Result<Arc<dyn FieldKind>, EngineError>;

#[derive(Clone, Copy, Debug)]
pub struct FieldTypeDescriptor {
    pub type_id: &'static str,
    pub build: BuildFn,
}

impl FieldTypeDescriptor {
    #[must_use]
    pub const fn new(type_id: &'static str, build: BuildFn) -> Self {
        Self { type_id, build }
    }
}

///
/// TypeRegistry
///
/// `type_id → descriptor`. New field types register without touching
/// the list or field core; redefining an id replaces the previous
/// descriptor (last registration wins).
///

#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, FieldTypeDescriptor>,
}

impl TypeRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }

    /// The built-in type vocabulary.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for descriptor in [
            FieldTypeDescriptor::new("text", TextKind::build_plain),
            FieldTypeDescriptor::new("textarea", TextKind::build_multiline),
            FieldTypeDescriptor::new("html", TextKind::build_html),
            FieldTypeDescriptor::new("textarray", TextArrayKind::build),
            FieldTypeDescriptor::new("number", NumberKind::build),
            FieldTypeDescriptor::new("numberarray", NumberArrayKind::build),
            FieldTypeDescriptor::new("boolean", BooleanKind::build),
            FieldTypeDescriptor::new("select", SelectKind::build),
            FieldTypeDescriptor::new("date", DateKind::build_date),
            FieldTypeDescriptor::new("datetime", DateKind::build_datetime),
            FieldTypeDescriptor::new("datearray", DateArrayKind::build),
            FieldTypeDescriptor::new("password", PasswordKind::build),
            FieldTypeDescriptor::new("relationship", RelationshipKind::build),
            FieldTypeDescriptor::new("geopoint", GeoPointKind::build),
        ] {
            registry.register(descriptor);
        }

        registry
    }

    /// Register (or redefine) a field type.
    pub fn register(&mut self, descriptor: FieldTypeDescriptor) {
        if self
            .types
            .insert(descriptor.type_id.to_string(), descriptor)
            .is_some()
        {
            tracing::debug!(type_id = descriptor.type_id, "field type redefined");
        }
    }

    #[must_use]
    pub fn resolve(&self, type_ref: &TypeRef) -> Option<&FieldTypeDescriptor> {
        self.types.get(type_ref.type_id())
    }

    #[must_use]
    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    /// Instantiate one `Field` from a raw definition.
    pub fn build_field(&self, list_key: &str, def: &FieldDef) -> Result<Field, EngineError> {
        let descriptor =
            self.resolve(&def.type_ref)
                .ok_or_else(|| EngineError::UnknownFieldType {
                    list: list_key.to_string(),
                    path: def.path.clone(),
                    type_id: def.type_ref.type_id().to_string(),
                })?;

        let ctx = FieldContext {
            list_key,
            path: &def.path,
            options: &def.options,
        };
        let kind = (descriptor.build)(&ctx)?;

        Ok(Field {
            list_key: list_key.to_string(),
            path: def.path.clone(),
            type_id: descriptor.type_id.to_string(),
            label: def
                .options
                .label
                .clone()
                .unwrap_or_else(|| default_label(&def.path)),
            required: def.options.required.clone(),
            options: def.options.clone(),
            kind,
        })
    }
}

///
/// TESTS
///
