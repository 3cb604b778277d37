//! Target-neutral type declarations produced by schema mapping.

use super::naming::{clean_variable_name, dedupe_names, is_identifier};

/// Reference to a primitive, container, or registered declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Str,
    Int,
    Float,
    Bool,
    Null,
    Any,
    /// String-keyed map of untyped values.
    Map,
    List(Box<TypeRef>),
    /// A single-value string literal (used for media-type annotations).
    Literal(String),
    Named(String),
    Union(Vec<TypeRef>),
}

impl TypeRef {
    /// Primitive for a raw schema type tag; unknown tags are untyped.
    pub fn from_tag(tag: &str) -> TypeRef {
        match tag {
            "string" => TypeRef::Str,
            "integer" => TypeRef::Int,
            "number" => TypeRef::Float,
            "boolean" => TypeRef::Bool,
            "null" => TypeRef::Null,
            "object" => TypeRef::Map,
            _ => TypeRef::Any,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Identifier-safe attribute name.
    pub name: String,
    /// Original property name when it differs from `name`.
    pub alias: Option<String>,
    pub ty: TypeRef,
    pub required: bool,
    pub description: Option<String>,
}

impl Field {
    pub fn new(property: &str, ty: TypeRef, required: bool, description: Option<String>) -> Self {
        let (name, alias) = if is_identifier(property) {
            (property.to_string(), None)
        } else {
            let mut cleaned = clean_variable_name(property);
            if !is_identifier(&cleaned) {
                cleaned.push('_');
            }
            (cleaned, Some(property.to_string()))
        };
        Self {
            name,
            alias,
            ty,
            required,
            description: description.filter(|d| !d.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Record with ordered fields; empty records are allowed.
    Record(Vec<Field>),
    /// Alias for a union of registered declarations.
    Union(Vec<TypeRef>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedType {
    pub name: String,
    pub description: Option<String>,
    pub kind: TypeKind,
}

impl SynthesizedType {
    /// Field names are made unique within the record; a renamed field keeps
    /// its property name as alias.
    pub fn record(name: String, description: Option<String>, mut fields: Vec<Field>) -> Self {
        let mut names: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
        dedupe_names(&mut names);
        for (field, unique) in fields.iter_mut().zip(names) {
            if field.name != unique {
                let property = std::mem::replace(&mut field.name, unique);
                field.alias.get_or_insert(property);
            }
        }
        Self {
            name,
            description: description.filter(|d| !d.is_empty()),
            kind: TypeKind::Record(fields),
        }
    }

    pub fn union(name: String, variants: Vec<TypeRef>) -> Self {
        Self {
            name,
            description: None,
            kind: TypeKind::Union(variants),
        }
    }

    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            TypeKind::Record(fields) => fields,
            TypeKind::Union(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_property_names_get_aliases() {
        let f = Field::new("user-id", TypeRef::Str, true, None);
        assert_eq!(f.name, "user_id");
        assert_eq!(f.alias.as_deref(), Some("user-id"));

        let kw = Field::new("from", TypeRef::Str, false, Some(String::new()));
        assert_eq!(kw.name, "from_");
        assert_eq!(kw.alias.as_deref(), Some("from"));
        assert_eq!(kw.description, None);

        let plain = Field::new("city", TypeRef::Str, true, Some("City name".into()));
        assert_eq!(plain.alias, None);
    }

    #[test]
    fn tags_map_to_primitives() {
        assert_eq!(TypeRef::from_tag("integer"), TypeRef::Int);
        assert_eq!(TypeRef::from_tag("object"), TypeRef::Map);
        assert_eq!(TypeRef::from_tag("file"), TypeRef::Any);
    }
}
