//! Pydantic rendering of synthesized declarations.

use crate::emit::python::{string_literal, triple_quoted};
use crate::model::{Field, SynthesizedType, TypeKind, TypeRef};

pub fn type_hint(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Str => "str".into(),
        TypeRef::Int => "int".into(),
        TypeRef::Float => "float".into(),
        TypeRef::Bool => "bool".into(),
        TypeRef::Null => "None".into(),
        TypeRef::Any => "Any".into(),
        TypeRef::Map => "Dict[str, Any]".into(),
        TypeRef::List(item) => format!("List[{}]", type_hint(item)),
        TypeRef::Literal(value) => format!("Literal[{}]", string_literal(value)),
        TypeRef::Named(name) => name.clone(),
        TypeRef::Union(variants) => {
            let parts: Vec<String> = variants.iter().map(type_hint).collect();
            format!("Union[{}]", parts.join(", "))
        }
    }
}

fn render_field(field: &Field) -> String {
    let hint = type_hint(&field.ty);
    let mut args: Vec<String> = Vec::new();
    if let Some(description) = &field.description {
        args.push(format!("description={}", string_literal(description)));
    }
    if let Some(alias) = &field.alias {
        args.push(format!("alias={}", string_literal(alias)));
    }
    match (field.required, args.is_empty()) {
        (true, true) => format!("{}: {hint}", field.name),
        (true, false) => format!("{}: {hint} = Field({})", field.name, args.join(", ")),
        (false, true) => format!("{}: Optional[{hint}] = None", field.name),
        (false, false) => format!(
            "{}: Optional[{hint}] = Field(None, {})",
            field.name,
            args.join(", ")
        ),
    }
}

pub fn render_declaration(ty: &SynthesizedType) -> String {
    match &ty.kind {
        TypeKind::Union(variants) => {
            format!("{} = {}", ty.name, type_hint(&TypeRef::Union(variants.clone())))
        }
        TypeKind::Record(fields) => {
            let mut out = format!("class {}(BaseModel):\n", ty.name);
            if let Some(description) = &ty.description {
                out.push_str(&format!("    {}\n", triple_quoted(description)));
            }
            if fields.is_empty() {
                out.push_str("    pass\n");
            }
            for field in fields {
                out.push_str(&format!("    {}\n", render_field(field)));
            }
            out
        }
    }
}

/// All declarations in registration order, separated by two blank lines.
pub fn render_declarations(types: &[SynthesizedType]) -> String {
    types
        .iter()
        .map(|t| render_declaration(t).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_render_by_requiredness() {
        let ty = SynthesizedType::record(
            "WeatherParams".into(),
            Some("Inputs".into()),
            vec![
                Field::new("city", TypeRef::Str, true, Some("City name".into())),
                Field::new("days", TypeRef::Int, false, None),
                Field::new("units", TypeRef::Str, false, Some("C or F".into())),
                Field::new("user-id", TypeRef::Str, true, None),
                Field::new("raw", TypeRef::Map, true, None),
            ],
        );
        let expected = "class WeatherParams(BaseModel):\n    \"\"\"Inputs\"\"\"\n    city: str = Field(description=\"City name\")\n    days: Optional[int] = None\n    units: Optional[str] = Field(None, description=\"C or F\")\n    user_id: str = Field(alias=\"user-id\")\n    raw: Dict[str, Any]\n";
        assert_eq!(render_declaration(&ty), expected);
    }

    #[test]
    fn empty_records_and_unions() {
        let empty = SynthesizedType::record("Ping".into(), None, Vec::new());
        assert_eq!(render_declaration(&empty), "class Ping(BaseModel):\n    pass\n");
        let union = SynthesizedType::union(
            "Body".into(),
            vec![TypeRef::Named("A".into()), TypeRef::Named("B".into())],
        );
        assert_eq!(render_declaration(&union), "Body = Union[A, B]");
        assert_eq!(
            render_declarations(&[empty, union]),
            "class Ping(BaseModel):\n    pass\n\n\nBody = Union[A, B]"
        );
    }

    #[test]
    fn nested_hints() {
        let ty = TypeRef::List(Box::new(TypeRef::Union(vec![
            TypeRef::Literal("a/b".into()),
            TypeRef::Null,
        ])));
        assert_eq!(type_hint(&ty), "List[Union[Literal[\"a/b\"], None]]");
    }
}
