//! Type expression helpers shared by indexing and lookups.

use async_graphql_parser::types::{BaseType, Type};

/// The builtin GraphQL scalars. Custom `scalar` declarations are NOT in this
/// set and therefore still produce relationship edges.
pub const BUILTIN_SCALARS: &[&str] = &["Int", "Float", "String", "Boolean", "ID"];

/// True if `name` is one of the five builtin scalars.
pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name)
}

/// Strip list and non-null wrappers down to the bare named type.
pub fn unwrap_type(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => unwrap_type(inner),
    }
}

/// Render the full wrapper-preserving signature, e.g. `[User!]!`.
pub fn full_type(ty: &Type) -> String {
    let rendered = match &ty.base {
        BaseType::Named(name) => name.to_string(),
        BaseType::List(inner) => format!("[{}]", full_type(inner)),
    };
    if ty.nullable {
        rendered
    } else {
        format!("{rendered}!")
    }
}

/// True if the type is a list at any non-null nesting depth.
pub fn is_list_type(ty: &Type) -> bool {
    matches!(ty.base, BaseType::List(_))
}
