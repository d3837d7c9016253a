//! Names synthesized from observable property names.

/// Member name reserved for the construction routine.
pub const CONSTRUCTOR: &str = "constructor";

/// Upper-cases the first character: `foo` becomes `Foo`.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn getter_name(property: &str) -> String {
    format!("get{}", capitalize(property))
}

pub fn setter_name(property: &str) -> String {
    format!("set{}", capitalize(property))
}

/// Name of the behavior invoked after `property` changes.
pub fn hook_name(property: &str) -> String {
    format!("{property}Changed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_first_char_only() {
        assert_eq!(capitalize("foo"), "Foo");
        assert_eq!(capitalize("fooBar"), "FooBar");
        assert_eq!(capitalize("x"), "X");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("éclair"), "Éclair");
        assert_eq!(capitalize("_id"), "_id");
    }

    #[test]
    fn synthesized_names() {
        assert_eq!(getter_name("title"), "getTitle");
        assert_eq!(setter_name("title"), "setTitle");
        assert_eq!(hook_name("title"), "titleChanged");
    }
}
