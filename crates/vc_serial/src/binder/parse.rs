use alloc::boxed::Box;
use alloc::vec::Vec;

/// Structure of a written type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TypeName<'a> {
    /// A plain path such as `my_crate::Foo` or `u8`.
    Path(&'a str),
    /// `Def<A, B>`.
    Generic {
        definition: &'a str,
        args: Vec<TypeName<'a>>,
    },
    /// `[T; N]`.
    Array { item: Box<TypeName<'a>>, len: usize },
    /// A const generic argument.
    Const(u64),
}

/// Parses `name` along the generic and array grammar.
///
/// Whitespace around separators is ignored. Returns `None` for names with
/// unbalanced brackets or empty segments.
pub(crate) fn parse(name: &str) -> Option<TypeName<'_>> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    if let Some(inner) = name.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let [item, len] = <[&str; 2]>::try_from(split_top_level(inner, ';')?).ok()?;
        return Some(TypeName::Array {
            item: Box::new(parse(item)?),
            len: len.trim().parse().ok()?,
        });
    }

    if let Some(open) = name.find('<') {
        let inner = name[open + 1..].strip_suffix('>')?;
        let definition = name[..open].trim();
        if definition.is_empty() || !is_path(definition) {
            return None;
        }
        let args = split_top_level(inner, ',')?
            .into_iter()
            .map(parse)
            .collect::<Option<Vec<_>>>()?;
        return Some(TypeName::Generic { definition, args });
    }

    if name.bytes().all(|b| b.is_ascii_digit()) {
        return name.parse().ok().map(TypeName::Const);
    }
    is_path(name).then_some(TypeName::Path(name))
}

fn is_path(text: &str) -> bool {
    !text.contains(['<', '>', '[', ']', ';', ',']) && !text.split("::").any(|s| s.trim().is_empty())
}

/// Splits at every `sep` outside angle and square brackets.
///
/// Returns `None` if the brackets do not balance.
fn split_top_level(text: &str, sep: char) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (index, c) in text.char_indices() {
        match c {
            '<' | '[' => depth += 1,
            '>' | ']' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            c if c == sep && depth == 0 => {
                parts.push(&text[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&text[start..]);
    Some(parts)
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn plain_paths() {
        assert_eq!(parse("u8"), Some(TypeName::Path("u8")));
        assert_eq!(parse(" my::Foo "), Some(TypeName::Path("my::Foo")));
        assert_eq!(parse("my::::Foo"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn nested_generics() {
        assert_eq!(
            parse("std::collections::HashMap<alloc::string::String, alloc::vec::Vec<i32>>"),
            Some(TypeName::Generic {
                definition: "std::collections::HashMap",
                args: vec![
                    TypeName::Path("alloc::string::String"),
                    TypeName::Generic {
                        definition: "alloc::vec::Vec",
                        args: vec![TypeName::Path("i32")],
                    },
                ],
            })
        );
    }

    #[test]
    fn arrays_and_consts() {
        assert_eq!(
            parse("[u16; 4]"),
            Some(TypeName::Array {
                item: Box::new(TypeName::Path("u16")),
                len: 4,
            })
        );
        assert_eq!(
            parse("my::Grid<[u8;2], 3>"),
            Some(TypeName::Generic {
                definition: "my::Grid",
                args: vec![
                    TypeName::Array {
                        item: Box::new(TypeName::Path("u8")),
                        len: 2,
                    },
                    TypeName::Const(3),
                ],
            })
        );
    }

    #[test]
    fn unbalanced_names() {
        assert_eq!(parse("Vec<u8"), None);
        assert_eq!(parse("Vec<u8>>"), None);
        assert_eq!(parse("[u8; 2; 3]"), None);
        assert_eq!(parse("[u8]"), None);
    }
}
