//! Call-site information used to derive a tag when none is given.
//!
//! Nothing here walks the stack at runtime. The call site hands its identity
//! over, either through `#[track_caller]` (file and line) or through the
//! [`caller!`](crate::caller) macro (module path and function name). Parsing is
//! deferred to [`Caller::tag`], so building a `Caller` costs nothing for
//! events that get filtered out.

use std::panic::Location;

/// Tag used when the call site cannot be identified.
pub const UNKNOWN_TAG: &str = "[unknown]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    origin: Origin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// `type_name` of a function item, e.g. `app::net::Client::connect`.
    Function(&'static str),
    Location { file: &'static str, line: u32 },
    Unknown,
}

impl Caller {
    /// Source location of whoever called the enclosing `#[track_caller]` fn.
    #[track_caller]
    pub fn here() -> Self {
        Self::from_location(Location::caller())
    }

    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            origin: Origin::Location {
                file: location.file(),
                line: location.line(),
            },
        }
    }

    /// From a fully qualified function path such as `crate::module::Type::method`.
    pub const fn from_function_path(path: &'static str) -> Self {
        Self {
            origin: Origin::Function(path),
        }
    }

    pub const fn unknown() -> Self {
        Self {
            origin: Origin::Unknown,
        }
    }

    /// Short `[Unit.member]` or `[file:line]` label for this call site.
    pub fn tag(&self) -> String {
        match self.origin {
            Origin::Function(path) => function_tag(path),
            Origin::Location { file, line } => location_tag(file, line),
            Origin::Unknown => None,
        }
        .unwrap_or_else(|| UNKNOWN_TAG.to_string())
    }
}

fn function_tag(path: &str) -> Option<String> {
    let mut segments = split_path(path.trim());
    while segments.last() == Some(&"{{closure}}") {
        segments.pop();
    }
    let member = strip_generics(segments.pop()?);
    let unit = short_type_name(segments.pop()?);
    if unit.is_empty() || member.is_empty() {
        return None;
    }
    Some(format!("[{unit}.{member}]"))
}

/// Split on `::` outside of generic brackets.
fn split_path(path: &str) -> Vec<&str> {
    let bytes = path.as_bytes();
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' if i == 0 || bytes[i - 1] != b'-' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                segments.push(&path[start..i]);
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    segments.push(&path[start..]);
    segments
}

/// `app::Client`, `app::Pool<u8>` and `<app::Client as app::Handler>` all
/// shorten to the implementing type's own name.
fn short_type_name(unit: &str) -> &str {
    let mut unit = unit.trim();
    if let Some(inner) = unit.strip_prefix('<').and_then(|u| u.strip_suffix('>')) {
        unit = match inner.find(" as ") {
            Some(at) => &inner[..at],
            None => inner,
        };
    }
    let unit = strip_generics(unit.trim_start_matches(['&', '*']));
    split_path(unit).last().copied().unwrap_or(unit)
}

fn strip_generics(segment: &str) -> &str {
    segment.find('<').map_or(segment, |at| &segment[..at]).trim()
}

fn location_tag(file: &str, line: u32) -> Option<String> {
    let name = file.rsplit(['/', '\\']).next().unwrap_or(file);
    let name = name.strip_suffix(".rs").unwrap_or(name);
    if name.is_empty() {
        return None;
    }
    Some(format!("[{name}:{line}]"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::marker::PhantomData;

    #[test]
    fn function_paths_become_unit_dot_member() {
        let c = Caller::from_function_path("app::net::Client::connect");
        assert_eq!(c.tag(), "[Client.connect]");

        let c = Caller::from_function_path("app::main::{{closure}}::{{closure}}");
        assert_eq!(c.tag(), "[app.main]");
    }

    #[test]
    fn trait_impls_and_generics_name_the_type() {
        let c = Caller::from_function_path("<app::net::Client as app::Handler>::handle");
        assert_eq!(c.tag(), "[Client.handle]");

        let c = Caller::from_function_path(
            "<app::Pool<alloc::string::String> as core::ops::Drop>::drop",
        );
        assert_eq!(c.tag(), "[Pool.drop]");

        let c = Caller::from_function_path("app::Pool<T>::get::{{closure}}");
        assert_eq!(c.tag(), "[Pool.get]");
    }

    #[test]
    fn locations_become_file_and_line() {
        let c = Caller::from_location(Location::caller());
        let tag = c.tag();
        assert!(tag.starts_with("[caller:"), "{tag}");
        assert!(tag.ends_with(']'));
    }

    #[test]
    fn shallow_or_empty_context_falls_back() {
        assert_eq!(Caller::unknown().tag(), UNKNOWN_TAG);
        assert_eq!(Caller::from_function_path("main").tag(), UNKNOWN_TAG);
        assert_eq!(Caller::from_function_path("").tag(), UNKNOWN_TAG);
        assert_eq!(Caller::from_function_path("::f").tag(), UNKNOWN_TAG);
    }

    trait Handler {
        fn handle(&self) -> Caller;
    }

    struct Client;

    impl Handler for Client {
        fn handle(&self) -> Caller {
            crate::caller!()
        }
    }

    struct Pool<T>(PhantomData<T>);

    impl<T> Pool<T> {
        fn get(&self) -> Caller {
            crate::caller!()
        }
    }

    #[test]
    fn macro_inside_impls_names_type_and_method() {
        assert_eq!(Client.handle().tag(), "[Client.handle]");
        assert_eq!(Pool::<u8>(PhantomData).get().tag(), "[Pool.get]");
    }

    #[test]
    fn macro_names_the_enclosing_function() {
        let c = crate::caller!();
        assert_eq!(c.tag(), "[tests.macro_names_the_enclosing_function]");

        let from_closure = (|| crate::caller!())();
        assert_eq!(
            from_closure.tag(),
            "[tests.macro_names_the_enclosing_function]"
        );
    }
}
