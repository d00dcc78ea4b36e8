use std::fmt;

/// Hierarchical object path of an attribute, e.g. `/org/bluez/example/service0/char1/desc0`.
///
/// Paths are handed out by the attribute tree when a child is added and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributePath(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathKind {
    Service,
    Characteristic,
    Descriptor,
}

impl PathKind {
    fn segment(self) -> &'static str {
        match self {
            PathKind::Service => "service",
            PathKind::Characteristic => "char",
            PathKind::Descriptor => "desc",
        }
    }
}

impl AttributePath {
    pub fn new<T: Into<String>>(path: T) -> Self {
        AttributePath(path.into())
    }

    pub fn root() -> Self {
        AttributePath("/".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn child(&self, kind: PathKind, index: usize) -> Self {
        let parent = self.0.trim_end_matches('/');
        AttributePath(format!("{}/{}{}", parent, kind.segment(), index))
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttributePath {
    fn from(path: &str) -> Self {
        AttributePath::new(path)
    }
}

impl AsRef<str> for AttributePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
