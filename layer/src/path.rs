//! Absolute scene paths.
//!
//! A [`Path`] addresses one spec in a [`Layer`](crate::Layer):
//!
//! - `/` — the pseudo-root
//! - `/World/Cube` — a prim
//! - `/World/Cube.size` — a property of a prim
//!
//! Paths order lexicographically by their text, which places every spec
//! before its descendants.

use std::fmt;
use std::str::FromStr;

use crate::error::PathError;

const ROOT: &str = "/";

/// An absolute, validated path to a spec.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Path(String);

impl Path {
    /// Parses and validates an absolute path.
    pub fn new(text: &str) -> Result<Self, PathError> {
        if text == ROOT {
            return Ok(Self::absolute_root());
        }
        let Some(rest) = text.strip_prefix('/') else {
            return Err(PathError::NotAbsolute(text.to_owned()));
        };

        let (prims, property) = match rest.split_once('.') {
            Some((prims, property)) => (prims, Some(property)),
            None => (rest, None),
        };
        for element in prims.split('/').chain(property) {
            if !is_identifier(element) {
                return Err(PathError::InvalidElement {
                    path: text.to_owned(),
                    element: element.to_owned(),
                });
            }
        }
        Ok(Self(text.to_owned()))
    }

    /// The pseudo-root path `/`.
    pub fn absolute_root() -> Self {
        Self(ROOT.to_owned())
    }

    pub fn is_absolute_root(&self) -> bool {
        self.0 == ROOT
    }

    /// Returns `true` for `/prim.property` paths.
    pub fn is_property(&self) -> bool {
        self.0.contains('.')
    }

    /// Returns `true` for prim paths (not the root, not a property).
    pub fn is_prim(&self) -> bool {
        !self.is_absolute_root() && !self.is_property()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last element: the property name for property paths, the prim
    /// name otherwise. Empty for the root.
    pub fn name(&self) -> &str {
        if let Some((_, property)) = self.0.rsplit_once('.') {
            return property;
        }
        match self.0.rsplit_once('/') {
            Some((_, name)) => name,
            None => "",
        }
    }

    /// The owning prim of a property, or the parent prim of a prim.
    /// `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        if self.is_absolute_root() {
            return None;
        }
        if let Some((prim, _)) = self.0.rsplit_once('.') {
            return Some(Self(prim.to_owned()));
        }
        match self.0.rsplit_once('/') {
            Some(("", _)) | None => Some(Self::absolute_root()),
            Some((parent, _)) => Some(Self(parent.to_owned())),
        }
    }

    /// Appends a child prim name.
    pub fn child(&self, name: &str) -> Result<Path, PathError> {
        self.append(name, '/')
    }

    /// Appends a property name.
    pub fn property(&self, name: &str) -> Result<Path, PathError> {
        if self.is_absolute_root() {
            return Err(PathError::InvalidElement {
                path: format!("/.{name}"),
                element: String::new(),
            });
        }
        self.append(name, '.')
    }

    fn append(&self, name: &str, separator: char) -> Result<Path, PathError> {
        if self.is_property() {
            return Err(PathError::PropertyParent {
                parent: self.0.clone(),
                name: name.to_owned(),
            });
        }
        let text = if self.is_absolute_root() {
            format!("/{name}")
        } else {
            format!("{}{separator}{name}", self.0)
        };
        if !is_identifier(name) {
            return Err(PathError::InvalidElement {
                path: text,
                element: name.to_owned(),
            });
        }
        Ok(Self(text))
    }

    /// Returns `true` if `prefix` is this path or one of its ancestors.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        if prefix.is_absolute_root() || self == prefix {
            return true;
        }
        match self.0.strip_prefix(prefix.as_str()) {
            Some(rest) => !prefix.is_property() && (rest.starts_with('/') || rest.starts_with('.')),
            None => false,
        }
    }

    /// Rewrites the `old` prefix of this path to `new`.
    ///
    /// Returns `None` if `old` is not a prefix of this path. The root cannot
    /// be re-rooted.
    pub fn replace_prefix(&self, old: &Path, new: &Path) -> Option<Path> {
        if old.is_absolute_root() || new.is_absolute_root() || !self.has_prefix(old) {
            return None;
        }
        let suffix = &self.0[old.0.len()..];
        Some(Self(format!("{}{suffix}", new.0)))
    }
}

fn is_identifier(element: &str) -> bool {
    let mut chars = element.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Path {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.0
    }
}
