//! Binding keys: a type tag plus an optional discriminating id.

use std::fmt;

use crate::tag::{Primitive, Token, TypeTag};

/// The lookup key for a binding or a produced instance.
///
/// A key is a [`TypeTag`] plus an optional id. The id distinguishes multiple
/// bindings of the same type, e.g. a `primary` and a `replica` database
/// handle. Keys are cheap to clone and hashable.
///
/// # Examples
///
/// ```
/// use kiln_di::Key;
///
/// struct Database;
///
/// let plain = Key::of::<Database>();
/// let named = Key::named::<Database>("replica");
/// assert_ne!(plain, named);
/// assert_eq!(named.id(), Some("replica"));
///
/// // Collection keys wrap the element tag.
/// let set = Key::set_of::<Database>();
/// assert!(set.is_set());
/// assert_eq!(set.element_key(), Some(plain));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    tag: TypeTag,
    id: Option<&'static str>,
}

impl Key {
    /// Key for a Rust type with no id.
    pub fn of<T: 'static>() -> Key {
        Key { tag: TypeTag::of::<T>(), id: None }
    }

    /// Key for a Rust type with a discriminating id.
    pub fn named<T: 'static>(id: &'static str) -> Key {
        Key { tag: TypeTag::of::<T>(), id: Some(id) }
    }

    /// Collection key over a Rust element type.
    pub fn set_of<T: 'static>() -> Key {
        Key { tag: TypeTag::set_of(TypeTag::of::<T>()), id: None }
    }

    /// Collection key over a Rust element type, with a discriminating id.
    pub fn named_set_of<T: 'static>(id: &'static str) -> Key {
        Key { tag: TypeTag::set_of(TypeTag::of::<T>()), id: Some(id) }
    }

    /// Key for an opaque [`Token`].
    pub fn of_token(token: Token) -> Key {
        Key { tag: TypeTag::Token(token), id: None }
    }

    /// Key for a scalar kind.
    pub fn of_primitive(kind: Primitive) -> Key {
        Key { tag: TypeTag::Primitive(kind), id: None }
    }

    /// Key for an arbitrary tag.
    pub fn of_tag(tag: TypeTag) -> Key {
        Key { tag, id: None }
    }

    /// Returns this key with the given id.
    pub fn with_id(mut self, id: &'static str) -> Key {
        self.id = Some(id);
        self
    }

    /// The type tag.
    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    /// The discriminating id, if any.
    pub fn id(&self) -> Option<&'static str> {
        self.id
    }

    /// Whether this key addresses a collection.
    pub fn is_set(&self) -> bool {
        self.tag.is_set()
    }

    /// The collection key whose elements this key would contribute,
    /// preserving the id.
    pub fn to_set(&self) -> Key {
        Key { tag: TypeTag::set_of(self.tag.clone()), id: self.id }
    }

    /// The element key of a collection key, preserving the id.
    pub fn element_key(&self) -> Option<Key> {
        self.tag.element().map(|inner| Key { tag: inner.clone(), id: self.id })
    }

    /// Human-readable name for error messages and graph exports.
    pub fn display_name(&self) -> String {
        match self.id {
            Some(id) => format!("{}#{}", self.tag.display_name(), id),
            None => self.tag.display_name(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}#{}", self.tag, id),
            None => write!(f, "{}", self.tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Database;

    #[test]
    fn named_and_plain_keys_differ() {
        assert_ne!(Key::of::<Database>(), Key::named::<Database>("replica"));
        assert_eq!(Key::named::<Database>("a"), Key::named::<Database>("a"));
    }

    #[test]
    fn set_round_trip_preserves_id() {
        let named = Key::named::<Database>("replica");
        let set = named.to_set();
        assert!(set.is_set());
        assert_eq!(set.id(), Some("replica"));
        assert_eq!(set.element_key(), Some(named));
    }

    #[test]
    fn display_includes_id() {
        let key = Key::named::<Database>("replica");
        assert!(key.to_string().ends_with("#replica"));
    }
}
