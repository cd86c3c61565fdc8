//! Type identity primitives for binding keys.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Comparable identifier for the type a binding produces.
///
/// Most bindings use the nominal form via [`TypeTag::of`], which pairs a
/// `TypeId` with the type name for diagnostics. Tokens cover seams where the
/// type system cannot tell two contracts apart (e.g. two bindings that both
/// erase to the same trait object). Primitive tags exist for configuration
/// values keyed by scalar kind rather than by a Rust type. `SetOf` wraps an
/// element tag to address a collection binding.
///
/// Equality is structural, except tokens, which compare by their
/// process-unique id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// A concrete Rust type, identified by `TypeId` and named for display.
    Nominal(TypeId, &'static str),
    /// An opaque process-unique symbol.
    Token(Token),
    /// A built-in scalar kind.
    Primitive(Primitive),
    /// The collection type over an element tag.
    SetOf(Box<TypeTag>),
}

impl TypeTag {
    /// Nominal tag for a Rust type.
    pub fn of<T: 'static>() -> TypeTag {
        TypeTag::Nominal(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Collection tag over an element tag.
    pub fn set_of(element: TypeTag) -> TypeTag {
        TypeTag::SetOf(Box::new(element))
    }

    /// Whether this tag addresses a collection.
    pub fn is_set(&self) -> bool {
        matches!(self, TypeTag::SetOf(_))
    }

    /// The element tag of a collection tag, if this is one.
    pub fn element(&self) -> Option<&TypeTag> {
        match self {
            TypeTag::SetOf(inner) => Some(inner),
            _ => None,
        }
    }

    /// Human-readable name for error messages and graph exports.
    pub fn display_name(&self) -> String {
        match self {
            TypeTag::Nominal(_, name) => (*name).to_string(),
            TypeTag::Token(token) => token.label().to_string(),
            TypeTag::Primitive(kind) => kind.name().to_string(),
            TypeTag::SetOf(inner) => format!("Set<{}>", inner.display_name()),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Nominal(_, name) => f.write_str(name),
            TypeTag::Token(token) => write!(f, "{}", token),
            TypeTag::Primitive(kind) => f.write_str(kind.name()),
            TypeTag::SetOf(inner) => write!(f, "Set<{}>", inner),
        }
    }
}

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque process-unique symbol for keys the type system cannot distinguish.
///
/// Two tokens are equal only if they are the same token; the label is for
/// diagnostics. Tokens are `Copy` and cheap to pass around.
///
/// # Examples
///
/// ```
/// use kiln_di::Token;
///
/// let a = Token::new("metrics-sink");
/// let b = Token::new("metrics-sink");
/// assert_ne!(a, b); // same label, distinct symbols
/// assert_eq!(a, a);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Token {
    id: u64,
    label: &'static str,
}

impl Token {
    /// Mints a fresh symbol with a diagnostic label.
    pub fn new(label: &'static str) -> Token {
        Token { id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed), label }
    }

    /// The diagnostic label supplied at creation.
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token({})", self.label)
    }
}

/// Built-in scalar kinds for primitive-keyed bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Machine integer.
    Integer,
    /// Floating-point number.
    Float,
    /// Text.
    Text,
    /// Boolean.
    Boolean,
    /// Arbitrary-precision integer.
    BigInteger,
    /// Interned symbol.
    Symbol,
}

impl Primitive {
    fn name(&self) -> &'static str {
        match self {
            Primitive::Integer => "integer",
            Primitive::Float => "float",
            Primitive::Text => "text",
            Primitive::Boolean => "boolean",
            Primitive::BigInteger => "biginteger",
            Primitive::Symbol => "symbol",
        }
    }
}
