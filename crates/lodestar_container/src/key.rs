//! Keys used to address providers.
//!
//! A provider is reachable either by a [`NamedKey`] or by the [`TypeKey`] of
//! the value it produces. [`Key`] is the union of both and is what errors
//! report back to the caller.

use core::any::TypeId;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{Hash, Hasher};

// ─────────────────────────────────────────────────────────────────────────────
// TypeKey
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of a produced or requested type.
///
/// Based on [`TypeId`], so equality and hashing ignore the stored type name.
/// The name is kept for error messages and logging.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeKey {
    /// Creates a `TypeKey` for the given type.
    ///
    /// `T` may be unsized, so capability types such as `dyn Greeter` have
    /// keys of their own.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NamedKey
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque name distinguishing providers that share a produced type.
///
/// Also the key type of named-collection injections
/// (`HashMap<NamedKey, Arc<T>>`). Lookups accept plain `&str` through
/// [`Borrow`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamedKey(String);

impl NamedKey {
    /// Creates a new key from the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the name is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Borrow<str> for NamedKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NamedKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for NamedKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Key
// ─────────────────────────────────────────────────────────────────────────────

/// Any key a resolution can be requested or reported under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A provider registered under a name.
    Name(NamedKey),
    /// A provider registered under, or satisfying, a type.
    Type(TypeKey),
    /// Every named provider satisfying a type.
    Collection(TypeKey),
}

impl Key {
    /// Shorthand for a type key of `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type(TypeKey::of::<T>())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "\"{name}\""),
            Self::Type(key) => write!(f, "{key}"),
            Self::Collection(key) => write!(f, "named collection of {key}"),
        }
    }
}

impl From<NamedKey> for Key {
    fn from(name: NamedKey) -> Self {
        Self::Name(name)
    }
}

impl From<TypeKey> for Key {
    fn from(key: TypeKey) -> Self {
        Self::Type(key)
    }
}
