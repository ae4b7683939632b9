//! Strongly-typed identifier newtypes.
//!
//! Table, column and work-unit names all end up inside generated SQL or
//! ledger rows, so they share one invariant: a plain SQL identifier
//! (`[A-Za-z_][A-Za-z0-9_]*`). The macro below generates the struct plus
//! `Display`, `Deref`, `AsRef`, `Borrow`, `TryFrom` and serde support.

/// Returns `true` if `s` is a plain, unquoted SQL identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

macro_rules! define_identifier {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        $vis struct $Name(String);

        impl<'de> serde::Deserialize<'de> for $Name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $Name::try_new(s.clone()).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        concat!(stringify!($Name), " '{}' is not a valid SQL identifier"),
                        s
                    ))
                })
            }
        }

        impl $Name {
            /// Create a new instance, panicking if the name is not an identifier.
            ///
            /// Prefer [`try_new`](Self::try_new) when handling untrusted input.
            pub fn new(name: impl Into<String>) -> Self {
                let s = name.into();
                assert!(
                    $crate::names::is_identifier(&s),
                    concat!(stringify!($Name), " must be a valid SQL identifier")
                );
                Self(s)
            }

            /// Try to create a new instance, returning `None` for invalid names.
            pub fn try_new(name: impl Into<String>) -> Option<Self> {
                let s = name.into();
                if $crate::names::is_identifier(&s) {
                    Some(Self(s))
                } else {
                    None
                }
            }

            /// Return the underlying name as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $Name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $Name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<&str> for $Name {
            type Error = $crate::error::CoreError;
            fn try_from(s: &str) -> Result<Self, Self::Error> {
                Self::try_new(s).ok_or_else(|| $crate::error::CoreError::EmptyName {
                    context: format!(concat!(stringify!($Name), " '{}' is not a valid SQL identifier"), s),
                })
            }
        }

        impl PartialEq<str> for $Name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_identifier! {
    /// Name of a warehouse table (unqualified; the layer supplies the schema).
    pub struct TableName;
}

define_identifier! {
    /// Name of a column within a table.
    pub struct ColumnName;
}

define_identifier! {
    /// Name of a work unit, unique within a run.
    pub struct UnitName;
}
