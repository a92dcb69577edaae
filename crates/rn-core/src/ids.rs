//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID", equal to `u32::MAX`.
            pub const INVALID: $name = $name(<$inner>::MAX);

            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }

            /// The id that follows `self`; used to hand out fresh ids.
            /// Saturates at `INVALID`.
            #[inline]
            pub fn next(self) -> $name {
                $name(self.0.saturating_add(1))
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$inner> for $name {
            #[inline(always)]
            fn from(n: $inner) -> $name {
                $name(n)
            }
        }
    };
}

typed_id! {
    /// Identity of a network Node.  Chosen by the caller (persisted files
    /// carry their own node numbers), unique within a `Network`.
    pub struct NodeId(u32);
}

typed_id! {
    /// Identity of a directed Link, assigned by the owning `Network`.
    pub struct LinkId(u32);
}
