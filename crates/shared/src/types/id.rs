//! Typed IDs for type-safe entity references.
//!
//! Identifiers are opaque integers handed out by the persistence layer.
//! Wrapping them prevents accidentally passing an `AccountId` where a
//! `CurrencyId` is expected.

use serde::{Deserialize, Serialize};

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Creates an ID from a raw integer.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the inner integer.
            #[must_use]
            pub const fn into_inner(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for a ledger owner.");
typed_id!(CurrencyId, "Unique identifier for a currency.");
typed_id!(AccountId, "Unique identifier for an account.");
typed_id!(CashFlowActivityId, "Unique identifier for a cash flow activity.");
typed_id!(ModifierId, "Unique identifier for a modifier (transaction template).");
typed_id!(ModifierAtomId, "Unique identifier for one atom of a modifier.");
typed_id!(FinancialEntryId, "Unique identifier for a financial entry.");
typed_id!(FrozenPeriodId, "Unique identifier for a frozen period.");
