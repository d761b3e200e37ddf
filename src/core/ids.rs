use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

numeric_id!(
    /// Store identity of an [`ExchangeRate`](crate::core::rate::ExchangeRate).
    RateId
);
numeric_id!(
    /// Store identity of an [`ExchangeTransaction`](crate::core::exchange::ExchangeTransaction).
    ExchangeId
);
numeric_id!(
    /// Application user performing an exchange.
    UserId
);
numeric_id!(
    /// Staff record linked to an application user; cashiers are assigned per staff.
    StaffId
);
numeric_id!(CashierId);
numeric_id!(TellerId);
numeric_id!(OfficeId);
numeric_id!(GlAccountId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_equality() {
        assert_eq!(RateId::new(7), RateId::from(7));
        assert_ne!(RateId::new(7), RateId::new(8));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(format!("{}", ExchangeId::new(42)), "42");
    }

    #[test]
    fn test_id_ordering() {
        assert!(StaffId::new(1) < StaffId::new(2));
    }

    #[test]
    fn test_id_serializes_as_number() {
        let json = serde_json::to_string(&OfficeId::new(3)).unwrap();
        assert_eq!(json, "3");
    }
}
