use crate::core::currency::CurrencyCode;
use crate::core::ids::{CashierId, OfficeId, StaffId, TellerId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A staff member's assignment to a teller till in an office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cashier {
    pub id: CashierId,
    pub staff_id: StaffId,
    pub teller_id: TellerId,
    pub office_id: OfficeId,
}

impl Cashier {
    pub fn new(id: CashierId, staff_id: StaffId, teller_id: TellerId, office_id: OfficeId) -> Self {
        Self {
            id,
            staff_id,
            teller_id,
            office_id,
        }
    }
}

/// Direction of a cash movement at the till.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashierTxnType {
    /// Cash received into the till.
    InwardCash,
    /// Cash paid out of the till.
    OutwardCash,
}

impl CashierTxnType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::InwardCash => "Cash In",
            Self::OutwardCash => "Cash Out",
        }
    }
}

impl fmt::Display for CashierTxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single cash movement recorded against a cashier session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashierTransaction {
    pub cashier_id: CashierId,
    pub txn_type: CashierTxnType,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub txn_date: NaiveDate,
    pub note: Option<String>,
}
