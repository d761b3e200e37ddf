use crate::core::cashier::{Cashier, CashierTransaction, CashierTxnType};
use crate::core::currency::CurrencyCode;
use crate::core::error::ForexError;
use crate::core::exchange::ExchangeTransaction;
use crate::core::ids::GlAccountId;
use crate::core::journal::{CorrelationId, FinancialActivity, JournalEntry, JournalEntryType};
use crate::store::{CashierLedger, GlLedger, PostingUnit};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Correlation id sequence shared by every adapter in the process.
static SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// One cash movement at the till and its balanced journal pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CashMovement {
    pub cashier_transaction: CashierTransaction,
    pub debit: JournalEntry,
    pub credit: JournalEntry,
}

impl CashMovement {
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.debit.transaction_id
    }

    /// Debit equals credit equals the cash moved, in the same currency and
    /// under one correlation id.
    pub fn is_balanced(&self) -> bool {
        let amount = self.cashier_transaction.amount;
        self.debit.entry_type == JournalEntryType::Debit
            && self.credit.entry_type == JournalEntryType::Credit
            && self.debit.amount == amount
            && self.credit.amount == amount
            && self.debit.currency == self.cashier_transaction.currency
            && self.credit.currency == self.cashier_transaction.currency
            && self.debit.transaction_id == self.credit.transaction_id
    }
}

/// Everything posted for one exchange leg: cash paid out in the source
/// currency and cash taken in the destination currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegPostings {
    pub outward: CashMovement,
    pub inward: CashMovement,
}

impl LegPostings {
    pub fn is_balanced(&self) -> bool {
        self.outward.is_balanced() && self.inward.is_balanced()
    }

    pub fn journal_entries(&self) -> [&JournalEntry; 4] {
        [
            &self.outward.debit,
            &self.outward.credit,
            &self.inward.debit,
            &self.inward.credit,
        ]
    }

    /// Sum of signed journal amounts per currency; zero for every currency
    /// when the leg balances.
    pub fn net_by_currency(&self) -> Vec<(CurrencyCode, Decimal)> {
        let mut totals: Vec<(CurrencyCode, Decimal)> = Vec::new();
        for entry in self.journal_entries() {
            match totals.iter_mut().find(|(c, _)| *c == entry.currency) {
                Some((_, total)) => *total += entry.signed_amount(),
                None => totals.push((entry.currency.clone(), entry.signed_amount())),
            }
        }
        totals
    }
}

/// Turns an exchange leg into cashier transactions and journal entries.
///
/// Outward cash debits the main vault and credits the teller till; inward
/// cash debits the till and credits the vault. Accounts are resolved per
/// currency of the movement.
pub struct LedgerPostingAdapter {
    cashiers: Arc<dyn CashierLedger>,
    gl: Arc<dyn GlLedger>,
}

impl LedgerPostingAdapter {
    pub fn new(cashiers: Arc<dyn CashierLedger>, gl: Arc<dyn GlLedger>) -> Self {
        Self { cashiers, gl }
    }

    /// Build the postings for a leg without writing anything.
    pub fn prepare(
        &self,
        leg: &ExchangeTransaction,
        at: DateTime<Utc>,
    ) -> Result<LegPostings, ForexError> {
        let staff_id = leg.user().staff_id;
        let cashier = self
            .cashiers
            .find_cashier_for_staff(staff_id)
            .map_err(|e| e.into_forex("cashier"))?
            .ok_or(ForexError::CashierNotFound { staff_id })?;

        let outward = self.movement(
            leg,
            &cashier,
            CashierTxnType::OutwardCash,
            leg.amount_given(),
            leg.currency_from(),
            at,
        )?;
        let inward = self.movement(
            leg,
            &cashier,
            CashierTxnType::InwardCash,
            leg.amount_taken(),
            leg.currency_to(),
            at,
        )?;

        Ok(LegPostings { outward, inward })
    }

    /// Build and write the postings for a leg into an open unit of work.
    ///
    /// Nothing is retried; on error the caller drops the unit.
    pub fn post(
        &self,
        unit: &mut dyn PostingUnit,
        leg: &ExchangeTransaction,
        at: DateTime<Utc>,
    ) -> Result<LegPostings, ForexError> {
        let postings = self.prepare(leg, at)?;
        for movement in [&postings.outward, &postings.inward] {
            unit.record_cashier_transaction(movement.cashier_transaction.clone())
                .map_err(|e| e.into_forex("cashier transaction"))?;
            unit.post_journal_entry(movement.debit.clone())
                .map_err(|e| e.into_forex("journal entry"))?;
            unit.post_journal_entry(movement.credit.clone())
                .map_err(|e| e.into_forex("journal entry"))?;
        }
        Ok(postings)
    }

    fn movement(
        &self,
        leg: &ExchangeTransaction,
        cashier: &Cashier,
        txn_type: CashierTxnType,
        amount: Decimal,
        currency: &CurrencyCode,
        at: DateTime<Utc>,
    ) -> Result<CashMovement, ForexError> {
        let main_vault = self.account(FinancialActivity::CashAtMainVault, currency)?;
        let teller_cash = self.account(FinancialActivity::CashAtTeller, currency)?;
        let (debit_account, credit_account) = match txn_type {
            CashierTxnType::InwardCash => (teller_cash, main_vault),
            CashierTxnType::OutwardCash => (main_vault, teller_cash),
        };

        let cashier_transaction = CashierTransaction {
            cashier_id: cashier.id,
            txn_type,
            amount,
            currency: currency.clone(),
            txn_date: leg.transaction_date(),
            note: leg.client_name().map(str::to_string),
        };

        let correlation = CorrelationId::generate(
            at,
            leg.user().user_id,
            cashier.office_id,
            SEQUENCE.fetch_add(1, Ordering::Relaxed),
        );

        let entry = |gl_account: GlAccountId, entry_type: JournalEntryType| JournalEntry {
            office_id: cashier.office_id,
            gl_account,
            currency: currency.clone(),
            exchange_rate_id: leg.exchange_rate_id(),
            transaction_id: correlation.clone(),
            manual_entry: false,
            entry_date: cashier_transaction.txn_date,
            entry_type,
            amount,
            description: cashier_transaction.note.clone(),
        };
        let debit = entry(debit_account, JournalEntryType::Debit);
        let credit = entry(credit_account, JournalEntryType::Credit);

        Ok(CashMovement {
            cashier_transaction,
            debit,
            credit,
        })
    }

    fn account(
        &self,
        activity: FinancialActivity,
        currency: &CurrencyCode,
    ) -> Result<GlAccountId, ForexError> {
        self.gl
            .find_financial_activity_account(activity, currency)
            .map_err(|e| e.into_forex("financial activity account"))?
            .map(|a| a.gl_account)
            .ok_or_else(|| ForexError::FinancialActivityAccountNotConfigured {
                activity,
                currency: currency.clone(),
            })
    }
}
