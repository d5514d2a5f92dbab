//! Storage and business rules of the milk dairy.
//!
//! [`Engine`] owns the database connection and exposes every operation the
//! HTTP layer needs: counterparties, milk entries, payments, the income and
//! expense books, dashboard reports and user accounts. Values cross the
//! boundary as typed records ([`Counterparty`], [`MilkEntry`], ...) with
//! money and measures in fixed point.

pub use counterparties::{Counterparty, CounterpartyAccount, MilkTotals, PaymentTotals};
pub use error::EngineError;
pub use kinds::{CounterpartyKind, LedgerKind, MilkType, PaymentMethod, PaymentType};
pub use ledger_entries::LedgerEntry;
pub use measure::{FatPercentage, Quantity};
pub use milk_entries::MilkEntry;
pub use money::Money;
pub use ops::*;
pub use payments::Payment;
pub use users::User;

mod counterparties;
mod error;
mod kinds;
mod ledger_entries;
mod measure;
mod milk_entries;
mod money;
mod ops;
mod payments;
mod users;

pub type ResultEngine<T> = Result<T, EngineError>;
