//! Closed vocabularies stored as lowercase strings in the database.

use serde::{Deserialize, Serialize};

use crate::EngineError;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $message:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// Parses request input, ignoring surrounding whitespace and case.
            pub fn from_input(value: &str) -> Result<Self, EngineError> {
                Self::try_from(value.trim().to_lowercase().as_str())
            }
        }

        impl TryFrom<&str> for $name {
            type Error = EngineError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(EngineError::InvalidInput($message.to_string())),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    MilkType, "Milk type must be 'cow' or 'buffalo'" {
        Cow => "cow",
        Buffalo => "buffalo",
    }
}

string_enum! {
    PaymentType, "Payment type must be 'advance', 'full', or 'partial'" {
        Advance => "advance",
        Full => "full",
        Partial => "partial",
    }
}

string_enum! {
    PaymentMethod, "Payment method must be 'cash', 'bank_transfer', 'upi', or 'cheque'" {
        Cash => "cash",
        BankTransfer => "bank_transfer",
        Upi => "upi",
        Cheque => "cheque",
    }
}

string_enum! {
    /// Which side of the dairy a counterparty sits on.
    ///
    /// Buyers are the farmers the dairy buys milk from; sellers are the
    /// customers the dairy sells milk to. Milk entries and payments carry the
    /// same discriminator.
    CounterpartyKind, "unknown counterparty kind" {
        Buyer => "buyer",
        Seller => "seller",
    }
}

string_enum! {
    LedgerKind, "unknown ledger kind" {
        Income => "income",
        Expense => "expense",
    }
}

impl CounterpartyKind {
    /// Capitalised label used in user-facing messages ("Buyer not found").
    pub fn label(self) -> &'static str {
        match self {
            Self::Buyer => "Buyer",
            Self::Seller => "Seller",
        }
    }

    /// Label of the milk record kind ("Milk purchase record not found").
    pub fn milk_label(self) -> &'static str {
        match self {
            Self::Buyer => "Milk purchase",
            Self::Seller => "Milk sale",
        }
    }

    /// The ledger book a milk entry of this kind posts into.
    pub fn ledger(self) -> LedgerKind {
        match self {
            Self::Buyer => LedgerKind::Expense,
            Self::Seller => LedgerKind::Income,
        }
    }
}

impl LedgerKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }

    /// Category assigned to rows posted automatically from milk entries.
    pub fn milk_category(self) -> &'static str {
        match self {
            Self::Income => "milk_sale",
            Self::Expense => "milk_purchase",
        }
    }
}
