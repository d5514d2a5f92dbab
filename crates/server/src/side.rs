//! Buyers and sellers share their handlers. A [`Side`] marker carries what
//! differs between them: the stored kind, the JSON keys and the field names of
//! the milk and payment bodies.

use api_types::{
    milk::{MilkListQuery, MilkPurchase, MilkPurchaseNew, MilkSale, MilkSaleNew},
    payment::{BuyerPayment, BuyerPaymentNew, SellerPayment, SellerPaymentNew},
};
use chrono::NaiveDate;
use engine::{
    CounterpartyKind, FatPercentage, MilkEntry, MilkEntryInput, MilkType, Money, Payment,
    PaymentInput, PaymentMethod, PaymentType, Quantity,
};
use serde::{Serialize, de::DeserializeOwned};

use crate::{ServerError, counterparties::counterparty_view};

pub trait Side: Send + Sync + 'static {
    const KIND: CounterpartyKind;
    /// Data key of a single counterparty, also the payments path segment.
    const ONE: &'static str;
    const MANY: &'static str;
    const MILK_ONE: &'static str;
    const MILK_MANY: &'static str;

    type MilkNew: DeserializeOwned + Send + 'static;
    type MilkRecord: Serialize + Send + 'static;
    type PaymentNew: DeserializeOwned + Send + 'static;
    type PaymentRecord: Serialize + Send + 'static;

    fn milk_input(body: Self::MilkNew) -> Result<MilkEntryInput, ServerError>;
    fn milk_record(entry: MilkEntry) -> Self::MilkRecord;
    /// `buyerId` on purchases, `sellerId` on sales.
    fn milk_counterparty(query: &MilkListQuery) -> Option<i64>;
    fn payment_input(body: Self::PaymentNew) -> Result<PaymentInput, ServerError>;
    fn payment_record(payment: Payment) -> Self::PaymentRecord;
}

pub struct Buyers;

pub struct Sellers;

fn build_milk_input(
    counterparty_id: i64,
    milk_type: &str,
    price: f64,
    quantity: f64,
    fat: f64,
    date: NaiveDate,
) -> Result<MilkEntryInput, ServerError> {
    Ok(MilkEntryInput {
        counterparty_id,
        milk_type: MilkType::from_input(milk_type)?,
        price: Money::from_major(price)?,
        quantity: Quantity::from_litres(quantity)?,
        fat: FatPercentage::from_percent(fat)?,
        date,
    })
}

fn build_payment_input(
    counterparty_id: i64,
    amount: f64,
    payment_type: &str,
    payment_method: &str,
    transaction_id: Option<String>,
    notes: Option<String>,
    date: NaiveDate,
) -> Result<PaymentInput, ServerError> {
    Ok(PaymentInput {
        counterparty_id,
        amount: Money::from_major(amount)?,
        payment_type: PaymentType::from_input(payment_type)?,
        payment_method: PaymentMethod::from_input(payment_method)?,
        transaction_id,
        notes,
        date,
    })
}

impl Side for Buyers {
    const KIND: CounterpartyKind = CounterpartyKind::Buyer;
    const ONE: &'static str = "buyer";
    const MANY: &'static str = "buyers";
    const MILK_ONE: &'static str = "milkPurchase";
    const MILK_MANY: &'static str = "milkPurchases";

    type MilkNew = MilkPurchaseNew;
    type MilkRecord = MilkPurchase;
    type PaymentNew = BuyerPaymentNew;
    type PaymentRecord = BuyerPayment;

    fn milk_input(body: MilkPurchaseNew) -> Result<MilkEntryInput, ServerError> {
        build_milk_input(
            body.buyer_id,
            &body.milk_type,
            body.buyer_price,
            body.total_qty,
            body.fat_percentage,
            body.date,
        )
    }

    fn milk_record(entry: MilkEntry) -> MilkPurchase {
        MilkPurchase {
            id: entry.id,
            buyer_id: entry.counterparty_id,
            buyer_name: entry.counterparty_name,
            milk_type: entry.milk_type.to_string(),
            buyer_price: entry.price.to_major(),
            total_qty: entry.quantity.to_litres(),
            date: entry.date,
            fat_percentage: entry.fat.to_percent(),
            total_amount: entry.total_amount.to_major(),
            created_at: entry.created_at,
            buyer: entry.counterparty.map(counterparty_view),
        }
    }

    fn milk_counterparty(query: &MilkListQuery) -> Option<i64> {
        query.buyer_id
    }

    fn payment_input(body: BuyerPaymentNew) -> Result<PaymentInput, ServerError> {
        build_payment_input(
            body.buyer_id,
            body.payment_amount,
            &body.payment_type,
            &body.payment_method,
            body.transaction_id,
            body.notes,
            body.date,
        )
    }

    fn payment_record(payment: Payment) -> BuyerPayment {
        BuyerPayment {
            id: payment.id,
            buyer_id: payment.counterparty_id,
            buyer_name: payment.counterparty_name,
            payment_amount: payment.amount.to_major(),
            payment_type: payment.payment_type.to_string(),
            payment_method: payment.payment_method.to_string(),
            transaction_id: payment.transaction_id,
            notes: payment.notes,
            date: payment.date,
            created_at: payment.created_at,
        }
    }
}

impl Side for Sellers {
    const KIND: CounterpartyKind = CounterpartyKind::Seller;
    const ONE: &'static str = "seller";
    const MANY: &'static str = "sellers";
    const MILK_ONE: &'static str = "milkSale";
    const MILK_MANY: &'static str = "milkSales";

    type MilkNew = MilkSaleNew;
    type MilkRecord = MilkSale;
    type PaymentNew = SellerPaymentNew;
    type PaymentRecord = SellerPayment;

    fn milk_input(body: MilkSaleNew) -> Result<MilkEntryInput, ServerError> {
        build_milk_input(
            body.seller_id,
            &body.milk_type,
            body.seller_price,
            body.total_qty,
            body.fat_percentage,
            body.date,
        )
    }

    fn milk_record(entry: MilkEntry) -> MilkSale {
        MilkSale {
            id: entry.id,
            seller_id: entry.counterparty_id,
            seller_name: entry.counterparty_name,
            milk_type: entry.milk_type.to_string(),
            seller_price: entry.price.to_major(),
            total_qty: entry.quantity.to_litres(),
            date: entry.date,
            fat_percentage: entry.fat.to_percent(),
            total_amount: entry.total_amount.to_major(),
            created_at: entry.created_at,
            seller: entry.counterparty.map(counterparty_view),
        }
    }

    fn milk_counterparty(query: &MilkListQuery) -> Option<i64> {
        query.seller_id
    }

    fn payment_input(body: SellerPaymentNew) -> Result<PaymentInput, ServerError> {
        build_payment_input(
            body.seller_id,
            body.payment_amount,
            &body.payment_type,
            &body.payment_method,
            body.transaction_id,
            body.notes,
            body.date,
        )
    }

    fn payment_record(payment: Payment) -> SellerPayment {
        SellerPayment {
            id: payment.id,
            seller_id: payment.counterparty_id,
            seller_name: payment.counterparty_name,
            payment_amount: payment.amount.to_major(),
            payment_type: payment.payment_type.to_string(),
            payment_method: payment.payment_method.to_string(),
            transaction_id: payment.transaction_id,
            notes: payment.notes,
            date: payment.date,
            created_at: payment.created_at,
        }
    }
}
