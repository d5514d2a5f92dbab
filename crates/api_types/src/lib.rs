//! Wire types of the milk dairy HTTP API.
//!
//! Request bodies and query strings are camelCase. Stored records are
//! PascalCase (`Id`, `FullName`, `TotalAmount`). Report rows are camelCase.
//! Amounts, quantities and percentages travel as JSON numbers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub mod envelope {
    use serde::ser::{SerializeMap, Serializer};

    use super::*;

    /// Success envelope: `{success: true, message, data}`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ApiResponse<T> {
        pub success: bool,
        pub message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub data: Option<T>,
    }

    impl<T> ApiResponse<T> {
        pub fn ok(message: impl Into<String>, data: T) -> Self {
            Self {
                success: true,
                message: message.into(),
                data: Some(data),
            }
        }
    }

    impl ApiResponse<()> {
        /// Success without payload (deletes, password change).
        pub fn done(message: impl Into<String>) -> Self {
            Self {
                success: true,
                message: message.into(),
                data: None,
            }
        }
    }

    /// Failure envelope: `{success: false, message, error?}`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ApiFailure {
        pub success: bool,
        pub message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub error: Option<String>,
    }

    impl ApiFailure {
        pub fn new(message: impl Into<String>) -> Self {
            Self {
                success: false,
                message: message.into(),
                error: None,
            }
        }
    }

    /// A single record under a resource-specific key, e.g. `{"buyer": {...}}`.
    #[derive(Debug)]
    pub struct Keyed<T> {
        pub key: &'static str,
        pub value: T,
    }

    impl<T: Serialize> Serialize for Keyed<T> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry(self.key, &self.value)?;
            map.end()
        }
    }

    /// A list under a resource-specific key plus its length, e.g.
    /// `{"buyers": [...], "total": 2}`.
    ///
    /// Date-range listings also carry the summed amount and the range.
    #[derive(Debug)]
    pub struct KeyedList<T> {
        pub key: &'static str,
        pub items: Vec<T>,
        pub total_amount: Option<f64>,
        pub date_range: Option<common::DateRange>,
    }

    impl<T> KeyedList<T> {
        pub fn new(key: &'static str, items: Vec<T>) -> Self {
            Self {
                key,
                items,
                total_amount: None,
                date_range: None,
            }
        }

        pub fn with_range(mut self, total_amount: f64, date_range: common::DateRange) -> Self {
            self.total_amount = Some(total_amount);
            self.date_range = Some(date_range);
            self
        }
    }

    impl<T: Serialize> Serialize for KeyedList<T> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(None)?;
            map.serialize_entry(self.key, &self.items)?;
            map.serialize_entry("total", &self.items.len())?;
            if let Some(total_amount) = self.total_amount {
                map.serialize_entry("totalAmount", &total_amount)?;
            }
            if let Some(date_range) = &self.date_range {
                map.serialize_entry("dateRange", date_range)?;
            }
            map.end()
        }
    }
}

pub mod common {
    use super::*;

    /// `?q=` of every search endpoint.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SearchQuery {
        pub q: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DateRangeQuery {
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DateRange {
        pub start_date: NaiveDate,
        pub end_date: NaiveDate,
    }

    /// Body of `GET /`.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Welcome {
        pub name: String,
        pub version: String,
        pub status: String,
    }
}

pub mod auth {
    use super::*;

    /// Register and login body. Missing fields arrive empty and fail
    /// validation with a readable message.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Credentials {
        pub username: String,
        pub password: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    pub struct PasswordChange {
        pub current_password: String,
        pub new_password: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    pub struct User {
        pub id: i64,
        pub username: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Login {
        pub user: User,
        /// Bearer token for the `Authorization` header.
        pub token: String,
    }
}

pub mod counterparty {
    use super::*;

    /// Create and full-replace body of buyers and sellers.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    pub struct CounterpartyNew {
        #[serde(alias = "name")]
        pub full_name: String,
        pub mobile_number: String,
        pub city: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CounterpartyListQuery {
        pub city: Option<String>,
        pub search: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CounterpartyGetQuery {
        pub include_transactions: Option<bool>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    pub struct Counterparty {
        pub id: i64,
        pub full_name: String,
        pub mobile_number: String,
        pub city: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MilkTransactions {
        pub total_transactions: u64,
        pub total_quantity: f64,
        pub total_amount: f64,
        pub avg_price: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaymentsMade {
        pub total_payments: u64,
        pub total_paid: f64,
    }

    /// A counterparty with its running account.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CounterpartyAccount {
        #[serde(flatten)]
        pub counterparty: Counterparty,
        #[serde(rename = "milkTransactions")]
        pub milk_transactions: MilkTransactions,
        pub payments: PaymentsMade,
        /// Milk total minus payments; negative when overpaid.
        #[serde(rename = "outstandingAmount")]
        pub outstanding_amount: f64,
    }

    /// `GET /:id` returns the account only when asked for.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum CounterpartyView {
        Account(CounterpartyAccount),
        Plain(Counterparty),
    }
}

pub mod milk {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MilkPurchaseNew {
        pub buyer_id: i64,
        pub milk_type: String,
        pub buyer_price: f64,
        pub total_qty: f64,
        pub date: NaiveDate,
        pub fat_percentage: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MilkSaleNew {
        pub seller_id: i64,
        pub milk_type: String,
        pub seller_price: f64,
        pub total_qty: f64,
        pub date: NaiveDate,
        pub fat_percentage: f64,
    }

    /// List filters. At most one of `buyerId`/`sellerId`, `milkType`, the date
    /// range and `includeDetails` may be given.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MilkListQuery {
        pub buyer_id: Option<i64>,
        pub seller_id: Option<i64>,
        pub milk_type: Option<String>,
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
        pub include_details: Option<bool>,
    }

    /// A milk purchase. `BuyerName` is the name at the time of purchase.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    pub struct MilkPurchase {
        pub id: i64,
        pub buyer_id: i64,
        pub buyer_name: String,
        pub milk_type: String,
        pub buyer_price: f64,
        pub total_qty: f64,
        pub date: NaiveDate,
        pub fat_percentage: f64,
        pub total_amount: f64,
        pub created_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub buyer: Option<counterparty::Counterparty>,
    }

    /// A milk sale. `SellerName` is the name at the time of sale.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    pub struct MilkSale {
        pub id: i64,
        pub seller_id: i64,
        pub seller_name: String,
        pub milk_type: String,
        pub seller_price: f64,
        pub total_qty: f64,
        pub date: NaiveDate,
        pub fat_percentage: f64,
        pub total_amount: f64,
        pub created_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub seller: Option<counterparty::Counterparty>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MilkTypeSummary {
        pub milk_type: String,
        pub total_transactions: u64,
        pub total_quantity: f64,
        pub total_amount: f64,
        pub avg_price: f64,
        pub unique_counterparties: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MilkSummary {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub date_range: Option<common::DateRange>,
        pub summary: Vec<MilkTypeSummary>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MilkDayRow {
        pub milk_type: String,
        pub total_transactions: u64,
        pub total_quantity: f64,
        pub total_amount: f64,
        pub avg_price: f64,
        pub min_price: f64,
        pub max_price: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MilkDailyReport {
        pub date: NaiveDate,
        pub report: Vec<MilkDayRow>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProfitAnalysisRow {
        /// `Sales` or `Purchases`.
        #[serde(rename = "type")]
        pub kind: String,
        pub milk_type: String,
        pub total_transactions: u64,
        pub total_quantity: f64,
        pub total_amount: f64,
        pub avg_price: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProfitAnalysis {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub date_range: Option<common::DateRange>,
        pub analysis: Vec<ProfitAnalysisRow>,
    }
}

pub mod payment {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BuyerPaymentNew {
        pub buyer_id: i64,
        pub payment_amount: f64,
        pub payment_type: String,
        pub payment_method: String,
        pub transaction_id: Option<String>,
        pub notes: Option<String>,
        pub date: NaiveDate,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SellerPaymentNew {
        pub seller_id: i64,
        pub payment_amount: f64,
        pub payment_type: String,
        pub payment_method: String,
        pub transaction_id: Option<String>,
        pub notes: Option<String>,
        pub date: NaiveDate,
    }

    /// Partial update. Unknown fields are rejected.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", deny_unknown_fields)]
    pub struct PaymentUpdate {
        pub payment_amount: Option<f64>,
        pub payment_type: Option<String>,
        pub payment_method: Option<String>,
        pub transaction_id: Option<String>,
        pub notes: Option<String>,
        pub date: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    pub struct BuyerPayment {
        pub id: i64,
        pub buyer_id: i64,
        pub buyer_name: String,
        pub payment_amount: f64,
        pub payment_type: String,
        pub payment_method: String,
        pub transaction_id: Option<String>,
        pub notes: Option<String>,
        pub date: NaiveDate,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    pub struct SellerPayment {
        pub id: i64,
        pub seller_id: i64,
        pub seller_name: String,
        pub payment_amount: f64,
        pub payment_type: String,
        pub payment_method: String,
        pub transaction_id: Option<String>,
        pub notes: Option<String>,
        pub date: NaiveDate,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaymentTotals {
        pub total_payments: u64,
        pub total_amount: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaymentGroup {
        pub payment_type: String,
        pub payment_method: String,
        pub total_payments: u64,
        pub total_amount: f64,
    }

    /// `GET /buyer/:id/summary` and `GET /seller/:id/summary`.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaymentSummary {
        pub counterparty_id: i64,
        pub counterparty_name: String,
        pub total_payments: u64,
        pub total_amount: f64,
        pub breakdown: Vec<PaymentGroup>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DailyPayments<T> {
        pub date: NaiveDate,
        pub payments: Vec<T>,
        pub total_payments: u64,
        pub total_amount: f64,
    }
}

pub mod ledger {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct IncomeNew {
        pub amount: f64,
        #[serde(default)]
        pub description: String,
        #[serde(default)]
        pub source: String,
        pub category: Option<String>,
        pub date: NaiveDate,
    }

    /// Partial update. Unknown fields are rejected.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", deny_unknown_fields)]
    pub struct IncomeUpdate {
        pub amount: Option<f64>,
        pub description: Option<String>,
        pub source: Option<String>,
        pub category: Option<String>,
        pub date: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExpenseNew {
        pub amount: f64,
        #[serde(default)]
        pub description: String,
        #[serde(default)]
        pub paid_to: String,
        pub category: Option<String>,
        pub date: NaiveDate,
    }

    /// Partial update. Unknown fields are rejected.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", deny_unknown_fields)]
    pub struct ExpenseUpdate {
        pub amount: Option<f64>,
        pub description: Option<String>,
        pub paid_to: Option<String>,
        pub category: Option<String>,
        pub date: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    pub struct Income {
        pub id: i64,
        pub amount: f64,
        pub description: String,
        pub source: String,
        pub category: String,
        pub date: NaiveDate,
        /// Set on rows posted from a milk sale.
        pub milk_distribution_id: Option<i64>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    pub struct Expense {
        pub id: i64,
        pub amount: f64,
        pub description: String,
        pub paid_to: String,
        pub category: String,
        pub date: NaiveDate,
        /// Set on rows posted from a milk purchase.
        pub milk_store_id: Option<i64>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CategoryTotal {
        pub category: String,
        pub total_amount: f64,
        pub total_records: u64,
        pub average_amount: f64,
    }

    /// Categories folded into "Milk Sales", "Other Expenses" and so on.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CategoryBucket {
        pub category: String,
        pub total_amount: f64,
        pub total_records: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DailySummary {
        pub date: NaiveDate,
        pub total_amount: f64,
        pub total_records: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub sources: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub categories: Option<Vec<String>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DayTotal {
        pub date: NaiveDate,
        pub total_amount: f64,
        pub total_records: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MonthlySummary {
        pub year: i32,
        pub month: u32,
        pub days: Vec<DayTotal>,
    }
}

pub mod dashboard {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProfitSummary {
        pub total_income: f64,
        pub total_expense: f64,
        pub net_profit: f64,
        /// Two-decimal percentage, `"0"` without income.
        pub profit_margin: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CounterpartyCounts {
        pub total_buyers: u64,
        pub total_sellers: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MilkFlow {
        pub total_transactions: u64,
        pub total_quantity: f64,
        pub total_amount: f64,
        pub average_price: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MilkOverview {
        pub purchases: MilkFlow,
        pub sales: MilkFlow,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaymentOverview {
        pub buyer_payments: payment::PaymentTotals,
        pub seller_payments: payment::PaymentTotals,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DashboardSummary {
        pub date_range: common::DateRange,
        pub counterparties: CounterpartyCounts,
        pub finance: ProfitSummary,
        pub milk: MilkOverview,
        pub payments: PaymentOverview,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct FinancialOverview {
        pub date_range: common::DateRange,
        pub summary: ProfitSummary,
        pub income_breakdown: Vec<ledger::CategoryBucket>,
        pub expense_breakdown: Vec<ledger::CategoryTotal>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DailyProfitLoss {
        pub date: NaiveDate,
        pub daily_income: f64,
        pub daily_expense: f64,
        pub daily_profit: f64,
        pub profit_margin: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TrendPoint {
        pub date: NaiveDate,
        pub income: f64,
        pub expense: f64,
        pub profit: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MonthlyTrends {
        pub year: i32,
        pub month: u32,
        pub trends: Vec<TrendPoint>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MilkMargins {
        pub milk_profit: f64,
        /// Milk profit over sales, two decimals.
        pub profit_margin: String,
        pub quantity_balance: f64,
        pub price_spread: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MilkAnalytics {
        pub date_range: common::DateRange,
        pub purchases: MilkFlow,
        pub sales: MilkFlow,
        pub analysis: MilkMargins,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaymentAnalytics {
        pub date_range: common::DateRange,
        pub buyer_payments: Vec<payment::PaymentGroup>,
        pub seller_payments: Vec<payment::PaymentGroup>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envelope::{ApiResponse, Keyed, KeyedList};

    #[test]
    fn keyed_list_serializes_key_and_total() {
        let list = KeyedList::new("buyers", vec![1, 2]);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json, serde_json::json!({"buyers": [1, 2], "total": 2}));
    }

    #[test]
    fn ranged_list_carries_amount_and_range() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let list = KeyedList::new("income", Vec::<i32>::new()).with_range(
            0.0,
            common::DateRange {
                start_date: date,
                end_date: date,
            },
        );
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["total"], 0);
        assert_eq!(json["totalAmount"], 0.0);
        assert_eq!(json["dateRange"]["startDate"], "2025-08-01");
    }

    #[test]
    fn envelope_omits_empty_data() {
        let json = serde_json::to_value(ApiResponse::done("Buyer deleted successfully")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "message": "Buyer deleted successfully"})
        );

        let keyed = ApiResponse::ok("ok", Keyed { key: "seller", value: 7 });
        let json = serde_json::to_value(keyed).unwrap();
        assert_eq!(json["data"]["seller"], 7);
    }

    #[test]
    fn counterparty_accepts_name_alias() {
        let body: counterparty::CounterpartyNew =
            serde_json::from_str(r#"{"name":"Ramesh","mobileNumber":"9876543210","city":"Pune"}"#)
                .unwrap();
        assert_eq!(body.full_name, "Ramesh");
    }

    #[test]
    fn payment_update_rejects_unknown_fields() {
        let parsed: Result<payment::PaymentUpdate, _> =
            serde_json::from_str(r#"{"paymentAmount": 10, "buyerId": 3}"#);
        assert!(parsed.is_err());
    }
}
