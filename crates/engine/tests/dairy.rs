use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    CounterpartyFilter, CounterpartyInput, CounterpartyKind, DateRange, Engine, EngineError,
    FatPercentage, LedgerFilter, LedgerKind, MilkEntryInput, MilkFilter, MilkType, Money,
    PaymentFilter, PaymentInput, PaymentMethod, PaymentPatch, PaymentType, Quantity,
};
use migration::MigratorTrait;

async fn engine_with_db(auto_post: bool) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .auto_post_ledger(auto_post)
        .bcrypt_cost(4)
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
}

fn person(name: &str, mobile: &str, city: &str) -> CounterpartyInput {
    CounterpartyInput {
        full_name: name.to_string(),
        mobile_number: mobile.to_string(),
        city: city.to_string(),
    }
}

fn milk(counterparty_id: i64, price: &str, litres: f64, day: u32) -> MilkEntryInput {
    MilkEntryInput {
        counterparty_id,
        milk_type: MilkType::Cow,
        price: price.parse().unwrap(),
        quantity: Quantity::from_litres(litres).unwrap(),
        fat: FatPercentage::from_percent(3.5).unwrap(),
        date: date(day),
    }
}

fn payment(counterparty_id: i64, amount: i64, day: u32) -> PaymentInput {
    PaymentInput {
        counterparty_id,
        amount: Money::new(amount),
        payment_type: PaymentType::Partial,
        payment_method: PaymentMethod::Cash,
        transaction_id: None,
        notes: Some("  first instalment ".to_string()),
        date: date(day),
    }
}

#[tokio::test]
async fn counterparty_lifecycle() {
    let (engine, _db) = engine_with_db(true).await;

    let ramesh = engine
        .create_counterparty(
            CounterpartyKind::Buyer,
            person("  Ramesh Kumar ", "9876543210", "Mumbai"),
        )
        .await
        .unwrap();
    assert_eq!(ramesh.full_name, "Ramesh Kumar");
    assert_eq!(ramesh.kind, CounterpartyKind::Buyer);

    // Same mobile on the other side is fine; on the same side it is not.
    engine
        .create_counterparty(
            CounterpartyKind::Seller,
            person("Suresh", "9876543210", "Pune"),
        )
        .await
        .unwrap();
    let duplicate = engine
        .create_counterparty(
            CounterpartyKind::Buyer,
            person("Other", "9876543210", "Pune"),
        )
        .await;
    assert_eq!(
        duplicate.err(),
        Some(EngineError::ExistingKey(
            "Mobile number already exists".to_string()
        ))
    );

    let by_city = engine
        .list_counterparties(
            CounterpartyKind::Buyer,
            CounterpartyFilter::City("mumbai".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(by_city.len(), 1);

    let found = engine
        .search_counterparties(CounterpartyKind::Buyer, "RAM")
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(
        engine
            .search_counterparties(CounterpartyKind::Buyer, "r")
            .await
            .err(),
        Some(EngineError::InvalidInput(
            "Search term must be at least 2 characters".to_string()
        ))
    );

    let updated = engine
        .update_counterparty(
            CounterpartyKind::Buyer,
            ramesh.id,
            person("Ramesh K", "9876543211", "Thane"),
        )
        .await
        .unwrap();
    assert_eq!(updated.city, "Thane");

    engine
        .delete_counterparty(CounterpartyKind::Buyer, ramesh.id)
        .await
        .unwrap();
    assert_eq!(
        engine
            .delete_counterparty(CounterpartyKind::Buyer, ramesh.id)
            .await
            .err(),
        Some(EngineError::KeyNotFound("Buyer not found".to_string()))
    );
    assert_eq!(
        engine
            .count_counterparties(CounterpartyKind::Buyer)
            .await
            .unwrap(),
        0
    );

    // The freed mobile number can be reused.
    engine
        .create_counterparty(
            CounterpartyKind::Buyer,
            person("New Ramesh", "9876543211", "Thane"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn a_buyer_is_not_a_seller() {
    let (engine, _db) = engine_with_db(true).await;
    let buyer = engine
        .create_counterparty(
            CounterpartyKind::Buyer,
            person("Ramesh", "9876543210", "Mumbai"),
        )
        .await
        .unwrap();

    assert_eq!(
        engine
            .counterparty(CounterpartyKind::Seller, buyer.id)
            .await
            .err(),
        Some(EngineError::KeyNotFound("Seller not found".to_string()))
    );
    assert!(
        engine
            .create_milk_entry(CounterpartyKind::Seller, milk(buyer.id, "60", 10.0, 25))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn purchase_posts_and_follows_its_expense() {
    let (engine, _db) = engine_with_db(true).await;
    let buyer = engine
        .create_counterparty(
            CounterpartyKind::Buyer,
            person("Ramesh Kumar", "9876543210", "Mumbai"),
        )
        .await
        .unwrap();

    let entry = engine
        .create_milk_entry(CounterpartyKind::Buyer, milk(buyer.id, "45.50", 100.0, 25))
        .await
        .unwrap();
    assert_eq!(entry.total_amount, Money::new(455_000));
    assert_eq!(entry.counterparty_name, "Ramesh Kumar");

    let expenses = engine
        .list_ledger_entries(LedgerKind::Expense, LedgerFilter::All)
        .await
        .unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].amount, Money::new(455_000));
    assert_eq!(expenses[0].category, "milk_purchase");
    assert_eq!(expenses[0].party, "Ramesh Kumar");
    assert_eq!(expenses[0].milk_entry_id, Some(entry.id));

    let updated = engine
        .update_milk_entry(CounterpartyKind::Buyer, entry.id, milk(buyer.id, "50", 10.0, 26))
        .await
        .unwrap();
    assert_eq!(updated.total_amount, Money::new(50_000));
    let expenses = engine
        .list_ledger_entries(LedgerKind::Expense, LedgerFilter::All)
        .await
        .unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].amount, Money::new(50_000));
    assert_eq!(expenses[0].date, date(26));

    engine
        .delete_milk_entry(CounterpartyKind::Buyer, entry.id)
        .await
        .unwrap();
    assert!(
        engine
            .list_ledger_entries(LedgerKind::Expense, LedgerFilter::All)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        engine
            .milk_entry(CounterpartyKind::Buyer, entry.id)
            .await
            .err(),
        Some(EngineError::KeyNotFound(
            "Milk purchase record not found".to_string()
        ))
    );
}

#[tokio::test]
async fn without_auto_post_the_books_stay_empty() {
    let (engine, _db) = engine_with_db(false).await;
    let seller = engine
        .create_counterparty(
            CounterpartyKind::Seller,
            person("Suresh", "9876500000", "Pune"),
        )
        .await
        .unwrap();
    engine
        .create_milk_entry(CounterpartyKind::Seller, milk(seller.id, "60", 10.0, 25))
        .await
        .unwrap();

    assert!(
        engine
            .list_ledger_entries(LedgerKind::Income, LedgerFilter::All)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn milk_listing_filters_and_reports() {
    let (engine, _db) = engine_with_db(true).await;
    let a = engine
        .create_counterparty(
            CounterpartyKind::Buyer,
            person("Asha", "9000000001", "Mumbai"),
        )
        .await
        .unwrap();
    let b = engine
        .create_counterparty(
            CounterpartyKind::Buyer,
            person("Bala", "9000000002", "Mumbai"),
        )
        .await
        .unwrap();

    engine
        .create_milk_entry(CounterpartyKind::Buyer, milk(a.id, "40", 10.0, 20))
        .await
        .unwrap();
    engine
        .create_milk_entry(CounterpartyKind::Buyer, milk(a.id, "50", 20.0, 25))
        .await
        .unwrap();
    let mut buffalo = milk(b.id, "70", 5.0, 25);
    buffalo.milk_type = MilkType::Buffalo;
    engine
        .create_milk_entry(CounterpartyKind::Buyer, buffalo)
        .await
        .unwrap();

    let all = engine
        .list_milk_entries(CounterpartyKind::Buyer, MilkFilter::All, false)
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].date, date(20));
    assert!(all.iter().all(|entry| entry.counterparty.is_none()));

    let detailed = engine
        .list_milk_entries(CounterpartyKind::Buyer, MilkFilter::Counterparty(a.id), true)
        .await
        .unwrap();
    assert_eq!(detailed.len(), 2);
    assert!(detailed.iter().all(|entry| entry.counterparty.is_some()));

    let ranged = engine
        .list_milk_entries(
            CounterpartyKind::Buyer,
            MilkFilter::Range(DateRange::new(date(21), date(31))),
            false,
        )
        .await
        .unwrap();
    assert_eq!(ranged.len(), 2);

    let summary = engine
        .milk_summary(CounterpartyKind::Buyer, None)
        .await
        .unwrap();
    let cow = summary
        .iter()
        .find(|row| row.milk_type == MilkType::Cow)
        .unwrap();
    assert_eq!(cow.count, 2);
    assert_eq!(cow.quantity, Quantity::from_milli(30_000));
    assert_eq!(cow.amount, Money::new(140_000));
    assert_eq!(cow.average_price, Money::new(4_500));
    assert_eq!(cow.counterparties, 1);

    let day = engine
        .milk_daily_report(CounterpartyKind::Buyer, date(25))
        .await
        .unwrap();
    assert_eq!(day.len(), 2);
    assert!(day.iter().all(|row| row.count == 1));

    let found = engine
        .search_milk_entries(CounterpartyKind::Buyer, "bala")
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].milk_type, MilkType::Buffalo);
}

#[tokio::test]
async fn profit_analysis_lists_sales_first() {
    let (engine, _db) = engine_with_db(true).await;
    let buyer = engine
        .create_counterparty(
            CounterpartyKind::Buyer,
            person("Asha", "9000000001", "Mumbai"),
        )
        .await
        .unwrap();
    let seller = engine
        .create_counterparty(
            CounterpartyKind::Seller,
            person("Suresh", "9000000002", "Pune"),
        )
        .await
        .unwrap();
    engine
        .create_milk_entry(CounterpartyKind::Buyer, milk(buyer.id, "40", 10.0, 25))
        .await
        .unwrap();
    engine
        .create_milk_entry(CounterpartyKind::Seller, milk(seller.id, "55", 8.0, 25))
        .await
        .unwrap();

    let rows = engine.milk_profit_analysis(None).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].kind, CounterpartyKind::Seller);
    assert_eq!(rows[0].amount, Money::new(44_000));
    assert_eq!(rows[1].kind, CounterpartyKind::Buyer);
}

#[tokio::test]
async fn payments_reduce_the_outstanding_balance() {
    let (engine, _db) = engine_with_db(true).await;
    let buyer = engine
        .create_counterparty(
            CounterpartyKind::Buyer,
            person("Ramesh Kumar", "9876543210", "Mumbai"),
        )
        .await
        .unwrap();
    engine
        .create_milk_entry(CounterpartyKind::Buyer, milk(buyer.id, "45.50", 100.0, 25))
        .await
        .unwrap();

    let account = engine
        .counterparty_account(CounterpartyKind::Buyer, buyer.id)
        .await
        .unwrap();
    assert_eq!(account.outstanding, Money::new(455_000));
    assert_eq!(account.milk.count, 1);

    let paid = engine
        .create_payment(CounterpartyKind::Buyer, payment(buyer.id, 100_000, 25))
        .await
        .unwrap();
    assert_eq!(paid.counterparty_name, "Ramesh Kumar");
    assert_eq!(paid.notes.as_deref(), Some("first instalment"));

    let account = engine
        .counterparty_account(CounterpartyKind::Buyer, buyer.id)
        .await
        .unwrap();
    assert_eq!(account.payments.amount, Money::new(100_000));
    assert_eq!(account.outstanding, Money::new(355_000));

    // Payments are not mirrored in the books.
    assert!(
        engine
            .list_ledger_entries(LedgerKind::Income, LedgerFilter::All)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn payment_updates_and_summaries() {
    let (engine, _db) = engine_with_db(true).await;
    let seller = engine
        .create_counterparty(
            CounterpartyKind::Seller,
            person("Suresh", "9000000002", "Pune"),
        )
        .await
        .unwrap();
    let first = engine
        .create_payment(CounterpartyKind::Seller, payment(seller.id, 20_000, 24))
        .await
        .unwrap();
    engine
        .create_payment(CounterpartyKind::Seller, payment(seller.id, 30_000, 25))
        .await
        .unwrap();

    assert_eq!(
        engine
            .update_payment(CounterpartyKind::Seller, first.id, PaymentPatch::default())
            .await
            .err(),
        Some(EngineError::InvalidInput(
            "No valid fields to update".to_string()
        ))
    );
    let updated = engine
        .update_payment(
            CounterpartyKind::Seller,
            first.id,
            PaymentPatch {
                payment_method: Some(PaymentMethod::Upi),
                transaction_id: Some("UPI-991".to_string()),
                ..PaymentPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.payment_method, PaymentMethod::Upi);
    assert_eq!(updated.amount, Money::new(20_000));

    let summary = engine
        .payment_summary(CounterpartyKind::Seller, seller.id)
        .await
        .unwrap();
    assert_eq!(summary.totals.count, 2);
    assert_eq!(summary.totals.amount, Money::new(50_000));
    assert_eq!(summary.groups.len(), 2);

    let day = engine
        .payments_on(CounterpartyKind::Seller, date(25))
        .await
        .unwrap();
    assert_eq!(day.totals.count, 1);
    assert_eq!(day.totals.amount, Money::new(30_000));

    let found = engine
        .search_payments(CounterpartyKind::Seller, "upi-9")
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    engine
        .delete_payment(CounterpartyKind::Seller, first.id)
        .await
        .unwrap();
    let left = engine
        .list_payments(CounterpartyKind::Seller, PaymentFilter::Counterparty(seller.id))
        .await
        .unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(
        engine
            .payment(CounterpartyKind::Seller, first.id)
            .await
            .err(),
        Some(EngineError::KeyNotFound("Payment not found".to_string()))
    );
}

#[tokio::test]
async fn zero_payment_is_rejected() {
    let (engine, _db) = engine_with_db(true).await;
    let buyer = engine
        .create_counterparty(
            CounterpartyKind::Buyer,
            person("Ramesh", "9876543210", "Mumbai"),
        )
        .await
        .unwrap();
    assert_eq!(
        engine
            .create_payment(CounterpartyKind::Buyer, payment(buyer.id, 0, 25))
            .await
            .err(),
        Some(EngineError::InvalidInput(
            "Payment amount must be greater than 0".to_string()
        ))
    );
}

#[tokio::test]
async fn oversized_totals_are_rejected() {
    let (engine, _db) = engine_with_db(true).await;
    let buyer = engine
        .create_counterparty(
            CounterpartyKind::Buyer,
            person("Ramesh", "9876543210", "Mumbai"),
        )
        .await
        .unwrap();

    assert_eq!(
        "1000000000000000".parse::<Money>().err(),
        Some(EngineError::InvalidInput("amount too large".to_string()))
    );

    let too_large = Some(EngineError::InvalidInput(
        "total amount too large".to_string(),
    ));
    assert_eq!(
        engine
            .create_milk_entry(
                CounterpartyKind::Buyer,
                milk(buyer.id, "10000000000", 2000.0, 20)
            )
            .await
            .err(),
        too_large
    );

    let entry = engine
        .create_milk_entry(CounterpartyKind::Buyer, milk(buyer.id, "45.5", 100.0, 20))
        .await
        .unwrap();
    assert_eq!(
        engine
            .update_milk_entry(
                CounterpartyKind::Buyer,
                entry.id,
                milk(buyer.id, "10000000000", 2000.0, 20)
            )
            .await
            .err(),
        too_large
    );

    let summary = engine
        .milk_summary(CounterpartyKind::Buyer, None)
        .await
        .unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].count, 1);
    assert_eq!(summary[0].amount, Money::new(455_000));

    let account = engine
        .counterparty_account(CounterpartyKind::Buyer, buyer.id)
        .await
        .unwrap();
    assert_eq!(account.outstanding, Money::new(455_000));

    let expenses = engine
        .list_ledger_entries(LedgerKind::Expense, LedgerFilter::All)
        .await
        .unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].amount, Money::new(455_000));
}

#[tokio::test]
async fn city_listing_orders_by_name() {
    let (engine, _db) = engine_with_db(true).await;
    for (name, mobile, city) in [
        ("Zara", "9000000001", "Mumbai"),
        ("Anil", "9000000002", "mumbai"),
        ("Bala", "9000000003", "Pune"),
    ] {
        engine
            .create_counterparty(CounterpartyKind::Seller, person(name, mobile, city))
            .await
            .unwrap();
    }

    let names: Vec<String> = engine
        .list_counterparties(
            CounterpartyKind::Seller,
            CounterpartyFilter::City("MUMBAI".to_string()),
        )
        .await
        .unwrap()
        .into_iter()
        .map(|seller| seller.full_name)
        .collect();
    assert_eq!(names, vec!["Anil".to_string(), "Zara".to_string()]);
}
