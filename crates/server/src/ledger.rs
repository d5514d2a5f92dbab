//! Income (`/api/income`) and expense (`/api/expense`) API endpoints.
//!
//! Both books share one set of handlers. [`Book`] maps the wire shapes, which
//! differ only in the counterparty column (`Source` against `PaidTo`) and the
//! milk backreference.

use api_types::{
    common::{DateRangeQuery, SearchQuery},
    envelope::{ApiResponse, Keyed, KeyedList},
    ledger::{
        CategoryBucket, CategoryTotal, DailySummary, DayTotal, Expense, ExpenseNew,
        ExpenseUpdate, Income, IncomeNew, IncomeUpdate, MonthlySummary,
    },
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use engine::{LedgerEntry, LedgerFilter, LedgerInput, LedgerKind, LedgerPatch, Money};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    ServerError,
    extract::{ApiJson, ApiPath, ApiQuery},
    params::{optional_range, parse_date, range_view, required_range, search_term},
    server::ServerState,
};

pub trait Book: Send + Sync + 'static {
    const KIND: LedgerKind;
    const ONE: &'static str;
    const MANY: &'static str;

    type New: DeserializeOwned + Send + 'static;
    type Update: DeserializeOwned + Send + 'static;
    type Record: Serialize + Send + 'static;

    fn input(body: Self::New) -> Result<LedgerInput, ServerError>;
    fn patch(body: Self::Update) -> Result<LedgerPatch, ServerError>;
    fn record(entry: LedgerEntry) -> Self::Record;
}

pub struct IncomeBook;

pub struct ExpenseBook;

impl Book for IncomeBook {
    const KIND: LedgerKind = LedgerKind::Income;
    const ONE: &'static str = "income";
    const MANY: &'static str = "income";

    type New = IncomeNew;
    type Update = IncomeUpdate;
    type Record = Income;

    fn input(body: IncomeNew) -> Result<LedgerInput, ServerError> {
        Ok(LedgerInput {
            amount: Money::from_major(body.amount)?,
            description: body.description,
            party: body.source,
            category: body.category,
            date: body.date,
        })
    }

    fn patch(body: IncomeUpdate) -> Result<LedgerPatch, ServerError> {
        Ok(LedgerPatch {
            amount: body.amount.map(Money::from_major).transpose()?,
            description: body.description,
            party: body.source,
            category: body.category,
            date: body.date,
        })
    }

    fn record(entry: LedgerEntry) -> Income {
        Income {
            id: entry.id,
            amount: entry.amount.to_major(),
            description: entry.description,
            source: entry.party,
            category: entry.category,
            date: entry.date,
            milk_distribution_id: entry.milk_entry_id,
            created_at: entry.created_at,
        }
    }
}

impl Book for ExpenseBook {
    const KIND: LedgerKind = LedgerKind::Expense;
    const ONE: &'static str = "expense";
    const MANY: &'static str = "expenses";

    type New = ExpenseNew;
    type Update = ExpenseUpdate;
    type Record = Expense;

    fn input(body: ExpenseNew) -> Result<LedgerInput, ServerError> {
        Ok(LedgerInput {
            amount: Money::from_major(body.amount)?,
            description: body.description,
            party: body.paid_to,
            category: body.category,
            date: body.date,
        })
    }

    fn patch(body: ExpenseUpdate) -> Result<LedgerPatch, ServerError> {
        Ok(LedgerPatch {
            amount: body.amount.map(Money::from_major).transpose()?,
            description: body.description,
            party: body.paid_to,
            category: body.category,
            date: body.date,
        })
    }

    fn record(entry: LedgerEntry) -> Expense {
        Expense {
            id: entry.id,
            amount: entry.amount.to_major(),
            description: entry.description,
            paid_to: entry.party,
            category: entry.category,
            date: entry.date,
            milk_store_id: entry.milk_entry_id,
            created_at: entry.created_at,
        }
    }
}

pub(crate) fn category_view(total: engine::CategoryTotal) -> CategoryTotal {
    CategoryTotal {
        category: total.category,
        total_amount: total.amount.to_major(),
        total_records: total.count,
        average_amount: total.average.to_major(),
    }
}

pub(crate) fn bucket_view(bucket: engine::LedgerBucket) -> CategoryBucket {
    CategoryBucket {
        category: bucket.label.to_string(),
        total_amount: bucket.amount.to_major(),
        total_records: bucket.count,
    }
}

/// Routes both books have. `/categories` differs and is added by the caller.
pub fn routes<B: Book>() -> Router<ServerState> {
    Router::new()
        .route("/", post(create::<B>).get(list::<B>))
        .route("/search", get(search::<B>))
        .route("/date-range", get(date_range::<B>))
        .route("/daily-summary/{date}", get(daily_summary::<B>))
        .route("/monthly-summary/{year}/{month}", get(monthly_summary::<B>))
        .route(
            "/{id}",
            get(get_one::<B>).put(update::<B>).delete(delete::<B>),
        )
}

async fn create<B: Book>(
    State(state): State<ServerState>,
    ApiJson(body): ApiJson<B::New>,
) -> Result<(StatusCode, Json<ApiResponse<Keyed<B::Record>>>), ServerError> {
    let entry = state
        .engine
        .create_ledger_entry(B::KIND, B::input(body)?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            format!("{} record created successfully", B::KIND.label()),
            Keyed {
                key: B::ONE,
                value: B::record(entry),
            },
        )),
    ))
}

async fn list<B: Book>(
    State(state): State<ServerState>,
) -> Result<Json<ApiResponse<KeyedList<B::Record>>>, ServerError> {
    let entries = state
        .engine
        .list_ledger_entries(B::KIND, LedgerFilter::All)
        .await?;
    Ok(Json(ApiResponse::ok(
        format!("{} records retrieved successfully", B::KIND.label()),
        KeyedList::new(B::MANY, entries.into_iter().map(B::record).collect()),
    )))
}

async fn search<B: Book>(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<ApiResponse<KeyedList<B::Record>>>, ServerError> {
    let term = search_term(query)?;
    let entries = state.engine.search_ledger_entries(B::KIND, &term).await?;
    Ok(Json(ApiResponse::ok(
        "Search completed successfully",
        KeyedList::new(B::MANY, entries.into_iter().map(B::record).collect()),
    )))
}

async fn date_range<B: Book>(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> Result<Json<ApiResponse<KeyedList<B::Record>>>, ServerError> {
    let range = required_range(&query)?;
    let entries = state
        .engine
        .list_ledger_entries(B::KIND, LedgerFilter::Range(range))
        .await?;
    let total: Money = entries.iter().map(|entry| entry.amount).sum();
    Ok(Json(ApiResponse::ok(
        format!("{} records retrieved successfully", B::KIND.label()),
        KeyedList::new(B::MANY, entries.into_iter().map(B::record).collect())
            .with_range(total.to_major(), range_view(range)),
    )))
}

/// Per-category totals, largest first.
pub async fn categories<B: Book>(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> Result<Json<ApiResponse<Keyed<Vec<CategoryTotal>>>>, ServerError> {
    let range = optional_range(&query)?;
    let totals = state.engine.ledger_categories(B::KIND, range).await?;
    Ok(Json(ApiResponse::ok(
        format!("{} categories retrieved successfully", B::KIND.label()),
        Keyed {
            key: "categories",
            value: totals.into_iter().map(category_view).collect(),
        },
    )))
}

/// Categories folded into milk, payment and other buckets.
pub async fn buckets<B: Book>(
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> Result<Json<ApiResponse<Keyed<Vec<CategoryBucket>>>>, ServerError> {
    let range = optional_range(&query)?;
    let buckets = state.engine.ledger_buckets(B::KIND, range).await?;
    let (message, key) = match B::KIND {
        LedgerKind::Income => ("Income categories retrieved successfully", "categories"),
        LedgerKind::Expense => ("Expense breakdown retrieved successfully", "breakdown"),
    };
    Ok(Json(ApiResponse::ok(
        message,
        Keyed {
            key,
            value: buckets.into_iter().map(bucket_view).collect(),
        },
    )))
}

/// Live rows of one category. Mounted under expenses only.
pub async fn by_category<B: Book>(
    State(state): State<ServerState>,
    ApiPath(category): ApiPath<String>,
) -> Result<Json<ApiResponse<KeyedList<B::Record>>>, ServerError> {
    let entries = state
        .engine
        .list_ledger_entries(B::KIND, LedgerFilter::Category(category))
        .await?;
    Ok(Json(ApiResponse::ok(
        format!("{} records retrieved successfully", B::KIND.label()),
        KeyedList::new(B::MANY, entries.into_iter().map(B::record).collect()),
    )))
}

async fn daily_summary<B: Book>(
    State(state): State<ServerState>,
    ApiPath(date): ApiPath<String>,
) -> Result<Json<ApiResponse<Keyed<DailySummary>>>, ServerError> {
    let date = parse_date(&date)?;
    let day = state.engine.ledger_daily(B::KIND, date).await?;
    let (sources, categories) = match B::KIND {
        LedgerKind::Income => (Some(day.labels), None),
        LedgerKind::Expense => (None, Some(day.labels)),
    };
    Ok(Json(ApiResponse::ok(
        format!(
            "Daily {} summary retrieved successfully",
            B::KIND.as_str()
        ),
        Keyed {
            key: "summary",
            value: DailySummary {
                date: day.date,
                total_amount: day.totals.amount.to_major(),
                total_records: day.totals.count,
                sources,
                categories,
            },
        },
    )))
}

async fn monthly_summary<B: Book>(
    State(state): State<ServerState>,
    ApiPath((year, month)): ApiPath<(i32, u32)>,
) -> Result<Json<ApiResponse<MonthlySummary>>, ServerError> {
    let days = state.engine.ledger_monthly(B::KIND, year, month).await?;
    Ok(Json(ApiResponse::ok(
        format!(
            "Monthly {} summary retrieved successfully",
            B::KIND.as_str()
        ),
        MonthlySummary {
            year,
            month,
            days: days
                .into_iter()
                .map(|day| DayTotal {
                    date: day.date,
                    total_amount: day.totals.amount.to_major(),
                    total_records: day.totals.count,
                })
                .collect(),
        },
    )))
}

async fn get_one<B: Book>(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<Keyed<B::Record>>>, ServerError> {
    let entry = state.engine.ledger_entry(B::KIND, id).await?;
    Ok(Json(ApiResponse::ok(
        format!("{} record retrieved successfully", B::KIND.label()),
        Keyed {
            key: B::ONE,
            value: B::record(entry),
        },
    )))
}

async fn update<B: Book>(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<B::Update>,
) -> Result<Json<ApiResponse<Keyed<B::Record>>>, ServerError> {
    let entry = state
        .engine
        .update_ledger_entry(B::KIND, id, B::patch(body)?)
        .await?;
    Ok(Json(ApiResponse::ok(
        format!("{} record updated successfully", B::KIND.label()),
        Keyed {
            key: B::ONE,
            value: B::record(entry),
        },
    )))
}

async fn delete<B: Book>(
    State(state): State<ServerState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<()>>, ServerError> {
    state.engine.delete_ledger_entry(B::KIND, id).await?;
    Ok(Json(ApiResponse::done(format!(
        "{} record deleted successfully",
        B::KIND.label()
    ))))
}
