use chrono::Utc;
use sea_orm::{
    ActiveValue, Condition, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    Counterparty, CounterpartyAccount, CounterpartyKind, EngineError, MilkTotals, PaymentTotals,
    ResultEngine, counterparties,
};

use super::{Engine, lower_like, normalize_required, search_pattern, with_tx};

/// Fields of a buyer or seller. Updates replace all of them.
#[derive(Clone, Debug)]
pub struct CounterpartyInput {
    pub full_name: String,
    pub mobile_number: String,
    pub city: String,
}

/// Selection for the list endpoint. At most one dimension applies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CounterpartyFilter {
    #[default]
    All,
    /// Case-insensitive city match.
    City(String),
    /// Same matching as [`Engine::search_counterparties`].
    Search(String),
}

const REQUIRED_FIELDS: &str = "Full name, mobile number, and city are required";

struct ValidCounterparty {
    full_name: String,
    mobile_number: String,
    city: String,
}

fn validate(input: &CounterpartyInput) -> ResultEngine<ValidCounterparty> {
    let full_name = normalize_required(&input.full_name, REQUIRED_FIELDS)?;
    let mobile_number = normalize_required(&input.mobile_number, REQUIRED_FIELDS)?;
    let city = normalize_required(&input.city, REQUIRED_FIELDS)?;
    if mobile_number.len() != 10 || !mobile_number.chars().all(|c| c.is_ascii_digit()) {
        return Err(EngineError::invalid("Mobile number must be 10 digits"));
    }
    Ok(ValidCounterparty {
        full_name,
        mobile_number,
        city,
    })
}

fn live(kind: CounterpartyKind) -> Condition {
    Condition::all()
        .add(counterparties::Column::Kind.eq(kind.as_str()))
        .add(counterparties::Column::IsDeleted.eq(false))
}

/// Loads a live counterparty of the given kind or fails with "Buyer not found".
pub(super) async fn require_counterparty<C: ConnectionTrait>(
    db: &C,
    kind: CounterpartyKind,
    id: i64,
) -> ResultEngine<counterparties::Model> {
    counterparties::Entity::find_by_id(id)
        .filter(live(kind))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::not_found(format!("{} not found", kind.label())))
}

async fn ensure_mobile_free<C: ConnectionTrait>(
    db: &C,
    kind: CounterpartyKind,
    mobile_number: &str,
    except_id: Option<i64>,
) -> ResultEngine<()> {
    let mut query = counterparties::Entity::find()
        .filter(live(kind))
        .filter(counterparties::Column::MobileNumber.eq(mobile_number));
    if let Some(id) = except_id {
        query = query.filter(counterparties::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(EngineError::ExistingKey(
            "Mobile number already exists".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Registers a new buyer or seller.
    ///
    /// The mobile number must be exactly ten digits and unique among the live
    /// counterparties of the same kind.
    pub async fn create_counterparty(
        &self,
        kind: CounterpartyKind,
        input: CounterpartyInput,
    ) -> ResultEngine<Counterparty> {
        let valid = validate(&input)?;
        with_tx!(self, |db_tx| {
            ensure_mobile_free(&db_tx, kind, &valid.mobile_number, None).await?;
            let model = counterparties::ActiveModel {
                id: ActiveValue::NotSet,
                kind: ActiveValue::Set(kind.as_str().to_string()),
                full_name: ActiveValue::Set(valid.full_name),
                mobile_number: ActiveValue::Set(valid.mobile_number),
                city: ActiveValue::Set(valid.city),
                created_at: ActiveValue::Set(Utc::now()),
                is_deleted: ActiveValue::Set(false),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!(kind = kind.as_str(), id = model.id, "counterparty created");
            Counterparty::try_from(model)
        })
    }

    pub async fn counterparty(&self, kind: CounterpartyKind, id: i64) -> ResultEngine<Counterparty> {
        let model = require_counterparty(&self.database, kind, id).await?;
        Counterparty::try_from(model)
    }

    /// Counterparty plus milk/payment aggregates and the outstanding balance.
    pub async fn counterparty_account(
        &self,
        kind: CounterpartyKind,
        id: i64,
    ) -> ResultEngine<CounterpartyAccount> {
        let counterparty = self.counterparty(kind, id).await?;
        let milk: MilkTotals = self.milk_totals_for(kind, id).await?;
        let payments: PaymentTotals = self.payment_totals_for(kind, id).await?;
        let outstanding = milk
            .amount
            .checked_sub(payments.amount)
            .ok_or_else(|| EngineError::Internal("outstanding amount overflow".to_string()))?;
        Ok(CounterpartyAccount {
            counterparty,
            milk,
            payments,
            outstanding,
        })
    }

    /// Live counterparties, newest first. A city filter orders by name.
    pub async fn list_counterparties(
        &self,
        kind: CounterpartyKind,
        filter: CounterpartyFilter,
    ) -> ResultEngine<Vec<Counterparty>> {
        let query = counterparties::Entity::find().filter(live(kind));
        let models = match filter {
            CounterpartyFilter::All => {
                query
                    .order_by_desc(counterparties::Column::CreatedAt)
                    .order_by_desc(counterparties::Column::Id)
                    .all(&self.database)
                    .await?
            }
            CounterpartyFilter::City(city) => {
                query
                    .filter(Expr::cust("LOWER(city)").eq(city.trim().to_lowercase()))
                    .order_by_asc(counterparties::Column::FullName)
                    .order_by_asc(counterparties::Column::Id)
                    .all(&self.database)
                    .await?
            }
            CounterpartyFilter::Search(term) => {
                return self.search_counterparties(kind, &term).await;
            }
        };
        models.into_iter().map(Counterparty::try_from).collect()
    }

    /// Case-insensitive substring search over name, mobile number and city,
    /// ordered by name.
    pub async fn search_counterparties(
        &self,
        kind: CounterpartyKind,
        term: &str,
    ) -> ResultEngine<Vec<Counterparty>> {
        let pattern = search_pattern(term)?;
        let models = counterparties::Entity::find()
            .filter(live(kind))
            .filter(
                Condition::any()
                    .add(lower_like(
                        Expr::col(counterparties::Column::FullName),
                        &pattern,
                    ))
                    .add(lower_like(
                        Expr::col(counterparties::Column::MobileNumber),
                        &pattern,
                    ))
                    .add(lower_like(Expr::col(counterparties::Column::City), &pattern)),
            )
            .order_by_asc(counterparties::Column::FullName)
            .order_by_asc(counterparties::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(Counterparty::try_from).collect()
    }

    /// Replaces every field of a live counterparty.
    ///
    /// Existing milk entries and payments keep their name snapshot.
    pub async fn update_counterparty(
        &self,
        kind: CounterpartyKind,
        id: i64,
        input: CounterpartyInput,
    ) -> ResultEngine<Counterparty> {
        let valid = validate(&input)?;
        with_tx!(self, |db_tx| {
            let existing = require_counterparty(&db_tx, kind, id).await?;
            ensure_mobile_free(&db_tx, kind, &valid.mobile_number, Some(id)).await?;
            let mut model: counterparties::ActiveModel = existing.into();
            model.full_name = ActiveValue::Set(valid.full_name);
            model.mobile_number = ActiveValue::Set(valid.mobile_number);
            model.city = ActiveValue::Set(valid.city);
            let model = model.update(&db_tx).await?;
            Counterparty::try_from(model)
        })
    }

    /// Soft-deletes a counterparty. A second delete fails with not found.
    pub async fn delete_counterparty(&self, kind: CounterpartyKind, id: i64) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let existing = require_counterparty(&db_tx, kind, id).await?;
            let mut model: counterparties::ActiveModel = existing.into();
            model.is_deleted = ActiveValue::Set(true);
            model.update(&db_tx).await?;
            tracing::info!(kind = kind.as_str(), id, "counterparty deleted");
            Ok(())
        })
    }

    /// Number of live counterparties of a kind.
    pub async fn count_counterparties(&self, kind: CounterpartyKind) -> ResultEngine<u64> {
        let count = counterparties::Entity::find()
            .filter(live(kind))
            .count(&self.database)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(mobile: &str) -> CounterpartyInput {
        CounterpartyInput {
            full_name: " Ramesh Kumar ".to_string(),
            mobile_number: mobile.to_string(),
            city: "Mumbai".to_string(),
        }
    }

    #[test]
    fn validate_trims_and_checks_mobile() {
        let valid = validate(&input("9876543210")).unwrap();
        assert_eq!(valid.full_name, "Ramesh Kumar");

        for bad in ["987654321", "98765432100", "98765abcde"] {
            assert_eq!(
                validate(&input(bad)).err(),
                Some(EngineError::InvalidInput(
                    "Mobile number must be 10 digits".to_string()
                ))
            );
        }
    }

    #[test]
    fn validate_requires_every_field() {
        let mut missing = input("9876543210");
        missing.city = "   ".to_string();
        assert_eq!(
            validate(&missing).err(),
            Some(EngineError::InvalidInput(REQUIRED_FIELDS.to_string()))
        );
    }
}
