//! Balance mutation
//!
//! [`adjust_balance`] is the only code path that writes `agents.crust_balance`.
//! It must run inside a transaction: the agent row is locked with
//! `SELECT ... FOR UPDATE` so concurrent adjustments for one agent serialize,
//! and every change leaves a `crust_transactions` audit row.

use rust_decimal::Decimal;
use solveby_types::BalanceReason;
use sqlx::PgConnection;
use tracing::debug;
use uuid::Uuid;

use crate::{DbError, DbResult, DbTransaction};

/// What a balance change points at, e.g. `("job", job_id)`
pub type Reference<'a> = Option<(&'a str, Uuid)>;

/// Apply a signed `delta` to an agent's balance
///
/// Credits must be positive and debits negative for the given `reason`.
/// A debit that would take the balance below zero fails with
/// [`DbError::InsufficientBalance`] and leaves the row untouched.
pub(crate) async fn adjust_balance(
    conn: &mut PgConnection,
    agent_id: Uuid,
    delta: Decimal,
    reason: BalanceReason,
    reference: Reference<'_>,
    note: Option<&str>,
) -> DbResult<DbTransaction> {
    check_direction(delta, reason)?;

    let before: Decimal = sqlx::query_scalar("SELECT crust_balance FROM agents WHERE id = $1 FOR UPDATE")
        .bind(agent_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::NotFound("Agent not found".to_string()))?;

    let after = before + delta;
    if after < Decimal::ZERO {
        return Err(DbError::InsufficientBalance {
            available: before,
            required: -delta,
        });
    }

    // The accumulator column is picked from a closed set, never from input
    let accumulator = accumulator_column(reason);
    let sql = match accumulator {
        Some(column) => format!(
            "UPDATE agents SET crust_balance = $2, {col} = {col} + $3, updated_at = NOW() WHERE id = $1",
            col = column
        ),
        None => "UPDATE agents SET crust_balance = $2, updated_at = NOW() WHERE id = $1".to_string(),
    };
    sqlx::query(&sql)
        .bind(agent_id)
        .bind(after)
        .bind(delta.abs())
        .execute(&mut *conn)
        .await?;

    let (reference_type, reference_id) = match reference {
        Some((kind, id)) => (Some(kind), Some(id)),
        None => (None, None),
    };

    let row = sqlx::query_as::<_, DbTransaction>(
        r#"
        INSERT INTO crust_transactions
            (agent_id, kind, amount, balance_before, balance_after, reference_type, reference_id, note)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(agent_id)
    .bind(reason.as_str())
    .bind(delta)
    .bind(before)
    .bind(after)
    .bind(reference_type)
    .bind(reference_id)
    .bind(note)
    .fetch_one(&mut *conn)
    .await?;

    debug!(%agent_id, %delta, reason = %reason, "Balance adjusted");
    Ok(row)
}

/// Lock several agent rows in ascending id order
pub(crate) async fn lock_agents(conn: &mut PgConnection, ids: &[Uuid]) -> DbResult<()> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids.dedup();

    let locked: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM agents WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

    if locked.len() != ids.len() {
        return Err(DbError::NotFound("Agent not found".to_string()));
    }
    Ok(())
}

pub(crate) fn check_direction(delta: Decimal, reason: BalanceReason) -> DbResult<()> {
    let ok = if reason.is_credit() {
        delta > Decimal::ZERO
    } else {
        delta < Decimal::ZERO
    };
    if ok {
        Ok(())
    } else {
        Err(DbError::InvalidInput(format!(
            "{} cannot apply a delta of {}",
            reason, delta
        )))
    }
}

pub(crate) fn accumulator_column(reason: BalanceReason) -> Option<&'static str> {
    match reason {
        BalanceReason::RegistrationBonus => None,
        BalanceReason::JobPayment => Some("crust_spent"),
        BalanceReason::JobEarning => Some("crust_earned"),
        BalanceReason::TipSent => Some("tips_given"),
        BalanceReason::TipReceived => Some("tips_received"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_direction_must_match_reason() {
        assert!(check_direction(dec!(100), BalanceReason::RegistrationBonus).is_ok());
        assert!(check_direction(dec!(-10), BalanceReason::JobPayment).is_ok());
        assert!(check_direction(dec!(10), BalanceReason::JobEarning).is_ok());
        assert!(check_direction(dec!(-5), BalanceReason::TipSent).is_ok());

        assert!(matches!(
            check_direction(dec!(10), BalanceReason::JobPayment),
            Err(DbError::InvalidInput(_))
        ));
        assert!(check_direction(dec!(-1), BalanceReason::TipReceived).is_err());
        assert!(check_direction(Decimal::ZERO, BalanceReason::JobEarning).is_err());
    }

    #[test]
    fn test_accumulators() {
        assert_eq!(accumulator_column(BalanceReason::RegistrationBonus), None);
        assert_eq!(accumulator_column(BalanceReason::JobPayment), Some("crust_spent"));
        assert_eq!(accumulator_column(BalanceReason::JobEarning), Some("crust_earned"));
        assert_eq!(accumulator_column(BalanceReason::TipSent), Some("tips_given"));
        assert_eq!(accumulator_column(BalanceReason::TipReceived), Some("tips_received"));
    }
}
