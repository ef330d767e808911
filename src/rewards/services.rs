use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::models::{
    AwardReason, RewardItem, RewardRedemption, RewardTransaction, RewardsSummary,
};
use super::tiers::{points_to_next_tier, Tier};
use crate::common::{
    generate_redemption_id, generate_reward_transaction_id, now_rfc3339, ApiError,
};

/// History rows included in the summary response
pub const SUMMARY_HISTORY_LIMIT: i64 = 20;
/// Upper bound for a paginated history request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Result of a single award
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardOutcome {
    pub transaction_id: String,
    pub points_awarded: i64,
    pub new_balance: i64,
}

#[derive(Clone)]
pub struct RewardsService {
    db: SqlitePool,
}

impl RewardsService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ============================================================================
    // Accrual
    // ============================================================================

    /// Award the flat amount for `reason` in its own transaction
    pub async fn award_points(
        &self,
        user_id: &str,
        reason: AwardReason,
        source_event_id: Option<&str>,
        description: Option<&str>,
    ) -> Result<AwardOutcome, ApiError> {
        let mut tx = self.db.begin().await?;
        let outcome =
            award_points_in(&mut tx, user_id, reason, source_event_id, description).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// (points, lifetime_points); a user without a balance row has zero of both
    pub async fn get_balance(&self, user_id: &str) -> Result<(i64, i64), ApiError> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT points, lifetime_points FROM rewards_balances WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.unwrap_or((0, 0)))
    }

    // ============================================================================
    // Queries
    // ============================================================================

    pub async fn get_summary(&self, user_id: &str) -> Result<RewardsSummary, ApiError> {
        let (points, lifetime_points) = self.get_balance(user_id).await?;

        let (redeemable_items, recent_transactions, recent_redemptions) = futures::try_join!(
            self.list_redeemable_items(points),
            self.list_transactions(user_id, SUMMARY_HISTORY_LIMIT, 0),
            self.list_redemptions(user_id, SUMMARY_HISTORY_LIMIT),
        )?;

        let tier = Tier::for_points(points);
        debug!(
            user_id = %user_id,
            points = points,
            tier = %tier,
            redeemable = redeemable_items.len(),
            "Built rewards summary"
        );

        Ok(RewardsSummary {
            points,
            lifetime_points,
            tier,
            next_tier: tier.next_tier(),
            points_to_next_tier: points_to_next_tier(points),
            redeemable_items,
            recent_transactions,
            recent_redemptions,
        })
    }

    pub async fn list_reward_items(&self) -> Result<Vec<RewardItem>, ApiError> {
        let items = sqlx::query_as::<_, RewardItem>(
            r#"
            SELECT id, name, description, points_cost, is_active, created_at
            FROM reward_items
            WHERE is_active = 1
            ORDER BY points_cost ASC, name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    /// Active items affordable with `points`, cheapest first
    pub async fn list_redeemable_items(&self, points: i64) -> Result<Vec<RewardItem>, ApiError> {
        let items = sqlx::query_as::<_, RewardItem>(
            r#"
            SELECT id, name, description, points_cost, is_active, created_at
            FROM reward_items
            WHERE is_active = 1 AND points_cost <= ?
            ORDER BY points_cost ASC, name ASC
            "#,
        )
        .bind(points)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    pub async fn list_transactions(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RewardTransaction>, ApiError> {
        let transactions = sqlx::query_as::<_, RewardTransaction>(
            r#"
            SELECT id, user_id, points, kind, reason, source_event_id, description, created_at
            FROM reward_transactions
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(limit.clamp(1, MAX_PAGE_SIZE))
        .bind(offset.max(0))
        .fetch_all(&self.db)
        .await?;

        Ok(transactions)
    }

    pub async fn list_redemptions(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<RewardRedemption>, ApiError> {
        let redemptions = sqlx::query_as::<_, RewardRedemption>(
            r#"
            SELECT id, user_id, reward_item_id, reward_name, points_spent, status, created_at
            FROM reward_redemptions
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit.clamp(1, MAX_PAGE_SIZE))
        .fetch_all(&self.db)
        .await?;

        Ok(redemptions)
    }

    // ============================================================================
    // Redemption
    // ============================================================================

    /// Spend points on a catalog reward.
    ///
    /// The decrement is conditional on the balance covering the cost, so two
    /// concurrent redemptions can never overdraw the account.
    pub async fn redeem(
        &self,
        user_id: &str,
        reward_item_id: &str,
    ) -> Result<RewardRedemption, ApiError> {
        let item = sqlx::query_as::<_, RewardItem>(
            r#"
            SELECT id, name, description, points_cost, is_active, created_at
            FROM reward_items
            WHERE id = ? AND is_active = 1
            "#,
        )
        .bind(reward_item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Reward not found".to_string()))?;

        // The decrement must be the first statement so concurrent redemptions
        // queue on the write lock instead of failing a read-to-write upgrade
        let mut tx = self.db.begin().await?;

        let now = now_rfc3339();
        let updated = sqlx::query(
            r#"
            UPDATE rewards_balances
            SET points = points - ?, updated_at = ?
            WHERE user_id = ? AND points >= ?
            "#,
        )
        .bind(item.points_cost)
        .bind(&now)
        .bind(user_id)
        .bind(item.points_cost)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let available: Option<(i64,)> =
                sqlx::query_as("SELECT points FROM rewards_balances WHERE user_id = ?")
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let available = available.map(|(p,)| p).unwrap_or(0);

            warn!(
                user_id = %user_id,
                reward_id = %item.id,
                required = item.points_cost,
                available = available,
                "Redemption rejected: insufficient points"
            );
            tx.rollback().await?;
            return Err(ApiError::InsufficientPoints {
                required: item.points_cost,
                available,
            });
        }

        let redemption = RewardRedemption {
            id: generate_redemption_id(),
            user_id: user_id.to_string(),
            reward_item_id: item.id.clone(),
            reward_name: item.name.clone(),
            points_spent: item.points_cost,
            status: "completed".to_string(),
            created_at: now.clone(),
        };

        sqlx::query(
            r#"
            INSERT INTO reward_redemptions
                (id, user_id, reward_item_id, reward_name, points_spent, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&redemption.id)
        .bind(&redemption.user_id)
        .bind(&redemption.reward_item_id)
        .bind(&redemption.reward_name)
        .bind(redemption.points_spent)
        .bind(&redemption.status)
        .bind(&redemption.created_at)
        .execute(&mut *tx)
        .await?;

        let description = format!("Redeemed {}", item.name);
        insert_transaction(
            &mut tx,
            user_id,
            -item.points_cost,
            "redeemed",
            "redemption",
            Some(redemption.id.as_str()),
            Some(description.as_str()),
            &now,
        )
        .await?;

        tx.commit().await?;

        info!(
            user_id = %user_id,
            reward_id = %item.id,
            redemption_id = %redemption.id,
            points_spent = item.points_cost,
            "Reward redeemed"
        );

        Ok(redemption)
    }
}

/// Award points on an open connection or transaction.
///
/// The balance is updated with a single upsert, so concurrent awards for the
/// same user both apply. Used directly by the webhook processor so the award
/// commits atomically with the event's other side effects.
pub async fn award_points_in(
    conn: &mut SqliteConnection,
    user_id: &str,
    reason: AwardReason,
    source_event_id: Option<&str>,
    description: Option<&str>,
) -> Result<AwardOutcome, sqlx::Error> {
    let amount = reason.points();
    let now = now_rfc3339();

    let (new_balance,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO rewards_balances (user_id, points, lifetime_points, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            points = points + excluded.points,
            lifetime_points = lifetime_points + excluded.lifetime_points,
            updated_at = excluded.updated_at
        RETURNING points
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(amount)
    .bind(&now)
    .fetch_one(&mut *conn)
    .await?;

    let transaction_id = insert_transaction(
        conn,
        user_id,
        amount,
        "earned",
        reason.as_str(),
        source_event_id,
        Some(description.unwrap_or_else(|| reason.default_description())),
        &now,
    )
    .await?;

    info!(
        user_id = %user_id,
        reason = reason.as_str(),
        points = amount,
        new_balance = new_balance,
        "Points awarded"
    );

    Ok(AwardOutcome {
        transaction_id,
        points_awarded: amount,
        new_balance,
    })
}

#[allow(clippy::too_many_arguments)]
async fn insert_transaction(
    conn: &mut SqliteConnection,
    user_id: &str,
    points: i64,
    kind: &str,
    reason: &str,
    source_event_id: Option<&str>,
    description: Option<&str>,
    created_at: &str,
) -> Result<String, sqlx::Error> {
    let id = generate_reward_transaction_id();
    sqlx::query(
        r#"
        INSERT INTO reward_transactions
            (id, user_id, points, kind, reason, source_event_id, description, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(points)
    .bind(kind)
    .bind(reason)
    .bind(source_event_id)
    .bind(description)
    .bind(created_at)
    .execute(conn)
    .await?;

    Ok(id)
}
