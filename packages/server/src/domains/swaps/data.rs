//! Postgres persistence for swaps.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::common::{AppResult, SwapId, UserId};
use crate::domains::swaps::machines::StatusPatch;
use crate::domains::swaps::models::{Swap, SwapRole, SwapStatus};
use crate::kernel::stores::{BaseSwapStore, Page};

#[derive(Clone)]
pub struct PgSwapStore {
    pool: PgPool,
}

impl PgSwapStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseSwapStore for PgSwapStore {
    async fn insert(&self, swap: &Swap) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO swaps (
                id, requester, provider, requested_skill, offered_skill,
                status, message, scheduled_date, location, duration, is_remote,
                created_at, updated_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(swap.id)
        .bind(swap.requester)
        .bind(swap.provider)
        .bind(&swap.requested_skill)
        .bind(&swap.offered_skill)
        .bind(swap.status)
        .bind(&swap.message)
        .bind(swap.scheduled_date)
        .bind(&swap.location)
        .bind(swap.duration)
        .bind(swap.is_remote)
        .bind(swap.created_at)
        .bind(swap.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: SwapId) -> AppResult<Option<Swap>> {
        sqlx::query_as::<_, Swap>("SELECT * FROM swaps WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn find_pending_between(&self, a: UserId, b: UserId) -> AppResult<Option<Swap>> {
        sqlx::query_as::<_, Swap>(
            "SELECT * FROM swaps
             WHERE status = 'pending'
               AND ((requester = $1 AND provider = $2)
                 OR (requester = $2 AND provider = $1))
             LIMIT 1",
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn update_status_checked(
        &self,
        id: SwapId,
        expected: &[SwapStatus],
        patch: &StatusPatch,
    ) -> AppResult<Option<Swap>> {
        let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
        // Single conditional UPDATE; of two concurrent callers only one
        // matches the WHERE clause.
        sqlx::query_as::<_, Swap>(
            "UPDATE swaps
             SET status = $2,
                 completed_at = COALESCE($3, completed_at),
                 cancelled_at = COALESCE($4, cancelled_at),
                 cancelled_by = COALESCE($5, cancelled_by),
                 cancellation_reason = COALESCE($6, cancellation_reason),
                 updated_at = NOW()
             WHERE id = $1 AND status::text = ANY($7)
             RETURNING *",
        )
        .bind(id)
        .bind(patch.status)
        .bind(patch.completed_at)
        .bind(patch.cancelled_at)
        .bind(patch.cancelled_by)
        .bind(&patch.cancellation_reason)
        .bind(&expected)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn set_rating_slot(
        &self,
        id: SwapId,
        role: SwapRole,
        rating: i32,
        review: Option<&str>,
    ) -> AppResult<Option<Swap>> {
        let query = match role {
            SwapRole::Requester => {
                "UPDATE swaps
                 SET requester_rating = $2, requester_review = $3, updated_at = NOW()
                 WHERE id = $1 AND status = 'completed' AND requester_rating IS NULL
                 RETURNING *"
            }
            SwapRole::Provider => {
                "UPDATE swaps
                 SET provider_rating = $2, provider_review = $3, updated_at = NOW()
                 WHERE id = $1 AND status = 'completed' AND provider_rating IS NULL
                 RETURNING *"
            }
        };
        sqlx::query_as::<_, Swap>(query)
            .bind(id)
            .bind(rating)
            .bind(review)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn list_for_user(
        &self,
        user: UserId,
        status: Option<SwapStatus>,
        page: u32,
        limit: u32,
    ) -> AppResult<Page<Swap>> {
        let status = status.map(|s| s.to_string());
        let offset = (page.saturating_sub(1) as i64) * limit as i64;
        let swaps = sqlx::query_as::<_, Swap>(
            "SELECT * FROM swaps
             WHERE (requester = $1 OR provider = $1)
               AND ($2::text IS NULL OR status::text = $2)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(user)
        .bind(&status)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM swaps
             WHERE (requester = $1 OR provider = $1)
               AND ($2::text IS NULL OR status::text = $2)",
        )
        .bind(user)
        .bind(&status)
        .fetch_one(&self.pool)
        .await?;

        Ok((swaps, total as u64))
    }

    async fn delete_for_user(&self, user: UserId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM swaps WHERE requester = $1 OR provider = $1")
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
