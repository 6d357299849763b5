//! Postgres persistence for users.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::common::{AppResult, UserId};
use crate::domains::users::models::{SkillSide, User, UserFilter};
use crate::kernel::stores::{BaseUserStore, Page};

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseUserStore for PgUserStore {
    async fn insert(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO users (
                id, name, email, password_hash, avatar, location, bio,
                skills_offered, skills_wanted, availability,
                rating, total_ratings, total_swaps, is_online, last_seen,
                created_at, updated_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                     $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(&user.location)
        .bind(&user.bio)
        .bind(&user.skills_offered)
        .bind(&user.skills_wanted)
        .bind(&user.availability)
        .bind(user.rating)
        .bind(user.total_ratings)
        .bind(user.total_swaps)
        .bind(user.is_online)
        .bind(user.last_seen)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn find_by_reset_token(&self, token: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users
             WHERE reset_password_token = $1 AND reset_password_expires > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            "UPDATE users
             SET name = $2, email = $3, password_hash = $4, avatar = $5,
                 location = $6, bio = $7, skills_offered = $8, skills_wanted = $9,
                 availability = $10, reset_password_token = $11,
                 reset_password_expires = $12, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(&user.location)
        .bind(&user.bio)
        .bind(&user.skills_offered)
        .bind(&user.skills_wanted)
        .bind(&user.availability)
        .bind(&user.reset_password_token)
        .bind(user.reset_password_expires)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_online(&self, id: UserId, is_online: bool) -> AppResult<()> {
        sqlx::query("UPDATE users SET is_online = $2, last_seen = NOW() WHERE id = $1")
            .bind(id)
            .bind(is_online)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn apply_rating(&self, id: UserId, rating: i32) -> AppResult<()> {
        sqlx::query(
            "UPDATE users
             SET rating = (rating * total_ratings + $2) / (total_ratings + 1),
                 total_ratings = total_ratings + 1,
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(rating as f64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_total_swaps(&self, id: UserId) -> AppResult<()> {
        sqlx::query("UPDATE users SET total_swaps = total_swaps + 1, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: UserId) -> AppResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn search(&self, filter: &UserFilter, page: u32, limit: u32) -> AppResult<Page<User>> {
        let search = filter.search.as_ref().map(|s| format!("%{s}%"));
        let location = filter.location.as_ref().map(|s| format!("%{s}%"));
        let skill = filter.skill.as_ref().map(|s| format!("%{s}%"));
        let offset = (page.saturating_sub(1) as i64) * limit as i64;

        let condition = "($1::uuid IS NULL OR id <> $1)
               AND ($2::text IS NULL
                 OR name ILIKE $2
                 OR location ILIKE $2
                 OR EXISTS (SELECT 1 FROM unnest(skills_offered) s WHERE s ILIKE $2)
                 OR EXISTS (SELECT 1 FROM unnest(skills_wanted) s WHERE s ILIKE $2))
               AND ($3::text IS NULL OR location ILIKE $3)
               AND ($4::text IS NULL
                 OR EXISTS (SELECT 1 FROM unnest(skills_offered) s WHERE s ILIKE $4)
                 OR EXISTS (SELECT 1 FROM unnest(skills_wanted) s WHERE s ILIKE $4))
               AND ($5::text IS NULL OR availability = $5)
               AND ($6::float8 IS NULL OR rating >= $6)";

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT * FROM users
             WHERE {condition}
             ORDER BY is_online DESC, last_seen DESC, id
             LIMIT $7 OFFSET $8"
        ))
        .bind(filter.exclude)
        .bind(&search)
        .bind(&location)
        .bind(&skill)
        .bind(&filter.availability)
        .bind(filter.min_rating)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {condition}"))
            .bind(filter.exclude)
            .bind(&search)
            .bind(&location)
            .bind(&skill)
            .bind(&filter.availability)
            .bind(filter.min_rating)
            .fetch_one(&self.pool)
            .await?;

        Ok((users, total as u64))
    }

    async fn count_by_skill(&self, skill: &str, side: SkillSide) -> AppResult<u64> {
        let condition = match side {
            SkillSide::Offered => {
                "EXISTS (SELECT 1 FROM unnest(skills_offered) s WHERE s ILIKE $1)"
            }
            SkillSide::Wanted => {
                "EXISTS (SELECT 1 FROM unnest(skills_wanted) s WHERE s ILIKE $1)"
            }
            SkillSide::Either => {
                "EXISTS (SELECT 1 FROM unnest(skills_offered || skills_wanted) s
                         WHERE s ILIKE $1)"
            }
        };
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {condition}"))
            .bind(format!("%{skill}%"))
            .fetch_one(&self.pool)
            .await?;
        Ok(total as u64)
    }
}
