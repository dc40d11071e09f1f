//! Postgres backend for the shop repository.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::model::{Language, NewOrder, NewTie, Order, Tie, TieUpdate, User};
use crate::store::{PurgeSummary, ShopRepository, StatusChange, TransitionOutcome};

const TIE_COLUMNS: &str = "id, name_ru, name_kz, name_en, color_ru, color_kz, color_en, \
    material_ru, material_kz, material_en, description_ru, description_kz, description_en, \
    price, image_path, is_active, created_at";

const ORDER_COLUMNS: &str = "id, buyer_id, tie_id, tie_name, price, recipient_name, \
    recipient_surname, recipient_phone, delivery_address, status, delivery_days, created_at";

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> StoreResult<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            telegram_id BIGINT PRIMARY KEY,
            display_name TEXT,
            language TEXT NOT NULL DEFAULT 'ru',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ties (
            id BIGSERIAL PRIMARY KEY,
            name_ru TEXT NOT NULL,
            name_kz TEXT NOT NULL DEFAULT '',
            name_en TEXT NOT NULL DEFAULT '',
            color_ru TEXT NOT NULL DEFAULT '',
            color_kz TEXT NOT NULL DEFAULT '',
            color_en TEXT NOT NULL DEFAULT '',
            material_ru TEXT NOT NULL DEFAULT '',
            material_kz TEXT NOT NULL DEFAULT '',
            material_en TEXT NOT NULL DEFAULT '',
            description_ru TEXT NOT NULL DEFAULT '',
            description_kz TEXT NOT NULL DEFAULT '',
            description_en TEXT NOT NULL DEFAULT '',
            price BIGINT NOT NULL CHECK (price > 0),
            image_path TEXT,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS orders (
            id BIGSERIAL PRIMARY KEY,
            buyer_id BIGINT NOT NULL,
            tie_id BIGINT NOT NULL REFERENCES ties(id),
            tie_name TEXT NOT NULL,
            price BIGINT NOT NULL,
            recipient_name TEXT NOT NULL,
            recipient_surname TEXT NOT NULL,
            recipient_phone TEXT NOT NULL,
            delivery_address TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending_payment',
            delivery_days INTEGER,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS orders_buyer_id_idx ON orders(buyer_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS ties_is_active_idx ON ties(is_active)")
        .execute(pool)
        .await?;

    info!("Database schema initialized successfully");
    Ok(())
}

#[derive(sqlx::FromRow)]
struct UserRow {
    telegram_id: i64,
    display_name: Option<String>,
    language: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            telegram_id: row.telegram_id,
            display_name: row.display_name,
            language: Language::detect(Some(&row.language)),
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    buyer_id: i64,
    tie_id: i64,
    tie_name: String,
    price: i64,
    recipient_name: String,
    recipient_surname: String,
    recipient_phone: String,
    delivery_address: String,
    status: String,
    delivery_days: Option<i32>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|e: String| StoreError::Corrupt(format!("order {}: {e}", row.id)))?;
        Ok(Order {
            id: row.id,
            buyer_id: row.buyer_id,
            tie_id: row.tie_id,
            tie_name: row.tie_name,
            price: row.price,
            recipient_name: row.recipient_name,
            recipient_surname: row.recipient_surname,
            recipient_phone: row.recipient_phone,
            delivery_address: row.delivery_address,
            status,
            delivery_days: row.delivery_days,
            created_at: row.created_at,
        })
    }
}

fn orders_from_rows(rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

/// Repository backed by a Postgres connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and make sure the schema exists
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        init_database_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl ShopRepository for PgStore {
    async fn get_or_create_user(
        &self,
        telegram_id: i64,
        display_name: Option<&str>,
        language: Language,
    ) -> StoreResult<User> {
        debug!(telegram_id, "Getting or creating user");
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (telegram_id, display_name, language)
             VALUES ($1, $2, $3)
             ON CONFLICT (telegram_id)
             DO UPDATE SET display_name = COALESCE(EXCLUDED.display_name, users.display_name)
             RETURNING telegram_id, display_name, language, created_at",
        )
        .bind(telegram_id)
        .bind(display_name)
        .bind(language.code())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_user(&self, telegram_id: i64) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT telegram_id, display_name, language, created_at FROM users WHERE telegram_id = $1",
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn set_user_language(
        &self,
        telegram_id: i64,
        language: Language,
    ) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "UPDATE users SET language = $2 WHERE telegram_id = $1
             RETURNING telegram_id, display_name, language, created_at",
        )
        .bind(telegram_id)
        .bind(language.code())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT telegram_id, display_name, language, created_at FROM users ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn create_tie(&self, tie: NewTie) -> StoreResult<Tie> {
        let created: Tie = sqlx::query_as(&format!(
            "INSERT INTO ties (name_ru, name_kz, name_en, color_ru, color_kz, color_en,
                material_ru, material_kz, material_en,
                description_ru, description_kz, description_en, price, image_path)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING {TIE_COLUMNS}"
        ))
        .bind(&tie.name_ru)
        .bind(&tie.name_kz)
        .bind(&tie.name_en)
        .bind(&tie.color_ru)
        .bind(&tie.color_kz)
        .bind(&tie.color_en)
        .bind(&tie.material_ru)
        .bind(&tie.material_kz)
        .bind(&tie.material_en)
        .bind(&tie.description_ru)
        .bind(&tie.description_kz)
        .bind(&tie.description_en)
        .bind(tie.price)
        .bind(&tie.image_path)
        .fetch_one(&self.pool)
        .await?;
        info!(tie_id = created.id, "Tie created");
        Ok(created)
    }

    async fn get_tie(&self, id: i64) -> StoreResult<Option<Tie>> {
        let tie = sqlx::query_as(&format!("SELECT {TIE_COLUMNS} FROM ties WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tie)
    }

    async fn list_active_ties(&self) -> StoreResult<Vec<Tie>> {
        let ties = sqlx::query_as(&format!(
            "SELECT {TIE_COLUMNS} FROM ties WHERE is_active ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(ties)
    }

    async fn list_all_ties(&self) -> StoreResult<Vec<Tie>> {
        let ties = sqlx::query_as(&format!("SELECT {TIE_COLUMNS} FROM ties ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(ties)
    }

    async fn update_tie(&self, id: i64, update: &TieUpdate) -> StoreResult<Option<Tie>> {
        let tie = sqlx::query_as(&format!(
            "UPDATE ties SET
                name_ru = COALESCE($2, name_ru),
                name_kz = COALESCE($3, name_kz),
                name_en = COALESCE($4, name_en),
                color_ru = COALESCE($5, color_ru),
                color_kz = COALESCE($6, color_kz),
                color_en = COALESCE($7, color_en),
                material_ru = COALESCE($8, material_ru),
                material_kz = COALESCE($9, material_kz),
                material_en = COALESCE($10, material_en),
                description_ru = COALESCE($11, description_ru),
                description_kz = COALESCE($12, description_kz),
                description_en = COALESCE($13, description_en),
                price = COALESCE($14, price),
                image_path = COALESCE($15, image_path)
             WHERE id = $1
             RETURNING {TIE_COLUMNS}"
        ))
        .bind(id)
        .bind(&update.name_ru)
        .bind(&update.name_kz)
        .bind(&update.name_en)
        .bind(&update.color_ru)
        .bind(&update.color_kz)
        .bind(&update.color_en)
        .bind(&update.material_ru)
        .bind(&update.material_kz)
        .bind(&update.material_en)
        .bind(&update.description_ru)
        .bind(&update.description_kz)
        .bind(&update.description_en)
        .bind(update.price)
        .bind(&update.image_path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tie)
    }

    async fn set_tie_active(&self, id: i64, active: bool) -> StoreResult<Option<Tie>> {
        let tie = sqlx::query_as(&format!(
            "UPDATE ties SET is_active = $2 WHERE id = $1 RETURNING {TIE_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tie)
    }

    async fn count_ties(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ties")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders (buyer_id, tie_id, tie_name, price, recipient_name,
                recipient_surname, recipient_phone, delivery_address, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending_payment')
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.buyer_id)
        .bind(order.tie_id)
        .bind(&order.tie_name)
        .bind(order.price)
        .bind(&order.recipient_name)
        .bind(&order.recipient_surname)
        .bind(&order.recipient_phone)
        .bind(&order.delivery_address)
        .fetch_one(&self.pool)
        .await?;
        info!(order_id = row.id, buyer_id = row.buyer_id, "Order created");
        row.try_into()
    }

    async fn get_order(&self, id: i64) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Order::try_from).transpose()
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        orders_from_rows(rows)
    }

    async fn list_user_orders(&self, buyer_id: i64) -> StoreResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(buyer_id)
        .fetch_all(&self.pool)
        .await?;
        orders_from_rows(rows)
    }

    async fn transition_order(&self, id: i64, change: StatusChange) -> StoreResult<TransitionOutcome> {
        let updated: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET status = $3, delivery_days = COALESCE($4, delivery_days)
             WHERE id = $1 AND status = $2
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(change.expected.as_str())
        .bind(change.next.as_str())
        .bind(change.delivery_days)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(TransitionOutcome::Applied(row.try_into()?));
        }

        let current: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match current {
            None => Ok(TransitionOutcome::NotFound),
            Some(status) => {
                let actual = status
                    .parse()
                    .map_err(|e: String| StoreError::Corrupt(format!("order {id}: {e}")))?;
                Ok(TransitionOutcome::Conflict { actual })
            }
        }
    }

    async fn purge_orders_and_users(&self) -> StoreResult<PurgeSummary> {
        let mut tx = self.pool.begin().await?;
        let orders = sqlx::query("DELETE FROM orders")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let users = sqlx::query("DELETE FROM users")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(PurgeSummary { orders, users })
    }
}
