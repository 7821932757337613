//! PostgreSQL ledger store

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use super::{AppendGuard, BalanceScope, LedgerStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    ledger_activity_details, ActivityRecord, EntryFilter, EntryKind, EntrySource, LedgerEntry,
    LotBalance, NewLedgerEntry, ProductBalance, LEDGER_ENTITY,
};
use shared::balance::covers;

/// Ledger store backed by the `ledger_entries` and `activity_logs` tables
#[derive(Clone)]
pub struct PgLedgerStore {
    db: PgPool,
}

/// Row shape of `ledger_entries`
#[derive(Debug, FromRow)]
struct LedgerEntryRow {
    id: Uuid,
    kind: String,
    product_id: Uuid,
    warehouse_id: Uuid,
    scale_id: Option<Uuid>,
    lot_id: Option<String>,
    quantity: Decimal,
    weight: Option<Decimal>,
    source: String,
    reverses_entry_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    created_by: String,
}

impl TryFrom<LedgerEntryRow> for LedgerEntry {
    type Error = AppError;

    fn try_from(row: LedgerEntryRow) -> Result<Self, Self::Error> {
        let kind = EntryKind::from_str(&row.kind)
            .ok_or_else(|| AppError::Internal(format!("unknown ledger kind {}", row.kind)))?;
        let source = EntrySource::from_str(&row.source)
            .ok_or_else(|| AppError::Internal(format!("unknown entry source {}", row.source)))?;

        Ok(LedgerEntry {
            id: row.id,
            kind,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            scale_id: row.scale_id,
            lot_id: row.lot_id,
            quantity: row.quantity,
            weight: row.weight,
            source,
            reverses_entry_id: row.reverses_entry_id,
            created_at: row.created_at,
            created_by: row.created_by,
        })
    }
}

/// Row for lot balance query
#[derive(Debug, FromRow)]
struct LotBalanceRow {
    lot_id: String,
    product_id: Uuid,
    warehouse_id: Uuid,
    balance: Decimal,
    last_updated_at: DateTime<Utc>,
}

/// Row for activity query
#[derive(Debug, FromRow)]
struct ActivityRow {
    id: Uuid,
    actor: String,
    action: String,
    entity_type: String,
    entity_id: Uuid,
    details: serde_json::Value,
    created_at: DateTime<Utc>,
}

const ENTRY_COLUMNS: &str = "id, kind, product_id, warehouse_id, scale_id, lot_id, quantity, \
     weight, source, reverses_entry_id, created_at, created_by";

/// Lost races and constraint hits that the caller should retry as a whole
fn map_db_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("40001") | Some("40P01") => {
                return AppError::conflict("ledger", "concurrent update, retry the operation");
            }
            Some("23505") => {
                return AppError::conflict("entryId", "entry has already been undone");
            }
            Some("23503") => {
                return AppError::NotFound("Referenced record".to_string());
            }
            _ => {}
        }
    }
    AppError::DatabaseError(err)
}

async fn scope_balance<'e, E>(executor: E, scope: &BalanceScope) -> Result<Decimal, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let (product_id, warehouse_id, lot_id) = scope.parts();
    sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(CASE WHEN kind IN ('STOCK_IN', 'STOCK_OUT_UNDO') THEN quantity ELSE -quantity END), 0)
        FROM ledger_entries
        WHERE ($1::uuid IS NULL OR product_id = $1)
          AND ($2::uuid IS NULL OR warehouse_id = $2)
          AND ($3::text IS NULL OR lot_id = $3)
        "#,
    )
    .bind(product_id)
    .bind(warehouse_id)
    .bind(lot_id)
    .fetch_one(executor)
    .await
}

impl PgLedgerStore {
    /// Create a new PgLedgerStore instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

impl LedgerStore for PgLedgerStore {
    async fn product_barcode(&self, product_id: Uuid) -> AppResult<Option<String>> {
        let barcode = sqlx::query_scalar::<_, String>(
            "SELECT barcode FROM products WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(barcode)
    }

    async fn product_by_barcode(&self, barcode: &str) -> AppResult<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM products WHERE barcode = $1 AND deleted_at IS NULL",
        )
        .bind(barcode)
        .fetch_optional(&self.db)
        .await?;

        Ok(id)
    }

    async fn warehouse_exists(&self, warehouse_id: Uuid) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1 AND status <> 'archived')",
        )
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    async fn scale_exists(&self, scale_id: Uuid) -> AppResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM scales WHERE id = $1)")
                .bind(scale_id)
                .fetch_one(&self.db)
                .await?;

        Ok(exists)
    }

    async fn lot_placement(&self, lot_id: &str) -> AppResult<Option<(Uuid, Uuid)>> {
        let placement = sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"
            SELECT product_id, warehouse_id
            FROM ledger_entries
            WHERE lot_id = $1
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .bind(lot_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(placement)
    }

    async fn find_entry(&self, entry_id: Uuid) -> AppResult<Option<LedgerEntry>> {
        let sql = format!("SELECT {} FROM ledger_entries WHERE id = $1", ENTRY_COLUMNS);
        sqlx::query_as::<_, LedgerEntryRow>(&sql)
            .bind(entry_id)
            .fetch_optional(&self.db)
            .await?
            .map(LedgerEntry::try_from)
            .transpose()
    }

    async fn find_undo(&self, entry_id: Uuid) -> AppResult<Option<LedgerEntry>> {
        let sql = format!(
            "SELECT {} FROM ledger_entries WHERE reverses_entry_id = $1",
            ENTRY_COLUMNS
        );
        sqlx::query_as::<_, LedgerEntryRow>(&sql)
            .bind(entry_id)
            .fetch_optional(&self.db)
            .await?
            .map(LedgerEntry::try_from)
            .transpose()
    }

    async fn balance(&self, scope: &BalanceScope) -> AppResult<Decimal> {
        Ok(scope_balance(&self.db, scope).await?)
    }

    async fn lot_balances(
        &self,
        product_id: Uuid,
        warehouse_id: Option<Uuid>,
    ) -> AppResult<Vec<LotBalance>> {
        let rows = sqlx::query_as::<_, LotBalanceRow>(
            r#"
            SELECT lot_id, product_id, warehouse_id,
                   SUM(CASE WHEN kind IN ('STOCK_IN', 'STOCK_OUT_UNDO') THEN quantity ELSE -quantity END) AS balance,
                   MAX(created_at) AS last_updated_at
            FROM ledger_entries
            WHERE lot_id IS NOT NULL
              AND product_id = $1
              AND ($2::uuid IS NULL OR warehouse_id = $2)
            GROUP BY lot_id, product_id, warehouse_id
            ORDER BY last_updated_at DESC, lot_id
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| LotBalance {
                lot_id: r.lot_id,
                product_id: r.product_id,
                warehouse_id: r.warehouse_id,
                balance: r.balance,
                last_updated_at: r.last_updated_at,
            })
            .collect())
    }

    async fn list_entries(&self, filter: &EntryFilter) -> AppResult<Vec<LedgerEntry>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM ledger_entries
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR warehouse_id = $2)
              AND ($3::text IS NULL OR lot_id = $3)
              AND ($4::text IS NULL OR kind = $4)
              AND ($5::timestamptz IS NULL OR created_at >= $5)
              AND ($6::timestamptz IS NULL OR created_at <= $6)
            ORDER BY created_at DESC, id
            LIMIT $7
            "#,
            ENTRY_COLUMNS
        );

        let rows = sqlx::query_as::<_, LedgerEntryRow>(&sql)
            .bind(filter.product_id)
            .bind(filter.warehouse_id)
            .bind(filter.lot_id.as_deref())
            .bind(filter.kind.map(|k| k.as_str()))
            .bind(filter.from)
            .bind(filter.to)
            .bind(i64::from(filter.effective_limit()))
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    async fn balances_below(&self, threshold: Decimal) -> AppResult<Vec<ProductBalance>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, Decimal)>(
            r#"
            SELECT product_id, warehouse_id,
                   SUM(CASE WHEN kind IN ('STOCK_IN', 'STOCK_OUT_UNDO') THEN quantity ELSE -quantity END) AS balance
            FROM ledger_entries
            GROUP BY product_id, warehouse_id
            HAVING SUM(CASE WHEN kind IN ('STOCK_IN', 'STOCK_OUT_UNDO') THEN quantity ELSE -quantity END) < $1
            ORDER BY balance, product_id, warehouse_id
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ProductBalance {
                product_id: r.0,
                warehouse_id: r.1,
                balance: r.2,
            })
            .collect())
    }

    async fn recent_activity(&self, limit: u32) -> AppResult<Vec<ActivityRecord>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, actor, action, entity_type, entity_id, details, created_at
            FROM activity_logs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ActivityRecord {
                id: r.id,
                actor: r.actor,
                action: r.action,
                entity_type: r.entity_type,
                entity_id: r.entity_id,
                details: r.details,
                created_at: r.created_at,
            })
            .collect())
    }

    async fn append(&self, entry: NewLedgerEntry, guard: AppendGuard) -> AppResult<LedgerEntry> {
        let scope = BalanceScope::of_entry(&entry);

        let mut tx = self.db.begin().await.map_err(map_db_error)?;

        // Held until commit or rollback; serializes writers on this lot across processes
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(scope.lock_key())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        if guard.fresh_lot {
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM ledger_entries WHERE lot_id = $1)",
            )
            .bind(entry.lot_id.as_deref())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

            if taken {
                return Err(AppError::conflict("lotId", "lot number already in use"));
            }
        }

        if let Some(original_id) = guard.not_undone {
            let undone = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM ledger_entries WHERE reverses_entry_id = $1)",
            )
            .bind(original_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

            if undone {
                return Err(AppError::conflict("entryId", "entry has already been undone"));
            }
        }

        if guard.require_cover {
            let available = scope_balance(&mut *tx, &scope)
                .await
                .map_err(map_db_error)?;
            if !covers(available, entry.quantity) {
                return Err(AppError::InsufficientStock { available });
            }
        }

        let sql = format!(
            r#"
            INSERT INTO ledger_entries (
                id, kind, product_id, warehouse_id, scale_id, lot_id, quantity, weight,
                source, reverses_entry_id, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            ENTRY_COLUMNS
        );

        let row = sqlx::query_as::<_, LedgerEntryRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(entry.kind.as_str())
            .bind(entry.product_id)
            .bind(entry.warehouse_id)
            .bind(entry.scale_id)
            .bind(entry.lot_id.as_deref())
            .bind(entry.quantity)
            .bind(entry.weight)
            .bind(entry.source.as_str())
            .bind(entry.reverses_entry_id)
            .bind(&entry.created_by)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

        let created = LedgerEntry::try_from(row)?;

        sqlx::query(
            r#"
            INSERT INTO activity_logs (id, actor, action, entity_type, entity_id, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&created.created_by)
        .bind(created.kind.as_str())
        .bind(LEDGER_ENTITY)
        .bind(created.id)
        .bind(ledger_activity_details(&created))
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(created)
    }
}
