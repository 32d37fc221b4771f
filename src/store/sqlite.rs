use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::schema::SCHEMA;
use super::{RawRecordFilter, Store};
use crate::error::{Error, Result};
use crate::types::*;

const PRODUCT_COLUMNS: &str =
    "id, business_id, name, sku, category, price, cost_price, attributes, created_at, updated_at";

const SALE_SELECT: &str = "SELECT s.id, s.business_id, s.product_id, p.name, s.date, s.quantity,
            s.revenue, s.channel, s.created_at
     FROM sales_records s
     JOIN products p ON p.id = s.product_id";

const DATE_FORMAT: &str = "%Y-%m-%d";
const BUSY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        // The server and a CLI import may write the same file at once.
        conn.busy_timeout(BUSY_TIMEOUT)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database, mostly useful in tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

// Fixed-width so that text ordering matches time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    Ok(parse_datetime(&row.get::<_, String>(idx)?))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn enum_column<T: FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| conversion_error(idx, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Error::from)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Maps unique-constraint failures to `AlreadyExists`.
fn unique_or(err: rusqlite::Error) -> Error {
    if is_constraint_violation(&err) {
        Error::AlreadyExists
    } else {
        Error::from(err)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        created_at: datetime_column(row, 3)?,
        updated_at: datetime_column(row, 4)?,
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        user_id: row.get(4)?,
        created_at: datetime_column(row, 5)?,
        expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

fn business_from_row(row: &Row<'_>) -> rusqlite::Result<Business> {
    Ok(Business {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        slug: row.get(3)?,
        industry: row.get(4)?,
        location: row.get(5)?,
        created_at: datetime_column(row, 6)?,
    })
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<BusinessMember> {
    Ok(BusinessMember {
        business_id: row.get(0)?,
        user_id: row.get(1)?,
        role: enum_column(row, 2)?,
        active: row.get(3)?,
        joined_at: datetime_column(row, 4)?,
    })
}

fn raw_record_from_row(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        business_id: row.get(1)?,
        kind: enum_column(row, 2)?,
        raw_row: json_column(row, 3)?,
        status: enum_column(row, 4)?,
        error_message: row.get(5)?,
        uploaded_at: datetime_column(row, 6)?,
    })
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        business_id: row.get(1)?,
        name: row.get(2)?,
        sku: row.get(3)?,
        category: row.get(4)?,
        price: row.get(5)?,
        cost_price: row.get(6)?,
        attributes: json_column(row, 7)?,
        created_at: datetime_column(row, 8)?,
        updated_at: datetime_column(row, 9)?,
    })
}

fn sale_from_row(row: &Row<'_>) -> rusqlite::Result<SalesRecord> {
    Ok(SalesRecord {
        id: row.get(0)?,
        business_id: row.get(1)?,
        product_id: row.get(2)?,
        product_name: row.get(3)?,
        date: date_column(row, 4)?,
        quantity: row.get(5)?,
        revenue: row.get(6)?,
        channel: row.get(7)?,
        created_at: datetime_column(row, 8)?,
    })
}

fn campaign_from_row(row: &Row<'_>) -> rusqlite::Result<Campaign> {
    Ok(Campaign {
        id: row.get(0)?,
        business_id: row.get(1)?,
        goal: row.get(2)?,
        budget: row.get(3)?,
        payload: json_column(row, 4)?,
        created_by: row.get(5)?,
        created_at: datetime_column(row, 6)?,
    })
}

fn raw_filter_clause(filter: RawRecordFilter) -> String {
    let mut clause = String::new();
    if let Some(kind) = filter.kind {
        clause.push_str(&format!(" AND kind = '{}'", kind.as_str()));
    }
    if let Some(status) = filter.status {
        clause.push_str(&format!(" AND status = '{}'", status.as_str()));
    }
    clause
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, email, display_name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id,
                    user.email,
                    user.display_name,
                    format_datetime(&user.created_at),
                    format_datetime(&user.updated_at),
                ],
            )
            .map_err(unique_or)?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                "SELECT id, email, display_name, created_at, updated_at FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                "SELECT id, email, display_name, created_at, updated_at
                 FROM users WHERE email = ?1 COLLATE NOCASE",
                params![email],
                user_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, email, display_name, created_at, updated_at
             FROM users WHERE id > ?1 ORDER BY id LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![cursor, limit], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>> {
        self.conn()
            .query_row(
                "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
                 FROM tokens WHERE id = ?1",
                params![id],
                token_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        self.conn()
            .query_row(
                "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
                 FROM tokens WHERE token_lookup = ?1",
                params![lookup],
                token_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE id > ?1 ORDER BY id LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![cursor, limit], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Business operations

    fn create_business(&self, business: &Business) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO businesses (id, owner_id, name, slug, industry, location, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                business.id,
                business.owner_id,
                business.name,
                business.slug,
                business.industry,
                business.location,
                format_datetime(&business.created_at),
            ],
        )
        .map_err(unique_or)?;

        tx.execute(
            "INSERT INTO business_members (business_id, user_id, role, active, joined_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![
                business.id,
                business.owner_id,
                MemberRole::Owner.as_str(),
                format_datetime(&business.created_at),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn get_business_by_slug(&self, slug: &str) -> Result<Option<Business>> {
        self.conn()
            .query_row(
                "SELECT id, owner_id, name, slug, industry, location, created_at
                 FROM businesses WHERE slug = ?1",
                params![slug],
                business_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_user_businesses(&self, user_id: &str) -> Result<Vec<Business>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT b.id, b.owner_id, b.name, b.slug, b.industry, b.location, b.created_at
             FROM businesses b
             WHERE b.owner_id = ?1
                OR EXISTS (
                    SELECT 1 FROM business_members m
                    WHERE m.business_id = b.id AND m.user_id = ?1 AND m.active = 1
                )
             ORDER BY b.name, b.slug",
        )?;

        let rows = stmt.query_map(params![user_id], business_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_business(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM businesses WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Membership operations

    fn upsert_member(&self, member: &BusinessMember) -> Result<()> {
        self.conn().execute(
            "INSERT INTO business_members (business_id, user_id, role, active, joined_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (business_id, user_id) DO UPDATE SET
                role = excluded.role,
                active = excluded.active",
            params![
                member.business_id,
                member.user_id,
                member.role.as_str(),
                member.active,
                format_datetime(&member.joined_at),
            ],
        )?;
        Ok(())
    }

    fn get_member(&self, business_id: &str, user_id: &str) -> Result<Option<BusinessMember>> {
        self.conn()
            .query_row(
                "SELECT business_id, user_id, role, active, joined_at
                 FROM business_members WHERE business_id = ?1 AND user_id = ?2",
                params![business_id, user_id],
                member_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_members(&self, business_id: &str) -> Result<Vec<BusinessMember>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT business_id, user_id, role, active, joined_at
             FROM business_members WHERE business_id = ?1 ORDER BY joined_at, user_id",
        )?;

        let rows = stmt.query_map(params![business_id], member_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn set_member_active(&self, business_id: &str, user_id: &str, active: bool) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE business_members SET active = ?1 WHERE business_id = ?2 AND user_id = ?3",
            params![active, business_id, user_id],
        )?;
        Ok(rows > 0)
    }

    // Raw record operations

    fn create_raw_record(&self, record: &RawRecord) -> Result<()> {
        let raw_row = to_json(&record.raw_row)?;
        self.conn().execute(
            "INSERT INTO raw_records (id, business_id, kind, raw_row, status, error_message, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.business_id,
                record.kind.as_str(),
                raw_row,
                record.status.as_str(),
                record.error_message,
                format_datetime(&record.uploaded_at),
            ],
        )?;
        Ok(())
    }

    fn get_raw_record(&self, id: &str) -> Result<Option<RawRecord>> {
        self.conn()
            .query_row(
                "SELECT id, business_id, kind, raw_row, status, error_message, uploaded_at
                 FROM raw_records WHERE id = ?1",
                params![id],
                raw_record_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn mark_raw_record(
        &self,
        id: &str,
        status: RecordStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let allowed = status
            .predecessors()
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        if allowed.is_empty() {
            return Err(Error::Conflict(format!(
                "raw record cannot move to {status}"
            )));
        }

        let conn = self.conn();
        let rows = conn.execute(
            &format!(
                "UPDATE raw_records SET status = ?1, error_message = ?2
                 WHERE id = ?3 AND status IN ({allowed})"
            ),
            params![status.as_str(), error_message, id],
        )?;

        if rows > 0 {
            return Ok(());
        }

        let current: Option<String> = conn
            .query_row(
                "SELECT status FROM raw_records WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match current {
            None => Err(Error::NotFound),
            Some(current) => Err(Error::Conflict(format!(
                "raw record cannot move from {current} to {status}"
            ))),
        }
    }

    fn list_raw_records(
        &self,
        business_id: &str,
        filter: RawRecordFilter,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<RawRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, business_id, kind, raw_row, status, error_message, uploaded_at
             FROM raw_records
             WHERE business_id = ?1
               AND rowid > COALESCE((SELECT rowid FROM raw_records WHERE id = ?2), 0){}
             ORDER BY rowid LIMIT ?3",
            raw_filter_clause(filter)
        ))?;

        let rows = stmt.query_map(params![business_id, cursor, limit], raw_record_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_raw_records(&self, business_id: &str, filter: RawRecordFilter) -> Result<i64> {
        let count: i64 = self.conn().query_row(
            &format!(
                "SELECT COUNT(*) FROM raw_records WHERE business_id = ?1{}",
                raw_filter_clause(filter)
            ),
            params![business_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // Product operations

    fn create_product(&self, product: &Product) -> Result<()> {
        let attributes = to_json(&product.attributes)?;
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO products ({PRODUCT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    product.id,
                    product.business_id,
                    product.name,
                    product.sku,
                    product.category,
                    product.price,
                    product.cost_price,
                    attributes,
                    format_datetime(&product.created_at),
                    format_datetime(&product.updated_at),
                ],
            )
            .map_err(unique_or)?;
        Ok(())
    }

    fn upsert_product(&self, product: &Product) -> Result<Upserted<Product>> {
        let attributes = to_json(&product.attributes)?;
        let (stored, revision) = self.conn().query_row(
            &format!(
                "INSERT INTO products ({PRODUCT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT (business_id, name) DO UPDATE SET
                    sku = COALESCE(excluded.sku, products.sku),
                    category = excluded.category,
                    price = excluded.price,
                    cost_price = excluded.cost_price,
                    attributes = excluded.attributes,
                    updated_at = excluded.updated_at,
                    revision = products.revision + 1
                 RETURNING {PRODUCT_COLUMNS}, revision"
            ),
            params![
                product.id,
                product.business_id,
                product.name,
                product.sku,
                product.category,
                product.price,
                product.cost_price,
                attributes,
                format_datetime(&product.created_at),
                format_datetime(&product.updated_at),
            ],
            |row| Ok((product_from_row(row)?, row.get::<_, i64>(10)?)),
        )?;

        // A row that already existed has been through the DO UPDATE arm at least once.
        if stored.id == product.id && revision == 0 {
            Ok(Upserted::Created(stored))
        } else {
            Ok(Upserted::Updated(stored))
        }
    }

    fn get_or_create_product(&self, business_id: &str, name: &str) -> Result<Product> {
        let now = format_datetime(&Utc::now());
        self.conn()
            .query_row(
                &format!(
                    "INSERT INTO products ({PRODUCT_COLUMNS})
                     VALUES (?1, ?2, ?3, NULL, '', 0, 0, '{{}}', ?4, ?4)
                     ON CONFLICT (business_id, name) DO UPDATE SET name = products.name
                     RETURNING {PRODUCT_COLUMNS}"
                ),
                params![Uuid::new_v4().to_string(), business_id, name, now],
                product_from_row,
            )
            .map_err(Error::from)
    }

    fn get_product(&self, business_id: &str, id: &str) -> Result<Option<Product>> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products WHERE business_id = ?1 AND id = ?2"
                ),
                params![business_id, id],
                product_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_product_by_name(&self, business_id: &str, name: &str) -> Result<Option<Product>> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products WHERE business_id = ?1 AND name = ?2"
                ),
                params![business_id, name],
                product_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_products(&self, business_id: &str) -> Result<Vec<Product>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE business_id = ?1 ORDER BY name"
        ))?;

        let rows = stmt.query_map(params![business_id], product_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_product(&self, product: &Product) -> Result<()> {
        let attributes = to_json(&product.attributes)?;
        let rows = self
            .conn()
            .execute(
                "UPDATE products SET name = ?1, sku = ?2, category = ?3, price = ?4,
                    cost_price = ?5, attributes = ?6, updated_at = ?7
                 WHERE business_id = ?8 AND id = ?9",
                params![
                    product.name,
                    product.sku,
                    product.category,
                    product.price,
                    product.cost_price,
                    attributes,
                    format_datetime(&product.updated_at),
                    product.business_id,
                    product.id,
                ],
            )
            .map_err(unique_or)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_product(&self, business_id: &str, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM products WHERE business_id = ?1 AND id = ?2",
            params![business_id, id],
        )?;
        Ok(rows > 0)
    }

    // Sales operations

    fn create_sale(&self, sale: &SalesRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sales_records (id, business_id, product_id, date, quantity, revenue, channel, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                sale.id,
                sale.business_id,
                sale.product_id,
                format_date(&sale.date),
                sale.quantity,
                sale.revenue,
                sale.channel,
                format_datetime(&sale.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_sale(&self, business_id: &str, id: &str) -> Result<Option<SalesRecord>> {
        self.conn()
            .query_row(
                &format!("{SALE_SELECT} WHERE s.business_id = ?1 AND s.id = ?2"),
                params![business_id, id],
                sale_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_sales(&self, business_id: &str) -> Result<Vec<SalesRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{SALE_SELECT} WHERE s.business_id = ?1 ORDER BY s.date DESC, s.created_at DESC"
        ))?;

        let rows = stmt.query_map(params![business_id], sale_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_sale(&self, sale: &SalesRecord) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE sales_records SET date = ?1, quantity = ?2, revenue = ?3, channel = ?4
             WHERE business_id = ?5 AND id = ?6",
            params![
                format_date(&sale.date),
                sale.quantity,
                sale.revenue,
                sale.channel,
                sale.business_id,
                sale.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_sale(&self, business_id: &str, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM sales_records WHERE business_id = ?1 AND id = ?2",
            params![business_id, id],
        )?;
        Ok(rows > 0)
    }

    // Campaign operations

    fn create_campaign(&self, campaign: &Campaign) -> Result<()> {
        let payload = to_json(&campaign.payload)?;
        self.conn().execute(
            "INSERT INTO campaigns (id, business_id, goal, budget, payload, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                campaign.id,
                campaign.business_id,
                campaign.goal,
                campaign.budget,
                payload,
                campaign.created_by,
                format_datetime(&campaign.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_campaign(&self, business_id: &str, id: &str) -> Result<Option<Campaign>> {
        self.conn()
            .query_row(
                "SELECT id, business_id, goal, budget, payload, created_by, created_at
                 FROM campaigns WHERE business_id = ?1 AND id = ?2",
                params![business_id, id],
                campaign_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_campaigns(&self, business_id: &str) -> Result<Vec<Campaign>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, business_id, goal, budget, payload, created_by, created_at
             FROM campaigns WHERE business_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map(params![business_id], campaign_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn has_admin_token(&self) -> Result<bool> {
        let count: i32 = self.conn().query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::{Map, json};
    use tempfile::TempDir;

    fn open_store(temp: &TempDir) -> SqliteStore {
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        store
    }

    fn seed_business(store: &SqliteStore, slug: &str) -> Business {
        let now = Utc::now();
        let owner = User {
            id: format!("user-{slug}"),
            email: format!("{slug}@example.com"),
            display_name: slug.to_string(),
            created_at: now,
            updated_at: now,
        };
        store.create_user(&owner).unwrap();

        let business = Business {
            id: format!("biz-{slug}"),
            owner_id: owner.id,
            name: slug.to_string(),
            slug: slug.to_string(),
            industry: "retail".to_string(),
            location: String::new(),
            created_at: now,
        };
        store.create_business(&business).unwrap();
        business
    }

    fn product(business_id: &str, name: &str, price: f64) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            business_id: business_id.to_string(),
            name: name.to_string(),
            sku: None,
            category: String::new(),
            price,
            cost_price: 0.0,
            attributes: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "users",
            "tokens",
            "businesses",
            "business_members",
            "raw_records",
            "products",
            "sales_records",
            "campaigns",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_create_business_adds_owner_membership() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let business = seed_business(&store, "duka");

        let member = store
            .get_member(&business.id, &business.owner_id)
            .unwrap()
            .unwrap();
        assert_eq!(member.role, MemberRole::Owner);
        assert!(member.active);

        let duplicate = Business {
            id: "biz-other".to_string(),
            ..business.clone()
        };
        assert!(matches!(
            store.create_business(&duplicate),
            Err(Error::AlreadyExists)
        ));
    }

    #[test]
    fn test_upsert_product_reports_create_then_update() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let business = seed_business(&store, "duka");

        let first = store
            .upsert_product(&product(&business.id, "Soap", 100.0))
            .unwrap();
        assert!(first.was_created());
        let first = first.into_inner();

        let mut again = product(&business.id, "Soap", 120.0);
        again.attributes.insert("size".into(), json!("large"));
        let second = store.upsert_product(&again).unwrap();
        assert!(!second.was_created());

        let second = second.into_inner();
        assert_eq!(second.id, first.id);
        assert_eq!(second.price, 120.0);
        assert_eq!(second.attributes["size"], json!("large"));
        assert_eq!(store.list_products(&business.id).unwrap().len(), 1);

        let third = store
            .upsert_product(&product(&business.id, "Soap", 90.0))
            .unwrap();
        assert!(!third.was_created());
        assert!(third.into_inner().attributes.is_empty());
    }

    #[test]
    fn test_get_or_create_product_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let business = seed_business(&store, "duka");

        let created = store.get_or_create_product(&business.id, "Candle").unwrap();
        assert_eq!(created.price, 0.0);

        let fetched = store.get_or_create_product(&business.id, "Candle").unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(store.list_products(&business.id).unwrap().len(), 1);
    }

    #[test]
    fn test_products_are_scoped_per_business() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let a = seed_business(&store, "alpha");
        let b = seed_business(&store, "beta");

        let in_a = store.get_or_create_product(&a.id, "Soap").unwrap();
        let in_b = store.get_or_create_product(&b.id, "Soap").unwrap();
        assert_ne!(in_a.id, in_b.id);
        assert!(store.get_product(&b.id, &in_a.id).unwrap().is_none());
    }

    #[test]
    fn test_sale_cannot_reference_other_business_product() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let a = seed_business(&store, "alpha");
        let b = seed_business(&store, "beta");
        let foreign = store.get_or_create_product(&a.id, "Soap").unwrap();

        let sale = SalesRecord {
            id: Uuid::new_v4().to_string(),
            business_id: b.id.clone(),
            product_id: foreign.id,
            product_name: "Soap".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            quantity: 1,
            revenue: 0.0,
            channel: "offline".to_string(),
            created_at: Utc::now(),
        };
        assert!(store.create_sale(&sale).is_err());
    }

    #[test]
    fn test_deleting_product_cascades_sales() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let business = seed_business(&store, "duka");
        let soap = store.get_or_create_product(&business.id, "Soap").unwrap();

        let sale = SalesRecord {
            id: Uuid::new_v4().to_string(),
            business_id: business.id.clone(),
            product_id: soap.id.clone(),
            product_name: soap.name.clone(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            quantity: 2,
            revenue: 10.0,
            channel: "offline".to_string(),
            created_at: Utc::now(),
        };
        store.create_sale(&sale).unwrap();
        assert_eq!(store.list_sales(&business.id).unwrap().len(), 1);

        assert!(store.delete_product(&business.id, &soap.id).unwrap());
        assert!(store.list_sales(&business.id).unwrap().is_empty());
    }

    #[test]
    fn test_raw_record_status_only_moves_forward() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let business = seed_business(&store, "duka");

        let record = RawRecord {
            id: "raw-1".to_string(),
            business_id: business.id.clone(),
            kind: RecordKind::Product,
            raw_row: [("name", "Soap")].into_iter().collect(),
            status: RecordStatus::Raw,
            error_message: None,
            uploaded_at: Utc::now(),
        };
        store.create_raw_record(&record).unwrap();

        store
            .mark_raw_record("raw-1", RecordStatus::Cleaned, None)
            .unwrap();
        let back = store.mark_raw_record("raw-1", RecordStatus::Raw, None);
        assert!(matches!(back, Err(Error::Conflict(_))));
        let again = store.mark_raw_record("raw-1", RecordStatus::Error, Some("late"));
        assert!(matches!(again, Err(Error::Conflict(_))));

        let stored = store.get_raw_record("raw-1").unwrap().unwrap();
        assert_eq!(stored.status, RecordStatus::Cleaned);
        assert!(stored.error_message.is_none());
        assert_eq!(stored.raw_row, record.raw_row);

        let missing = store.mark_raw_record("nope", RecordStatus::Cleaned, None);
        assert!(matches!(missing, Err(Error::NotFound)));
    }

    #[test]
    fn test_list_raw_records_filters_and_pages() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let business = seed_business(&store, "duka");

        for i in 0..5 {
            let record = RawRecord {
                id: format!("raw-{i}"),
                business_id: business.id.clone(),
                kind: if i % 2 == 0 {
                    RecordKind::Product
                } else {
                    RecordKind::Sale
                },
                raw_row: [("row", i.to_string())].into_iter().collect(),
                status: RecordStatus::Raw,
                error_message: None,
                uploaded_at: Utc::now(),
            };
            store.create_raw_record(&record).unwrap();
        }

        let products = RawRecordFilter {
            kind: Some(RecordKind::Product),
            status: None,
        };
        assert_eq!(store.count_raw_records(&business.id, products).unwrap(), 3);

        let page = store
            .list_raw_records(&business.id, RawRecordFilter::default(), "", 2)
            .unwrap();
        let ids: Vec<&str> = page.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["raw-0", "raw-1"]);

        let next = store
            .list_raw_records(&business.id, RawRecordFilter::default(), "raw-1", 10)
            .unwrap();
        let ids: Vec<&str> = next.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["raw-2", "raw-3", "raw-4"]);
    }

    #[test]
    fn test_campaigns_list_newest_first() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let business = seed_business(&store, "duka");
        let now = Utc::now();

        for (id, offset) in [("old", 2), ("new", 0), ("mid", 1)] {
            store
                .create_campaign(&Campaign {
                    id: id.to_string(),
                    business_id: business.id.clone(),
                    goal: "Increase sales".to_string(),
                    budget: 1000.0,
                    payload: json!({"summary": id}),
                    created_by: Some(business.owner_id.clone()),
                    created_at: now - Duration::minutes(offset),
                })
                .unwrap();
        }

        let ids: Vec<String> = store
            .list_campaigns(&business.id)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, ["new", "mid", "old"]);
    }

    #[test]
    fn test_token_lookup_collision() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let token1 = Token {
            id: "token-1".to_string(),
            token_hash: "hash1".to_string(),
            token_lookup: "lookup123".to_string(),
            is_admin: true,
            user_id: None,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };
        store.create_token(&token1).unwrap();

        let token2 = Token {
            id: "token-2".to_string(),
            token_hash: "hash2".to_string(),
            token_lookup: "lookup123".to_string(), // Same lookup
            is_admin: true,
            user_id: None,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };

        let result = store.create_token(&token2);
        assert!(matches!(result, Err(Error::TokenLookupCollision)));
    }

    #[test]
    fn test_concurrent_upserts_create_one_product() {
        let temp = TempDir::new().unwrap();
        let first = open_store(&temp);
        let business = seed_business(&first, "duka");
        let second = open_store(&temp);

        let barrier = std::sync::Barrier::new(2);
        let outcomes: Vec<Upserted<Product>> = std::thread::scope(|s| {
            let handles: Vec<_> = [&first, &second]
                .into_iter()
                .map(|store| {
                    let barrier = &barrier;
                    let candidate = product(&business.id, "Soap", 100.0);
                    s.spawn(move || {
                        barrier.wait();
                        store.upsert_product(&candidate).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|o| o.was_created()).count(), 1);
        let ids: Vec<String> = outcomes.into_iter().map(|o| o.into_inner().id).collect();
        assert_eq!(ids[0], ids[1]);
        assert_eq!(first.list_products(&business.id).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_get_or_create_shares_one_product() {
        let temp = TempDir::new().unwrap();
        let first = open_store(&temp);
        let business = seed_business(&first, "duka");
        let second = open_store(&temp);

        let barrier = std::sync::Barrier::new(2);
        let ids: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = [&first, &second]
                .into_iter()
                .map(|store| {
                    let barrier = &barrier;
                    let business_id = business.id.as_str();
                    s.spawn(move || {
                        barrier.wait();
                        store.get_or_create_product(business_id, "Candle").unwrap().id
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(ids[0], ids[1]);
        let products = second.list_products(&business.id).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Candle");
    }
}
