mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Optional filters for listing raw records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawRecordFilter {
    pub kind: Option<RecordKind>,
    pub status: Option<RecordStatus>,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn delete_user(&self, id: &str) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>>;
    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Business operations; creating a business also records the owner membership
    fn create_business(&self, business: &Business) -> Result<()>;
    fn get_business_by_slug(&self, slug: &str) -> Result<Option<Business>>;
    fn list_user_businesses(&self, user_id: &str) -> Result<Vec<Business>>;
    fn delete_business(&self, id: &str) -> Result<bool>;

    // Membership operations
    fn upsert_member(&self, member: &BusinessMember) -> Result<()>;
    fn get_member(&self, business_id: &str, user_id: &str) -> Result<Option<BusinessMember>>;
    fn list_members(&self, business_id: &str) -> Result<Vec<BusinessMember>>;
    fn set_member_active(&self, business_id: &str, user_id: &str, active: bool) -> Result<bool>;

    // Raw record operations (append-only; status moves forward only)
    fn create_raw_record(&self, record: &RawRecord) -> Result<()>;
    fn get_raw_record(&self, id: &str) -> Result<Option<RawRecord>>;
    fn mark_raw_record(
        &self,
        id: &str,
        status: RecordStatus,
        error_message: Option<&str>,
    ) -> Result<()>;
    fn list_raw_records(
        &self,
        business_id: &str,
        filter: RawRecordFilter,
        cursor: &str,
        limit: i32,
    ) -> Result<Vec<RawRecord>>;
    fn count_raw_records(&self, business_id: &str, filter: RawRecordFilter) -> Result<i64>;

    // Product operations
    fn create_product(&self, product: &Product) -> Result<()>;
    /// Inserts the product or overwrites the existing one with the same
    /// (business, name) in a single statement.
    fn upsert_product(&self, product: &Product) -> Result<Upserted<Product>>;
    /// Returns the named product, creating a zero-priced one if absent.
    fn get_or_create_product(&self, business_id: &str, name: &str) -> Result<Product>;
    fn get_product(&self, business_id: &str, id: &str) -> Result<Option<Product>>;
    fn get_product_by_name(&self, business_id: &str, name: &str) -> Result<Option<Product>>;
    fn list_products(&self, business_id: &str) -> Result<Vec<Product>>;
    fn update_product(&self, product: &Product) -> Result<()>;
    fn delete_product(&self, business_id: &str, id: &str) -> Result<bool>;

    // Sales operations
    fn create_sale(&self, sale: &SalesRecord) -> Result<()>;
    fn get_sale(&self, business_id: &str, id: &str) -> Result<Option<SalesRecord>>;
    fn list_sales(&self, business_id: &str) -> Result<Vec<SalesRecord>>;
    fn update_sale(&self, sale: &SalesRecord) -> Result<()>;
    fn delete_sale(&self, business_id: &str, id: &str) -> Result<bool>;

    // Campaign operations (immutable once created)
    fn create_campaign(&self, campaign: &Campaign) -> Result<()>;
    fn get_campaign(&self, business_id: &str, id: &str) -> Result<Option<Campaign>>;
    fn list_campaigns(&self, business_id: &str) -> Result<Vec<Campaign>>;

    // Admin token check
    fn has_admin_token(&self) -> Result<bool>;

    fn close(&self) -> Result<()>;
}
