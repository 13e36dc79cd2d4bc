//! PostgreSQL implementation of CustomerDirectory.
//!
//! Reads and writes the commerce store's `customer` table directly. The
//! billing customer id and the membership tier live in custom-field columns.

use crate::domain::foundation::{CustomerId, DomainError, ErrorCode};
use crate::domain::membership::MembershipTier;
use crate::ports::{CustomerDirectory, CustomerRecord};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

const SELECT_CUSTOMER: &str = r#"
    SELECT id, "emailAddress" AS email_address,
           "customFieldsStripeCustomerId" AS billing_customer_id,
           "customFieldsMembershipTier" AS membership_tier
    FROM customer
"#;

/// PostgreSQL implementation of the CustomerDirectory port.
///
/// Soft-deleted customers are invisible to every lookup.
pub struct PostgresCustomerDirectory {
    pool: PgPool,
}

impl PostgresCustomerDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where<T>(
        &self,
        predicate: &str,
        value: T,
        what: &str,
    ) -> Result<Option<CustomerRecord>, DomainError>
    where
        T: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
    {
        let sql = format!(
            "{} WHERE {} AND \"deletedAt\" IS NULL ORDER BY id LIMIT 1",
            SELECT_CUSTOMER, predicate
        );
        let row: Option<CustomerRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to find customer by {}: {}", what, e),
                )
            })?;

        row.map(CustomerRecord::try_from).transpose()
    }
}

/// Database row representation of a customer.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    email_address: String,
    billing_customer_id: Option<String>,
    membership_tier: Option<String>,
}

impl TryFrom<CustomerRow> for CustomerRecord {
    type Error = DomainError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(CustomerRecord {
            id: CustomerId::new(row.id.to_string()).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid customer id: {}", e))
            })?,
            email: row.email_address,
            billing_customer_id: row.billing_customer_id.filter(|id| !id.trim().is_empty()),
            tier: MembershipTier::from_field_value(row.membership_tier.as_deref()),
        })
    }
}

/// Customer ids are integer keys in the store. Anything else cannot match.
fn numeric_id(id: &CustomerId) -> Option<i32> {
    id.as_str().trim().parse().ok()
}

fn not_found(id: &CustomerId) -> DomainError {
    DomainError::new(ErrorCode::CustomerNotFound, "Customer not found")
        .with_detail("customer_id", id.as_str())
}

#[async_trait]
impl CustomerDirectory for PostgresCustomerDirectory {
    async fn find_by_external_id(
        &self,
        billing_customer_id: &str,
    ) -> Result<Option<CustomerRecord>, DomainError> {
        self.fetch_one_where(
            r#""customFieldsStripeCustomerId" = $1"#,
            billing_customer_id.to_string(),
            "billing customer id",
        )
        .await
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<CustomerRecord>, DomainError> {
        let Some(key) = numeric_id(id) else {
            return Ok(None);
        };
        self.fetch_one_where("id = $1", key, "id").await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<CustomerRecord>, DomainError> {
        self.fetch_one_where(
            r#"lower("emailAddress") = lower($1)"#,
            email.trim().to_string(),
            "email",
        )
        .await
    }

    async fn link_external_id(
        &self,
        id: &CustomerId,
        billing_customer_id: &str,
    ) -> Result<(), DomainError> {
        let key = numeric_id(id).ok_or_else(|| not_found(id))?;

        let result = sqlx::query(
            r#"
            UPDATE customer
            SET "customFieldsStripeCustomerId" = $2, "updatedAt" = NOW()
            WHERE id = $1 AND "deletedAt" IS NULL
            "#,
        )
        .bind(key)
        .bind(billing_customer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to link billing customer: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        Ok(())
    }

    async fn update_tier_field(
        &self,
        id: &CustomerId,
        tier: MembershipTier,
    ) -> Result<(), DomainError> {
        let key = numeric_id(id).ok_or_else(|| not_found(id))?;

        let result = sqlx::query(
            r#"
            UPDATE customer
            SET "customFieldsMembershipTier" = $2, "updatedAt" = NOW()
            WHERE id = $1 AND "deletedAt" IS NULL
            "#,
        )
        .bind(key)
        .bind(tier.field_value())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update membership tier: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        Ok(())
    }

    async fn tier_field(&self, id: &CustomerId) -> Result<Option<MembershipTier>, DomainError> {
        Ok(self.find_by_id(id).await?.map(|record| record.tier))
    }
}
