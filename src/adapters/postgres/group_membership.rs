//! PostgreSQL implementation of GroupMembership over the store's
//! customer-group join table.

use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, GroupId};
use crate::ports::{GroupMembership, RemovalOutcome};
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresGroupMembership {
    pool: PgPool,
}

impl PostgresGroupMembership {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_key(field: &str, value: &str) -> Result<i32, DomainError> {
    value.trim().parse().map_err(|_| {
        DomainError::validation(field, format!("{} must be an integer id", field))
            .with_detail("value", value)
    })
}

#[async_trait]
impl GroupMembership for PostgresGroupMembership {
    async fn add_member(&self, group: &GroupId, customer: &CustomerId) -> Result<(), DomainError> {
        let group_key = parse_key("group_id", group.as_str())?;
        let customer_key = parse_key("customer_id", customer.as_str())?;

        sqlx::query(
            r#"
            INSERT INTO customer_groups_customer_group ("customerId", "customerGroupId")
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(customer_key)
        .bind(group_key)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let message = format!("Failed to add customer to group: {}", e);
            match &e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    DomainError::new(ErrorCode::GroupNotFound, message)
                        .with_detail("group_id", group.as_str())
                }
                _ => DomainError::new(ErrorCode::DatabaseError, message),
            }
        })?;

        Ok(())
    }

    async fn remove_member(
        &self,
        group: &GroupId,
        customer: &CustomerId,
    ) -> Result<RemovalOutcome, DomainError> {
        let group_key = parse_key("group_id", group.as_str())?;
        let customer_key = parse_key("customer_id", customer.as_str())?;

        let result = sqlx::query(
            r#"
            DELETE FROM customer_groups_customer_group
            WHERE "customerId" = $1 AND "customerGroupId" = $2
            "#,
        )
        .bind(customer_key)
        .bind(group_key)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to remove customer from group: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            Ok(RemovalOutcome::NotAMember)
        } else {
            Ok(RemovalOutcome::Removed)
        }
    }

    async fn groups_of(&self, customer: &CustomerId) -> Result<Vec<GroupId>, DomainError> {
        let customer_key = parse_key("customer_id", customer.as_str())?;

        let rows: Vec<(i32,)> = sqlx::query_as(
            r#"
            SELECT "customerGroupId"
            FROM customer_groups_customer_group
            WHERE "customerId" = $1
            ORDER BY "customerGroupId"
            "#,
        )
        .bind(customer_key)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to list customer groups: {}", e),
            )
        })?;

        rows.into_iter()
            .map(|(id,)| {
                GroupId::new(id.to_string()).map_err(|e| {
                    DomainError::new(ErrorCode::DatabaseError, format!("Invalid group id: {}", e))
                })
            })
            .collect()
    }
}
