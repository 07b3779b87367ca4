//! Service, package, add-on and request repository

use async_trait::async_trait;
use solveby_types::Category;
use tracing::info;
use uuid::Uuid;

use crate::error::on_unique;
use crate::{
    Database, DbAddon, DbError, DbPackage, DbRequest, DbResult, DbService, ListingStore, NewAddon,
    NewPackage, NewRequest, NewService, RequestFilter, RequestListing, ServiceFilter,
    ServiceListing, ServiceUpdate,
};

fn category_str(category: &Option<Category>) -> Option<&str> {
    category.as_ref().map(|c| c.as_str())
}

#[async_trait]
impl ListingStore for Database {
    async fn create_service(&self, new: NewService) -> DbResult<DbService> {
        let service = sqlx::query_as::<_, DbService>(
            r#"
            INSERT INTO services (agent_id, title, description, category, price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new.agent_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.category.as_str())
        .bind(new.price)
        .fetch_one(&self.pg)
        .await?;

        info!(service_id = %service.id, agent_id = %service.agent_id, "Service created");
        Ok(service)
    }

    async fn find_service(&self, id: Uuid) -> DbResult<Option<DbService>> {
        let service = sqlx::query_as::<_, DbService>(
            "SELECT * FROM services WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pg)
        .await?;

        Ok(service)
    }

    async fn list_services(&self, filter: ServiceFilter) -> DbResult<Vec<ServiceListing>> {
        let services = sqlx::query_as::<_, ServiceListing>(
            r#"
            SELECT s.*, a.name AS provider_name, a.karma AS provider_karma
            FROM services s
            JOIN agents a ON a.id = s.agent_id
            WHERE s.active AND s.deleted_at IS NULL
              AND ($1::text IS NULL OR s.category = $1)
              AND ($2::uuid IS NULL OR s.agent_id = $2)
            ORDER BY s.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(category_str(&filter.category))
        .bind(filter.agent_id)
        .bind(filter.page.limit)
        .bind(filter.page.offset)
        .fetch_all(&self.pg)
        .await?;

        Ok(services)
    }

    async fn update_service(&self, id: Uuid, update: ServiceUpdate) -> DbResult<DbService> {
        let service = sqlx::query_as::<_, DbService>(
            r#"
            UPDATE services SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                price = COALESCE($5, price),
                active = COALESCE($6, active),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.description)
        .bind(category_str(&update.category))
        .bind(update.price)
        .bind(update.active)
        .fetch_optional(&self.pg)
        .await?
        .ok_or_else(|| DbError::NotFound("Service not found".to_string()))?;

        Ok(service)
    }

    async fn delete_service(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE services
            SET deleted_at = NOW(), active = FALSE, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pg)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound("Service not found".to_string()));
        }

        info!(service_id = %id, "Service deleted");
        Ok(())
    }

    async fn list_packages(&self, service_id: Uuid) -> DbResult<Vec<DbPackage>> {
        let packages = sqlx::query_as::<_, DbPackage>(
            "SELECT * FROM service_packages WHERE service_id = $1 ORDER BY price ASC",
        )
        .bind(service_id)
        .fetch_all(&self.pg)
        .await?;

        Ok(packages)
    }

    async fn create_package(&self, new: NewPackage) -> DbResult<DbPackage> {
        let package = sqlx::query_as::<_, DbPackage>(
            r#"
            INSERT INTO service_packages
                (service_id, tier, name, description, price, delivery_days, revisions, features)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.service_id)
        .bind(new.tier.as_str())
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.delivery_days)
        .bind(new.revisions)
        .bind(&new.features)
        .fetch_one(&self.pg)
        .await
        .map_err(on_unique(
            "service_packages_service_tier_key",
            "A package for this tier already exists",
        ))?;

        Ok(package)
    }

    async fn find_package(&self, id: Uuid) -> DbResult<Option<DbPackage>> {
        let package = sqlx::query_as::<_, DbPackage>("SELECT * FROM service_packages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pg)
            .await?;

        Ok(package)
    }

    async fn list_addons(&self, service_id: Uuid) -> DbResult<Vec<DbAddon>> {
        let addons = sqlx::query_as::<_, DbAddon>(
            r#"
            SELECT * FROM service_addons
            WHERE service_id = $1 AND is_active
            ORDER BY price ASC
            "#,
        )
        .bind(service_id)
        .fetch_all(&self.pg)
        .await?;

        Ok(addons)
    }

    async fn create_addon(&self, new: NewAddon) -> DbResult<DbAddon> {
        let addon = sqlx::query_as::<_, DbAddon>(
            r#"
            INSERT INTO service_addons (service_id, name, description, price, delivery_days_extra)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new.service_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.delivery_days_extra)
        .fetch_one(&self.pg)
        .await?;

        Ok(addon)
    }

    async fn find_addons(&self, service_id: Uuid, ids: &[Uuid]) -> DbResult<Vec<DbAddon>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let addons = sqlx::query_as::<_, DbAddon>(
            r#"
            SELECT * FROM service_addons
            WHERE service_id = $1 AND id = ANY($2) AND is_active
            ORDER BY price ASC
            "#,
        )
        .bind(service_id)
        .bind(ids)
        .fetch_all(&self.pg)
        .await?;

        Ok(addons)
    }

    async fn create_request(&self, new: NewRequest) -> DbResult<DbRequest> {
        let request = sqlx::query_as::<_, DbRequest>(
            r#"
            INSERT INTO requests (agent_id, title, description, category, budget, urgency)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.agent_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.category.as_str())
        .bind(new.budget)
        .bind(new.urgency.as_str())
        .fetch_one(&self.pg)
        .await?;

        info!(request_id = %request.id, agent_id = %request.agent_id, "Request posted");
        Ok(request)
    }

    async fn find_request(&self, id: Uuid) -> DbResult<Option<DbRequest>> {
        let request = sqlx::query_as::<_, DbRequest>("SELECT * FROM requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pg)
            .await?;

        Ok(request)
    }

    async fn list_requests(&self, filter: RequestFilter) -> DbResult<Vec<RequestListing>> {
        let requests = sqlx::query_as::<_, RequestListing>(
            r#"
            SELECT r.*, a.name AS requester_name,
                (SELECT COUNT(*) FROM proposals p WHERE p.request_id = r.id) AS proposals_count
            FROM requests r
            JOIN agents a ON a.id = r.agent_id
            WHERE r.status = $1
              AND ($2::text IS NULL OR r.category = $2)
              AND ($3::text IS NULL OR r.urgency = $3)
            ORDER BY r.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.status.as_str())
        .bind(category_str(&filter.category))
        .bind(filter.urgency.map(|u| u.as_str()))
        .bind(filter.page.limit)
        .bind(filter.page.offset)
        .fetch_all(&self.pg)
        .await?;

        Ok(requests)
    }

    async fn cancel_request(&self, id: Uuid) -> DbResult<DbRequest> {
        let cancelled = sqlx::query_as::<_, DbRequest>(
            r#"
            UPDATE requests SET status = 'cancelled', updated_at = NOW()
            WHERE id = $1 AND status = 'open'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pg)
        .await?;

        match cancelled {
            Some(request) => {
                info!(request_id = %id, "Request cancelled");
                Ok(request)
            }
            None => match self.find_request(id).await? {
                Some(_) => Err(DbError::InvalidState(
                    "Only open requests can be cancelled".to_string(),
                )),
                None => Err(DbError::NotFound("Request not found".to_string())),
            },
        }
    }
}
