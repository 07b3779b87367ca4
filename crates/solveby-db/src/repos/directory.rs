//! Search, categories, skills and portfolio repository

use async_trait::async_trait;
use solveby_types::{like_pattern, SearchSort};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::on_unique;
use crate::{
    AgentSkillListing, CategoryCount, Database, DbAgent, DbPortfolioItem, DbResult, DbSkill,
    DirectoryStore, NewAgentSkill, NewPortfolioItem, RequestListing, SearchParams, ServiceListing,
};

/// Append `AND (a ILIKE p OR b ILIKE p ...)` for free-text search
fn push_text_filter(qb: &mut QueryBuilder<'_, Postgres>, columns: &[&str], text: &Option<String>) {
    let Some(text) = text.as_deref().filter(|t| !t.trim().is_empty()) else {
        return;
    };
    let pattern = like_pattern(text);

    qb.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
    }
    qb.push(")");
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, params: &SearchParams) {
    qb.push(" LIMIT ")
        .push_bind(params.page.limit)
        .push(" OFFSET ")
        .push_bind(params.page.offset);
}

#[async_trait]
impl DirectoryStore for Database {
    async fn search_services(&self, params: &SearchParams) -> DbResult<Vec<ServiceListing>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT s.*, a.name AS provider_name, a.karma AS provider_karma
            FROM services s
            JOIN agents a ON a.id = s.agent_id
            WHERE s.active AND s.deleted_at IS NULL
            "#,
        );

        push_text_filter(&mut qb, &["s.title", "s.description", "s.category"], &params.text);
        if let Some(category) = &params.category {
            qb.push(" AND s.category = ").push_bind(category.as_str().to_string());
        }
        if let Some(min) = params.min_price {
            qb.push(" AND s.price >= ").push_bind(min);
        }
        if let Some(max) = params.max_price {
            qb.push(" AND s.price <= ").push_bind(max);
        }
        if let Some(min) = params.min_rating {
            qb.push(" AND s.avg_rating >= ").push_bind(min);
        }

        qb.push(match params.sort {
            SearchSort::Relevance => " ORDER BY s.orders_count DESC, s.created_at DESC",
            SearchSort::Newest => " ORDER BY s.created_at DESC",
            SearchSort::PriceLow => " ORDER BY s.price ASC, s.created_at DESC",
            SearchSort::PriceHigh => " ORDER BY s.price DESC, s.created_at DESC",
            SearchSort::Rating => " ORDER BY s.avg_rating DESC NULLS LAST, s.orders_count DESC",
        });
        push_page(&mut qb, params);

        let services = qb.build_query_as::<ServiceListing>().fetch_all(&self.pg).await?;
        Ok(services)
    }

    async fn search_requests(&self, params: &SearchParams) -> DbResult<Vec<RequestListing>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT r.*, a.name AS requester_name,
                (SELECT COUNT(*) FROM proposals p WHERE p.request_id = r.id) AS proposals_count
            FROM requests r
            JOIN agents a ON a.id = r.agent_id
            WHERE r.status = 'open'
            "#,
        );

        push_text_filter(&mut qb, &["r.title", "r.description", "r.category"], &params.text);
        if let Some(category) = &params.category {
            qb.push(" AND r.category = ").push_bind(category.as_str().to_string());
        }
        if let Some(min) = params.min_price {
            qb.push(" AND r.budget >= ").push_bind(min);
        }
        if let Some(max) = params.max_price {
            qb.push(" AND r.budget <= ").push_bind(max);
        }

        qb.push(match params.sort {
            SearchSort::PriceLow => " ORDER BY r.budget ASC, r.created_at DESC",
            SearchSort::PriceHigh => " ORDER BY r.budget DESC, r.created_at DESC",
            SearchSort::Relevance | SearchSort::Newest | SearchSort::Rating => " ORDER BY r.created_at DESC",
        });
        push_page(&mut qb, params);

        let requests = qb.build_query_as::<RequestListing>().fetch_all(&self.pg).await?;
        Ok(requests)
    }

    async fn search_agents(&self, params: &SearchParams) -> DbResult<Vec<DbAgent>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM agents WHERE TRUE");

        push_text_filter(&mut qb, &["name", "description"], &params.text);

        qb.push(match params.sort {
            SearchSort::Newest => " ORDER BY created_at DESC",
            _ => " ORDER BY karma DESC, created_at ASC",
        });
        push_page(&mut qb, params);

        let agents = qb.build_query_as::<DbAgent>().fetch_all(&self.pg).await?;
        Ok(agents)
    }

    async fn list_categories(&self) -> DbResult<Vec<CategoryCount>> {
        let categories = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT category,
                SUM(services_count)::BIGINT AS services_count,
                SUM(requests_count)::BIGINT AS requests_count
            FROM (
                SELECT category, COUNT(*) AS services_count, 0::BIGINT AS requests_count
                FROM services WHERE active AND deleted_at IS NULL
                GROUP BY category
                UNION ALL
                SELECT category, 0::BIGINT, COUNT(*)
                FROM requests WHERE status = 'open'
                GROUP BY category
            ) c
            GROUP BY category
            ORDER BY SUM(services_count) + SUM(requests_count) DESC, category ASC
            "#,
        )
        .fetch_all(&self.pg)
        .await?;

        Ok(categories)
    }

    async fn list_skills(&self, category: Option<String>) -> DbResult<Vec<DbSkill>> {
        let skills = sqlx::query_as::<_, DbSkill>(
            "SELECT * FROM skills WHERE ($1::text IS NULL OR category = $1) ORDER BY name ASC",
        )
        .bind(category)
        .fetch_all(&self.pg)
        .await?;

        Ok(skills)
    }

    async fn find_skill(&self, id: Uuid) -> DbResult<Option<DbSkill>> {
        let skill = sqlx::query_as::<_, DbSkill>("SELECT * FROM skills WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pg)
            .await?;

        Ok(skill)
    }

    async fn list_agent_skills(&self, agent_id: Uuid) -> DbResult<Vec<AgentSkillListing>> {
        let skills = sqlx::query_as::<_, AgentSkillListing>(
            r#"
            SELECT s.id AS skill_id, s.name, s.category, a.proficiency_level, a.created_at
            FROM agent_skills a
            JOIN skills s ON s.id = a.skill_id
            WHERE a.agent_id = $1
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(agent_id)
        .fetch_all(&self.pg)
        .await?;

        Ok(skills)
    }

    async fn add_agent_skill(&self, new: NewAgentSkill) -> DbResult<AgentSkillListing> {
        let skill = sqlx::query_as::<_, AgentSkillListing>(
            r#"
            WITH inserted AS (
                INSERT INTO agent_skills (agent_id, skill_id, proficiency_level)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT s.id AS skill_id, s.name, s.category, i.proficiency_level, i.created_at
            FROM inserted i
            JOIN skills s ON s.id = i.skill_id
            "#,
        )
        .bind(new.agent_id)
        .bind(new.skill_id)
        .bind(new.proficiency_level.as_str())
        .fetch_one(&self.pg)
        .await
        .map_err(on_unique("agent_skills_pkey", "You already have this skill"))?;

        Ok(skill)
    }

    async fn remove_agent_skill(&self, agent_id: Uuid, skill_id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM agent_skills WHERE agent_id = $1 AND skill_id = $2")
            .bind(agent_id)
            .bind(skill_id)
            .execute(&self.pg)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_portfolio(&self, agent_id: Uuid, limit: i64) -> DbResult<Vec<DbPortfolioItem>> {
        let items = sqlx::query_as::<_, DbPortfolioItem>(
            r#"
            SELECT * FROM portfolio_items
            WHERE agent_id = $1 AND is_public
            ORDER BY is_featured DESC, created_at DESC
            LIMIT $2
            "#,
        )
        .bind(agent_id)
        .bind(limit)
        .fetch_all(&self.pg)
        .await?;

        Ok(items)
    }

    async fn create_portfolio_item(&self, new: NewPortfolioItem) -> DbResult<DbPortfolioItem> {
        let item = sqlx::query_as::<_, DbPortfolioItem>(
            r#"
            INSERT INTO portfolio_items
                (agent_id, title, description, category, images, files, skills_used,
                 project_date, is_featured, is_public)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(new.agent_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.category)
        .bind(&new.images)
        .bind(&new.files)
        .bind(&new.skills_used)
        .bind(new.project_date)
        .bind(new.is_featured)
        .bind(new.is_public)
        .fetch_one(&self.pg)
        .await?;

        Ok(item)
    }
}
