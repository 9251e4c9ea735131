use sqlx::{Postgres, QueryBuilder, Row};

use super::Database;
use crate::{
    errors::ApiError,
    models::{
        Client, DashboardStats, Distributor, PriceListItem, Product, Proposal, ProposalStatus,
        ProposalStatusCounts, Sale, SaleStatus,
    },
    query::{Filter, Scope},
    resource::Resource,
};

fn scoped<R: Resource>(scope: Scope) -> Filter {
    Filter::scoped(&R::FILTERS, scope)
}

impl Database {
    pub async fn dashboard_stats(&self, scope: Scope) -> Result<DashboardStats, ApiError> {
        let clients = self.count_records::<Client>(&scoped::<Client>(scope)).await?;
        let products = self.count_records::<Product>(&scoped::<Product>(scope)).await?;
        let distributors = self
            .count_records::<Distributor>(&scoped::<Distributor>(scope))
            .await?;
        let sales = self.count_records::<Sale>(&scoped::<Sale>(scope)).await?;
        let proposals = self.count_records::<Proposal>(&scoped::<Proposal>(scope)).await?;
        let price_list_items = self
            .count_records::<PriceListItem>(&scoped::<PriceListItem>(scope))
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT COALESCE(SUM(total), 0)::float8 FROM sales WHERE status <> ",
        );
        query.push_bind(SaleStatus::Cancelled.to_string());
        if let Scope::Owner(user_id) = scope {
            query.push(" AND created_by = ");
            query.push_bind(user_id);
        }
        let sales_total: f64 = query.build_query_scalar().fetch_one(&self.pool()).await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT status, COUNT(*) AS count FROM proposals");
        scoped::<Proposal>(scope).push_where(&mut query);
        query.push(" GROUP BY status");
        let rows = query.build().fetch_all(&self.pool()).await?;

        let mut by_status = ProposalStatusCounts {
            draft: 0,
            sent: 0,
            accepted: 0,
            rejected: 0,
            expired: 0,
        };
        for row in rows {
            let count: i64 = row.try_get("count")?;
            match ProposalStatus::try_from(row.try_get::<String, _>("status")?) {
                Ok(ProposalStatus::Draft) => by_status.draft = count,
                Ok(ProposalStatus::Sent) => by_status.sent = count,
                Ok(ProposalStatus::Accepted) => by_status.accepted = count,
                Ok(ProposalStatus::Rejected) => by_status.rejected = count,
                Ok(ProposalStatus::Expired) => by_status.expired = count,
                Err(e) => tracing::warn!("Ignoring proposals with {}", e),
            }
        }

        Ok(DashboardStats {
            clients,
            products,
            distributors,
            sales,
            proposals,
            price_list_items,
            sales_total,
            proposals_by_status: by_status,
        })
    }
}
