use sqlx::{Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use super::Database;
use crate::{
    errors::{ApiError, FieldError},
    models::Reference,
    query::Scope,
};

/// Entities other records point at by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Client,
    Distributor,
    Product,
}

impl ReferenceKind {
    pub fn table(&self) -> &'static str {
        match self {
            ReferenceKind::Client => "clients",
            ReferenceKind::Distributor => "distributors",
            ReferenceKind::Product => "products",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReferenceKind::Client => "Client",
            ReferenceKind::Distributor => "Distributor",
            ReferenceKind::Product => "Product",
        }
    }
}

impl Database {
    /// Loads `{id, name}` for every id that still exists.
    pub async fn resolve_references<I>(
        &self,
        kind: ReferenceKind,
        ids: I,
    ) -> Result<HashMap<Uuid, Reference>, ApiError>
    where
        I: IntoIterator<Item = Uuid>,
    {
        self.load_references(kind, ids, Scope::Global).await
    }

    async fn load_references<I>(
        &self,
        kind: ReferenceKind,
        ids: I,
        scope: Scope,
    ) -> Result<HashMap<Uuid, Reference>, ApiError>
    where
        I: IntoIterator<Item = Uuid>,
    {
        let mut ids: Vec<Uuid> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::<Postgres>::new("SELECT id, name FROM ");
        query.push(kind.table());
        query.push(" WHERE id = ANY(");
        query.push_bind(ids);
        query.push(")");
        if let Scope::Owner(user_id) = scope {
            query.push(" AND created_by = ");
            query.push_bind(user_id);
        }

        let rows = query
            .build_query_as::<Reference>()
            .fetch_all(&self.pool())
            .await?;
        Ok(rows.into_iter().map(|r| (r.id, r)).collect())
    }

    /// Rejects a write that points at records which do not exist or, under
    /// [`Scope::Owner`], belong to someone else. Each entry is
    /// `(kind, field, id)`; every missing id is reported against its field.
    pub async fn ensure_references(
        &self,
        scope: Scope,
        references: &[(ReferenceKind, String, Uuid)],
    ) -> Result<(), ApiError> {
        let mut errors = Vec::new();

        for kind in [ReferenceKind::Client, ReferenceKind::Distributor, ReferenceKind::Product] {
            let wanted: Vec<&(ReferenceKind, String, Uuid)> =
                references.iter().filter(|(k, _, _)| *k == kind).collect();
            if wanted.is_empty() {
                continue;
            }

            let found = self
                .load_references(kind, wanted.iter().map(|(_, _, id)| *id), scope)
                .await?;
            for (_, field, id) in wanted {
                if !found.contains_key(id) {
                    errors.push(FieldError::new(
                        field.clone(),
                        format!("{} {} does not exist", kind.label(), id),
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(errors))
        }
    }
}
