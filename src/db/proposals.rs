use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;

use super::{populate::ReferenceKind, resource::UpdateBuilder, sales::line_references, Database};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    models::{
        check_total, generate_proposal_number, items_total, CreateProposal, Proposal, UpdateProposal,
    },
    query::{Filter, FilterConfig, Scope},
    resource::Resource,
    validation::FieldErrors,
};

const PROPOSAL_COLUMNS: &str = "id, proposal_number, title, client_id, distributor_id, items, discount, \
                                total, status, valid_until, notes, is_active, created_by, created_at, updated_at";

/// Attempts at drawing an unused proposal number.
const NUMBER_ATTEMPTS: usize = 3;

#[async_trait]
impl Resource for Proposal {
    type Create = CreateProposal;
    type Update = UpdateProposal;

    const NAME: &'static str = "Proposal";
    const TABLE: &'static str = "proposals";
    const COLUMNS: &'static str = PROPOSAL_COLUMNS;
    const FILTERS: FilterConfig = FilterConfig {
        search: &["title", "proposal_number", "notes"],
        exact: &[
            ("status", "status"),
            ("proposalNumber", "proposal_number"),
        ],
        references: &[("clientId", "client_id"), ("distributorId", "distributor_id")],
        flags: &[("isActive", "is_active")],
        date_column: Some("created_at"),
        owner_column: Some("created_by"),
        sortable: &[
            ("title", "title"),
            ("total", "total"),
            ("status", "status"),
            ("validUntil", "valid_until"),
            ("createdAt", "created_at"),
        ],
        default_sort: "created_at",
    };

    async fn insert(db: &Database, owner: &AuthUser, input: CreateProposal) -> Result<Self, ApiError> {
        let references = line_references(
            Some(input.client_id),
            input.distributor_id,
            Some(&input.items),
        );
        db.ensure_references(Scope::for_user(owner), &references).await?;

        let total = items_total(&input.items, input.discount);
        let sql = format!(
            "INSERT INTO proposals (proposal_number, title, client_id, distributor_id, items, discount, total, \
             status, valid_until, notes, is_active, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {}",
            PROPOSAL_COLUMNS
        );

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = sqlx::query_as::<_, Proposal>(&sql)
                .bind(generate_proposal_number(Utc::now()))
                .bind(input.title.trim())
                .bind(input.client_id)
                .bind(input.distributor_id)
                .bind(Json(&input.items))
                .bind(input.discount)
                .bind(total)
                .bind(input.status.to_string())
                .bind(input.valid_until)
                .bind(input.notes.as_deref())
                .bind(input.is_active.unwrap_or(true))
                .bind(owner.id)
                .fetch_one(&db.pool())
                .await;

            match result.map_err(ApiError::from) {
                Ok(proposal) => return Ok(proposal),
                Err(ApiError::DuplicateKey { .. }) if attempt < NUMBER_ATTEMPTS => {
                    tracing::warn!("Proposal number collision, retrying (attempt {})", attempt);
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn update(db: &Database, filter: &Filter, patch: UpdateProposal) -> Result<Option<Self>, ApiError> {
        let Some(existing) = db.find_record::<Proposal>(filter).await? else {
            return Ok(None);
        };

        let references = line_references(
            patch.client_id,
            patch.distributor_id,
            patch.items.as_deref(),
        );
        db.ensure_references(filter.owner_scope(), &references).await?;

        let total = if patch.items.is_some() || patch.discount.is_some() {
            let items = patch.items.as_deref().unwrap_or(&existing.items.0);
            let mut errors = FieldErrors::new();
            let total = check_total(
                &mut errors,
                items,
                patch.discount.unwrap_or(existing.discount),
            );
            errors.finish()?;
            Some(total)
        } else {
            None
        };

        let mut update = UpdateBuilder::new(Self::TABLE);
        update
            .set("title", patch.title.map(|t| t.trim().to_string()))
            .set("client_id", patch.client_id)
            .set("distributor_id", patch.distributor_id)
            .set("items", patch.items.map(Json))
            .set("discount", patch.discount)
            .set("total", total)
            .set("status", patch.status.map(|s| s.to_string()))
            .set("valid_until", patch.valid_until)
            .set("notes", patch.notes)
            .set("is_active", patch.is_active);
        update
            .fetch(db, &Filter::by_id(existing.id, &Self::FILTERS, Scope::Global))
            .await
    }

    async fn populate(db: &Database, records: &mut [Self]) -> Result<(), ApiError> {
        let clients = db
            .resolve_references(ReferenceKind::Client, records.iter().map(|p| p.client_id))
            .await?;
        let distributors = db
            .resolve_references(
                ReferenceKind::Distributor,
                records.iter().filter_map(|p| p.distributor_id),
            )
            .await?;

        for proposal in records.iter_mut() {
            proposal.client = clients.get(&proposal.client_id).cloned();
            proposal.distributor = proposal
                .distributor_id
                .and_then(|id| distributors.get(&id).cloned());
        }
        Ok(())
    }
}
