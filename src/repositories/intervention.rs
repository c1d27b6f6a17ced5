//! Intervention repository: transactional visit recording.
//!
//! An intervention and its control rows are written in one transaction;
//! either every row lands or none does. Only checklist items the technician
//! explicitly answered produce a row.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, not_found, validation_error};
use crate::models::control::{self, ControlType, Entity as Control};
use crate::models::intervention::{self, Entity as Intervention};
use crate::models::portal::{self, Entity as Portal};
use crate::models::user;

/// Errors from intervention recording and reads.
#[derive(Debug, thiserror::Error)]
pub enum InterventionError {
    #[error("Portal {0} not found")]
    PortalNotFound(Uuid),
    #[error("Unknown control type: {0}")]
    UnknownControlType(String),
    #[error("Intervention {0} not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl From<InterventionError> for ApiError {
    fn from(error: InterventionError) -> Self {
        match error {
            InterventionError::Db(db_err) => db_err.into(),
            InterventionError::UnknownControlType(ref name) => validation_error(
                &error.to_string(),
                serde_json::json!({ "control_type": name }),
            ),
            InterventionError::PortalNotFound(_) | InterventionError::NotFound(_) => {
                not_found(&error.to_string())
            }
        }
    }
}

/// Input for recording one maintenance visit.
///
/// `controls` maps control-type names to the technician's explicit
/// selections; `None` values and absent keys both mean "not inspected" and
/// produce no row.
#[derive(Debug, Clone)]
pub struct NewIntervention {
    pub portal_id: Uuid,
    pub date: chrono::NaiveDate,
    pub summary: Option<String>,
    pub controls: BTreeMap<String, Option<bool>>,
}

/// Repository for intervention database operations
#[derive(Debug, Clone)]
pub struct InterventionRepository {
    pub db: Arc<DatabaseConnection>,
}

impl InterventionRepository {
    /// Creates a new InterventionRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records an intervention and its controls in one transaction.
    ///
    /// The technician's display name is snapshotted onto the row at this
    /// point and never updated afterwards. Returns the new intervention id.
    pub async fn record(
        &self,
        user: &user::Model,
        new: NewIntervention,
    ) -> Result<Uuid, InterventionError> {
        let txn = self.db.begin().await?;

        Portal::find_by_id(new.portal_id)
            .filter(portal::Column::DeletedAt.is_null())
            .one(&txn)
            .await?
            .ok_or(InterventionError::PortalNotFound(new.portal_id))?;

        let intervention_id = Uuid::new_v4();
        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();

        intervention::ActiveModel {
            id: Set(intervention_id),
            date: Set(new.date),
            summary: Set(new.summary.filter(|s| !s.is_empty())),
            user_id: Set(user.id),
            user_name: Set(user.full_name()),
            portal_id: Set(new.portal_id),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut recorded = 0usize;
        for (name, selection) in &new.controls {
            let kind = ControlType::parse(name)
                .ok_or_else(|| InterventionError::UnknownControlType(name.clone()))?;

            // Items left blank produce no row, not a null-result row.
            let Some(result) = selection else {
                continue;
            };

            control::ActiveModel {
                id: Set(Uuid::new_v4()),
                kind: Set(kind),
                result: Set(Some(*result)),
                intervention_id: Set(intervention_id),
                created_at: Set(now),
                updated_at: Set(now),
                deleted_at: Set(None),
            }
            .insert(&txn)
            .await?;
            recorded += 1;
        }

        txn.commit().await?;

        tracing::info!(
            intervention_id = %intervention_id,
            portal_id = %new.portal_id,
            user_id = %user.id,
            controls = recorded,
            "Intervention recorded"
        );
        Ok(intervention_id)
    }

    /// Loads a live intervention together with its controls.
    pub async fn find_with_controls(
        &self,
        id: &Uuid,
    ) -> Result<Option<(intervention::Model, Vec<control::Model>)>, DbErr> {
        let Some(intervention) = Intervention::find_by_id(*id)
            .filter(intervention::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
        else {
            return Ok(None);
        };

        let controls = Control::find()
            .filter(control::Column::InterventionId.eq(*id))
            .filter(control::Column::DeletedAt.is_null())
            .order_by_asc(control::Column::Kind)
            .all(&*self.db)
            .await?;

        Ok(Some((intervention, controls)))
    }

    /// Lists a portal's live interventions, most recent visit first, each
    /// with its controls.
    pub async fn list_for_portal(
        &self,
        portal_id: &Uuid,
    ) -> Result<Vec<(intervention::Model, Vec<control::Model>)>, DbErr> {
        Intervention::find()
            .filter(intervention::Column::PortalId.eq(*portal_id))
            .filter(intervention::Column::DeletedAt.is_null())
            .order_by_desc(intervention::Column::Date)
            .order_by_asc(intervention::Column::Id)
            .find_with_related(Control)
            .all(&*self.db)
            .await
    }

    /// Soft-deletes an intervention and its controls together.
    pub async fn soft_delete(&self, id: &Uuid) -> Result<bool, DbErr> {
        let txn = self.db.begin().await?;

        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        let marked = Intervention::update_many()
            .col_expr(intervention::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(intervention::Column::UpdatedAt, Expr::value(now))
            .filter(intervention::Column::Id.eq(*id))
            .filter(intervention::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        if marked.rows_affected == 0 {
            return Ok(false);
        }

        Control::update_many()
            .col_expr(control::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(control::Column::UpdatedAt, Expr::value(now))
            .filter(control::Column::InterventionId.eq(*id))
            .filter(control::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(true)
    }
}
