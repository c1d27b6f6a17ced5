//! QR code repository: the association state machine.
//!
//! A sticker moves `available → associated → available` (unassociate) or is
//! retired (`lost`, `damaged`). Two mechanisms keep the one-code-per-portal
//! invariant under concurrent writers:
//!
//! 1. the status transition is a single conditional `UPDATE ... WHERE
//!    status = 'available'` inside the transaction, so a code can only be
//!    claimed once;
//! 2. the partial unique index on `(portal_id) WHERE status = 'associated'`
//!    rejects a second association racing past the existence check, which
//!    surfaces as a unique violation (mapped to 409 upstream).

use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, conflict, not_found};
use crate::models::portal::{self, Entity as Portal};
use crate::models::qr_code::{self, Entity as QrCode, QrCodeStatus};

/// Errors from association state transitions.
#[derive(Debug, thiserror::Error)]
pub enum AssociationError {
    #[error("Portal {0} not found")]
    PortalNotFound(Uuid),
    #[error("QR code {0} not found")]
    QrCodeNotFound(Uuid),
    #[error("QR code {id} is not available (status: {})", .status.as_str())]
    QrCodeNotAvailable { id: Uuid, status: QrCodeStatus },
    #[error("Portal {0} already has an associated QR code")]
    AlreadyAssociated(Uuid),
    #[error("No QR code is associated with portal {0}")]
    NoAssociatedCode(Uuid),
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl From<AssociationError> for ApiError {
    fn from(error: AssociationError) -> Self {
        match error {
            AssociationError::Db(db_err) => db_err.into(),
            AssociationError::AlreadyAssociated(_) => conflict(&error.to_string()),
            AssociationError::PortalNotFound(_)
            | AssociationError::QrCodeNotFound(_)
            | AssociationError::QrCodeNotAvailable { .. }
            | AssociationError::NoAssociatedCode(_) => not_found(&error.to_string()),
        }
    }
}

/// Repository for QR code database operations
#[derive(Debug, Clone)]
pub struct QrCodeRepository {
    pub db: Arc<DatabaseConnection>,
}

impl QrCodeRepository {
    /// Creates a new QrCodeRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a live QR code by its sticker UUID.
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<qr_code::Model>, DbErr> {
        QrCode::find_by_id(*id)
            .filter(qr_code::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await
    }

    /// Associates an available QR code with a portal that has none.
    ///
    /// Preconditions are checked inside one transaction and the transition
    /// itself is a conditional update, so losing a race never produces a
    /// second associated code.
    pub async fn associate(
        &self,
        portal_id: &Uuid,
        qr_code_id: &Uuid,
    ) -> Result<qr_code::Model, AssociationError> {
        let txn = self.db.begin().await?;

        Portal::find_by_id(*portal_id)
            .filter(portal::Column::DeletedAt.is_null())
            .one(&txn)
            .await?
            .ok_or(AssociationError::PortalNotFound(*portal_id))?;

        let already = QrCode::find()
            .filter(qr_code::Column::PortalId.eq(*portal_id))
            .filter(qr_code::Column::Status.eq(QrCodeStatus::Associated))
            .filter(qr_code::Column::DeletedAt.is_null())
            .count(&txn)
            .await?;
        if already > 0 {
            return Err(AssociationError::AlreadyAssociated(*portal_id));
        }

        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        let claimed = QrCode::update_many()
            .col_expr(qr_code::Column::PortalId, Expr::value(Some(*portal_id)))
            .col_expr(
                qr_code::Column::Status,
                Expr::value(QrCodeStatus::Associated),
            )
            .col_expr(qr_code::Column::AssociatedAt, Expr::value(Some(now)))
            .col_expr(qr_code::Column::UpdatedAt, Expr::value(now))
            .filter(qr_code::Column::Id.eq(*qr_code_id))
            .filter(qr_code::Column::Status.eq(QrCodeStatus::Available))
            .filter(qr_code::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        if claimed.rows_affected == 0 {
            // Name the actual reason: absent vs. wrong status.
            let current = QrCode::find_by_id(*qr_code_id)
                .filter(qr_code::Column::DeletedAt.is_null())
                .one(&txn)
                .await?;
            return Err(match current {
                None => AssociationError::QrCodeNotFound(*qr_code_id),
                Some(code) => AssociationError::QrCodeNotAvailable {
                    id: *qr_code_id,
                    status: code.status,
                },
            });
        }

        let updated = QrCode::find_by_id(*qr_code_id)
            .one(&txn)
            .await?
            .ok_or(AssociationError::QrCodeNotFound(*qr_code_id))?;

        txn.commit().await?;

        tracing::info!(portal_id = %portal_id, qr_code_id = %qr_code_id, "QR code associated");
        Ok(updated)
    }

    /// Removes the portal's associated code and makes it reusable
    /// (`available`).
    pub async fn unassociate(&self, portal_id: &Uuid) -> Result<qr_code::Model, AssociationError> {
        let released = self
            .release(portal_id, QrCodeStatus::Available)
            .await?;
        tracing::info!(portal_id = %portal_id, qr_code_id = %released.id, "QR code unassociated");
        Ok(released)
    }

    /// Removes the portal's associated code and retires it (`lost`).
    pub async fn mark_lost(&self, portal_id: &Uuid) -> Result<qr_code::Model, AssociationError> {
        let released = self.release(portal_id, QrCodeStatus::Lost).await?;
        tracing::info!(portal_id = %portal_id, qr_code_id = %released.id, "QR code marked lost");
        Ok(released)
    }

    /// Shared removal path: detach the associated code and leave it in
    /// `target` status with portal reference and association time cleared.
    async fn release(
        &self,
        portal_id: &Uuid,
        target: QrCodeStatus,
    ) -> Result<qr_code::Model, AssociationError> {
        let txn = self.db.begin().await?;

        let code = QrCode::find()
            .filter(qr_code::Column::PortalId.eq(*portal_id))
            .filter(qr_code::Column::Status.eq(QrCodeStatus::Associated))
            .filter(qr_code::Column::DeletedAt.is_null())
            .one(&txn)
            .await?
            .ok_or(AssociationError::NoAssociatedCode(*portal_id))?;

        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        let released = QrCode::update_many()
            .col_expr(
                qr_code::Column::PortalId,
                Expr::value(Option::<Uuid>::None),
            )
            .col_expr(qr_code::Column::Status, Expr::value(target))
            .col_expr(
                qr_code::Column::AssociatedAt,
                Expr::value(Option::<chrono::DateTime<chrono::FixedOffset>>::None),
            )
            .col_expr(qr_code::Column::UpdatedAt, Expr::value(now))
            .filter(qr_code::Column::Id.eq(code.id))
            .filter(qr_code::Column::Status.eq(QrCodeStatus::Associated))
            .exec(&txn)
            .await?;

        if released.rows_affected == 0 {
            // Another request detached the code between the read and here.
            return Err(AssociationError::NoAssociatedCode(*portal_id));
        }

        let updated = QrCode::find_by_id(code.id)
            .one(&txn)
            .await?
            .ok_or(AssociationError::QrCodeNotFound(code.id))?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Administrative override retiring an available sticker as physically
    /// unusable.
    pub async fn mark_damaged(&self, qr_code_id: &Uuid) -> Result<qr_code::Model, AssociationError> {
        let txn = self.db.begin().await?;

        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        let claimed = QrCode::update_many()
            .col_expr(qr_code::Column::Status, Expr::value(QrCodeStatus::Damaged))
            .col_expr(qr_code::Column::UpdatedAt, Expr::value(now))
            .filter(qr_code::Column::Id.eq(*qr_code_id))
            .filter(qr_code::Column::Status.eq(QrCodeStatus::Available))
            .filter(qr_code::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;

        if claimed.rows_affected == 0 {
            let current = QrCode::find_by_id(*qr_code_id)
                .filter(qr_code::Column::DeletedAt.is_null())
                .one(&txn)
                .await?;
            return Err(match current {
                None => AssociationError::QrCodeNotFound(*qr_code_id),
                Some(code) => AssociationError::QrCodeNotAvailable {
                    id: *qr_code_id,
                    status: code.status,
                },
            });
        }

        let updated = QrCode::find_by_id(*qr_code_id)
            .one(&txn)
            .await?
            .ok_or(AssociationError::QrCodeNotFound(*qr_code_id))?;

        txn.commit().await?;

        tracing::info!(qr_code_id = %qr_code_id, "QR code marked damaged");
        Ok(updated)
    }

    /// Resolves a scanned sticker to the portal it is associated with.
    ///
    /// Pure read: a sticker that exists but is not currently associated is
    /// indistinguishable from an unknown one to the caller.
    pub async fn resolve_portal(&self, qr_code_id: &Uuid) -> Result<Uuid, AssociationError> {
        let code = QrCode::find_by_id(*qr_code_id)
            .filter(qr_code::Column::Status.eq(QrCodeStatus::Associated))
            .filter(qr_code::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or(AssociationError::QrCodeNotFound(*qr_code_id))?;

        code.portal_id
            .ok_or(AssociationError::QrCodeNotFound(*qr_code_id))
    }

    /// Creates a print batch of fresh `available` codes, returning their
    /// sticker UUIDs in insertion order.
    pub async fn generate_batch(&self, count: usize) -> Result<Vec<Uuid>, DbErr> {
        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        let ids: Vec<Uuid> = (0..count).map(|_| Uuid::new_v4()).collect();

        let rows = ids.iter().map(|id| qr_code::ActiveModel {
            id: Set(*id),
            portal_id: Set(None),
            status: Set(QrCodeStatus::Available),
            associated_at: Set(None),
            generated_at: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        });

        QrCode::insert_many(rows).exec(&*self.db).await?;
        Ok(ids)
    }

    /// Lists live codes in a given status, newest batch first.
    pub async fn list_by_status(
        &self,
        status: QrCodeStatus,
    ) -> Result<Vec<qr_code::Model>, DbErr> {
        QrCode::find()
            .filter(qr_code::Column::Status.eq(status))
            .filter(qr_code::Column::DeletedAt.is_null())
            .order_by_desc(qr_code::Column::GeneratedAt)
            .order_by_asc(qr_code::Column::Id)
            .all(&*self.db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn not_available_error_names_the_actual_status() {
        let id = Uuid::new_v4();
        let error = AssociationError::QrCodeNotAvailable {
            id,
            status: QrCodeStatus::Damaged,
        };
        assert!(error.to_string().contains("damaged"));

        let api: ApiError = error.into();
        assert_eq!(api.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflict_error_maps_to_409() {
        let api: ApiError = AssociationError::AlreadyAssociated(Uuid::new_v4()).into();
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.code, Box::from("CONFLICT"));
    }

    #[test]
    fn missing_entities_map_to_404() {
        for error in [
            AssociationError::PortalNotFound(Uuid::new_v4()),
            AssociationError::QrCodeNotFound(Uuid::new_v4()),
            AssociationError::NoAssociatedCode(Uuid::new_v4()),
        ] {
            let api: ApiError = error.into();
            assert_eq!(api.status, StatusCode::NOT_FOUND);
        }
    }
}
