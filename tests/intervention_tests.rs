//! Integration tests for transactional intervention recording.

mod support;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use sea_orm::{EntityTrait, PaginatorTrait, Set, ActiveModelTrait};

use portal_maintenance::models::control::{ControlType, Entity as Control};
use portal_maintenance::models::intervention::Entity as Intervention;
use portal_maintenance::repositories::{
    InterventionError, InterventionRepository, NewIntervention, UserRepository,
};
use support::{seed_portal, seed_user, setup_db};

fn visit_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

#[tokio::test]
async fn record_persists_exactly_the_explicit_selections() {
    let db = setup_db().await;
    let repo = InterventionRepository::new(db.clone());
    let portal = seed_portal(&db, "P-0100").await;
    let user = seed_user(&db, "jo@example.com").await;

    // Two explicit answers, one explicit "not inspected", everything else
    // absent.
    let mut controls = BTreeMap::new();
    controls.insert("warning_lights".to_string(), Some(true));
    controls.insert("apron_condition".to_string(), Some(false));
    controls.insert("drive_system".to_string(), None);

    let id = repo
        .record(
            &user,
            NewIntervention {
                portal_id: portal.id,
                date: visit_date(),
                summary: Some("RAS".to_string()),
                controls,
            },
        )
        .await
        .unwrap();

    let (intervention, rows) = repo.find_with_controls(&id).await.unwrap().unwrap();
    assert_eq!(intervention.portal_id, portal.id);
    assert_eq!(intervention.user_id, user.id);
    assert_eq!(intervention.summary.as_deref(), Some("RAS"));

    assert_eq!(rows.len(), 2, "only explicit selections persist");
    let kinds: Vec<ControlType> = rows.iter().map(|c| c.kind).collect();
    assert!(kinds.contains(&ControlType::WarningLights));
    assert!(kinds.contains(&ControlType::ApronCondition));
    assert!(!kinds.contains(&ControlType::DriveSystem));

    let pass = rows
        .iter()
        .find(|c| c.kind == ControlType::WarningLights)
        .unwrap();
    assert_eq!(pass.result, Some(true));
    let fail = rows
        .iter()
        .find(|c| c.kind == ControlType::ApronCondition)
        .unwrap();
    assert_eq!(fail.result, Some(false));
}

#[tokio::test]
async fn record_with_unknown_control_type_rolls_back_entirely() {
    let db = setup_db().await;
    let repo = InterventionRepository::new(db.clone());
    let portal = seed_portal(&db, "P-0101").await;
    let user = seed_user(&db, "jo2@example.com").await;

    // BTreeMap iterates alphabetically, so the valid selection inserts its
    // control row before the unknown key aborts the transaction.
    let mut controls = BTreeMap::new();
    controls.insert("apron_condition".to_string(), Some(true));
    controls.insert("coffee_machine".to_string(), Some(false));

    let err = repo
        .record(
            &user,
            NewIntervention {
                portal_id: portal.id,
                date: visit_date(),
                summary: None,
                controls,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InterventionError::UnknownControlType(name) if name == "coffee_machine"));

    // Nothing is visible: neither the intervention nor the already-inserted
    // control survived the rollback.
    assert_eq!(Intervention::find().count(&*db).await.unwrap(), 0);
    assert_eq!(Control::find().count(&*db).await.unwrap(), 0);
}

#[tokio::test]
async fn record_requires_a_live_portal() {
    let db = setup_db().await;
    let repo = InterventionRepository::new(db.clone());
    let user = seed_user(&db, "jo3@example.com").await;

    let missing = uuid::Uuid::new_v4();
    let err = repo
        .record(
            &user,
            NewIntervention {
                portal_id: missing,
                date: visit_date(),
                summary: None,
                controls: BTreeMap::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InterventionError::PortalNotFound(id) if id == missing));
}

#[tokio::test]
async fn user_name_is_snapshotted_at_recording_time() {
    let db = setup_db().await;
    let repo = InterventionRepository::new(db.clone());
    let portal = seed_portal(&db, "P-0102").await;
    let user = seed_user(&db, "jo4@example.com").await;

    let id = repo
        .record(
            &user,
            NewIntervention {
                portal_id: portal.id,
                date: visit_date(),
                summary: None,
                controls: BTreeMap::new(),
            },
        )
        .await
        .unwrap();

    // The technician later changes name; the recorded intervention must not.
    let mut rename = portal_maintenance::models::user::ActiveModel::from(
        UserRepository::new(db.clone())
            .find_by_id(&user.id)
            .await
            .unwrap()
            .unwrap(),
    );
    rename.last_name = Set("Durand".to_string());
    rename.update(&*db).await.unwrap();

    let (intervention, _) = repo.find_with_controls(&id).await.unwrap().unwrap();
    assert_eq!(intervention.user_name, "Jo Martin");
}

#[tokio::test]
async fn list_for_portal_returns_most_recent_first_with_controls() {
    let db = setup_db().await;
    let repo = InterventionRepository::new(db.clone());
    let portal = seed_portal(&db, "P-0103").await;
    let user = seed_user(&db, "jo5@example.com").await;

    let mut first_controls = BTreeMap::new();
    first_controls.insert("warning_lights".to_string(), Some(true));
    repo.record(
        &user,
        NewIntervention {
            portal_id: portal.id,
            date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            summary: None,
            controls: first_controls,
        },
    )
    .await
    .unwrap();

    let newest = repo
        .record(
            &user,
            NewIntervention {
                portal_id: portal.id,
                date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                summary: None,
                controls: BTreeMap::new(),
            },
        )
        .await
        .unwrap();

    let listed = repo.list_for_portal(&portal.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].0.id, newest);
    assert_eq!(listed[1].1.len(), 1, "controls ride along");
}

#[tokio::test]
async fn soft_delete_hides_the_intervention_and_its_controls() {
    let db = setup_db().await;
    let repo = InterventionRepository::new(db.clone());
    let portal = seed_portal(&db, "P-0104").await;
    let user = seed_user(&db, "jo6@example.com").await;

    let mut controls = BTreeMap::new();
    controls.insert("control_panel".to_string(), Some(true));
    let id = repo
        .record(
            &user,
            NewIntervention {
                portal_id: portal.id,
                date: visit_date(),
                summary: None,
                controls,
            },
        )
        .await
        .unwrap();

    assert!(repo.soft_delete(&id).await.unwrap());
    assert!(repo.find_with_controls(&id).await.unwrap().is_none());
    assert!(repo.list_for_portal(&portal.id).await.unwrap().is_empty());

    // Second delete is a no-op.
    assert!(!repo.soft_delete(&id).await.unwrap());
}
