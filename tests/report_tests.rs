//! Integration tests for report generation and email delivery, with the
//! Gotenberg endpoint stubbed by wiremock and the mailer mocked.

mod support;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use portal_maintenance::mail::MockMailer;
use portal_maintenance::pdf::GotenbergClient;
use portal_maintenance::reports::{ReportError, ReportService};
use portal_maintenance::repositories::{
    InterventionRepository, NewIntervention, PortalRepository, UserRepository,
};
use support::{seed_portal, seed_user, setup_db};

async fn gotenberg_stub() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/forms/chromium/convert/html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.4 report".to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&server)
        .await;
    server
}

fn service(
    db: &Arc<sea_orm::DatabaseConnection>,
    gotenberg_url: String,
    mailer: Arc<MockMailer>,
) -> ReportService {
    ReportService::new(
        GotenbergClient::new(gotenberg_url),
        mailer,
        InterventionRepository::new(db.clone()),
        PortalRepository::new(db.clone()),
        UserRepository::new(db.clone()),
    )
}

#[tokio::test]
async fn send_report_emails_the_pdf_to_the_technician() {
    let db = setup_db().await;
    let portal = seed_portal(&db, "P-0200").await;
    let user = seed_user(&db, "tech@example.com").await;

    let mut controls = BTreeMap::new();
    controls.insert("warning_lights".to_string(), Some(true));
    controls.insert("drive_system".to_string(), Some(false));
    let intervention_id = InterventionRepository::new(db.clone())
        .record(
            &user,
            NewIntervention {
                portal_id: portal.id,
                date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
                summary: Some("Galet remplacé".to_string()),
                controls,
            },
        )
        .await
        .unwrap();

    let gotenberg = gotenberg_stub().await;
    let mailer = Arc::new(MockMailer::new());
    let reports = service(&db, gotenberg.uri(), mailer.clone());

    reports.send_report(&intervention_id).await.unwrap();

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["tech@example.com".to_string()]);
    assert!(sent[0].subject.contains(&portal.name));
    assert!(sent[0].body.contains("Galet remplacé"));

    assert_eq!(sent[0].attachments.len(), 1);
    let attachment = &sent[0].attachments[0];
    assert_eq!(attachment.content_type, "application/pdf");
    assert!(attachment.filename.ends_with(".pdf"));
    assert!(attachment.content.starts_with(b"%PDF"));
}

#[tokio::test]
async fn generate_pdf_returns_converted_bytes() {
    let db = setup_db().await;
    let portal = seed_portal(&db, "P-0201").await;
    let user = seed_user(&db, "tech2@example.com").await;

    let intervention_id = InterventionRepository::new(db.clone())
        .record(
            &user,
            NewIntervention {
                portal_id: portal.id,
                date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
                summary: None,
                controls: BTreeMap::new(),
            },
        )
        .await
        .unwrap();

    let gotenberg = gotenberg_stub().await;
    let mailer = Arc::new(MockMailer::new());
    let reports = service(&db, gotenberg.uri(), mailer);

    let pdf = reports.generate_pdf(&intervention_id).await.unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[tokio::test]
async fn send_report_fails_without_sending_when_conversion_fails() {
    let db = setup_db().await;
    let portal = seed_portal(&db, "P-0202").await;
    let user = seed_user(&db, "tech3@example.com").await;

    let intervention_id = InterventionRepository::new(db.clone())
        .record(
            &user,
            NewIntervention {
                portal_id: portal.id,
                date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
                summary: None,
                controls: BTreeMap::new(),
            },
        )
        .await
        .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/forms/chromium/convert/html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mailer = Arc::new(MockMailer::new());
    let reports = service(&db, server.uri(), mailer.clone());

    let err = reports.send_report(&intervention_id).await.unwrap_err();
    assert!(matches!(err, ReportError::Pdf(_)));
    assert!(mailer.sent().is_empty(), "no email without a PDF");
}

#[tokio::test]
async fn report_for_unknown_intervention_is_not_found() {
    let db = setup_db().await;

    let gotenberg = gotenberg_stub().await;
    let mailer = Arc::new(MockMailer::new());
    let reports = service(&db, gotenberg.uri(), mailer);

    let missing = uuid::Uuid::new_v4();
    let err = reports.generate_pdf(&missing).await.unwrap_err();
    assert!(matches!(err, ReportError::InterventionNotFound(id) if id == missing));
}
