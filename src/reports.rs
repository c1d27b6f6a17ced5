//! Intervention report generation and notification.
//!
//! Renders an intervention into a self-contained HTML document, converts it
//! to PDF through Gotenberg and emails the PDF to the technician who
//! performed the visit. Generation and delivery are best-effort one-shots:
//! a failed conversion or send surfaces immediately, nothing is queued.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{ApiError, not_found, upstream_error};
use crate::mail::{EmailAttachment, MailError, Mailer, OutgoingEmail};
use crate::models::control::{self, ControlKind, ControlType};
use crate::models::{intervention, portal};
use crate::pdf::{GotenbergClient, PdfError};
use crate::repositories::{InterventionRepository, PortalRepository, UserRepository};

/// Errors from report generation and delivery.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Intervention {0} not found")]
    InterventionNotFound(Uuid),
    #[error("Portal {0} not found")]
    PortalNotFound(Uuid),
    #[error("Technician {0} not found")]
    TechnicianNotFound(Uuid),
    #[error(transparent)]
    Pdf(#[from] PdfError),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ReportError> for ApiError {
    fn from(error: ReportError) -> Self {
        match error {
            ReportError::InterventionNotFound(_)
            | ReportError::PortalNotFound(_)
            | ReportError::TechnicianNotFound(_) => not_found(&error.to_string()),
            ReportError::Pdf(pdf_err) => upstream_error("gotenberg", &pdf_err.to_string()),
            ReportError::Mail(mail_err) => upstream_error("smtp", &mail_err.to_string()),
            ReportError::Db(db_err) => db_err.into(),
            ReportError::Other(other) => other.into(),
        }
    }
}

/// French label shown on the report for each checklist item.
pub fn control_label(control_type: ControlType) -> &'static str {
    match control_type {
        ControlType::WarningLights => "Feux de signalisation",
        ControlType::AreaLighting => "Éclairage de zone",
        ControlType::SafetyCells => "Cellules de sécurité",
        ControlType::PressureBar => "Barre palpeuse",
        ControlType::FloorLoop => "Boucle au sol",
        ControlType::ForceLimiter => "Limiteur d'effort",
        ControlType::SafetySprings => "Ressorts de sécurité",
        ControlType::FloorMarkings => "Marquage au sol",
        ControlType::ApronCondition => "État du tablier",
        ControlType::HorizontalRails => "Rails horizontaux",
        ControlType::VerticalRails => "Rails verticaux",
        ControlType::RollerCondition => "État des galets",
        ControlType::DriveSystem => "Système d'entraînement",
        ControlType::LimitSwitches => "Fins de course",
        ControlType::ControlDevices => "Organes de commande",
        ControlType::ControlPanel => "Armoire de commande",
        ControlType::ManualOverride => "Manœuvre de secours",
    }
}

fn result_label(result: Option<bool>) -> &'static str {
    match result {
        Some(true) => "Conforme",
        Some(false) => "Non conforme",
        None => "Non contrôlé",
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Renders the intervention report as a self-contained HTML document suited
/// for the Chromium conversion route.
pub fn render_intervention_html(
    intervention: &intervention::Model,
    portal: &portal::Model,
    controls: &[control::Model],
) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html><html lang=\"fr\"><head><meta charset=\"utf-8\">");
    html.push_str("<style>");
    html.push_str(
        "body{font-family:sans-serif;margin:0;color:#222}\
         h1{font-size:20px;border-bottom:2px solid #222;padding-bottom:8px}\
         h2{font-size:16px;margin-top:24px}\
         table{width:100%;border-collapse:collapse;margin-top:8px}\
         td,th{border:1px solid #999;padding:6px 8px;text-align:left;font-size:13px}\
         th{background:#eee}\
         .fail{color:#a40000;font-weight:bold}",
    );
    html.push_str("</style></head><body>");

    html.push_str(&format!(
        "<h1>Rapport d'intervention &mdash; {}</h1>",
        escape_html(&portal.name)
    ));

    html.push_str("<h2>Portail</h2><table>");
    html.push_str(&format!(
        "<tr><th>Identifiant</th><td>{}</td></tr>",
        escape_html(&portal.internal_id)
    ));
    html.push_str(&format!(
        "<tr><th>Adresse</th><td>{}, {} {}</td></tr>",
        escape_html(&portal.address_street),
        escape_html(&portal.address_zipcode),
        escape_html(&portal.address_city)
    ));
    html.push_str(&format!(
        "<tr><th>Prestataire</th><td>{}</td></tr>",
        escape_html(&portal.contractor_company)
    ));
    html.push_str("</table>");

    html.push_str("<h2>Intervention</h2><table>");
    html.push_str(&format!(
        "<tr><th>Date</th><td>{}</td></tr>",
        intervention.date.format("%Y-%m-%d")
    ));
    html.push_str(&format!(
        "<tr><th>Technicien</th><td>{}</td></tr>",
        escape_html(&intervention.user_name)
    ));
    if let Some(summary) = &intervention.summary {
        html.push_str(&format!(
            "<tr><th>R&eacute;sum&eacute;</th><td>{}</td></tr>",
            escape_html(summary)
        ));
    }
    html.push_str("</table>");

    for (kind, title) in [
        (ControlKind::Security, "Contr&ocirc;les de s&eacute;curit&eacute;"),
        (ControlKind::Other, "Autres contr&ocirc;les"),
    ] {
        let rows: Vec<&control::Model> = controls
            .iter()
            .filter(|c| c.kind.kind() == kind)
            .collect();
        if rows.is_empty() {
            continue;
        }

        html.push_str(&format!(
            "<h2>{title}</h2><table><tr><th>Point de contr&ocirc;le</th><th>R&eacute;sultat</th></tr>"
        ));
        for row in rows {
            let class = if row.result == Some(false) {
                " class=\"fail\""
            } else {
                ""
            };
            html.push_str(&format!(
                "<tr><td>{}</td><td{}>{}</td></tr>",
                control_label(row.kind),
                class,
                result_label(row.result)
            ));
        }
        html.push_str("</table>");
    }

    html.push_str("</body></html>");
    html
}

/// Generates intervention PDFs and emails them to the technician.
pub struct ReportService {
    gotenberg: GotenbergClient,
    mailer: Arc<dyn Mailer>,
    interventions: InterventionRepository,
    portals: PortalRepository,
    users: UserRepository,
}

impl ReportService {
    pub fn new(
        gotenberg: GotenbergClient,
        mailer: Arc<dyn Mailer>,
        interventions: InterventionRepository,
        portals: PortalRepository,
        users: UserRepository,
    ) -> Self {
        Self {
            gotenberg,
            mailer,
            interventions,
            portals,
            users,
        }
    }

    /// Renders and converts the report, returning the raw PDF bytes.
    pub async fn generate_pdf(&self, intervention_id: &Uuid) -> Result<Vec<u8>, ReportError> {
        let (intervention, portal, controls) = self.load_aggregate(intervention_id).await?;
        let html = render_intervention_html(&intervention, &portal, &controls);
        Ok(self.gotenberg.convert_html(&html).await?)
    }

    /// Generates the report and emails it to the technician who performed
    /// the intervention. No retry on failure.
    pub async fn send_report(&self, intervention_id: &Uuid) -> Result<(), ReportError> {
        let (intervention, portal, controls) = self.load_aggregate(intervention_id).await?;

        let technician = self
            .users
            .find_by_id(&intervention.user_id)
            .await?
            .ok_or(ReportError::TechnicianNotFound(intervention.user_id))?;

        let html = render_intervention_html(&intervention, &portal, &controls);
        let pdf = self.gotenberg.convert_html(&html).await?;

        let subject = format!(
            "Rapport d'Intervention #{} - {}",
            intervention.id, portal.name
        );
        let body = build_email_body(&intervention, &portal, &technician.full_name());

        self.mailer
            .send(OutgoingEmail {
                to: vec![technician.email.clone()],
                subject,
                body,
                attachments: vec![EmailAttachment::pdf(
                    format!("rapport_intervention_{}.pdf", intervention.id),
                    pdf,
                )],
            })
            .await?;

        tracing::info!(
            intervention_id = %intervention.id,
            to = %technician.email,
            "Intervention report sent"
        );
        Ok(())
    }

    async fn load_aggregate(
        &self,
        intervention_id: &Uuid,
    ) -> Result<(intervention::Model, portal::Model, Vec<control::Model>), ReportError> {
        let (intervention, controls) = self
            .interventions
            .find_with_controls(intervention_id)
            .await?
            .ok_or(ReportError::InterventionNotFound(*intervention_id))?;

        let portal = self
            .portals
            .find_by_id(&intervention.portal_id)
            .await
            .map_err(ReportError::Other)?
            .ok_or(ReportError::PortalNotFound(intervention.portal_id))?;

        Ok((intervention, portal, controls))
    }
}

fn build_email_body(
    intervention: &intervention::Model,
    portal: &portal::Model,
    technician_name: &str,
) -> String {
    let mut body = format!(
        "Cher/Chère {},\n\n\
         Veuillez trouver en pièce jointe le rapport d'intervention pour :\n\n\
         Portail : {}\n\
         ID d'intervention : {}\n\
         Date : {}\n\
         Technicien : {}",
        technician_name,
        portal.name,
        intervention.id,
        intervention.date.format("%Y-%m-%d"),
        intervention.user_name
    );

    if let Some(summary) = &intervention.summary
        && !summary.is_empty()
    {
        body.push_str(&format!("\nRésumé : {}", summary));
    }

    body.push_str("\n\nCordialement,\nSystème de Maintenance des Portails");
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_portal() -> portal::Model {
        portal::Model {
            id: Uuid::new_v4(),
            internal_id: "P-0042".to_string(),
            name: "Dépôt <Nord>".to_string(),
            address_street: "12 rue des Lilas".to_string(),
            address_zipcode: "69003".to_string(),
            address_city: "Lyon".to_string(),
            contractor_company: "Garde-Portail SARL".to_string(),
            contact_phone: "+33 4 00 00 00 00".to_string(),
            contact_email: None,
            installation_date: NaiveDate::from_ymd_opt(2019, 6, 1).unwrap(),
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
            deleted_at: None,
        }
    }

    fn sample_intervention(portal_id: Uuid) -> intervention::Model {
        intervention::Model {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            summary: Some("RAS".to_string()),
            user_id: Uuid::new_v4(),
            user_name: "Jo Martin".to_string(),
            portal_id,
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
            deleted_at: None,
        }
    }

    fn sample_control(intervention_id: Uuid, kind: ControlType, result: Option<bool>) -> control::Model {
        control::Model {
            id: Uuid::new_v4(),
            kind,
            result,
            intervention_id,
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
            deleted_at: None,
        }
    }

    #[test]
    fn report_html_contains_portal_and_checklist() {
        let portal = sample_portal();
        let intervention = sample_intervention(portal.id);
        let controls = vec![
            sample_control(intervention.id, ControlType::WarningLights, Some(true)),
            sample_control(intervention.id, ControlType::DriveSystem, Some(false)),
        ];

        let html = render_intervention_html(&intervention, &portal, &controls);

        // User-provided text is escaped, not interpolated raw.
        assert!(html.contains("Dépôt &lt;Nord&gt;"));
        assert!(!html.contains("Dépôt <Nord>"));

        assert!(html.contains("P-0042"));
        assert!(html.contains("Jo Martin"));
        assert!(html.contains("Feux de signalisation"));
        assert!(html.contains("Conforme"));
        assert!(html.contains("Non conforme"));
    }

    #[test]
    fn report_html_omits_empty_sections() {
        let portal = sample_portal();
        let intervention = sample_intervention(portal.id);
        let controls = vec![sample_control(
            intervention.id,
            ControlType::WarningLights,
            Some(true),
        )];

        let html = render_intervention_html(&intervention, &portal, &controls);
        assert!(html.contains("s&eacute;curit&eacute;"));
        assert!(!html.contains("Autres contr&ocirc;les"));
    }

    #[test]
    fn email_body_includes_summary_when_present() {
        let portal = sample_portal();
        let intervention = sample_intervention(portal.id);

        let body = build_email_body(&intervention, &portal, "Jo Martin");
        assert!(body.contains("Cher/Chère Jo Martin"));
        assert!(body.contains("Résumé : RAS"));
        assert!(body.contains(&intervention.id.to_string()));
    }

    #[test]
    fn email_body_skips_missing_summary() {
        let portal = sample_portal();
        let mut intervention = sample_intervention(portal.id);
        intervention.summary = None;

        let body = build_email_body(&intervention, &portal, "Jo Martin");
        assert!(!body.contains("Résumé"));
    }

    #[test]
    fn every_control_type_has_a_label() {
        for t in ControlType::all() {
            assert!(!control_label(t).is_empty());
        }
    }
}
