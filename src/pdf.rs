//! Gotenberg HTML-to-PDF client.
//!
//! Reports are rendered to HTML and converted by a Gotenberg instance via a
//! single multipart POST to its Chromium conversion route. Any non-200
//! response is a hard failure; there is no retry.

use reqwest::multipart::{Form, Part};
use std::time::Duration;

/// Page-layout options submitted with every conversion: A4 paper with
/// 0.4-inch margins, backgrounds printed.
const PDF_OPTIONS: &[(&str, &str)] = &[
    ("paperWidth", "8.27"),
    ("paperHeight", "11.7"),
    ("marginTop", "0.4"),
    ("marginBottom", "0.4"),
    ("marginLeft", "0.4"),
    ("marginRight", "0.4"),
    ("printBackground", "true"),
];

/// Errors from the PDF conversion call.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("Gotenberg request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Gotenberg returned status {status}")]
    UnexpectedStatus { status: u16 },
    #[error("Failed to assemble conversion form: {0}")]
    Form(String),
}

/// Client for a Gotenberg conversion endpoint.
#[derive(Debug, Clone)]
pub struct GotenbergClient {
    base_url: String,
    client: reqwest::Client,
}

impl GotenbergClient {
    /// Creates a client for the given Gotenberg base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds with static configuration"),
        }
    }

    /// Converts an HTML document to PDF, returning the raw PDF bytes.
    pub async fn convert_html(&self, html: &str) -> Result<Vec<u8>, PdfError> {
        let mut form = Form::new().part(
            "files",
            Part::bytes(html.as_bytes().to_vec())
                .file_name("index.html")
                .mime_str("text/html")
                .map_err(|e| PdfError::Form(e.to_string()))?,
        );

        for (key, value) in PDF_OPTIONS {
            form = form.text(*key, *value);
        }

        let url = format!("{}/forms/chromium/convert/html", self.base_url);
        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PdfError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn convert_html_posts_multipart_and_returns_pdf_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/forms/chromium/convert/html"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"%PDF-1.4 fake".to_vec())
                    .insert_header("content-type", "application/pdf"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = GotenbergClient::new(server.uri());
        let pdf = client
            .convert_html("<html><body>report</body></html>")
            .await
            .unwrap();

        assert!(pdf.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn non_200_is_a_hard_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/forms/chromium/convert/html"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = GotenbergClient::new(server.uri());
        let err = client.convert_html("<html></html>").await.unwrap_err();

        assert!(matches!(
            err,
            PdfError::UnexpectedStatus { status: 503 }
        ));
    }
}
