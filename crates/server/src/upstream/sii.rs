//! Taxpayer lookups against the SII (Servicio de Impuestos Internos) public query page.
//!
//! A lookup takes two requests: a captcha is fetched first, its solution is embedded in the
//! base64 encoded token itself, then the form is posted with both and the resulting HTML page is
//! scraped for the taxpayer name and activity table.

use async_trait::async_trait;
use base64::Engine;
use rut::Rut;
use serde::Deserialize;
use url::Url;

use super::{
    ActivityService, EconomicActivity, TaxpayerProfile, html,
    text::{parse_sii_date, title_case},
};
use crate::error::{ServerError, ServerResult};

/// Path of the captcha generator, relative to the SII base URL.
const CAPTCHA_PATH: &str = "cvc_cgi/stc/CViewCaptcha.cgi?oper=0";

/// Path of the taxpayer query form, relative to the SII base URL.
const PROFILE_PATH: &str = "cvc_cgi/stc/getstc";

/// Byte range of the decoded captcha token holding the solution.
const CAPTCHA_SOLUTION: std::ops::Range<usize> = 36..40;

/// Name shown by the SII when it has no record of the RUT.
const NO_RECORD_NAME: &str = "**";

/// Label of the element preceding the taxpayer name.
const NAME_LABEL: &str = "Nombre o Raz";

/// Body of the captcha endpoint response.
#[derive(Debug, Deserialize)]
struct CaptchaResponse {
    /// Base64 encoded captcha token.
    #[serde(rename = "txtCaptcha")]
    txt_captcha: Option<String>,
}

/// A captcha token and its solution.
#[derive(Debug)]
struct Captcha {
    /// The encoded token, sent back as is.
    code: String,
    /// The four characters the captcha image shows.
    solution: String,
}

/// Client for the SII public taxpayer query.
#[derive(Debug, Clone)]
pub struct SiiClient {
    /// Shared HTTP client.
    client: reqwest::Client,
    /// Base URL the SII paths are resolved against.
    base_url: Url,
}

impl SiiClient {
    /// Create a client resolving requests against `base_url`, normally `https://zeus.sii.cl/`.
    pub const fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Fetch a new captcha and read its solution out of the token.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    async fn captcha(&self) -> ServerResult<Captcha> {
        let url = self.base_url.join(CAPTCHA_PATH)?;
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let code = serde_json::from_str::<CaptchaResponse>(&body)?
            .txt_captcha
            .ok_or_else(|| ServerError::Upstream("no captcha code".to_string()))?;

        let decoded = base64::engine::general_purpose::STANDARD.decode(code.trim())?;
        let solution = decoded
            .get(CAPTCHA_SOLUTION)
            .map(|solution| String::from_utf8_lossy(solution).into_owned())
            .ok_or_else(|| ServerError::Upstream("captcha code is too short".to_string()))?;

        Ok(Captcha { code, solution })
    }
}

#[async_trait]
impl ActivityService for SiiClient {
    #[tracing::instrument(skip(self, rut), fields(rut = %rut), err(level = "debug"))]
    async fn profile(&self, rut: &Rut) -> ServerResult<TaxpayerProfile> {
        let Captcha { code, solution } = self.captcha().await?;

        let check_digit = rut
            .check_digit()
            .unwrap_or_else(|| rut.calculate_check_digit());

        let form = [
            ("RUT", rut.body_string()),
            ("DV", check_digit.to_string()),
            ("PRG", "STC".to_string()),
            ("OPC", "NOR".to_string()),
            // The SII expects the token in `txt_captcha` and the solution in `txt_code`.
            ("txt_captcha", code),
            ("txt_code", solution),
        ];

        let url = self.base_url.join(PROFILE_PATH)?;
        let page = self
            .client
            .post(url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let profile = parse_profile(&page);
        tracing::debug!(
            found = !profile.name.is_empty(),
            activities = profile.activities.len(),
            "Parsed SII profile"
        );
        Ok(profile)
    }
}

/// Scrape the taxpayer name and activities out of the query result page.
pub fn parse_profile(page: &str) -> TaxpayerProfile {
    TaxpayerProfile {
        name: taxpayer_name(page),
        activities: activities(page),
    }
}

/// The name is in the element right after its label, among the innermost `div`s of the page.
fn taxpayer_name(page: &str) -> String {
    let leaves: Vec<String> = html::blocks(page, "div")
        .into_iter()
        .filter(|block| !html::inner(block).to_ascii_lowercase().contains("<div"))
        .map(html::text)
        .collect();

    let name = leaves
        .iter()
        .position(|text| text.starts_with(NAME_LABEL))
        .and_then(|label| leaves.get(label.saturating_add(1)))
        .map(|name| title_case(name))
        .unwrap_or_default();

    if name == NO_RECORD_NAME {
        String::new()
    } else {
        name
    }
}

/// Rows of the first activity table. Rows without a numeric activity code, like the header, are
/// skipped.
fn activities(page: &str) -> Vec<EconomicActivity> {
    let tables = html::blocks(page, "table");
    let Some(table) = tables
        .iter()
        .find(|table| html::has_class(html::open_tag(table), "tabla"))
        .or_else(|| tables.first())
    else {
        return Vec::new();
    };

    html::blocks(table, "tr")
        .into_iter()
        .filter_map(|row| {
            let cells: Vec<String> = html::blocks(row, "td").into_iter().map(html::text).collect();
            let [name, code, category, subject_to_vat, date, ..] = cells.as_slice() else {
                return None;
            };

            Some(EconomicActivity {
                name: title_case(name),
                code: code.parse().ok()?,
                category: title_case(category),
                subject_to_vat: subject_to_vat.eq_ignore_ascii_case("si"),
                date: parse_sii_date(date),
            })
        })
        .collect()
}
