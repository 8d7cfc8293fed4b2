use common::config;
use scraper::{Html, Selector};
use tracing::{info, instrument, warn};

/// Check that the deployed page renders the expected content.
///
/// Any network failure, non-success status code, missing element or text mismatch
/// results in `false`.
#[instrument(skip(page))]
pub(crate) async fn verify_page_contents(url: &str, page: &config::Page) -> bool {
    let body = match fetch(url, page).await {
        Ok(body) => body,
        Err(err) => {
            warn!(%err, "could not open page");
            return false;
        }
    };

    let matches = page_matches(&body, &page.selector, &page.expected_text);

    info!(matches, "page contents checked");

    matches
}

/// Fetch the page body.
async fn fetch(url: &str, page: &config::Page) -> Result<String, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(page.timeout())
        .build()?
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
}

/// Check that the text of the first element matching `selector` equals `expected`.
pub(crate) fn page_matches(html: &str, selector: &str, expected: &str) -> bool {
    let selector = match Selector::parse(selector) {
        Ok(selector) => selector,
        Err(err) => {
            warn!(?err, "invalid page selector");
            return false;
        }
    };

    let document = Html::parse_document(html);

    let Some(element) = document.select(&selector).next() else {
        warn!("required element not found");
        return false;
    };

    element.text().collect::<String>() == expected
}
