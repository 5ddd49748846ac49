//! KRX KIND company listing client
//!
//! KIND serves the full listing as an HTML table in EUC-KR, despite the
//! `download` name. Only the company name and code columns are used.

use crate::config::DashboardConfig;
use crate::error::{Result, StockError};
use crate::model::{CompanyDirectory, Listing, SecurityCode};
use crate::providers::ListingProvider;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};

const NAME_COLUMN: &str = "회사명";
const CODE_COLUMN: &str = "종목코드";
const LISTING_CHARSET: &str = "euc-kr";

/// KIND listing download client
pub struct KrxListingClient {
    client: Client,
    url: String,
}

impl KrxListingClient {
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.listing_url.clone(),
        })
    }
}

#[async_trait]
impl ListingProvider for KrxListingClient {
    async fn fetch_listing(&self) -> Result<CompanyDirectory> {
        tracing::info!("Downloading company listing from {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(StockError::api(
                "KRX listing",
                format!("HTTP {}", response.status()),
            ));
        }

        let body = response.text_with_charset(LISTING_CHARSET).await?;
        parse_listing_html(&body)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| StockError::Other(format!("bad selector '{css}': {e}")))
}

/// Pull (name, code) pairs out of the listing table.
///
/// Codes are zero-padded to six digits; rows whose code still does not look
/// like a KRX code are skipped.
pub fn parse_listing_html(html: &str) -> Result<CompanyDirectory> {
    let doc = Html::parse_document(html);
    let tr_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    let mut rows = doc.select(&tr_sel).map(|tr| {
        tr.select(&cell_sel)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect::<Vec<String>>()
    });

    let (name_idx, code_idx) = rows
        .by_ref()
        .find_map(|cells| {
            let name = cells.iter().position(|c| c == NAME_COLUMN)?;
            let code = cells.iter().position(|c| c == CODE_COLUMN)?;
            Some((name, code))
        })
        .ok_or_else(|| {
            StockError::api(
                "KRX listing",
                format!("table has no '{NAME_COLUMN}' / '{CODE_COLUMN}' header"),
            )
        })?;

    let mut listings = Vec::new();
    let mut skipped = 0usize;
    for cells in rows {
        let (Some(name), Some(raw_code)) = (cells.get(name_idx), cells.get(code_idx)) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        match SecurityCode::from_listing(raw_code) {
            Some(code) => listings.push(Listing {
                name: name.clone(),
                code,
            }),
            None => {
                tracing::debug!("Skipping listing '{}' with code '{}'", name, raw_code);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} listings with non-numeric codes", skipped);
    }

    Ok(CompanyDirectory::new(listings))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <html><head><meta http-equiv="Content-Type" content="text/html; charset=euc-kr"></head>
        <body><table>
          <tr><th>회사명</th><th>시장구분</th><th>종목코드</th><th>업종</th></tr>
          <tr><td>삼성전자</td><td>유가</td><td style="mso-number-format:'\@';">005930</td><td>통신 및 방송 장비 제조업</td></tr>
          <tr><td>SK하이닉스</td><td>유가</td><td>660</td><td>반도체 제조업</td></tr>
          <tr><td>신규상장</td><td>코스닥</td><td>0126Z0</td><td>-</td></tr>
          <tr><td>삼성전자</td><td>유가</td><td>999999</td><td>-</td></tr>
        </table></body></html>
    "#;

    #[test]
    fn test_parse_listing_html() {
        let dir = parse_listing_html(SAMPLE).unwrap();

        assert_eq!(dir.len(), 3);
        assert_eq!(dir.find("SK하이닉스").unwrap().code.as_str(), "000660");
        assert_eq!(dir.find("삼성전자").unwrap().code.as_str(), "005930");
        assert!(dir.find("신규상장").is_none());
    }

    #[test]
    fn test_parse_listing_without_header() {
        let err = parse_listing_html("<table><tr><td>a</td></tr></table>").unwrap_err();
        assert!(matches!(err, StockError::Api { provider: "KRX listing", .. }));
    }

    #[test]
    fn test_parse_empty_table() {
        let html = "<table><tr><th>종목코드</th><th>회사명</th></tr></table>";
        assert!(parse_listing_html(html).unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fetch_listing() {
        let client = KrxListingClient::new(&DashboardConfig::default()).unwrap();
        let dir = client.fetch_listing().await.unwrap();
        assert!(dir.len() > 1000);
        assert_eq!(dir.find("삼성전자").unwrap().code.as_str(), "005930");
    }
}
