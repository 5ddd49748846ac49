//! OpenDART client for corporate codes and financial statements
//!
//! Requires an API key from <https://opendart.fss.or.kr>. The corp code table
//! is a zipped XML file downloaded once per client; statements come from the
//! single-company key-account endpoint.
//!
//! Rate limit: configurable, 600 requests per minute by default

use crate::config::DashboardConfig;
use crate::error::{Result, StockError};
use crate::filings::{CorpInfo, FsDivision, ReportPeriod, StatementLine, parse_amount};
use crate::providers::FilingProvider;
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::io::{Cursor, Read};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const PROVIDER: &str = "OpenDART";
const DART_BASE_URL: &str = "https://opendart.fss.or.kr/api";

/// Status codes with a meaning other than failure
const STATUS_OK: &str = "000";
const STATUS_NO_DATA: &str = "013";

#[derive(Debug, Deserialize)]
struct CorpCodeFile {
    #[serde(rename = "list", default)]
    list: Vec<CorpCodeEntry>,
}

#[derive(Debug, Deserialize)]
struct CorpCodeEntry {
    corp_code: String,
    corp_name: String,
    #[serde(default)]
    stock_code: String,
}

/// Error body returned in place of the archive
#[derive(Debug, Deserialize)]
struct DartStatus {
    status: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    list: Vec<DartAccount>,
}

/// One row of `fnlttSinglAcnt.json`
#[derive(Debug, Deserialize)]
struct DartAccount {
    #[serde(default)]
    fs_div: Option<String>,
    #[serde(default)]
    sj_div: String,
    #[serde(default)]
    sj_nm: String,
    account_nm: String,
    #[serde(default)]
    thstrm_amount: Option<String>,
    #[serde(default)]
    frmtrm_amount: Option<String>,
    #[serde(default)]
    bfefrmtrm_amount: Option<String>,
    #[serde(default)]
    currency: Option<String>,
}

impl From<DartAccount> for StatementLine {
    fn from(account: DartAccount) -> Self {
        let amount = |raw: Option<String>| raw.as_deref().and_then(parse_amount);
        Self {
            division: account.fs_div.as_deref().and_then(FsDivision::from_code),
            statement_code: account.sj_div,
            statement_name: account.sj_nm,
            account: account.account_nm.trim().to_string(),
            current: amount(account.thstrm_amount),
            previous: amount(account.frmtrm_amount),
            before_previous: amount(account.bfefrmtrm_amount),
            currency: account.currency.filter(|c| !c.trim().is_empty()),
        }
    }
}

/// OpenDART API client
pub struct DartClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: SharedRateLimiter,
    corps: OnceCell<Arc<Vec<CorpInfo>>>,
}

impl DartClient {
    /// Create a client from configuration; `None` when no API key is set
    pub fn from_config(config: &DashboardConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.dart_api_key.clone() else {
            return Ok(None);
        };

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Some(Self::with_client(client, api_key, config.dart_rate_limit)))
    }

    /// # Arguments
    /// * `api_key` - OpenDART certification key
    /// * `rate_limit` - Requests per minute
    pub fn with_client(client: Client, api_key: impl Into<String>, rate_limit: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));

        Self {
            client,
            api_key: api_key.into(),
            base_url: DART_BASE_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            corps: OnceCell::new(),
        }
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let base = format!("{}/{}", self.base_url, path);
        let params =
            std::iter::once(("crtfc_key", self.api_key.as_str())).chain(params.iter().copied());
        Url::parse_with_params(&base, params)
            .map_err(|e| StockError::ConfigError(format!("bad OpenDART URL '{base}': {e}")))
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>> {
        self.rate_limiter.until_ready().await;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(StockError::api(PROVIDER, format!("HTTP {}", response.status())));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Corp code table, downloaded on first use
    pub async fn corp_codes(&self) -> Result<Arc<Vec<CorpInfo>>> {
        self.corps
            .get_or_try_init(|| async {
                tracing::info!("Downloading OpenDART corp codes");
                let bytes = self.get_bytes(self.endpoint("corpCode.xml", &[])?).await?;
                let corps = parse_corp_codes(&bytes)?;
                tracing::info!("Loaded {} OpenDART corp codes", corps.len());
                Ok::<_, StockError>(Arc::new(corps))
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl FilingProvider for DartClient {
    async fn find_corp(&self, company: &str) -> Result<Option<CorpInfo>> {
        let corps = self.corp_codes().await?;
        Ok(find_corp_in(&corps, company).cloned())
    }

    async fn fetch_statements(
        &self,
        corp_code: &str,
        year: i32,
        period: ReportPeriod,
    ) -> Result<Vec<StatementLine>> {
        let year = year.to_string();
        let url = self.endpoint(
            "fnlttSinglAcnt.json",
            &[
                ("corp_code", corp_code),
                ("bsns_year", &year),
                ("reprt_code", period.code()),
            ],
        )?;

        tracing::info!("Fetching statements for {} ({} {})", corp_code, year, period.code());
        let bytes = self.get_bytes(url).await?;
        parse_statements(&bytes)
    }
}

/// Exact name match first, then the first name containing `company`
pub fn find_corp_in<'a>(corps: &'a [CorpInfo], company: &str) -> Option<&'a CorpInfo> {
    corps
        .iter()
        .find(|c| c.corp_name == company)
        .or_else(|| corps.iter().find(|c| c.corp_name.contains(company)))
}

/// Read the zipped corp code table
pub fn parse_corp_codes(bytes: &[u8]) -> Result<Vec<CorpInfo>> {
    if !bytes.starts_with(b"PK") {
        let text = String::from_utf8_lossy(bytes);
        return Err(match quick_xml::de::from_str::<DartStatus>(&text) {
            Ok(status) => StockError::api(
                PROVIDER,
                format!("status {}: {}", status.status, status.message),
            ),
            Err(_) => StockError::api(PROVIDER, "corp code download is not a zip archive"),
        });
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_index(0)?.read_to_string(&mut xml)?;

    let file: CorpCodeFile = quick_xml::de::from_str(&xml)?;
    Ok(file
        .list
        .into_iter()
        .map(|entry| CorpInfo {
            corp_code: entry.corp_code.trim().to_string(),
            corp_name: entry.corp_name.trim().to_string(),
            stock_code: Some(entry.stock_code.trim().to_string()).filter(|s| !s.is_empty()),
        })
        .collect())
}

/// Read a statement response; "no data" is an empty list
pub fn parse_statements(bytes: &[u8]) -> Result<Vec<StatementLine>> {
    let response: StatementResponse = serde_json::from_slice(bytes)?;
    match response.status.as_str() {
        STATUS_OK => Ok(response.list.into_iter().map(StatementLine::from).collect()),
        STATUS_NO_DATA => Ok(Vec::new()),
        status => Err(StockError::api(
            PROVIDER,
            format!("status {status}: {}", response.message),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const CORP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<result>
    <list>
        <corp_code>00434003</corp_code>
        <corp_name>삼성전자서비스</corp_name>
        <corp_eng_name>Samsung Electronics Service</corp_eng_name>
        <stock_code> </stock_code>
        <modify_date>20170630</modify_date>
    </list>
    <list>
        <corp_code>00126380</corp_code>
        <corp_name>삼성전자</corp_name>
        <corp_eng_name>SAMSUNG ELECTRONICS CO,.LTD</corp_eng_name>
        <stock_code>005930</stock_code>
        <modify_date>20230110</modify_date>
    </list>
</result>"#;

    fn zipped(name: &str, contents: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_parse_corp_codes() {
        let corps = parse_corp_codes(&zipped("CORPCODE.xml", CORP_XML)).unwrap();

        assert_eq!(corps.len(), 2);
        assert_eq!(corps[0].stock_code, None);
        assert_eq!(corps[1].corp_code, "00126380");
        assert_eq!(corps[1].stock_code.as_deref(), Some("005930"));
    }

    #[test]
    fn test_parse_corp_codes_error_body() {
        let body = "<result><status>010</status><message>등록되지 않은 키입니다.</message></result>";
        let err = parse_corp_codes(body.as_bytes()).unwrap_err();
        let StockError::Api { ref reason, .. } = err else {
            panic!("expected an API error, got {err:?}");
        };
        assert!(reason.starts_with("status 010"));
    }

    #[test]
    fn test_find_corp_exact_then_substring() {
        let corps = parse_corp_codes(&zipped("CORPCODE.xml", CORP_XML)).unwrap();

        assert_eq!(find_corp_in(&corps, "삼성전자").unwrap().corp_code, "00126380");
        assert_eq!(find_corp_in(&corps, "서비스").unwrap().corp_code, "00434003");
        assert!(find_corp_in(&corps, "카카오").is_none());
    }

    #[test]
    fn test_parse_statements() {
        let body = r#"{
            "status": "000",
            "message": "정상",
            "list": [
                {"rcept_no": "20240312000736", "fs_div": "CFS", "fs_nm": "연결재무제표",
                 "sj_div": "BS", "sj_nm": "재무상태표", "account_nm": "자산총계",
                 "thstrm_amount": "455,905,980,000,000", "frmtrm_amount": "448,424,507,000,000",
                 "bfefrmtrm_amount": "", "currency": "KRW"},
                {"fs_div": "OFS", "sj_div": "IS", "sj_nm": "손익계산서", "account_nm": " 매출액 ",
                 "thstrm_amount": "-", "currency": "KRW"}
            ]
        }"#;
        let lines = parse_statements(body.as_bytes()).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].division, Some(FsDivision::Consolidated));
        assert_eq!(lines[0].current, Some(455_905_980_000_000));
        assert_eq!(lines[0].before_previous, None);
        assert_eq!(lines[1].account, "매출액");
        assert_eq!(lines[1].current, None);
    }

    #[test]
    fn test_parse_statements_status() {
        let no_data = r#"{"status": "013", "message": "조회된 데이타가 없습니다."}"#;
        assert!(parse_statements(no_data.as_bytes()).unwrap().is_empty());

        let bad_key = r#"{"status": "010", "message": "등록되지 않은 키입니다."}"#;
        assert!(matches!(
            parse_statements(bad_key.as_bytes()),
            Err(StockError::Api { provider: "OpenDART", .. })
        ));
    }

    #[test]
    fn test_from_config_without_key() {
        assert!(DartClient::from_config(&DashboardConfig::default()).unwrap().is_none());
    }

    #[test]
    fn test_endpoint_encodes_params() {
        let client = DartClient::with_client(Client::new(), "k e y", 60);
        let url = client
            .endpoint("fnlttSinglAcnt.json", &[("corp_code", "00126380")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://opendart.fss.or.kr/api/fnlttSinglAcnt.json?crtfc_key=k+e+y&corp_code=00126380"
        );
    }

    #[tokio::test]
    #[ignore] // Requires network access and DART_API_KEY
    async fn test_fetch_statements() {
        let config = DashboardConfig::default().with_env_api_key();
        let client = DartClient::from_config(&config).unwrap().unwrap();
        let corp = client.find_corp("삼성전자").await.unwrap().unwrap();
        let lines = client
            .fetch_statements(&corp.corp_code, 2023, ReportPeriod::Annual)
            .await
            .unwrap();
        assert!(!lines.is_empty());
    }
}
