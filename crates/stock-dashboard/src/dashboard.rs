//! Dashboard orchestration: resolve → fetch → session, and the views built
//! from the session snapshot.

use crate::api::{DartClient, GoogleNewsClient, KrxListingClient, YahooPriceClient};
use crate::cache::DirectoryCache;
use crate::config::DashboardConfig;
use crate::crossover::{CrossoverEvent, dated, last_crossover};
use crate::error::{Result, StockError};
use crate::export::{ExportFormat, export_to_path, write_csv, write_workbook};
use crate::filings::{FilingRequest, FilingsView};
use crate::metrics::{MaAlignment, Metrics, MovingAverage, VolumeSignal, compute_metrics_with};
use crate::model::{DateRange, PriceSeries, SecurityCode};
use crate::news::{NewsView, sort_newest_first};
use crate::providers::{FilingProvider, ListingProvider, NewsProvider, PriceProvider, with_timeout};
use crate::resolver::SymbolResolver;
use crate::session::{Session, Snapshot};
use chrono::NaiveDate;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// Moving averages compared for the crossover signal
const CROSSOVER_PAIR: (usize, usize) = (5, 20);

/// Summary of a successful query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub title: String,
    pub code: SecurityCode,
    pub range: DateRange,
    pub rows: usize,
    /// Non-fatal problems met on the way, e.g. the listing could not be loaded
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub title: String,
    pub range: DateRange,
    pub rows: usize,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorView {
    pub title: String,
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<f64>,
    pub moving_averages: Vec<MovingAverage>,
    pub crossover: Option<CrossoverEvent>,
    pub alignment: Option<MaAlignment>,
    /// `None` when the series has no volume column
    pub volume_signal: Option<VolumeSignal>,
}

/// Dashboard over a set of providers
pub struct Dashboard {
    config: Arc<DashboardConfig>,
    resolver: SymbolResolver,
    prices: Arc<dyn PriceProvider>,
    filings: Option<Arc<dyn FilingProvider>>,
    news: Arc<dyn NewsProvider>,
}

impl Dashboard {
    pub fn new(
        config: DashboardConfig,
        listing: Arc<dyn ListingProvider>,
        prices: Arc<dyn PriceProvider>,
        filings: Option<Arc<dyn FilingProvider>>,
        news: Arc<dyn NewsProvider>,
    ) -> Self {
        let directory = DirectoryCache::new(listing, config.listing_ttl, config.request_timeout);
        Self {
            config: Arc::new(config),
            resolver: SymbolResolver::new(directory),
            prices,
            filings,
            news,
        }
    }

    /// Wire up the HTTP clients described by `config`
    pub fn from_config(config: DashboardConfig) -> Result<Self> {
        config.validate()?;

        let listing = Arc::new(KrxListingClient::new(&config)?);
        let prices = Arc::new(YahooPriceClient::new(&config)?);
        let news = Arc::new(GoogleNewsClient::new(&config)?);
        let filings = DartClient::from_config(&config)?
            .map(|client| Arc::new(client) as Arc<dyn FilingProvider>);

        if filings.is_none() {
            tracing::info!("DART_API_KEY not set, financial statements disabled");
        }

        Ok(Self::new(config, listing, prices, filings, news))
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn filings_enabled(&self) -> bool {
        self.filings.is_some()
    }

    /// Resolve `identifier`, fetch its prices and make it the session's
    /// current snapshot.
    ///
    /// On any error, including an empty result, the session keeps whatever
    /// snapshot it had.
    #[instrument(skip(self, session, range), fields(session = %session.id()))]
    pub async fn query(
        &self,
        session: &mut Session,
        identifier: &str,
        range: DateRange,
    ) -> Result<QueryOutcome> {
        if identifier.trim().is_empty() {
            return Err(StockError::EmptyQuery);
        }

        let (code, warnings) = self.resolver.resolve(identifier).await.into_code_and_warnings()?;

        let series = with_timeout(
            "Price history",
            self.config.request_timeout,
            self.prices.fetch_prices(&code, &range),
        )
        .await?;

        if series.is_empty() {
            return Err(StockError::EmptyResult(format!(
                "no trading data for {code} in {range}"
            )));
        }

        Ok(self.install(session, identifier, code, range, series, warnings))
    }

    /// Make an already loaded series the current snapshot, e.g. one read
    /// from an exported sheet. The range is taken from the series itself.
    pub async fn load_series(
        &self,
        session: &mut Session,
        identifier: &str,
        series: PriceSeries,
    ) -> Result<QueryOutcome> {
        if identifier.trim().is_empty() {
            return Err(StockError::EmptyQuery);
        }
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(StockError::EmptyResult("the sheet has no rows".to_string()));
        };
        let range = DateRange::new(first.date, last.date)?;

        let (code, warnings) = self.resolver.resolve(identifier).await.into_code_and_warnings()?;

        Ok(self.install(session, identifier, code, range, series, warnings))
    }

    fn install(
        &self,
        session: &mut Session,
        identifier: &str,
        code: SecurityCode,
        range: DateRange,
        series: PriceSeries,
        warnings: Vec<String>,
    ) -> QueryOutcome {
        let snapshot = Snapshot::new(identifier.trim(), code, range, series);
        let outcome = QueryOutcome {
            title: snapshot.title(),
            code: snapshot.code.clone(),
            range,
            rows: snapshot.series.len(),
            warnings,
        };
        tracing::info!("Loaded {} rows for {}", outcome.rows, outcome.title);
        session.replace(snapshot);
        outcome
    }

    pub fn overview(&self, session: &Session) -> Result<Overview> {
        let snapshot = session.current()?;
        Ok(Overview {
            title: snapshot.title(),
            range: snapshot.range,
            rows: snapshot.series.len(),
            metrics: compute_metrics_with(&snapshot.series, self.config.probability_lookback),
        })
    }

    pub fn indicators(&self, session: &Session) -> Result<IndicatorView> {
        let snapshot = session.current()?;
        let series = &snapshot.series;
        let metrics = compute_metrics_with(series, self.config.probability_lookback);

        let crossover = match (
            metrics.moving_average(CROSSOVER_PAIR.0),
            metrics.moving_average(CROSSOVER_PAIR.1),
        ) {
            (Some(short), Some(long)) => last_crossover(
                &dated(series.dates(), &short.values),
                &dated(series.dates(), &long.values),
                self.config.crossover_lookback,
            ),
            _ => None,
        };

        Ok(IndicatorView {
            title: snapshot.title(),
            dates: series.dates().collect(),
            closes: series.closes(),
            crossover,
            alignment: metrics.ma_alignment,
            volume_signal: metrics.volume_signal,
            moving_averages: metrics.moving_averages,
        })
    }

    /// Financial statements for the session company.
    ///
    /// Returns [`FilingsView::Disabled`] rather than an error when no
    /// disclosure provider is configured.
    pub async fn filings(&self, session: &Session, request: FilingRequest) -> Result<FilingsView> {
        let snapshot = session.current()?;
        let Some(provider) = &self.filings else {
            return Ok(FilingsView::Disabled);
        };

        let timeout = self.config.request_timeout;
        let corp = with_timeout("OpenDART", timeout, provider.find_corp(&snapshot.label)).await?;
        let Some(corp) = corp else {
            return Ok(FilingsView::CorpNotFound(snapshot.label.clone()));
        };

        let lines = with_timeout(
            "OpenDART",
            timeout,
            provider.fetch_statements(&corp.corp_code, request.year, request.period),
        )
        .await?;

        Ok(FilingsView::from_lines(corp, request, lines))
    }

    /// News for `query`, or for the session company when no query is given
    pub async fn news(
        &self,
        session: &Session,
        query: Option<&str>,
        limit: Option<usize>,
    ) -> Result<NewsView> {
        let snapshot = session.current()?;
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(&snapshot.label)
            .to_string();
        let limit = self.config.news_limit_for(limit);

        let mut items = with_timeout(
            "Google News",
            self.config.news_timeout,
            self.news.search(&query, limit),
        )
        .await?;
        sort_newest_first(&mut items);
        items.truncate(limit);

        Ok(NewsView { query, items })
    }

    /// Write the session series as a workbook or CSV. Returns the row count.
    pub fn export<W: io::Write>(
        &self,
        session: &Session,
        format: ExportFormat,
        writer: W,
    ) -> Result<usize> {
        let series = &session.current()?.series;
        match format {
            ExportFormat::Xlsx => write_workbook(series, writer),
            ExportFormat::Csv => write_csv(series, writer),
        }
    }

    /// Save the session series; the extension picks the format
    pub fn export_file(&self, session: &Session, path: &Path) -> Result<usize> {
        export_to_path(&session.current()?.series, path)
    }

    /// Drop the cached company listing
    pub async fn refresh(&self) {
        self.resolver.directory_cache().invalidate().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crossover::CrossoverDirection;
    use crate::filings::{CorpInfo, FsDivision, ReportPeriod, StatementLine};
    use crate::model::CompanyDirectory;
    use crate::model::fixtures::{day, series_from_closes};
    use crate::news::NewsItem;
    use crate::providers::{
        MockFilingProvider, MockListingProvider, MockNewsProvider, MockPriceProvider,
    };
    use async_trait::async_trait;
    use std::time::Duration;

    fn code(s: &str) -> SecurityCode {
        SecurityCode::parse(s).unwrap()
    }

    fn range() -> DateRange {
        DateRange::new(day(0), day(60)).unwrap()
    }

    fn directory() -> CompanyDirectory {
        vec![("삼성전자".to_string(), code("005930"))]
            .into_iter()
            .collect()
    }

    fn listing() -> MockListingProvider {
        let mut listing = MockListingProvider::new();
        listing.expect_fetch_listing().returning(|| Ok(directory()));
        listing
    }

    fn prices_returning(series: PriceSeries) -> MockPriceProvider {
        let mut prices = MockPriceProvider::new();
        prices
            .expect_fetch_prices()
            .returning(move |_, _| Ok(series.clone()));
        prices
    }

    fn dashboard(
        listing: MockListingProvider,
        prices: impl PriceProvider + 'static,
        filings: Option<MockFilingProvider>,
        news: MockNewsProvider,
    ) -> Dashboard {
        Dashboard::new(
            DashboardConfig::default(),
            Arc::new(listing),
            Arc::new(prices),
            filings.map(|f| Arc::new(f) as Arc<dyn FilingProvider>),
            Arc::new(news),
        )
    }

    fn simple(prices: MockPriceProvider) -> Dashboard {
        dashboard(listing(), prices, None, MockNewsProvider::new())
    }

    async fn queried(dashboard: &Dashboard) -> Session {
        let mut session = Session::new();
        dashboard.query(&mut session, "삼성전자", range()).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_query_by_code_skips_listing() {
        let mut listing = MockListingProvider::new();
        listing.expect_fetch_listing().never();
        let mut prices = MockPriceProvider::new();
        prices
            .expect_fetch_prices()
            .withf(|c, _| c.as_str() == "000660")
            .times(1)
            .returning(|_, _| Ok(series_from_closes(&[1.0, 2.0, 3.0])));

        let dash = dashboard(listing, prices, None, MockNewsProvider::new());
        let mut session = Session::new();
        let outcome = dash.query(&mut session, "000660", range()).await.unwrap();

        assert_eq!(outcome.title, "000660 (000660)");
        assert_eq!(outcome.rows, 3);
        assert!(outcome.warnings.is_empty());
        assert_eq!(session.current().unwrap().code.as_str(), "000660");
    }

    #[tokio::test]
    async fn test_query_by_name() {
        let dash = simple(prices_returning(series_from_closes(&[10.0, 11.0])));
        let mut session = Session::new();
        let outcome = dash.query(&mut session, "삼성전자", range()).await.unwrap();

        assert_eq!(outcome.code.as_str(), "005930");
        assert_eq!(outcome.title, "삼성전자 (005930)");
    }

    #[tokio::test]
    async fn test_empty_identifier() {
        let mut listing = MockListingProvider::new();
        listing.expect_fetch_listing().never();
        let dash = dashboard(listing, MockPriceProvider::new(), None, MockNewsProvider::new());

        let mut session = Session::new();
        for raw in ["", "   "] {
            let err = dash.query(&mut session, raw, range()).await.unwrap_err();
            assert!(matches!(err, StockError::EmptyQuery));
        }
    }

    #[tokio::test]
    async fn test_failures_keep_previous_snapshot() {
        let mut prices = MockPriceProvider::new();
        let mut calls = 0;
        prices.expect_fetch_prices().returning(move |_, _| {
            calls += 1;
            match calls {
                1 => Ok(series_from_closes(&[10.0, 11.0])),
                2 => Err(StockError::api("Yahoo Finance", "HTTP 500")),
                _ => Ok(PriceSeries::default()),
            }
        });
        let dash = simple(prices);
        let mut session = queried(&dash).await;

        let err = dash.query(&mut session, "005930", range()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Fetch);

        let err = dash.query(&mut session, "005930", range()).await.unwrap_err();
        assert!(matches!(err, StockError::EmptyResult(_)));
        assert!(err.is_soft());

        let err = dash.query(&mut session, "없는회사", range()).await.unwrap_err();
        assert!(matches!(err, StockError::SymbolNotFound(_)));

        assert_eq!(session.current().unwrap().label, "삼성전자");
        assert_eq!(session.current().unwrap().series.len(), 2);
    }

    #[tokio::test]
    async fn test_listing_failure_reported_as_warning() {
        let mut listing = MockListingProvider::new();
        listing
            .expect_fetch_listing()
            .returning(|| Err(StockError::api("KRX listing", "HTTP 503")));
        let dash = dashboard(
            listing,
            prices_returning(series_from_closes(&[1.0])),
            None,
            MockNewsProvider::new(),
        );

        let mut session = Session::new();
        let err = dash.query(&mut session, "삼성전자", range()).await.unwrap_err();
        assert!(matches!(err, StockError::ListingUnavailable { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Fetch);
        assert!(err.to_string().contains("HTTP 503"));
        assert!(!session.has_snapshot());

        let outcome = dash.query(&mut session, "005930", range()).await.unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("HTTP 503"));
        assert!(session.has_snapshot());
    }

    struct SlowPrices;

    #[async_trait]
    impl PriceProvider for SlowPrices {
        async fn fetch_prices(&self, _: &SecurityCode, _: &DateRange) -> Result<PriceSeries> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(PriceSeries::default())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_timeout() {
        let dash = dashboard(listing(), SlowPrices, None, MockNewsProvider::new());
        let mut session = Session::new();

        let err = dash.query(&mut session, "005930", range()).await.unwrap_err();
        assert!(matches!(err, StockError::Timeout { .. }));
        assert!(!session.has_snapshot());
    }

    #[tokio::test]
    async fn test_views_require_query() {
        let dash = simple(MockPriceProvider::new());
        let session = Session::new();

        assert!(matches!(dash.overview(&session), Err(StockError::NoActiveQuery)));
        assert!(matches!(dash.indicators(&session), Err(StockError::NoActiveQuery)));
        assert!(matches!(
            dash.news(&session, None, None).await,
            Err(StockError::NoActiveQuery)
        ));
        assert!(matches!(
            dash.export(&session, ExportFormat::Xlsx, Vec::new()),
            Err(StockError::NoActiveQuery)
        ));
    }

    #[tokio::test]
    async fn test_overview() {
        let dash = simple(prices_returning(series_from_closes(&[100.0, 110.0, 90.0, 95.0])));
        let session = queried(&dash).await;

        let overview = dash.overview(&session).unwrap();
        assert_eq!(overview.rows, 4);
        assert!((overview.metrics.period_return.unwrap() - -5.0).abs() < 1e-9);
        assert_eq!(overview.metrics.high_close, Some(110.0));
    }

    #[tokio::test]
    async fn test_indicators_crossover() {
        // flat, then a sharp rise pulls MA5 above MA20
        let mut closes = vec![100.0; 30];
        closes.extend([90.0, 90.0, 90.0, 140.0, 150.0, 160.0]);
        let dash = simple(prices_returning(series_from_closes(&closes)));
        let session = queried(&dash).await;

        let view = dash.indicators(&session).unwrap();
        assert_eq!(view.dates.len(), closes.len());
        assert_eq!(view.moving_averages.len(), 4);
        assert_eq!(view.volume_signal, None);

        let event = view.crossover.unwrap();
        assert_eq!(event.direction, CrossoverDirection::Golden);
        assert!(event.date > day(30));
    }

    #[tokio::test]
    async fn test_filings_disabled_without_provider() {
        let dash = simple(prices_returning(series_from_closes(&[1.0, 2.0])));
        let session = queried(&dash).await;

        let view = dash.filings(&session, FilingRequest::default_for(2025)).await.unwrap();
        assert_eq!(view, FilingsView::Disabled);
        assert!(!dash.filings_enabled());
    }

    fn samsung() -> CorpInfo {
        CorpInfo {
            corp_code: "00126380".to_string(),
            corp_name: "삼성전자".to_string(),
            stock_code: Some("005930".to_string()),
        }
    }

    #[tokio::test]
    async fn test_filings_statements_with_fallback() {
        let mut filings = MockFilingProvider::new();
        filings
            .expect_find_corp()
            .withf(|name| name == "삼성전자")
            .returning(|_| Ok(Some(samsung())));
        filings
            .expect_fetch_statements()
            .withf(|corp, year, period| {
                corp == "00126380" && *year == 2024 && *period == ReportPeriod::Annual
            })
            .returning(|_, _, _| {
                Ok(vec![StatementLine {
                    division: Some(FsDivision::Separate),
                    statement_code: "IS".to_string(),
                    statement_name: "손익계산서".to_string(),
                    account: "매출액".to_string(),
                    current: Some(100),
                    previous: Some(90),
                    before_previous: None,
                    currency: Some("KRW".to_string()),
                }])
            });

        let dash = dashboard(
            listing(),
            prices_returning(series_from_closes(&[1.0, 2.0])),
            Some(filings),
            MockNewsProvider::new(),
        );
        let session = queried(&dash).await;

        let view = dash.filings(&session, FilingRequest::default_for(2025)).await.unwrap();
        let FilingsView::Statements(statements) = view else {
            panic!("expected statements, got {view:?}");
        };
        assert!(statements.selection.fell_back);
        assert_eq!(statements.summary, vec![("매출액".to_string(), 100)]);
    }

    #[tokio::test]
    async fn test_filings_corp_not_found_and_no_data() {
        let mut filings = MockFilingProvider::new();
        let mut calls = 0;
        filings.expect_find_corp().returning(move |_| {
            calls += 1;
            Ok((calls > 1).then(samsung))
        });
        filings
            .expect_fetch_statements()
            .returning(|_, _, _| Ok(Vec::new()));

        let dash = dashboard(
            listing(),
            prices_returning(series_from_closes(&[1.0, 2.0])),
            Some(filings),
            MockNewsProvider::new(),
        );
        let session = queried(&dash).await;
        let request = FilingRequest::default_for(2025);

        assert_eq!(
            dash.filings(&session, request).await.unwrap(),
            FilingsView::CorpNotFound("삼성전자".to_string())
        );
        assert!(matches!(
            dash.filings(&session, request).await.unwrap(),
            FilingsView::NoData { .. }
        ));
    }

    #[tokio::test]
    async fn test_filings_no_lines_left_after_division_pick() {
        let mut filings = MockFilingProvider::new();
        filings.expect_find_corp().returning(|_| Ok(Some(samsung())));
        filings.expect_fetch_statements().returning(|_, _, _| {
            Ok(vec![StatementLine {
                division: Some(FsDivision::Consolidated),
                statement_code: "BS".to_string(),
                statement_name: "재무상태표".to_string(),
                account: "자산총계".to_string(),
                current: Some(500),
                previous: None,
                before_previous: None,
                currency: Some("KRW".to_string()),
            }])
        });

        let dash = dashboard(
            listing(),
            prices_returning(series_from_closes(&[1.0, 2.0])),
            Some(filings),
            MockNewsProvider::new(),
        );
        let session = queried(&dash).await;
        let request = FilingRequest {
            division: FsDivision::Separate,
            ..FilingRequest::default_for(2025)
        };

        assert_eq!(
            dash.filings(&session, request).await.unwrap(),
            FilingsView::NoData {
                corp: samsung(),
                request
            }
        );
    }

    fn news_item(title: &str, published: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            link: String::new(),
            published: published.to_string(),
            source: None,
        }
    }

    #[tokio::test]
    async fn test_news_defaults_to_company_and_clamps_limit() {
        let mut news = MockNewsProvider::new();
        news.expect_search()
            .withf(|query, limit| query == "삼성전자" && *limit == 5)
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    news_item("older", "Mon, 13 Jan 2025 06:30:00 GMT"),
                    news_item("newer", "Tue, 14 Jan 2025 06:30:00 GMT"),
                ])
            });
        news.expect_search()
            .withf(|query, limit| query == "반도체" && *limit == 10)
            .times(1)
            .returning(|_, _| Ok(Vec::new()));

        let dash = dashboard(
            listing(),
            prices_returning(series_from_closes(&[1.0, 2.0])),
            None,
            news,
        );
        let session = queried(&dash).await;

        let view = dash.news(&session, Some("  "), Some(1)).await.unwrap();
        assert_eq!(view.query, "삼성전자");
        assert_eq!(view.items[0].title, "newer");

        let view = dash.news(&session, Some("반도체"), None).await.unwrap();
        assert!(view.is_empty());
    }

    #[tokio::test]
    async fn test_export() {
        let dash = simple(prices_returning(series_from_closes(&[1.0, 2.0, 3.0])));
        let session = queried(&dash).await;

        let series = &*session.current().unwrap().series;

        let mut workbook = Vec::new();
        assert_eq!(dash.export(&session, ExportFormat::Xlsx, &mut workbook).unwrap(), 3);
        assert_eq!(crate::export::import_workbook_bytes(&workbook).unwrap(), *series);

        let mut csv = Vec::new();
        assert_eq!(dash.export(&session, ExportFormat::Csv, &mut csv).unwrap(), 3);
        assert_eq!(crate::export::import_csv(csv.as_slice()).unwrap(), *series);
    }

    #[tokio::test]
    async fn test_load_series() {
        let dash = simple(MockPriceProvider::new());
        let mut session = Session::new();

        let outcome = dash
            .load_series(&mut session, "005930", series_from_closes(&[5.0, 6.0]))
            .await
            .unwrap();
        assert_eq!(outcome.range, DateRange::new(day(0), day(1)).unwrap());

        let err = dash
            .load_series(&mut session, "005930", PriceSeries::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::EmptyResult(_)));
        assert_eq!(session.current().unwrap().series.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_reloads_listing() {
        let mut listing = MockListingProvider::new();
        listing
            .expect_fetch_listing()
            .times(2)
            .returning(|| Ok(directory()));
        let dash = dashboard(
            listing,
            prices_returning(series_from_closes(&[1.0])),
            None,
            MockNewsProvider::new(),
        );

        let mut session = Session::new();
        dash.query(&mut session, "삼성전자", range()).await.unwrap();
        dash.query(&mut session, "삼성전자", range()).await.unwrap();
        dash.refresh().await;
        dash.query(&mut session, "삼성전자", range()).await.unwrap();
    }
}
