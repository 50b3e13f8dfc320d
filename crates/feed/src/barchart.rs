use crate::parser::DocumentParser;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reqwest::{Client, Request};
use rousoku_core::common::{ChartRequest, DayLayout};
use rousoku_core::config::FeedConfig;
use rousoku_core::feed::entity::ParsedChart;
use rousoku_core::feed::error::FeedError;
use rousoku_core::feed::port::ChartProvider;
use std::time::Duration;
use tracing::{debug, warn};

/// # Summary
/// Barchart 盘中技术图表页面的抓取实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯，所有请求都带超时。
/// - 实例本身无可变状态，可通过 `Arc` 在多个 worker 间共享。
#[derive(Clone)]
pub struct BarchartProvider {
    /// 内部使用的 HTTP 客户端
    client: Client,
    /// 图表页面地址 (不含查询参数)
    base_url: String,
    /// 超时时长 (秒)，用于错误信息
    timeout_secs: u64,
    parser: DocumentParser,
}

impl BarchartProvider {
    /// # Summary
    /// 创建一个新的 BarchartProvider 实例。
    ///
    /// # Logic
    /// 1. 安装 rustls 的 ring 加密后端 (已安装时忽略)。
    /// 2. 按配置设置超时与伪装浏览器 Header (User-Agent)。
    /// 3. 初始化 reqwest 客户端与页面解析器。
    ///
    /// # Arguments
    /// * `config`: 数据源配置。
    ///
    /// # Returns
    /// 成功返回实例；客户端构建失败返回 `FeedError::Parse`。
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FeedError::Parse(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            timeout_secs: config.timeout_secs,
            parser: DocumentParser::new()?,
        })
    }

    /// 数据源要求的日期格式：`M/D/YYYY` (不补零)，查询编码后为 `M%2FD%2FYYYY`。
    fn format_date(date: NaiveDate) -> String {
        format!("{}/{}/{}", date.month(), date.day(), date.year())
    }

    fn query_params(request: &ChartRequest) -> Vec<(&'static str, String)> {
        let start = Self::format_date(request.start);
        let end = Self::format_date(request.end);
        vec![
            ("sym", request.symbol.clone()),
            ("style", "technical".into()),
            ("template", String::new()),
            ("p", "I".into()),
            ("d", "L".into()),
            ("im", request.interval_minutes.to_string()),
            ("sd", start),
            ("ed", end.clone()),
            ("size", "S".into()),
            ("log", "0".into()),
            ("t", "CANDLE".into()),
            ("v", "0".into()),
            ("evnt", "1".into()),
            ("late", "1".into()),
            ("o1", String::new()),
            ("o2", String::new()),
            ("o3", String::new()),
            ("sh", "100".into()),
            ("indicators", String::new()),
            ("addindicator", String::new()),
            ("submitted", "1".into()),
            ("fpage", String::new()),
            ("txtDate", end),
        ]
    }

    /// # Summary
    /// 根据请求构建完整的 HTTP 请求 (含查询参数)。
    ///
    /// # Returns
    /// 成功返回 `Request`，地址非法时返回携带原始请求的 `FeedError::Fetch`。
    pub fn build_request(&self, request: &ChartRequest) -> Result<Request, FeedError> {
        self.client
            .get(&self.base_url)
            .query(&Self::query_params(request))
            .build()
            .map_err(|e| FeedError::Fetch {
                request: request.clone(),
                reason: format!("invalid request: {e}"),
            })
    }

    /// # Summary
    /// 抓取原始页面文本。
    ///
    /// # Logic
    /// 1. 构建请求并发送。
    /// 2. 超时、传输失败或非成功状态码统一转换为 `FeedError::Fetch`。
    /// 3. 读取响应正文。
    pub async fn fetch_document(&self, request: &ChartRequest) -> Result<String, FeedError> {
        let fetch_error = |reason: String| FeedError::Fetch {
            request: request.clone(),
            reason,
        };
        let describe = |e: reqwest::Error| {
            if e.is_timeout() {
                format!("timed out after {}s", self.timeout_secs)
            } else {
                e.to_string()
            }
        };

        let http_request = self.build_request(request)?;
        debug!("GET {}", http_request.url());

        let resp = self
            .client
            .execute(http_request)
            .await
            .map_err(|e| fetch_error(describe(e)))?;

        if !resp.status().is_success() {
            warn!("Chart request {} returned HTTP {}", request, resp.status());
            return Err(fetch_error(format!("HTTP {}", resp.status())));
        }

        resp.text().await.map_err(|e| fetch_error(describe(e)))
    }
}

#[async_trait]
impl ChartProvider for BarchartProvider {
    /// # Summary
    /// 抓取页面并解析为图表。
    ///
    /// # Logic
    /// 1. 调用 `fetch_document` 获取页面。
    /// 2. 交给 `DocumentParser::parse` 提取 K 线与元数据。
    async fn fetch_chart(
        &self,
        request: &ChartRequest,
        layout: &DayLayout,
    ) -> Result<ParsedChart, FeedError> {
        let document = self.fetch_document(request).await?;
        self.parser.parse(&document, layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_template() {
        let provider = BarchartProvider::new(&FeedConfig::default()).unwrap();
        let request = ChartRequest::new(
            "AAPL",
            5,
            NaiveDate::from_ymd_opt(2014, 3, 6).unwrap(),
            NaiveDate::from_ymd_opt(2014, 3, 7).unwrap(),
        );
        let http_request = provider.build_request(&request).unwrap();
        let url = http_request.url().as_str();

        assert!(url.starts_with("http://www.barchart.com/chart.php?sym=AAPL&style=technical&template=&p=I&d=L&im=5"));
        assert!(url.contains("&sd=3%2F6%2F2014&ed=3%2F7%2F2014&"));
        assert!(url.ends_with("&txtDate=3%2F7%2F2014"));
    }

    #[test]
    fn test_invalid_base_url_is_fetch_error() {
        let config = FeedConfig {
            base_url: "not a url".into(),
            ..FeedConfig::default()
        };
        let provider = BarchartProvider::new(&config).unwrap();
        let request = ChartRequest::new(
            "AAPL",
            5,
            NaiveDate::from_ymd_opt(2014, 3, 6).unwrap(),
            NaiveDate::from_ymd_opt(2014, 3, 7).unwrap(),
        );
        match provider.build_request(&request) {
            Err(FeedError::Fetch { request: r, .. }) => assert_eq!(r, request),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
