use chrono::NaiveDate;
use rousoku_core::common::{ChartRequest, DayLayout};
use rousoku_core::config::FeedConfig;
use rousoku_core::feed::error::FeedError;
use rousoku_core::feed::port::ChartProvider;
use rousoku_feed::barchart::BarchartProvider;
use rousoku_feed::parser::DocumentParser;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// 构造一段 onmousemove 载荷，格式与数据源页面一致。
fn payload(day: &str, bar: [f64; 4]) -> String {
    format!(
        "showOHLC(event, &#39;T&#39;, &#39;[{day}, 2016 09:30]&#39;, &#39;AAPL&#39;, &#39;O: ${:.5}&#39;, &#39;H: ${:.5}&#39;, &#39;L: ${:.5}&#39;, &#39;C: ${:.5}&#39;)",
        bar[0], bar[1], bar[2], bar[3]
    )
}

/// # Summary
/// 生成测试用图表页面。
///
/// # Logic
/// 1. 前 `day_one` 根 K 线属于 10/07，其余属于 10/10。
/// 2. 页面中的 `<area>` 按时间倒序排列。
fn fixture(bars: &[[f64; 4]], day_one: usize) -> String {
    let areas: String = bars
        .iter()
        .enumerate()
        .rev()
        .map(|(i, bar)| {
            let day = if i < day_one { "10/07" } else { "10/10" };
            format!(
                "<area shape=\"rect\" coords=\"{i},0,{i},1\" onmousemove=\"{}\">\n",
                payload(day, *bar)
            )
        })
        .collect();
    format!(
        "<html><body><map name=\"menu\"></map><center><img usemap=\"#chart\">\
         <map name=\"chart\">\n{areas}</map></center></body></html>"
    )
}

fn bar(i: usize) -> [f64; 4] {
    let p = 100.0 + f64::from(u32::try_from(i).unwrap()) * 0.25;
    [p, p + 0.5, p - 0.5, p + 0.125]
}

fn request() -> ChartRequest {
    ChartRequest::new(
        "AAPL",
        5,
        NaiveDate::from_ymd_opt(2016, 10, 7).unwrap(),
        NaiveDate::from_ymd_opt(2016, 10, 10).unwrap(),
    )
}

/// 启动一个只应答一次的本地 HTTP 服务，返回服务地址。
async fn serve_once(status: &'static str, body: String, delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let mut read = Vec::new();
        while !read.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            read.extend_from_slice(&buf[..n]);
        }
        tokio::time::sleep(delay).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = socket.write_all(response.as_bytes()).await;
    });
    format!("http://{addr}/chart.php")
}

fn provider(base_url: String, timeout_secs: u64) -> BarchartProvider {
    BarchartProvider::new(&FeedConfig {
        base_url,
        timeout_secs,
        ..FeedConfig::default()
    })
    .unwrap()
}

/// # Summary
/// 完整页面解析：倒序页面被还原为 85 根正序 K 线，元数据取自固定位置。
#[test]
fn test_parse_full_document() {
    let bars: Vec<[f64; 4]> = (0..160).map(bar).collect();
    let html = fixture(&bars, 79);
    let parsed = DocumentParser::new()
        .unwrap()
        .parse(&html, &DayLayout::default())
        .unwrap();

    assert_eq!(parsed.bars.len(), 85);
    assert_eq!(parsed.bars[0], bar(0));
    assert_eq!(parsed.bars[84], bar(84));
    assert_eq!(parsed.meta.first_day, "10/07");
    assert_eq!(parsed.meta.second_day, "10/10");
    assert_eq!(parsed.meta.year, "2016");
    assert_eq!(parsed.meta.symbol, "AAPL");
    assert_eq!(parsed.to_chart().len(), 85);
}

/// # Summary
/// 157 根原始 K 线且下标 78 为单值占位时，插入承接前收盘价的 K 线。
#[test]
fn test_parse_repairs_missing_session_close() {
    let mut bars: Vec<[f64; 4]> = (0..157).map(bar).collect();
    bars[78] = [120.0; 4];
    let html = fixture(&bars, 78);
    let parsed = DocumentParser::new()
        .unwrap()
        .parse(&html, &DayLayout::default())
        .unwrap();

    assert_eq!(parsed.bars.len(), 85);
    assert_eq!(parsed.bars[78], [bar(77)[3]; 4]);
    assert_eq!(parsed.bars[79], [120.0; 4]);
    assert_eq!(parsed.bars[80], bar(79));
}

/// # Summary
/// 原始 K 线恰为 156 根 (最小长度) 时同样修复占位 K 线，修复后截断为 85 根。
#[test]
fn test_parse_repairs_minimal_document() {
    let mut bars: Vec<[f64; 4]> = (0..156).map(bar).collect();
    bars[77][3] = 7.0;
    bars[78] = [5.0; 4];
    let html = fixture(&bars, 78);
    let parsed = DocumentParser::new()
        .unwrap()
        .parse(&html, &DayLayout::default())
        .unwrap();

    assert_eq!(parsed.bars.len(), 85);
    assert_eq!(parsed.bars[77][3], 7.0);
    assert_eq!(parsed.bars[78], [7.0; 4]);
    assert_eq!(parsed.bars[79], [5.0; 4]);
    assert_eq!(parsed.bars[84], bar(83));
    assert_eq!(parsed.meta.second_day, "10/10");
}

#[test]
fn test_parse_rejects_short_document() {
    let bars: Vec<[f64; 4]> = (0..100).map(bar).collect();
    let html = fixture(&bars, 79);
    let result = DocumentParser::new()
        .unwrap()
        .parse(&html, &DayLayout::default());
    assert_eq!(
        result,
        Err(FeedError::IncompleteChart {
            found: 100,
            required: 156
        })
    );
}

/// # Summary
/// 通过本地 HTTP 服务验证完整的抓取 + 解析流程。
#[tokio::test]
async fn test_fetch_chart_from_local_server() {
    let bars: Vec<[f64; 4]> = (0..158).map(bar).collect();
    let url = serve_once("200 OK", fixture(&bars, 79), Duration::ZERO).await;

    let parsed = provider(url, 5)
        .fetch_chart(&request(), &DayLayout::default())
        .await
        .unwrap();
    assert_eq!(parsed.bars.len(), 85);
    assert_eq!(parsed.meta.symbol, "AAPL");
}

#[tokio::test]
async fn test_http_error_is_fetch_error() {
    let url = serve_once("500 Internal Server Error", String::new(), Duration::ZERO).await;

    let result = provider(url, 5)
        .fetch_chart(&request(), &DayLayout::default())
        .await;
    match result {
        Err(FeedError::Fetch { request: r, reason }) => {
            assert_eq!(r, request());
            assert!(reason.contains("500"), "unexpected reason: {reason}");
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let url = serve_once("200 OK", String::new(), Duration::from_secs(3)).await;

    let result = provider(url, 1)
        .fetch_chart(&request(), &DayLayout::default())
        .await;
    assert!(
        matches!(result, Err(FeedError::Fetch { .. })),
        "expected fetch error, got {result:?}"
    );
}

/// # Summary
/// 页面不含图表区块 (例如被限流时的提示页) 时返回解析错误。
#[tokio::test]
async fn test_unexpected_page_is_parse_error() {
    let url = serve_once(
        "200 OK",
        "<html><body>Too many requests</body></html>".into(),
        Duration::ZERO,
    )
    .await;

    let result = provider(url, 5)
        .fetch_chart(&request(), &DayLayout::default())
        .await;
    assert!(matches!(result, Err(FeedError::Parse(_))));
}
