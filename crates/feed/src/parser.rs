use regex::{Captures, Regex};
use rousoku_core::chart::entity::ChartMeta;
use rousoku_core::common::DayLayout;
use rousoku_core::feed::entity::ParsedChart;
use rousoku_core::feed::error::FeedError;
use tracing::debug;

/// 每根 K 线载荷中固定丢弃的前导片段数量。
const FRAMING_TOKENS: usize = 2;

/// 去掉前导片段后，元数据片段 (日期、年份、代码) 的数量。
const META_TOKENS: usize = 3;

/// # Summary
/// 从图表页面中提取数值化的 K 线与元数据。
///
/// # Invariants
/// - 页面格式由数据源决定，必须按原样逐字节解析，不做任何格式归一化。
/// - 解析器只持有编译好的正则，无可变状态，可在多个任务间共享。
#[derive(Debug, Clone)]
pub struct DocumentParser {
    // 第一个 <center> 之后的第一个 <map> 区块
    map_block: Regex,
    // <map> 内的每个 <area> 标签
    area_tag: Regex,
    // <area> 上的 onmousemove 属性值
    mouse_over: Regex,
    // 十进制 &#NNN; 与十六进制 &#xHH; 字符引用
    numeric_entity: Regex,
}

impl DocumentParser {
    /// # Summary
    /// 编译页面解析所需的正则表达式。
    ///
    /// # Returns
    /// 成功返回解析器，正则编译失败返回 `FeedError::Parse`。
    pub fn new() -> Result<Self, FeedError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| FeedError::Parse(format!("invalid pattern: {e}")))
        };
        Ok(Self {
            map_block: compile(r"(?is)<center\b.*?<map\b[^>]*>(.*?)</map\s*>")?,
            area_tag: compile(r"(?is)<area\b[^>]*>")?,
            mouse_over: compile(r#"(?is)\bonmousemove\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
            numeric_entity: compile(r"(?i)&#(x[0-9a-f]+|[0-9]+);")?,
        })
    }

    /// # Summary
    /// 提取页面中每根 K 线的 onmousemove 文本载荷，保持文档顺序。
    ///
    /// # Logic
    /// 1. 定位第一个 `<center>` 内的 `<map>` 区块。
    /// 2. 遍历其中全部 `<area>` 标签，读取 onmousemove 属性并解码 HTML 实体。
    ///
    /// # Returns
    /// 载荷列表；找不到图表区块或某个 `<area>` 缺少属性时返回 `FeedError::Parse`。
    pub fn extract_payloads(&self, html: &str) -> Result<Vec<String>, FeedError> {
        let block = self
            .map_block
            .captures(html)
            .and_then(|c| c.get(1))
            .ok_or_else(|| FeedError::Parse("no chart <map> found inside <center>".into()))?;

        self.area_tag
            .find_iter(block.as_str())
            .map(|tag| {
                self.mouse_over
                    .captures(tag.as_str())
                    .and_then(|c| c.get(1).or_else(|| c.get(2)))
                    .map(|m| self.decode_entities(m.as_str()))
                    .ok_or_else(|| {
                        FeedError::Parse(format!("<area> without onmousemove: {}", tag.as_str()))
                    })
            })
            .collect()
    }

    /// # Summary
    /// 将完整页面解析为一张固定长度的图表。
    ///
    /// # Logic
    /// 1. 提取载荷；数量少于 `layout.min_raw_candles` 时返回 `IncompleteChart`。
    /// 2. 页面按时间倒序排列，反转为正序。
    /// 3. 按 `", "` 切分载荷并丢弃前两个片段。
    /// 4. 从第一根 K 线读取 first_day / year / symbol，从次日第一根读取 second_day。
    /// 5. 剩余片段中的前四个解析为 open / high / low / close。
    /// 6. 修复缺失的收盘占位 K 线 (`repair_session_close`)。
    /// 7. 截断为 `layout.chart_len()` 根，不足时返回 `IncompleteChart`。
    ///
    /// # Arguments
    /// * `html`: 数据源返回的页面文本。
    /// * `layout`: 图表形态参数。
    ///
    /// # Returns
    /// 成功返回 `ParsedChart`。
    pub fn parse(&self, html: &str, layout: &DayLayout) -> Result<ParsedChart, FeedError> {
        let mut payloads = self.extract_payloads(html)?;
        if payloads.len() < layout.min_raw_candles {
            return Err(FeedError::IncompleteChart {
                found: payloads.len(),
                required: layout.min_raw_candles,
            });
        }
        payloads.reverse();

        let rows: Vec<Vec<&str>> = payloads
            .iter()
            .map(|p| p.split(", ").skip(FRAMING_TOKENS).collect())
            .collect();

        let meta = extract_meta(&rows, layout)?;

        let mut bars = rows
            .iter()
            .map(|tokens| parse_bar(tokens))
            .collect::<Result<Vec<_>, _>>()?;

        repair_session_close(&mut bars, layout);

        let chart_len = layout.chart_len();
        if bars.len() < chart_len {
            return Err(FeedError::IncompleteChart {
                found: bars.len(),
                required: chart_len,
            });
        }
        bars.truncate(chart_len);
        debug!("Parsed {} candles for {}", bars.len(), meta.symbol);

        Ok(ParsedChart { bars, meta })
    }

    /// # Summary
    /// 解码属性值中的 HTML 实体。
    ///
    /// # Logic
    /// 1. 替换命名实体 `&quot;` `&apos;` `&lt;` `&gt;`。
    /// 2. 替换数字字符引用 `&#NNN;` / `&#xHH;`；码点无效时保留原文。
    /// 3. 最后替换 `&amp;`，使 `&amp;#36;` 只解码一层。
    fn decode_entities(&self, raw: &str) -> String {
        let named = raw
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">");
        self.numeric_entity
            .replace_all(&named, |caps: &Captures| {
                let original = caps.get(0).map_or("", |m| m.as_str());
                caps.get(1)
                    .and_then(|code| decode_char_ref(code.as_str()))
                    .map_or_else(|| original.to_string(), String::from)
            })
            .replace("&amp;", "&")
    }
}

/// `36` 或 `x24` 形式的字符引用转为字符。
fn decode_char_ref(code: &str) -> Option<char> {
    let value = match code.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => code.parse::<u32>().ok()?,
    };
    char::from_u32(value)
}

/// # Summary
/// 从夹杂标点的文本片段中提取浮点数。
///
/// # Logic
/// 1. 去掉第一个数字之前与最后一个数字之后的全部字符。
/// 2. 将剩余部分解析为 `f64`。
///
/// # Arguments
/// * `token`: 例如 `"$17.15000,"`。
///
/// # Returns
/// 成功返回数值；片段中没有数字或剩余部分无法解析时返回 `FeedError::Parse`。
pub fn ugly_text_to_float(token: &str) -> Result<f64, FeedError> {
    let (Some(first), Some(last)) = (
        token.find(|c: char| c.is_ascii_digit()),
        token.rfind(|c: char| c.is_ascii_digit()),
    ) else {
        return Err(FeedError::Parse(format!("no digits in token '{token}'")));
    };

    let digits = &token[first..=last];
    digits
        .parse::<f64>()
        .map_err(|e| FeedError::Parse(format!("token '{token}' is not a number: {e}")))
}

/// # Summary
/// 补回数据源偶尔缺失的当日最后一根 K 线。
///
/// # Logic
/// 原始 K 线数量恰为 `min_raw_candles` 或 `min_raw_candles + 1`，
/// 且收盘下标处的 K 线四个字段完全相同 (数据源插入的单值占位) 时，
/// 在该下标处插入一根四个字段都等于前一根收盘价的 K 线，后续 K 线整体后移一位。
///
/// # Arguments
/// * `bars`: 正序排列的原始 K 线。
/// * `layout`: 图表形态参数。
pub fn repair_session_close(bars: &mut Vec<[f64; 4]>, layout: &DayLayout) {
    let len = bars.len();
    if len != layout.min_raw_candles && len != layout.min_raw_candles + 1 {
        return;
    }
    let index = layout.session_close_index();
    let (Some(placeholder), Some(prior)) = (
        bars.get(index),
        index.checked_sub(1).and_then(|i| bars.get(i)),
    ) else {
        return;
    };

    let [open, high, low, close] = *placeholder;
    if open == high && high == low && low == close {
        let carried = prior[3];
        debug!("Repairing session close placeholder at {index} with {carried}");
        bars.insert(index, [carried; 4]);
    }
}

fn extract_meta(rows: &[Vec<&str>], layout: &DayLayout) -> Result<ChartMeta, FeedError> {
    let first = rows
        .first()
        .ok_or_else(|| FeedError::Parse("document has no candles".into()))?;
    let second = rows
        .get(layout.next_day_index())
        .ok_or(FeedError::IncompleteChart {
            found: rows.len(),
            required: layout.next_day_index() + 1,
        })?;

    let token = |tokens: &[&str], i: usize| -> Result<String, FeedError> {
        tokens
            .get(i)
            .map(|t| (*t).to_string())
            .ok_or_else(|| FeedError::Parse(format!("payload missing metadata field {i}")))
    };

    Ok(ChartMeta {
        first_day: token(first, 0)?.chars().skip(2).collect(),
        year: token(first, 1)?.chars().take(4).collect(),
        symbol: strip_quotes(&token(first, 2)?),
        second_day: token(second, 0)?.chars().skip(2).collect(),
    })
}

fn parse_bar(tokens: &[&str]) -> Result<[f64; 4], FeedError> {
    let numbers = tokens.get(META_TOKENS..META_TOKENS + 4).ok_or_else(|| {
        FeedError::Parse(format!(
            "payload has {} fields, expected at least {}",
            tokens.len(),
            META_TOKENS + 4
        ))
    })?;
    Ok([
        ugly_text_to_float(numbers[0])?,
        ugly_text_to_float(numbers[1])?,
        ugly_text_to_float(numbers[2])?,
        ugly_text_to_float(numbers[3])?,
    ])
}

/// 去掉首尾各一个字符 (数据源在代码两侧加了引号)。
fn strip_quotes(token: &str) -> String {
    let mut chars = token.chars();
    chars.next();
    chars.next_back();
    chars.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ugly_text_to_float() {
        assert_eq!(ugly_text_to_float("$17.15000,").unwrap(), 17.15);
        assert_eq!(ugly_text_to_float("'O: $530.81000'").unwrap(), 530.81);
        assert_eq!(ugly_text_to_float("7").unwrap(), 7.0);
        assert!(matches!(ugly_text_to_float("$,"), Err(FeedError::Parse(_))));
        assert!(matches!(ugly_text_to_float(""), Err(FeedError::Parse(_))));
        assert!(matches!(ugly_text_to_float("1.2.3"), Err(FeedError::Parse(_))));
    }

    #[test]
    fn test_extract_payloads_reads_areas_in_map() {
        let parser = DocumentParser::new().unwrap();
        let html = r#"<html><map name="nav"><area onmousemove="ignored"></map>
            <CENTER><img src="c.png"><MAP name="chart">
              <AREA shape="rect" onmousemove="tip(this, 'a, &quot;b&quot;')">
              <area onmousemove='tip(x, y)' coords="1,2,3,4">
            </MAP></CENTER></html>"#;
        let payloads = parser.extract_payloads(html).unwrap();
        assert_eq!(payloads, vec!["tip(this, 'a, \"b\"')", "tip(x, y)"]);
    }

    #[test]
    fn test_decode_entities() {
        let parser = DocumentParser::new().unwrap();
        assert_eq!(parser.decode_entities("&#36;17.15"), "$17.15");
        assert_eq!(parser.decode_entities("&#x24;17.15 &#X24;1"), "$17.15 $1");
        assert_eq!(parser.decode_entities("&#39;AAPL&#39;"), "'AAPL'");
        assert_eq!(parser.decode_entities("&quot;a&quot; &lt;b&gt;"), "\"a\" <b>");
        // 只解码一层
        assert_eq!(parser.decode_entities("&amp;#36;"), "&#36;");
        // 无效码点保留原文
        assert_eq!(parser.decode_entities("&#xD800;&#99999999999;"), "&#xD800;&#99999999999;");

        let payload = parser
            .extract_payloads(r#"<center><map><area onmousemove="tip(x, &#39;O: &#36;17.15000&#39;)"></map></center>"#)
            .unwrap();
        assert_eq!(payload, vec!["tip(x, 'O: $17.15000')"]);
        assert_eq!(ugly_text_to_float("'O: $17.15000'").unwrap(), 17.15);
    }

    #[test]
    fn test_extract_payloads_failures() {
        let parser = DocumentParser::new().unwrap();
        assert!(matches!(
            parser.extract_payloads("<html><body>rate limited</body></html>"),
            Err(FeedError::Parse(_))
        ));
        assert!(matches!(
            parser.extract_payloads("<center><map><area href=\"#\"></map></center>"),
            Err(FeedError::Parse(_))
        ));
    }

    #[test]
    fn test_repair_inserts_carried_close() {
        let layout = DayLayout::default();
        let mut bars = vec![[1.0, 2.0, 0.5, 1.5]; 157];
        bars[77] = [6.0, 7.5, 5.5, 7.0];
        bars[78] = [5.0, 5.0, 5.0, 5.0];
        repair_session_close(&mut bars, &layout);

        assert_eq!(bars.len(), 158);
        assert_eq!(bars[78], [7.0; 4]);
        assert_eq!(bars[79], [5.0; 4]);
    }

    #[test]
    fn test_repair_at_minimum_length() {
        let layout = DayLayout::default();
        let mut bars = vec![[1.0, 2.0, 0.5, 1.5]; 156];
        bars[77] = [6.0, 7.5, 5.5, 7.0];
        bars[78] = [5.0; 4];
        repair_session_close(&mut bars, &layout);

        assert_eq!(bars.len(), 157);
        assert_eq!(bars[78], [7.0; 4]);
        assert_eq!(bars[79], [5.0; 4]);
    }

    #[test]
    fn test_repair_skips_real_bars_and_other_lengths() {
        let layout = DayLayout::default();
        let mut real = vec![[1.0, 2.0, 0.5, 1.5]; 156];
        repair_session_close(&mut real, &layout);
        assert_eq!(real.len(), 156);

        let mut long = vec![[5.0; 4]; 158];
        repair_session_close(&mut long, &layout);
        assert_eq!(long.len(), 158);
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("'AAPL'"), "AAPL");
        assert_eq!(strip_quotes("'"), "");
        assert_eq!(strip_quotes(""), "");
    }
}
