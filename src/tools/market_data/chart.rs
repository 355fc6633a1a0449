//! 行情图表：收盘价 + 移动平均（左轴）与 RSI（右轴，0–100，含 70/30 参考线），输出 SVG

use std::fmt::Write as _;

use chrono::NaiveDate;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 480.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 50.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 40.0;

pub struct ChartInput<'a> {
    pub title: String,
    pub dates: &'a [NaiveDate],
    pub closes: &'a [Option<f64>],
    pub ma: &'a [Option<f64>],
    pub ma_window: usize,
    pub rsi: &'a [Option<f64>],
    pub rsi_window: usize,
}

pub fn render_svg(input: &ChartInput<'_>) -> String {
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let n = input.dates.len().max(1);

    let prices = input.closes.iter().chain(input.ma.iter()).flatten().copied();
    let (lo, hi) = prices.fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let (lo, hi) = if lo > hi {
        (0.0, 1.0)
    } else if (hi - lo).abs() < f64::EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo, hi)
    };

    let x = |i: usize| {
        if n == 1 {
            MARGIN_LEFT + plot_w / 2.0
        } else {
            MARGIN_LEFT + plot_w * i as f64 / (n - 1) as f64
        }
    };
    let y_price = |v: f64| MARGIN_TOP + plot_h * (1.0 - (v - lo) / (hi - lo));
    let y_rsi = |v: f64| MARGIN_TOP + plot_h * (1.0 - v / 100.0);

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    );
    svg.push_str(r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = write!(
        svg,
        r#"<text x="{}" y="24" font-size="16" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        escape(&input.title)
    );
    let _ = write!(
        svg,
        r##"<rect x="{MARGIN_LEFT}" y="{MARGIN_TOP}" width="{plot_w}" height="{plot_h}" fill="none" stroke="#999"/>"##
    );

    for level in [70.0, 30.0] {
        let y = y_rsi(level);
        let _ = write!(
            svg,
            r#"<line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{}" y2="{y:.1}" stroke="red" stroke-width="0.7" stroke-dasharray="4 3"/>"#,
            MARGIN_LEFT + plot_w
        );
    }

    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" font-size="11" text-anchor="end">{hi:.2}</text><text x="{}" y="{}" font-size="11" text-anchor="end">{lo:.2}</text>"#,
        MARGIN_LEFT - 4.0,
        MARGIN_TOP + 10.0,
        MARGIN_LEFT - 4.0,
        MARGIN_TOP + plot_h
    );
    if let (Some(first), Some(last)) = (input.dates.first(), input.dates.last()) {
        let _ = write!(
            svg,
            r#"<text x="{MARGIN_LEFT}" y="{}" font-size="11">{first}</text><text x="{}" y="{}" font-size="11" text-anchor="end">{last}</text>"#,
            HEIGHT - 14.0,
            MARGIN_LEFT + plot_w,
            HEIGHT - 14.0
        );
    }

    polyline(&mut svg, input.closes, &x, &y_price, "blue");
    polyline(&mut svg, input.ma, &x, &y_price, "orange");
    polyline(&mut svg, input.rsi, &x, &y_rsi, "green");

    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" font-size="11" fill="blue">Close</text><text x="{}" y="{}" font-size="11" fill="orange">MA({})</text><text x="{}" y="{}" font-size="11" fill="green" text-anchor="end">RSI({})</text>"#,
        MARGIN_LEFT + 6.0,
        MARGIN_TOP + 14.0,
        MARGIN_LEFT + 50.0,
        MARGIN_TOP + 14.0,
        input.ma_window,
        MARGIN_LEFT + plot_w - 6.0,
        MARGIN_TOP + 14.0,
        input.rsi_window
    );
    svg.push_str("</svg>");
    svg
}

/// 连续的有效点画成一段 polyline，遇到缺失值断开
fn polyline(
    svg: &mut String,
    values: &[Option<f64>],
    x: &dyn Fn(usize) -> f64,
    y: &dyn Fn(f64) -> f64,
    color: &str,
) {
    let mut segment: Vec<String> = Vec::new();
    let flush = |segment: &mut Vec<String>, svg: &mut String| {
        if segment.len() > 1 {
            let _ = write!(
                svg,
                r#"<polyline fill="none" stroke="{color}" stroke-width="1.5" points="{}"/>"#,
                segment.join(" ")
            );
        }
        segment.clear();
    };
    for (i, v) in values.iter().enumerate() {
        match v {
            Some(v) => segment.push(format!("{:.1},{:.1}", x(i), y(*v))),
            None => flush(&mut segment, svg),
        }
    }
    flush(&mut segment, svg);
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
