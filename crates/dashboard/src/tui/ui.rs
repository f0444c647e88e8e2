use std::str::FromStr;

use kcovid_core::chart::{ChartKind, ChartPanel, LegendPosition as PanelLegend};
use kcovid_core::load::DashboardState;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, BorderType, Borders, Chart, Dataset, GraphType,
        LegendPosition, Paragraph, Wrap,
    },
    Frame,
};

use crate::tui::app::App;

const MUTED: Color = Color::DarkGray;

pub fn draw(frame: &mut Frame, app: &App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header / status
            Constraint::Min(10),   // Charts
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    draw_header(frame, app, main_chunks[0]);

    let charts = app.state.charts();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(main_chunks[1]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);

    draw_series_chart(frame, &charts.cumulative, rows[0]);
    draw_series_chart(frame, &charts.active, bottom[0]);
    draw_breakdown(frame, &charts.breakdown, bottom[1]);

    let footer = Paragraph::new("q/Esc: Quit")
        .style(Style::default().fg(MUTED))
        .alignment(Alignment::Center);
    frame.render_widget(footer, main_chunks[2]);
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let status = match &app.state {
        DashboardState::Pending => Span::styled("loading...", Style::default().fg(Color::Yellow)),
        DashboardState::Ready(charts) => {
            let months = charts.cumulative.data.labels.len();
            Span::styled(format!("{months} months"), Style::default().fg(Color::Green))
        }
        DashboardState::Failed { reason } => Span::styled(
            format!("fetch failed: {reason}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    };

    let line = Line::from(vec![
        Span::styled(
            "국내 코로나 현황",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(app.country.to_uppercase(), Style::default().fg(MUTED)),
        Span::raw("  "),
        status,
    ]);

    let header = Paragraph::new(line)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).border_type(BorderType::Rounded));
    frame.render_widget(header, area);
}

fn panel_block(panel: &ChartPanel) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(MUTED))
        .title(format!(" {} ", panel.title))
}

fn draw_series_chart(frame: &mut Frame, panel: &ChartPanel, area: Rect) {
    let data = &panel.data;

    let points: Vec<Vec<(f64, f64)>> = data
        .datasets
        .iter()
        .map(|ds| {
            ds.data
                .iter()
                .enumerate()
                .map(|(i, v)| (i as f64, *v as f64))
                .collect()
        })
        .collect();

    let datasets: Vec<Dataset> = data
        .datasets
        .iter()
        .zip(points.iter())
        .map(|(ds, pts)| {
            let graph_type = match panel.kind {
                ChartKind::Area if ds.fill => GraphType::Bar,
                _ => GraphType::Line,
            };
            let color = ds
                .border_color
                .as_ref()
                .unwrap_or(&ds.background_color)
                .at(0)
                .map(parse_color)
                .unwrap_or(Color::Reset);

            Dataset::default()
                .name(ds.label.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(graph_type)
                .style(Style::default().fg(color))
                .data(pts)
        })
        .collect();

    let x_max = data.labels.len().saturating_sub(1).max(1) as f64;
    let y_max = (data.max_value() as f64 * 1.1).max(1.0);
    // Source data occasionally carries negative counters; keep them on screen.
    let y_min = data
        .datasets
        .iter()
        .flat_map(|d| d.data.iter().copied())
        .min()
        .unwrap_or(0)
        .min(0) as f64;

    let chart = Chart::new(datasets)
        .block(panel_block(panel))
        .legend_position(Some(legend_position(panel.legend)))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(MUTED))
                .bounds([0.0, x_max])
                .labels(axis_labels(&data.labels)),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(MUTED))
                .bounds([y_min, y_max])
                .labels(vec![format_count(y_min as i64), format_count(y_max as i64)]),
        );

    frame.render_widget(chart, area);
}

fn draw_breakdown(frame: &mut Frame, panel: &ChartPanel, area: Rect) {
    let Some(ds) = panel.data.datasets.first() else {
        frame.render_widget(Paragraph::new("No data").block(panel_block(panel)), area);
        return;
    };

    let total: i64 = ds.data.iter().map(|v| (*v).max(0)).sum();
    let bars: Vec<Bar> = ds
        .data
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let label = panel.data.labels.get(i).cloned().unwrap_or_default();
            let color = ds.background_color.at(i).map(parse_color).unwrap_or(Color::Reset);
            let share = if total > 0 {
                (*value).max(0) as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            Bar::default()
                .label(label)
                .value((*value).max(0) as u64)
                .style(Style::default().fg(color))
                .text_value(format!("{} ({share:.0}%)", format_count(*value)))
        })
        .collect();

    let chart = BarChart::default()
        .block(panel_block(panel))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .data(BarGroup::default().bars(&bars));

    frame.render_widget(chart, area);
}

fn legend_position(pos: PanelLegend) -> LegendPosition {
    match pos {
        PanelLegend::Top => LegendPosition::TopRight,
        PanelLegend::Bottom => LegendPosition::BottomRight,
    }
}

/// First, middle and last label; a chart axis has no room for every month.
fn axis_labels(labels: &[String]) -> Vec<String> {
    match labels.len() {
        0 => vec![String::new()],
        1 | 2 => labels.to_vec(),
        n => vec![labels[0].clone(), labels[n / 2].clone(), labels[n - 1].clone()],
    }
}

pub fn parse_color(s: &str) -> Color {
    match s.trim() {
        "" => Color::Reset,
        "salmon" => Color::Rgb(250, 128, 114),
        other => Color::from_str(other).unwrap_or(Color::Gray),
    }
}

fn format_count(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
