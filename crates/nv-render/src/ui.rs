use nv_core::frame::FeatureFrame;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Sparkline};

use crate::color::frame_color;
use crate::fps::FpsCounter;

/// Sidebar width in columns.
pub const SIDEBAR_WIDTH: u16 = 24;
/// Sparkline resolution: a level of 1.0 maps to this bar height.
const SPARK_MAX: f32 = 64.0;

/// Draw the full UI: spectrum + band gauges + sidebar.
pub fn draw(
    frame: &mut Frame,
    features: &FeatureFrame,
    fps_counter: &FpsCounter,
    tonal_threshold: f32,
) {
    let area = frame.area();
    let color = {
        let (r, g, b) = frame_color(features, tonal_threshold);
        Color::Rgb(r, g, b)
    };

    // Horizontal split: [main | sidebar]
    let h_chunks =
        Layout::horizontal([Constraint::Min(30), Constraint::Length(SIDEBAR_WIDTH)]).split(area);

    // Vertical split of left panel: [spectrum | bands]
    let band_rows = u16::try_from(features.bands.len()).unwrap_or(u16::MAX).saturating_mul(2);
    let v_chunks = Layout::vertical([
        Constraint::Min(6),
        Constraint::Length(band_rows.saturating_add(1)),
    ])
    .split(h_chunks[0]);

    draw_spectrum(frame, v_chunks[0], features, color);
    draw_bands(frame, v_chunks[1], features, color);
    draw_sidebar(frame, h_chunks[1], features, fps_counter, tonal_threshold);
}

/// Draw the log spectrum as a sparkline tinted with the frame color.
fn draw_spectrum(frame: &mut Frame, area: Rect, features: &FeatureFrame, color: Color) {
    let data = spectrum_bars(features);
    let title = if features.spectrum_ready {
        " Spectrum "
    } else {
        " Spectrum (warm-up) "
    };

    let sparkline = Sparkline::default()
        .block(Block::default().borders(Borders::TOP).title(title))
        .data(&data)
        .max(SPARK_MAX as u64)
        .style(Style::default().fg(color));

    frame.render_widget(sparkline, area);
}

/// One gauge per named band.
fn draw_bands(frame: &mut Frame, area: Rect, features: &FeatureFrame, color: Color) {
    let block = Block::default().borders(Borders::TOP).title(" Bands ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::vertical(features.bands.iter().map(|_| Constraint::Length(2))).split(inner);
    for (band, row) in features.bands.iter().zip(rows.iter()) {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(color).bg(Color::Black))
            .ratio(f64::from(unit(band.level)))
            .label(format!("{} {:.2}", band.name, band.level));
        frame.render_widget(gauge, *row);
    }
}

/// Draw the sidebar with all scalar features.
fn draw_sidebar(
    frame: &mut Frame,
    area: Rect,
    features: &FeatureFrame,
    fps_counter: &FpsCounter,
    tonal_threshold: f32,
) {
    let dominant_str = match features.dominant {
        Some(d) => format!(" Dom: #{} {:.0} Hz", d.index, d.freq_hz),
        None => " Dom: -".to_string(),
    };
    let trusted = features.trusted_dominant(tonal_threshold).is_some();

    let mut lines = vec![
        Line::from(Span::styled("─ Level ────", Style::default().fg(Color::Yellow))),
        Line::from(format!(" Volume: {:.3}", features.volume)),
        Line::from(format!(" Env: {:.2}", features.envelope)),
        Line::from(format!(" Trans: {:.2}", features.transient)),
    ];
    lines.extend(
        features
            .primary
            .iter()
            .map(|p| Line::from(format!(" {}: {:.2}", p.name, p.level))),
    );
    lines.extend([
        Line::from(""),
        Line::from(Span::styled("─ Shape ────", Style::default().fg(Color::Yellow))),
        Line::from(format!(" Centroid: {:.2}", features.centroid)),
        Line::from(format!(" Bandw: {:.2}", features.bandwidth)),
        Line::from(""),
        Line::from(Span::styled("─ Pitch ────", Style::default().fg(Color::Yellow))),
        Line::from(Span::styled(
            dominant_str,
            Style::default().fg(if trusted { Color::Green } else { Color::DarkGray }),
        )),
        Line::from(format!(" Tonal: {:.2}", features.tonalness)),
        Line::from(""),
        Line::from(Span::styled("─ Info ─────", Style::default().fg(Color::Yellow))),
        Line::from(format!(" {:.0} FPS", fps_counter.fps())),
        Line::from(format!(" {:.1}ms", fps_counter.frame_time_ms())),
        Line::from(""),
        Line::from(Span::styled(" q/Esc = quit", Style::default().fg(Color::DarkGray))),
    ]);

    let sidebar = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::LEFT)
            .title(" Features "),
    );

    frame.render_widget(sidebar, area);
}

fn unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

/// Spectrum levels scaled to sparkline bar heights.
#[must_use]
pub fn spectrum_bars(features: &FeatureFrame) -> Vec<u64> {
    features
        .spectrum
        .iter()
        .map(|&v| (unit(v) * SPARK_MAX) as u64)
        .collect()
}
