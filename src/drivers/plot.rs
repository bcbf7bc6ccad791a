use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb as ImageRgb};
use plotters::prelude::*;

use crate::drivers::error::ExplorerError;
use crate::waveform::{PlotFrame, Rgb, SubplotGroup, TraceStyle};

#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    /// Height of one subplot panel; the image grows with the panel count.
    pub panel_height: u32,
    pub background: RGBColor,
    pub foreground: RGBColor,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1200,
            panel_height: 320,
            background: RGBColor(10, 10, 10),
            foreground: WHITE,
        }
    }
}

/// Total image height and RGB buffer length for `panels` stacked panels.
fn canvas_size(width: u32, panel_height: u32, panels: usize) -> Result<(u32, usize), ExplorerError> {
    if width == 0 || panel_height == 0 {
        return Err(ExplorerError::Plot("image size must be non-zero".into()));
    }
    let too_large = || {
        ExplorerError::Plot(format!(
            "{panels} panels of {width}x{panel_height} px do not fit in one image"
        ))
    };
    let height = u32::try_from(panels)
        .ok()
        .and_then(|p| panel_height.checked_mul(p))
        .ok_or_else(too_large)?;
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(3))
        .ok_or_else(too_large)?;
    Ok((height, len))
}

fn to_plotters(rgb: Rgb) -> RGBColor {
    RGBColor(rgb.0, rgb.1, rgb.2)
}

/// Render every panel of `frame` stacked vertically and encode the result as PNG.
pub fn render_plot_png(frame: &PlotFrame<'_>, style: &PlotStyle) -> Result<Vec<u8>, ExplorerError> {
    let panels = frame.plan.panel_count();
    if panels == 0 {
        return Err(ExplorerError::NothingToRender);
    }
    let (height, len) = canvas_size(style.width, style.panel_height, panels)?;
    let mut buffer = vec![0u8; len];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, height)).into_drawing_area();
        root.fill(&style.background)?;
        let areas = root.split_evenly((panels, 1));
        for (area, group) in areas.iter().zip(&frame.plan.groups) {
            draw_panel(area, frame, group, style)?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, height)
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    frame: &PlotFrame<'_>,
    group: &SubplotGroup,
    style: &PlotStyle,
) -> Result<(), ExplorerError> {
    let fg = style.foreground;
    let (t0, t1) = frame.time_bounds();
    let (p0, p1) = frame.value_bounds(group.primary.iter().map(|t| &t.channel));
    let (s0, s1) = frame.value_bounds(group.secondary.iter().map(|t| &t.channel));

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .caption(frame.title(group), ("sans-serif", 18).into_font().color(&fg))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Right, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(t0..t1, p0..p1)?
        .set_secondary_coord(t0..t1, s0..s1);

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc(group.primary_title.as_str())
        .axis_desc_style(("sans-serif", 14).into_font().color(&fg))
        .label_style(("sans-serif", 12).into_font().color(&fg))
        .light_line_style(&fg.mix(0.1))
        .draw()?;
    if !group.secondary.is_empty() {
        chart
            .configure_secondary_axes()
            .y_desc(group.secondary_title.as_str())
            .axis_desc_style(("sans-serif", 14).into_font().color(&fg))
            .label_style(("sans-serif", 12).into_font().color(&fg))
            .draw()?;
    }

    for trace_style in &group.primary {
        let Some((label, points)) = series(frame, trace_style) else {
            continue;
        };
        let color = to_plotters(trace_style.color);
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }
    for trace_style in &group.secondary {
        let Some((label, points)) = series(frame, trace_style) else {
            continue;
        };
        let color = to_plotters(trace_style.color);
        chart
            .draw_secondary_series(LineSeries::new(points, color.stroke_width(1)))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font(("sans-serif", 12).into_font().color(&fg))
        .border_style(&fg.mix(0.2))
        .background_style(&style.background.mix(0.8))
        .draw()?;
    Ok(())
}

fn series(frame: &PlotFrame<'_>, style: &TraceStyle) -> Option<(String, Vec<(f64, f64)>)> {
    let trace = frame.traces.get(&style.channel)?;
    let points = trace.points().filter(|(_, v)| v.is_finite()).collect();
    Some((trace.label.clone(), points))
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ExplorerError> {
    let image = ImageBuffer::<ImageRgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| ExplorerError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::{group_channels, Axis, ChannelConfig, Trace, DEFAULT_PALETTE};
    use std::collections::BTreeMap;

    #[test]
    fn oversized_or_empty_canvas_is_an_error() {
        assert_eq!(canvas_size(100, 50, 3).unwrap(), (150, 100 * 150 * 3));
        assert!(matches!(canvas_size(0, 50, 1), Err(ExplorerError::Plot(_))));
        assert!(matches!(canvas_size(100, 0, 1), Err(ExplorerError::Plot(_))));
        assert!(matches!(
            canvas_size(u32::MAX, u32::MAX, 2),
            Err(ExplorerError::Plot(_))
        ));
    }

    #[test]
    fn renders_one_panel_per_subplot() {
        let time: Vec<f64> = (0..50).map(|i| i as f64 * 0.01).collect();
        let a: Vec<f64> = time.iter().map(|t| (t * 20.0).sin()).collect();
        let b: Vec<f64> = time.iter().map(|t| t * 3.0).collect();

        let mut configs = BTreeMap::new();
        configs.insert(1, ChannelConfig::new(1, Some("Sine"), Some("V"), None).unwrap());
        let mut second =
            ChannelConfig::new(2, Some("Ramp"), Some("A"), Some(Axis::Secondary)).unwrap();
        second.subplot = 2;
        configs.insert(2, second);

        let mut traces = BTreeMap::new();
        for (ch, values) in [(1u32, &a), (2u32, &b)] {
            traces.insert(
                ch,
                Trace {
                    channel: ch,
                    label: configs[&ch].label(),
                    stride: 1,
                    time: &time,
                    values,
                },
            );
        }
        let frame = PlotFrame {
            filename: "bench.wdq",
            plan: group_channels(&configs, &DEFAULT_PALETTE).unwrap(),
            traces,
        };
        let style = PlotStyle {
            width: 320,
            panel_height: 160,
            ..PlotStyle::default()
        };
        match render_plot_png(&frame, &style) {
            Ok(png) => assert_eq!(&png[1..4], b"PNG"),
            // Headless machines without a sans-serif font cannot draw text.
            Err(ExplorerError::Plot(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
