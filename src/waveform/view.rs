use std::collections::BTreeMap;

use serde::Serialize;

use super::channel::ChannelConfig;
use super::grouping::{RenderPlan, SubplotGroup};
use super::transform::{mean, min_max, std_dev};

/// Summary of one channel's working samples. Empty channels report NaN.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelStatistics {
    pub name: String,
    pub units: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    pub sample_count: usize,
}

impl ChannelStatistics {
    pub fn compute(config: &ChannelConfig, data: &[f64]) -> Self {
        let (min, max, mean, std) = if data.is_empty() {
            (f64::NAN, f64::NAN, f64::NAN, f64::NAN)
        } else {
            let (min, max) = min_max(data);
            let mean = mean(data);
            (min, max, mean, std_dev(data, mean))
        };
        Self {
            name: config.name.clone(),
            units: config.units.clone(),
            min,
            max,
            mean,
            std,
            sample_count: data.len(),
        }
    }
}

/// Borrowed view of one channel ready to draw.
#[derive(Clone, Debug)]
pub struct Trace<'a> {
    pub channel: u32,
    pub label: String,
    /// Original sample indices between consecutive working samples.
    pub stride: usize,
    pub time: &'a [f64],
    pub values: &'a [f64],
}

impl<'a> Trace<'a> {
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time
            .iter()
            .step_by(self.stride.max(1))
            .zip(self.values)
            .map(|(t, v)| (*t, *v))
    }

    pub fn time_axis(&self) -> Vec<f64> {
        self.points().map(|(t, _)| t).collect()
    }
}

pub struct PlotFrame<'a> {
    pub filename: &'a str,
    pub plan: RenderPlan,
    pub traces: BTreeMap<u32, Trace<'a>>,
}

impl<'a> PlotFrame<'a> {
    /// Panels are numbered densely from 1, whatever subplot numbers were assigned.
    pub fn title(&self, group: &SubplotGroup) -> String {
        if self.plan.panel_count() == 1 {
            self.filename.to_owned()
        } else {
            format!("{} - Subplot {}", self.filename, group.panel)
        }
    }

    /// Time span covered by every rendered trace; degenerate spans are widened.
    pub fn time_bounds(&self) -> (f64, f64) {
        let (lo, hi) = self
            .plan
            .groups
            .iter()
            .flat_map(|g| g.traces())
            .filter_map(|(_, style)| self.traces.get(&style.channel))
            .flat_map(|trace| trace.points().map(|(t, _)| t))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
                (lo.min(t), hi.max(t))
            });
        padded(lo, hi)
    }

    pub fn value_bounds<'s>(&self, styles: impl Iterator<Item = &'s u32>) -> (f64, f64) {
        let (lo, hi) = styles
            .filter_map(|ch| self.traces.get(ch))
            .flat_map(|trace| trace.values.iter().copied())
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        padded(lo, hi)
    }
}

fn padded(lo: f64, hi: f64) -> (f64, f64) {
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        let pad = lo.abs().max(1.0) * 0.5;
        return (lo - pad, hi + pad);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_use_population_std() {
        let config = ChannelConfig::new(1, Some("Load"), Some("kN"), None).unwrap();
        let stats = ChannelStatistics::compute(&config, &[0.0, 2.0, -2.0, 0.0]);
        assert_eq!(stats.min, -2.0);
        assert_eq!(stats.max, 2.0);
        assert_eq!(stats.mean, 0.0);
        assert!((stats.std - 2.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats.sample_count, 4);
        assert_eq!(stats.units, "kN");
    }

    #[test]
    fn statistics_of_empty_channel_are_nan() {
        let config = ChannelConfig::new(2, None, None, None).unwrap();
        let stats = ChannelStatistics::compute(&config, &[]);
        assert!(stats.min.is_nan() && stats.std.is_nan());
        assert_eq!(stats.sample_count, 0);
    }

    #[test]
    fn trace_points_follow_stride() {
        let time = [0.0, 0.1, 0.2, 0.3, 0.4];
        let values = [10.0, 30.0, 50.0];
        let trace = Trace {
            channel: 1,
            label: "x".into(),
            stride: 2,
            time: &time,
            values: &values,
        };
        let points: Vec<(f64, f64)> = trace.points().collect();
        assert_eq!(points, vec![(0.0, 10.0), (0.2, 30.0), (0.4, 50.0)]);
        assert_eq!(trace.time_axis(), vec![0.0, 0.2, 0.4]);
    }

    #[test]
    fn titles_use_dense_panel_numbers() {
        let time = [0.0, 1.0];
        let values = [1.0, 2.0];
        let mut configs = BTreeMap::new();
        for (ch, subplot) in [(1u32, 4u32), (2, 7), (3, 7)] {
            let mut config = ChannelConfig::new(ch, None, None, None).unwrap();
            config.subplot = subplot;
            configs.insert(ch, config);
        }
        let traces = configs
            .iter()
            .map(|(ch, config)| {
                let trace = Trace {
                    channel: *ch,
                    label: config.label(),
                    stride: 1,
                    time: &time,
                    values: &values,
                };
                (*ch, trace)
            })
            .collect();
        let frame = PlotFrame {
            filename: "f.wdq",
            plan: crate::waveform::group_channels(&configs, &crate::waveform::DEFAULT_PALETTE)
                .unwrap(),
            traces,
        };
        let titles: Vec<String> = frame.plan.groups.iter().map(|g| frame.title(g)).collect();
        assert_eq!(titles, vec!["f.wdq - Subplot 1", "f.wdq - Subplot 2"]);
    }

    #[test]
    fn flat_bounds_are_widened() {
        assert_eq!(padded(5.0, 5.0), (2.5, 7.5));
        assert_eq!(padded(f64::INFINITY, f64::NEG_INFINITY), (0.0, 1.0));
    }
}
