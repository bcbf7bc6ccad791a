//! Partition channel configs into renderable subplot panels and assign colors.
//!
//! Grouping is a pure function of the current configs: it is recomputed from
//! scratch on every redraw, so identical input always yields identical panels
//! and colors.

use std::collections::{BTreeMap, BTreeSet};

use super::channel::{Axis, ChannelColor, ChannelConfig, Rgb};
use crate::drivers::ExplorerError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceStyle {
    pub channel: u32,
    pub color: Rgb,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubplotGroup {
    /// Dense 1-based position among rendered panels.
    pub panel: usize,
    /// Subplot number the user assigned.
    pub subplot: u32,
    pub primary: Vec<TraceStyle>,
    pub secondary: Vec<TraceStyle>,
    pub hidden: Vec<u32>,
    pub primary_title: String,
    pub secondary_title: String,
}

impl SubplotGroup {
    pub fn traces(&self) -> impl Iterator<Item = (Axis, &TraceStyle)> {
        self.primary
            .iter()
            .map(|t| (Axis::Primary, t))
            .chain(self.secondary.iter().map(|t| (Axis::Secondary, t)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderPlan {
    pub groups: Vec<SubplotGroup>,
}

impl RenderPlan {
    pub fn panel_count(&self) -> usize {
        self.groups.len()
    }

    pub fn color_of(&self, channel: u32) -> Option<Rgb> {
        self.groups
            .iter()
            .flat_map(|g| g.traces())
            .find(|(_, t)| t.channel == channel)
            .map(|(_, t)| t.color)
    }
}

#[derive(Default)]
struct Bucket<'a> {
    primary: Vec<&'a ChannelConfig>,
    secondary: Vec<&'a ChannelConfig>,
    hidden: Vec<u32>,
}

pub fn group_channels(
    configs: &BTreeMap<u32, ChannelConfig>,
    palette: &[Rgb],
) -> Result<RenderPlan, ExplorerError> {
    let mut buckets: BTreeMap<u32, Bucket<'_>> = BTreeMap::new();
    // BTreeMap iteration keeps channel-number order inside every bucket.
    for config in configs.values() {
        let bucket = buckets.entry(config.subplot).or_default();
        match config.axis {
            Axis::Primary => bucket.primary.push(config),
            Axis::Secondary => bucket.secondary.push(config),
            Axis::Hidden => bucket.hidden.push(config.channel_number()),
        }
    }

    let groups: Vec<SubplotGroup> = buckets
        .into_iter()
        .filter(|(_, b)| !b.primary.is_empty() || !b.secondary.is_empty())
        .enumerate()
        .map(|(idx, (subplot, bucket))| build_group(idx + 1, subplot, bucket, palette))
        .collect();

    if groups.is_empty() {
        return Err(ExplorerError::NothingToRender);
    }
    Ok(RenderPlan { groups })
}

fn build_group(panel: usize, subplot: u32, bucket: Bucket<'_>, palette: &[Rgb]) -> SubplotGroup {
    let mut visible: Vec<&ChannelConfig> = bucket
        .primary
        .iter()
        .chain(bucket.secondary.iter())
        .copied()
        .collect();
    visible.sort_by_key(|c| c.channel_number());

    let colors = assign_colors(&visible, palette);
    let style = |c: &&ChannelConfig| TraceStyle {
        channel: c.channel_number(),
        color: colors[&c.channel_number()],
    };

    SubplotGroup {
        panel,
        subplot,
        primary: bucket.primary.iter().map(style).collect(),
        secondary: bucket.secondary.iter().map(style).collect(),
        hidden: bucket.hidden,
        primary_title: axis_title(Axis::Primary, &bucket.primary),
        secondary_title: axis_title(Axis::Secondary, &bucket.secondary),
    }
}

/// Auto channels take palette entries in channel order, skipping colors that
/// fixed channels of the same panel already use.
fn assign_colors(visible: &[&ChannelConfig], palette: &[Rgb]) -> BTreeMap<u32, Rgb> {
    let fixed: BTreeSet<Rgb> = visible
        .iter()
        .filter_map(|c| match c.color {
            ChannelColor::Fixed(rgb) => Some(rgb),
            ChannelColor::Auto => None,
        })
        .collect();
    let mut available: Vec<Rgb> = palette
        .iter()
        .copied()
        .filter(|rgb| !fixed.contains(rgb))
        .collect();
    if available.is_empty() {
        available = palette.to_vec();
    }
    if available.is_empty() {
        available = super::config::DEFAULT_PALETTE.to_vec();
    }

    let mut next = 0usize;
    visible
        .iter()
        .map(|c| {
            let color = match c.color {
                ChannelColor::Fixed(rgb) => rgb,
                ChannelColor::Auto => {
                    let rgb = available[next % available.len()];
                    next += 1;
                    rgb
                }
            };
            (c.channel_number(), color)
        })
        .collect()
}

fn axis_title(axis: Axis, channels: &[&ChannelConfig]) -> String {
    let units: BTreeSet<&str> = channels
        .iter()
        .filter(|c| c.has_units())
        .map(|c| c.units.as_str())
        .collect();
    match units.len() {
        0 => axis.to_string(),
        1 => format!("{axis} ({})", units.iter().next().copied().unwrap_or_default()),
        _ => format!("{axis} (Mixed Units)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::config::DEFAULT_PALETTE;

    fn configs(specs: &[(u32, Axis, u32)]) -> BTreeMap<u32, ChannelConfig> {
        specs
            .iter()
            .map(|&(ch, axis, subplot)| {
                let mut c = ChannelConfig::new(ch, None, Some("V"), Some(axis)).unwrap();
                c.subplot = subplot;
                (ch, c)
            })
            .collect()
    }

    fn channels(traces: &[TraceStyle]) -> Vec<u32> {
        traces.iter().map(|t| t.channel).collect()
    }

    #[test]
    fn groups_are_densely_renumbered_and_hidden_only_groups_dropped() {
        let map = configs(&[
            (1, Axis::Primary, 4),
            (2, Axis::Secondary, 4),
            (3, Axis::Hidden, 2),
            (4, Axis::Secondary, 7),
            (5, Axis::Primary, 7),
            (6, Axis::Hidden, 7),
        ]);
        let plan = group_channels(&map, &DEFAULT_PALETTE).unwrap();
        assert_eq!(plan.panel_count(), 2);

        let first = &plan.groups[0];
        assert_eq!((first.panel, first.subplot), (1, 4));
        assert_eq!(channels(&first.primary), vec![1]);
        assert_eq!(channels(&first.secondary), vec![2]);

        let second = &plan.groups[1];
        assert_eq!((second.panel, second.subplot), (2, 7));
        assert_eq!(channels(&second.primary), vec![5]);
        assert_eq!(channels(&second.secondary), vec![4]);
        assert_eq!(second.hidden, vec![6]);
    }

    #[test]
    fn auto_colors_follow_channel_order_across_both_axes() {
        let map = configs(&[
            (1, Axis::Secondary, 1),
            (2, Axis::Primary, 1),
            (3, Axis::Secondary, 1),
            (4, Axis::Primary, 2),
        ]);
        let plan = group_channels(&map, &DEFAULT_PALETTE).unwrap();
        assert_eq!(plan.color_of(1), Some(DEFAULT_PALETTE[0]));
        assert_eq!(plan.color_of(2), Some(DEFAULT_PALETTE[1]));
        assert_eq!(plan.color_of(3), Some(DEFAULT_PALETTE[2]));
        // Each panel starts over at the head of the palette.
        assert_eq!(plan.color_of(4), Some(DEFAULT_PALETTE[0]));
    }

    #[test]
    fn fixed_colors_are_kept_and_not_reused() {
        let mut map = configs(&[
            (1, Axis::Primary, 1),
            (2, Axis::Primary, 1),
            (3, Axis::Secondary, 1),
        ]);
        map.get_mut(&2).unwrap().color = ChannelColor::Fixed(DEFAULT_PALETTE[0]);
        let plan = group_channels(&map, &DEFAULT_PALETTE).unwrap();
        assert_eq!(plan.color_of(2), Some(DEFAULT_PALETTE[0]));
        assert_eq!(plan.color_of(1), Some(DEFAULT_PALETTE[1]));
        assert_eq!(plan.color_of(3), Some(DEFAULT_PALETTE[2]));
    }

    #[test]
    fn palette_cycles_when_exhausted() {
        let palette = [Rgb(1, 1, 1), Rgb(2, 2, 2)];
        let map = configs(&[
            (1, Axis::Primary, 1),
            (2, Axis::Primary, 1),
            (3, Axis::Primary, 1),
        ]);
        let plan = group_channels(&map, &palette).unwrap();
        assert_eq!(plan.color_of(3), Some(palette[0]));
    }

    #[test]
    fn grouping_is_idempotent() {
        let mut map = configs(&[
            (1, Axis::Primary, 2),
            (2, Axis::Secondary, 1),
            (3, Axis::Primary, 1),
            (4, Axis::Hidden, 1),
        ]);
        map.get_mut(&3).unwrap().color = ChannelColor::Fixed(Rgb(9, 9, 9));
        let a = group_channels(&map, &DEFAULT_PALETTE).unwrap();
        let b = group_channels(&map, &DEFAULT_PALETTE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn setting_a_channel_back_to_auto_recomputes_the_panel() {
        let mut map = configs(&[(1, Axis::Primary, 1), (2, Axis::Primary, 1)]);
        map.get_mut(&1).unwrap().color = ChannelColor::Fixed(DEFAULT_PALETTE[0]);
        let before = group_channels(&map, &DEFAULT_PALETTE).unwrap();
        assert_eq!(before.color_of(2), Some(DEFAULT_PALETTE[1]));

        map.get_mut(&1).unwrap().color = ChannelColor::Auto;
        let after = group_channels(&map, &DEFAULT_PALETTE).unwrap();
        assert_eq!(after.color_of(1), Some(DEFAULT_PALETTE[0]));
        assert_eq!(after.color_of(2), Some(DEFAULT_PALETTE[1]));
    }

    #[test]
    fn all_hidden_is_reported() {
        let map = configs(&[(1, Axis::Hidden, 1), (2, Axis::Hidden, 3)]);
        assert!(matches!(
            group_channels(&map, &DEFAULT_PALETTE),
            Err(ExplorerError::NothingToRender)
        ));
    }

    #[test]
    fn axis_titles_reflect_units() {
        let mut map = configs(&[
            (1, Axis::Primary, 1),
            (2, Axis::Secondary, 1),
            (3, Axis::Secondary, 1),
        ]);
        map.get_mut(&3).unwrap().units = "psi".into();
        let plan = group_channels(&map, &DEFAULT_PALETTE).unwrap();
        assert_eq!(plan.groups[0].primary_title, "Primary (V)");
        assert_eq!(plan.groups[0].secondary_title, "Secondary (Mixed Units)");

        map.get_mut(&1).unwrap().units = "N/A".into();
        let plan = group_channels(&map, &DEFAULT_PALETTE).unwrap();
        assert_eq!(plan.groups[0].primary_title, "Primary");
    }
}
