use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::drivers::ExplorerError;

/// Units value used when the recording carries no usable unit string.
pub const NO_UNITS: &str = "N/A";

/// Which y axis of its subplot a channel is drawn against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Axis {
    Primary,
    Secondary,
    Hidden,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Primary, Axis::Secondary, Axis::Hidden];

    /// Channel 1 goes on the primary axis, everything else on the secondary.
    pub fn default_for(channel_number: u32) -> Self {
        if channel_number == 1 {
            Axis::Primary
        } else {
            Axis::Secondary
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Primary => "Primary",
            Axis::Secondary => "Secondary",
            Axis::Hidden => "Hidden",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axis {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(Axis::Primary),
            "secondary" => Ok(Axis::Secondary),
            "hidden" | "hide" | "omit" => Ok(Axis::Hidden),
            other => Err(ExplorerError::InvalidParameter(format!(
                "unknown axis '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for Axis {
    type Error = ExplorerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Axis> for String {
    fn from(value: Axis) -> Self {
        value.as_str().to_owned()
    }
}

/// 8-bit RGB color, written as `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn parse_hex(s: &str) -> Result<Self, ExplorerError> {
        let invalid = || ExplorerError::InvalidParameter(format!("'{s}' is not a #rrggbb color"));
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        Ok(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ExplorerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::parse_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// Either take part in automatic palette assignment or keep a fixed color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChannelColor {
    #[default]
    Auto,
    Fixed(Rgb),
}

impl fmt::Display for ChannelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelColor::Auto => f.write_str("auto"),
            ChannelColor::Fixed(rgb) => write!(f, "{rgb}"),
        }
    }
}

impl FromStr for ChannelColor {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") || trimmed.eq_ignore_ascii_case("#auto") {
            return Ok(ChannelColor::Auto);
        }
        Rgb::parse_hex(trimmed).map(ChannelColor::Fixed)
    }
}

impl TryFrom<String> for ChannelColor {
    type Error = ExplorerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChannelColor> for String {
    fn from(value: ChannelColor) -> Self {
        value.to_string()
    }
}

/// Display and identity metadata of one channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    channel_number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_units")]
    pub units: String,
    pub axis: Axis,
    #[serde(default = "default_subplot")]
    pub subplot: u32,
    #[serde(default)]
    pub color: ChannelColor,
}

fn default_units() -> String {
    NO_UNITS.to_owned()
}

fn default_subplot() -> u32 {
    1
}

impl ChannelConfig {
    /// Channel numbers start at 1.
    pub fn new(
        channel_number: u32,
        name: Option<&str>,
        units: Option<&str>,
        axis: Option<Axis>,
    ) -> Result<Self, ExplorerError> {
        if channel_number == 0 {
            return Err(ExplorerError::InvalidParameter(
                "channel numbers start at 1".into(),
            ));
        }
        let name = match name {
            Some(n) if !n.trim().is_empty() => n.to_owned(),
            _ => default_name(channel_number),
        };
        Ok(Self {
            channel_number,
            name,
            units: normalize_units(units),
            axis: axis.unwrap_or_else(|| Axis::default_for(channel_number)),
            subplot: 1,
            color: ChannelColor::Auto,
        })
    }

    pub fn channel_number(&self) -> u32 {
        self.channel_number
    }

    pub fn has_units(&self) -> bool {
        !self.units.is_empty() && self.units != NO_UNITS
    }

    /// Legend/column label: `name (units)`, or just `name` without units.
    pub fn label(&self) -> String {
        if self.has_units() {
            format!("{} ({})", self.name, self.units)
        } else {
            self.name.clone()
        }
    }

    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("channel_number".into(), Value::from(self.channel_number));
        record.insert("name".into(), Value::from(self.name.clone()));
        record.insert("units".into(), Value::from(self.units.clone()));
        record.insert("axis".into(), Value::from(self.axis.as_str()));
        record.insert("subplot".into(), Value::from(self.subplot));
        record.insert("color".into(), Value::from(self.color.to_string()));
        record
    }

    pub fn from_record(record: &Map<String, Value>) -> Result<Self, ExplorerError> {
        let mut config: ChannelConfig = serde_json::from_value(Value::Object(record.clone()))
            .map_err(|err| ExplorerError::InvalidParameter(format!("channel record: {err}")))?;
        if config.channel_number == 0 {
            return Err(ExplorerError::InvalidParameter(
                "channel record: channel_number must be at least 1".into(),
            ));
        }
        if config.subplot == 0 {
            return Err(ExplorerError::InvalidParameter(
                "channel record: subplot must be at least 1".into(),
            ));
        }
        if config.name.trim().is_empty() {
            config.name = default_name(config.channel_number);
        }
        if config.units.is_empty() {
            config.units = default_units();
        }
        Ok(config)
    }
}

pub fn default_name(channel_number: u32) -> String {
    format!("Channel {channel_number}")
}

/// Strip NULs, non-printable characters and brackets; fall back to `N/A`.
pub fn normalize_units(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return default_units();
    };
    let cleaned: String = raw
        .replace('\0', "")
        .trim()
        .chars()
        .filter(|c| is_printable(*c) && *c != '[' && *c != ']')
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        default_units()
    } else {
        cleaned.to_owned()
    }
}

/// Plain spaces are printable; other whitespace, control and format
/// characters (zero-width spaces, bidi marks, BOM) are not.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !(c.is_control() || c.is_whitespace() || is_format(c))
}

/// Unicode general category Cf.
fn is_format(c: char) -> bool {
    matches!(
        c,
        '\u{ad}'
            | '\u{600}'..='\u{605}'
            | '\u{61c}'
            | '\u{6dd}'
            | '\u{70f}'
            | '\u{890}'..='\u{891}'
            | '\u{8e2}'
            | '\u{180e}'
            | '\u{200b}'..='\u{200f}'
            | '\u{202a}'..='\u{202e}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206f}'
            | '\u{feff}'
            | '\u{fff9}'..='\u{fffb}'
            | '\u{110bd}'
            | '\u{110cd}'
            | '\u{13430}'..='\u{1343f}'
            | '\u{1bca0}'..='\u{1bca3}'
            | '\u{1d173}'..='\u{1d17a}'
            | '\u{e0001}'
            | '\u{e0020}'..='\u{e007f}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_falls_back_to_channel_number() {
        let config = ChannelConfig::new(3, Some("   "), None, None).unwrap();
        assert_eq!(config.name, "Channel 3");
        assert_eq!(ChannelConfig::new(4, None, None, None).unwrap().name, "Channel 4");
    }

    #[test]
    fn default_axis_depends_on_channel_number() {
        assert_eq!(ChannelConfig::new(1, None, None, None).unwrap().axis, Axis::Primary);
        assert_eq!(ChannelConfig::new(2, None, None, None).unwrap().axis, Axis::Secondary);
        let explicit = ChannelConfig::new(1, None, None, Some(Axis::Hidden)).unwrap();
        assert_eq!(explicit.axis, Axis::Hidden);
        assert_eq!(explicit.subplot, 1);
        assert_eq!(explicit.color, ChannelColor::Auto);
    }

    #[test]
    fn units_are_cleaned() {
        assert_eq!(normalize_units(Some("[V]\0\0")), "V");
        assert_eq!(normalize_units(Some(" \u{1}[] ")), NO_UNITS);
        assert_eq!(normalize_units(Some("")), NO_UNITS);
        assert_eq!(normalize_units(None), NO_UNITS);
        assert_eq!(normalize_units(Some("°C")), "°C");
    }

    #[test]
    fn invisible_unit_characters_are_dropped() {
        assert_eq!(normalize_units(Some("\u{200b}")), NO_UNITS);
        assert_eq!(normalize_units(Some("\u{feff}m/s\u{200e}")), "m/s");
        assert_eq!(normalize_units(Some("k\u{00a0}Pa")), "kPa");
        assert_eq!(normalize_units(Some("N m")), "N m");
    }

    #[test]
    fn channel_zero_is_rejected() {
        assert!(matches!(
            ChannelConfig::new(0, Some("Ghost"), None, None),
            Err(ExplorerError::InvalidParameter(_))
        ));
    }

    #[test]
    fn label_includes_units_only_when_known() {
        let with_units =
            ChannelConfig::new(1, Some("Temperature (°C)"), Some("°C"), None).unwrap();
        assert_eq!(with_units.label(), "Temperature (°C) (°C)");
        let without = ChannelConfig::new(2, Some("Pressure"), Some("N/A"), None).unwrap();
        assert_eq!(without.label(), "Pressure");
    }

    #[test]
    fn record_round_trip_keeps_every_field() {
        let mut config =
            ChannelConfig::new(5, Some("Vibration"), Some("g"), Some(Axis::Secondary)).unwrap();
        config.subplot = 3;
        config.color = ChannelColor::Fixed(Rgb(0xd6, 0x27, 0x28));
        let record = config.to_record();
        assert_eq!(record["color"], Value::from("#d62728"));
        assert_eq!(record["axis"], Value::from("Secondary"));
        let restored = ChannelConfig::from_record(&record).unwrap();
        assert_eq!(restored, config);
        assert_eq!(restored.channel_number(), 5);
        assert_eq!(restored.label(), "Vibration (g)");
    }

    #[test]
    fn record_defaults_and_rejections() {
        let mut record = Map::new();
        record.insert("channel_number".into(), Value::from(2));
        record.insert("axis".into(), Value::from("Primary"));
        let config = ChannelConfig::from_record(&record).unwrap();
        assert_eq!(config.name, "Channel 2");
        assert_eq!(config.units, NO_UNITS);
        assert_eq!(config.subplot, 1);
        assert_eq!(config.color, ChannelColor::Auto);

        record.insert("color".into(), Value::from("chartreuse"));
        assert!(matches!(
            ChannelConfig::from_record(&record),
            Err(ExplorerError::InvalidParameter(_))
        ));

        record.insert("color".into(), Value::from("auto"));
        record.insert("axis".into(), Value::from("omit"));
        assert_eq!(ChannelConfig::from_record(&record).unwrap().axis, Axis::Hidden);
        record.insert("axis".into(), Value::from("hide"));
        assert_eq!(ChannelConfig::from_record(&record).unwrap().axis, Axis::Hidden);
        record.insert("axis".into(), Value::from("sideways"));
        assert!(ChannelConfig::from_record(&record).is_err());

        record.insert("axis".into(), Value::from("Primary"));
        record.insert("subplot".into(), Value::from(0));
        assert!(ChannelConfig::from_record(&record).is_err());
    }

    #[test]
    fn axis_and_color_parsing() {
        assert_eq!("omit".parse::<Axis>().unwrap(), Axis::Hidden);
        assert_eq!("HIDE".parse::<Axis>().unwrap(), Axis::Hidden);
        assert_eq!(" secondary ".parse::<Axis>().unwrap(), Axis::Secondary);
        assert!("sideways".parse::<Axis>().is_err());

        assert_eq!("#auto".parse::<ChannelColor>().unwrap(), ChannelColor::Auto);
        assert_eq!(
            "#1F77B4".parse::<ChannelColor>().unwrap(),
            ChannelColor::Fixed(Rgb(0x1f, 0x77, 0xb4))
        );
        assert!("#12345".parse::<ChannelColor>().is_err());
        assert!("1f77b4".parse::<ChannelColor>().is_err());
    }
}
