// Channel model, signal transforms and render grouping. Nothing in here
// touches the filesystem or the GUI.
pub mod channel;
pub mod config;
pub mod filter;
pub mod grouping;
pub mod ledger;
pub mod transform;
pub mod view;

pub use channel::{Axis, ChannelColor, ChannelConfig, Rgb, NO_UNITS};
pub use config::{ExplorerSettings, TransformDefaults, DEFAULT_PALETTE};
pub use filter::low_pass_filter;
pub use grouping::{group_channels, RenderPlan, SubplotGroup, TraceStyle};
pub use ledger::ProcessingLedger;
pub use transform::{
    decimate, moving_average, normalize, remove_offset, NormalizeMethod, Transform, TransformKind,
};
pub use view::{ChannelStatistics, PlotFrame, Trace};
