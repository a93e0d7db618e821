//! Translation between the hierarchical VRRP configuration/state trees used
//! by the configuration bus and the flat text files consumed and produced by
//! the keepalived daemon.
//!
//! # Features
//!
//! - Sanitization of the raw interface tree (vif promotion, pruning)
//! - keepalived.conf generation from the typed configuration tree
//! - keepalived.conf parsing back into the typed configuration tree
//! - keepalived.data (topology) and keepalived.stats dump parsing into the
//!   typed state tree consumed by the show-command renderers
//!
//! The crate performs no I/O: every entry point is a pure function over
//! in-memory text and trees. Reading and writing the daemon's files, and the
//! bus that delivers configuration, belong to the callers.
//!
//! # Example
//!
//! ```
//! use keepalived::{sanitize, render_config, parse_config, ConfigTree};
//!
//! # fn example(raw: ConfigTree) -> common::Result<()> {
//! let tree = sanitize(raw);
//! let text = render_config(&tree)?;
//! let round_tripped = parse_config(&text)?;
//! # Ok(())
//! # }
//! ```

mod config_file;
mod data_file;
mod group;
mod sanitize;
mod scan;
mod state;
mod stats;
mod stats_file;
mod sync;
mod types;

pub use config_file::{parse_config, render_config};
pub use data_file::parse_data_file;
pub use group::{instance_name, vmac_name};
pub use sanitize::sanitize;
pub use scan::{FieldValue, block_starts, find_field, find_keyword, find_line, split_blocks};
pub use state::{
    GroupState, InstanceState, InterfaceState, MonitorState, StateTree, SyncGroupState,
    TrackState, TrackedObjectState, VRRPState,
};
pub use stats::{AuthenticationErrors, Counters, InstanceStats, PacketErrors};
pub use stats_file::parse_stats_file;
pub use sync::{SyncGroup, SyncGroupMap};
pub use types::{
    AuthType, Authentication, ConfigTree, Interface, InterfaceType, Monitor, Notify, PathMonitor,
    Policy, Track, TrackWeight, TrackedInterface, TrackedRoute, VRRPConfig, VRRPGroup,
    WeightDirection,
};
