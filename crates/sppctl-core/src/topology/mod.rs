//! CPU topology service.
//!
//! Reads the host socket/core/lcore layout and derives which lcores are still
//! free given the lcores each registered process reports in its status.
//! Nothing here is cached; every call reflects the current registry.

mod layout;
mod usage;

pub use layout::{layout_source, CoreLayout, HelperLayout, LayoutSource, SocketLayout, SysfsLayout};
pub use usage::{pick_slave_lcores, unused_lcores, usage_from_status, CpuUsage, UnusedLcores};
