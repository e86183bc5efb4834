//! Shared utilities: IPv4/CIDR parsing and port interval merging.

pub mod ip_utils;
pub mod ranges;

pub use ip_utils::{parse_cidr, parse_ipv4, AddrError, Ipv4Cidr};
pub use ranges::{format_runs, merge_consecutive, PortRange, PortRun, RangeError};
