//! linebar: concurrent status line generator for i3bar/swaybar
//!
//! Every activated module runs as its own task and owns one output slot. A
//! module publishes by overwriting its slot and raising a coalescing update
//! signal; a single aggregator waits out a short debounce window after the
//! first signal, snapshots every visible slot in activation order and writes
//! one frame of the i3bar JSON protocol to standard output.
//!
//! ## Modules
//!
//! * `config`: TOML configuration with `validator` checks and built-in
//!   defaults: logging, debounce window and the ordered module list.
//!
//! * `core`: Runtime components:
//!   - Output slots and the ordered slot registry
//!   - Update signal and the aggregator loop
//!   - Engine wiring with one task per module
//!   - Module catalog, producer traits and built-in producers
//!
//! * `logger`: Logging initialization using `tracing`. Console output
//!   always goes to standard error (standard output carries the protocol),
//!   with optional systemd journald integration.
//!
//! ## Features
//!
//! * `standard`: every built-in producer (default).
//! * `minimal`: `clock`, `df` and `sysinfo` only.
//! * `module-<name>`: enables a single producer.

pub mod config;
pub mod core;
pub mod logger;
