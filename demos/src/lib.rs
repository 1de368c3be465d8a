//! Shared support for the `roc-send`/`roc-recv` command-line demos: the
//! "external collaborators" the core toolkit only specifies as a consumed
//! contract (spec §6 "CLI surface") — device URIs and the UDP transport
//! binding the packet pipeline to the network.

pub mod device;
pub mod wire;
