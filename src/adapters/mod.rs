pub mod local;
pub mod net_probe;
pub mod ssh;
pub mod transport;
