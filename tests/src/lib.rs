//! End-to-end checks of the scan coordinator. Loopback only; anything that
//! needs a real LAN is ignored by default.

mod util;

mod discovery;
mod lifecycle;
