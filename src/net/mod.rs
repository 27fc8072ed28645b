//! Network probing layer (spec §4.3, §4.4, §4.10): DNS, HTTP file
//! fetch, and WHOIS.

pub mod dns;
pub mod http;
pub mod whois;

pub use dns::{DnsData, DnsProbeClient};
pub use http::{FileClientResponse, HttpFileProbeClient};
pub use whois::WhoisClient;
