//! Hosts, requests and the HTTP transport.

mod connection;
mod host;
mod request;
mod transport;

pub(crate) use connection::{Connection, ConnectionConfig};
pub use host::{Host, HostList, HostRef};
pub(crate) use host::parse_host_url;
pub use request::{Request, Response};
pub(crate) use request::{DIRTY_READ_HEADER, TRANSACTION_ID_HEADER};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
