#[cfg(not(unix))]
compile_error!("sendfile needs a Unix-like platform");

pub mod result;
pub use result::{Error, ErrorType, Result};

pub mod request;
pub use request::{Capability, Request, Transfer, CAPABILITY};

pub mod sys;
pub use sys::{sendfile, MAX_CHUNK_SIZE};

pub mod send;
pub use send::{send_all, SendOptions, Sent, DEFAULT_CHUNK_SIZE};

pub mod peer;
pub use peer::Peer;

pub mod util;
