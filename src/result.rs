// This file is part of rust-sendfile.
//
// rust-sendfile is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// rust-sendfile is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with rust-sendfile.  If not, see <https://www.gnu.org/licenses/>.

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorType {
    InvalidArgument,
    WouldBlock,
    ConnectionReset,
    Unsupported,
    OS,
    Message,
}

impl ErrorType {
    pub fn from_raw_os_error(errno: i32) -> Self {
        match errno {
            libc::EINVAL => ErrorType::InvalidArgument,
            libc::ECONNRESET | libc::EPIPE => ErrorType::ConnectionReset,
            libc::EOPNOTSUPP => ErrorType::Unsupported,
            // EWOULDBLOCK == EAGAIN everywhere we build, but don't rely on it
            _ if errno == libc::EAGAIN || errno == libc::EWOULDBLOCK => ErrorType::WouldBlock,
            _ => ErrorType::OS,
        }
    }
}

#[derive(Debug)]
pub struct Error {
    pub(crate) error_type: ErrorType,
    pub(crate) io: Option<std::io::Error>,
    pub(crate) message: Option<String>,
}

impl Error {
    #[inline]
    pub fn new(message: String) -> Self {
        Self {
            error_type: ErrorType::Message,
            io: None,
            message: Some(message),
        }
    }

    #[inline]
    pub fn from_raw_os_error(errno: i32) -> Self {
        Self::io(std::io::Error::from_raw_os_error(errno))
    }

    #[inline]
    pub fn last_os_error() -> Self {
        Self::io(std::io::Error::last_os_error())
    }

    pub fn io(error: std::io::Error) -> Self {
        let error_type = match error.raw_os_error() {
            Some(errno) => ErrorType::from_raw_os_error(errno),
            None => match error.kind() {
                std::io::ErrorKind::WouldBlock => ErrorType::WouldBlock,
                std::io::ErrorKind::InvalidInput => ErrorType::InvalidArgument,
                std::io::ErrorKind::ConnectionReset |
                std::io::ErrorKind::BrokenPipe => ErrorType::ConnectionReset,
                _ => ErrorType::OS,
            },
        };
        Self {
            error_type,
            io: Some(error),
            message: None,
        }
    }

    #[inline]
    pub(crate) fn invalid_argument() -> Self {
        Self::from_raw_os_error(libc::EINVAL)
    }

    #[inline]
    pub(crate) fn unsupported() -> Self {
        Self::from_raw_os_error(libc::EOPNOTSUPP)
    }

    #[inline]
    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    #[inline]
    pub fn raw_os_error(&self) -> Option<i32> {
        self.io.as_ref().and_then(std::io::Error::raw_os_error)
    }

    #[inline]
    pub fn is_invalid_argument(&self) -> bool {
        self.error_type == ErrorType::InvalidArgument
    }

    #[inline]
    pub fn is_would_block(&self) -> bool {
        self.error_type == ErrorType::WouldBlock
    }

    #[inline]
    pub fn is_connection_reset(&self) -> bool {
        self.error_type == ErrorType::ConnectionReset
    }

    #[inline]
    pub fn is_unsupported(&self) -> bool {
        self.error_type == ErrorType::Unsupported
    }

    #[inline]
    pub fn is_interrupted(&self) -> bool {
        self.raw_os_error() == Some(libc::EINTR)
    }

    pub fn with_context(self, context: impl std::fmt::Display) -> Self {
        match self.message {
            Some(message) => Error::new(format!("{}: {}", context, message)),
            None => self,
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorType::InvalidArgument => write!(f, "invalid argument"),
            ErrorType::WouldBlock      => write!(f, "resource temporarily unavailable"),
            ErrorType::ConnectionReset => write!(f, "connection reset"),
            ErrorType::Unsupported     => write!(f, "not supported on this platform"),
            ErrorType::OS              => write!(f, "OS error"),
            ErrorType::Message         => write!(f, "error"),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(message) = &self.message {
            message.fmt(f)
        } else if let Some(io) = &self.io {
            io.fmt(f)
        } else {
            self.error_type.fmt(f)
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.io {
            Some(io) => Some(io),
            None => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::io(error)
    }
}

impl From<clap::Error> for Error {
    fn from(error: clap::Error) -> Self {
        Error::new(error.message)
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(error: std::num::ParseIntError) -> Self {
        Error::new(error.to_string())
    }
}

pub type Result<T> = core::result::Result<T, Error>;
