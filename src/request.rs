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

use std::os::unix::io::{AsRawFd, RawFd};

use crate::{Error, Result};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Capability {
    Simple,
    Full,
}

impl Capability {
    #[inline]
    pub fn supports_headers(self) -> bool {
        matches!(self, Capability::Full)
    }

    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Capability::Simple => "simple",
            Capability::Full   => "full",
        }
    }
}

#[cfg(any(
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
))]
pub const CAPABILITY: Capability = Capability::Full;

#[cfg(not(any(
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
)))]
pub const CAPABILITY: Capability = Capability::Simple;

/// Outcome of one successful call.
///
/// `sent` counts header and trailer bytes too, `offset` only moves by the
/// bytes that came out of the file. A `sent` of zero means end of file.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Transfer {
    pub sent: usize,
    pub offset: i64,
}

impl Transfer {
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.sent == 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub(crate) out_fd: RawFd,
    pub(crate) in_fd: RawFd,
    pub(crate) offset: i64,
    pub(crate) count: usize,
    pub(crate) headers: &'a [&'a [u8]],
    pub(crate) trailers: &'a [&'a [u8]],
}

impl<'a> Request<'a> {
    #[inline]
    pub fn new(out: &impl AsRawFd, input: &impl AsRawFd, offset: i64, count: usize) -> Self {
        Self::from_raw_fds(out.as_raw_fd(), input.as_raw_fd(), offset, count)
    }

    #[inline]
    pub fn from_raw_fds(out_fd: RawFd, in_fd: RawFd, offset: i64, count: usize) -> Self {
        Self {
            out_fd,
            in_fd,
            offset,
            count,
            headers: &[],
            trailers: &[],
        }
    }

    // only empty lists get through on simple platforms
    pub fn headers(mut self, headers: &'a [&'a [u8]]) -> Result<Self> {
        if !headers.is_empty() && !CAPABILITY.supports_headers() {
            return Err(Error::unsupported());
        }
        self.headers = headers;
        Ok(self)
    }

    pub fn trailers(mut self, trailers: &'a [&'a [u8]]) -> Result<Self> {
        if !trailers.is_empty() && !CAPABILITY.supports_headers() {
            return Err(Error::unsupported());
        }
        self.trailers = trailers;
        Ok(self)
    }

    #[inline]
    pub fn offset(&self) -> i64 {
        self.offset
    }

    #[inline]
    pub fn header_len(&self) -> usize {
        self.headers.iter().map(|buf| buf.len()).sum()
    }

    #[inline]
    pub fn send(&self) -> Result<Transfer> {
        crate::sys::send(self)
    }
}
