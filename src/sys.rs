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

// Linux takes (out, in, &mut offset, count), the BSDs take (in, out, offset,
// ...) plus an sf_hdtr. macOS counts the headers in its in/out len.

use std::convert::TryFrom;
use std::os::unix::io::RawFd;

use crate::request::{Request, Transfer};
use crate::{Error, Result};

// Linux clamps to this anyway
pub const MAX_CHUNK_SIZE: usize = 0x7fff_f000;

#[inline]
pub fn sendfile(out_fd: RawFd, in_fd: RawFd, offset: i64, count: usize) -> Result<Transfer> {
    send(&Request::from_raw_fds(out_fd, in_fd, offset, count))
}

pub(crate) fn send(request: &Request) -> Result<Transfer> {
    if request.offset < 0 {
        return Err(Error::invalid_argument());
    }

    let offset = match libc::off_t::try_from(request.offset) {
        Ok(offset) => offset,
        Err(_) => return Err(Error::invalid_argument()),
    };

    // BSD reads a zero count as "until EOF", so never hand it down.
    if request.count == 0 {
        return Ok(Transfer { sent: 0, offset: request.offset });
    }

    sys_sendfile(request, offset)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn sys_sendfile(request: &Request, mut offset: libc::off_t) -> Result<Transfer> {
    debug_assert!(request.headers.is_empty() && request.trailers.is_empty());

    // offset + count must not wrap, the kernel answers that with EINVAL
    let room = usize::try_from(libc::off_t::MAX - offset).unwrap_or(usize::MAX);
    let count = request.count.min(MAX_CHUNK_SIZE).min(room);
    if count == 0 {
        return Ok(Transfer { sent: 0, offset: request.offset });
    }

    // SAFETY: offset is a valid off_t for the duration of the call. Bad
    // descriptors are reported by the kernel as EBADF.
    let result = unsafe { libc::sendfile(request.out_fd, request.in_fd, &mut offset, count) };

    if result < 0 {
        let error = Error::last_os_error();
        // only raised for offsets at or past the filesystem's size limit,
        // which no file reaches
        if error.raw_os_error() == Some(libc::EOVERFLOW) {
            return Ok(Transfer { sent: 0, offset: request.offset });
        }
        return Err(error);
    }

    Ok(Transfer {
        sent: result as usize,
        offset: offset as i64,
    })
}

#[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
fn sys_sendfile(request: &Request, offset: libc::off_t) -> Result<Transfer> {
    let mut headers  = iovecs(request.headers)?;
    let mut trailers = iovecs(request.trailers)?;
    let mut hdtr = sf_hdtr(&mut headers, &mut trailers);
    let hdtr_ptr = if request.headers.is_empty() && request.trailers.is_empty() {
        std::ptr::null_mut()
    } else {
        &mut hdtr as *mut libc::sf_hdtr
    };

    let count = request.count.min(MAX_CHUNK_SIZE);
    let mut sbytes: libc::off_t = 0;

    // SAFETY: the iovecs borrow request's buffers, which outlive the call.
    let result = unsafe {
        libc::sendfile(request.in_fd, request.out_fd, offset, count, hdtr_ptr, &mut sbytes, 0)
    };
    let error = if result < 0 { Some(Error::last_os_error()) } else { None };

    finish(request, error, sbytes as usize)
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn sys_sendfile(request: &Request, offset: libc::off_t) -> Result<Transfer> {
    let mut headers  = iovecs(request.headers)?;
    let mut trailers = iovecs(request.trailers)?;
    let mut hdtr = sf_hdtr(&mut headers, &mut trailers);
    let hdtr_ptr = if request.headers.is_empty() && request.trailers.is_empty() {
        std::ptr::null_mut()
    } else {
        &mut hdtr as *mut libc::sf_hdtr
    };

    // len is in/out and counts the headers on the way in
    let count = request.count.min(MAX_CHUNK_SIZE);
    let mut len = match libc::off_t::try_from(count.saturating_add(request.header_len())) {
        Ok(len) => len,
        Err(_) => return Err(Error::invalid_argument()),
    };

    // SAFETY: the iovecs borrow request's buffers, which outlive the call.
    let result = unsafe {
        libc::sendfile(request.in_fd, request.out_fd, offset, &mut len, hdtr_ptr, 0)
    };
    let error = if result < 0 { Some(Error::last_os_error()) } else { None };

    finish(request, error, len as usize)
}

#[cfg(any(
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
))]
fn iovecs(buffers: &[&[u8]]) -> Result<Vec<libc::iovec>> {
    if buffers.is_empty() {
        return Ok(Vec::new());
    }

    // SAFETY: sysconf has no preconditions.
    let iov_max = unsafe { libc::sysconf(libc::_SC_IOV_MAX) };
    if iov_max > 0 && buffers.len() > iov_max as usize {
        return Err(Error::invalid_argument());
    }

    Ok(buffers.iter().map(|buf| libc::iovec {
        iov_base: buf.as_ptr() as *mut libc::c_void,
        iov_len:  buf.len(),
    }).collect())
}

#[cfg(any(
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
))]
fn sf_hdtr(headers: &mut Vec<libc::iovec>, trailers: &mut Vec<libc::iovec>) -> libc::sf_hdtr {
    fn ptr(iov: &mut Vec<libc::iovec>) -> *mut libc::iovec {
        if iov.is_empty() { std::ptr::null_mut() } else { iov.as_mut_ptr() }
    }

    libc::sf_hdtr {
        headers:  ptr(headers),
        hdr_cnt:  headers.len() as libc::c_int,
        trailers: ptr(trailers),
        trl_cnt:  trailers.len() as libc::c_int,
    }
}

/// Turns the raw BSD outcome into a `Transfer`.
///
/// These calls can fail with EAGAIN/EINTR/EBUSY after part of the data
/// already left. Those bytes are on the wire, so they are reported as a
/// short send and only a call that moved nothing becomes an error.
#[cfg(any(
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
))]
fn finish(request: &Request, error: Option<Error>, sent: usize) -> Result<Transfer> {
    if let Some(error) = error {
        let partial = match error.raw_os_error() {
            Some(errno) => sent > 0 && (
                errno == libc::EAGAIN ||
                errno == libc::EINTR  ||
                errno == libc::EBUSY),
            None => false,
        };
        if !partial {
            return Err(error);
        }
    }

    let mut file_sent = sent.saturating_sub(request.header_len()).min(request.count);

    // with trailers the byte count can't tell file bytes from trailer bytes
    // once the file ran out early
    if !request.trailers.is_empty() && file_sent > 0 {
        let remaining = file_size(request.in_fd)?.saturating_sub(request.offset as u64);
        if (file_sent as u64) > remaining {
            file_sent = remaining as usize;
        }
    }

    Ok(Transfer {
        sent,
        offset: request.offset + file_sent as i64,
    })
}

pub(crate) fn file_size(fd: RawFd) -> Result<u64> {
    let mut stat = std::mem::MaybeUninit::<libc::stat>::uninit();

    // SAFETY: fstat fills stat completely on success.
    let result = unsafe { libc::fstat(fd, stat.as_mut_ptr()) };
    if result < 0 {
        return Err(Error::last_os_error());
    }

    let stat = unsafe { stat.assume_init() };
    Ok(stat.st_size.max(0) as u64)
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
)))]
fn sys_sendfile(request: &Request, offset: libc::off_t) -> Result<Transfer> {
    // no native call, so this goes through user space after all
    const BUFFER_SIZE: usize = 64 * 1024;

    debug_assert!(request.headers.is_empty() && request.trailers.is_empty());

    // needs to be heap allocated since some platforms have small stacks
    let mut buf = vec![0u8; request.count.min(BUFFER_SIZE)];

    // SAFETY: buf is valid for buf.len() bytes.
    let read = unsafe {
        libc::pread(request.in_fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), offset)
    };
    if read < 0 {
        return Err(Error::last_os_error());
    }
    if read == 0 {
        return Ok(Transfer { sent: 0, offset: request.offset });
    }

    // SAFETY: the first `read` bytes of buf were just filled.
    let written = unsafe {
        libc::write(request.out_fd, buf.as_ptr() as *const libc::c_void, read as usize)
    };
    if written < 0 {
        return Err(Error::last_os_error());
    }

    Ok(Transfer {
        sent: written as usize,
        offset: request.offset + written as i64,
    })
}
