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

use crate::request::{Request, CAPABILITY};
use crate::sys::file_size;
use crate::{Error, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy)]
pub struct SendOptions<'a> {
    pub chunk_size: usize,
    pub headers: &'a [&'a [u8]],
    pub trailers: &'a [&'a [u8]],
    pub wait_writable: bool,
}

impl Default for SendOptions<'_> {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            headers: &[],
            trailers: &[],
            wait_writable: true,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub struct Sent {
    pub total: u64,
    pub file_bytes: u64,
    pub offset: i64,
    pub calls: usize,
}

struct Pending {
    data: Vec<u8>,
    pos: usize,
}

impl Pending {
    fn new(buffers: &[&[u8]]) -> Self {
        Self {
            data: buffers.concat(),
            pos: 0,
        }
    }

    #[inline]
    fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    #[inline]
    fn is_done(&self) -> bool {
        self.pos >= self.data.len()
    }

    #[inline]
    fn consume(&mut self, amount: usize) -> usize {
        let amount = amount.min(self.data.len() - self.pos);
        self.pos += amount;
        amount
    }
}

// Framing the platform can't take natively goes out with plain write()s.
pub fn send_all(out: &impl AsRawFd, input: &impl AsRawFd, offset: i64, count: Option<u64>, options: &SendOptions) -> Result<Sent> {
    let out_fd = out.as_raw_fd();
    let in_fd  = input.as_raw_fd();

    if offset < 0 || options.chunk_size == 0 {
        return Err(Error::invalid_argument());
    }

    let count = match count {
        Some(count) => count,
        None => file_size(in_fd)?.saturating_sub(offset as u64),
    };

    let native = CAPABILITY.supports_headers();
    let mut headers  = Pending::new(options.headers);
    let mut trailers = Pending::new(options.trailers);
    let mut sent = Sent {
        offset,
        ..Sent::default()
    };

    if !native && !headers.is_done() {
        sent.total += write_all(out_fd, headers.remaining(), options.wait_writable)? as u64;
        headers.consume(usize::MAX);
    }

    while sent.file_bytes < count {
        let remaining = count - sent.file_bytes;
        let chunk = if remaining < options.chunk_size as u64 {
            remaining as usize
        } else {
            options.chunk_size
        };
        let is_last = remaining == chunk as u64;

        let header_slice = [headers.remaining()];
        let trailer_slice = [trailers.remaining()];
        let mut request = Request::from_raw_fds(out_fd, in_fd, sent.offset, chunk);
        if native && !headers.is_done() {
            request = request.headers(&header_slice)?;
        }
        if native && is_last && !trailers.is_done() {
            request = request.trailers(&trailer_slice)?;
        }
        let header_len = request.header_len();

        let transfer = match request.send() {
            Ok(transfer) => transfer,
            Err(error) if error.is_would_block() => {
                log::trace!("fd {}: would block at offset {}", out_fd, sent.offset);
                if options.wait_writable {
                    wait_writable(out_fd)?;
                } else {
                    std::thread::yield_now();
                }
                continue;
            }
            Err(error) if error.is_interrupted() => continue,
            Err(error) => return Err(error),
        };

        debug_assert!(transfer.offset >= sent.offset);
        let file_sent = (transfer.offset - sent.offset) as usize;
        debug_assert!(file_sent <= transfer.sent);

        sent.calls += 1;
        sent.total += transfer.sent as u64;
        sent.file_bytes += file_sent as u64;
        sent.offset = transfer.offset;

        let framing = transfer.sent - file_sent;
        let used = headers.consume(framing.min(header_len));
        trailers.consume(framing - used);

        log::trace!("fd {}: sent {} bytes ({} from file), offset now {}",
            out_fd, transfer.sent, file_sent, sent.offset);

        if transfer.is_eof() {
            break;
        }
    }

    // leftovers: everything on simple platforms, or framing the file ran
    // out before
    if !headers.is_done() {
        sent.total += write_all(out_fd, headers.remaining(), options.wait_writable)? as u64;
    }
    if !trailers.is_done() {
        sent.total += write_all(out_fd, trailers.remaining(), options.wait_writable)? as u64;
    }

    log::debug!("fd {}: sent {} bytes in {} calls ({} from file), final offset {}",
        out_fd, sent.total, sent.calls, sent.file_bytes, sent.offset);

    Ok(sent)
}

fn write_all(fd: RawFd, mut buf: &[u8], wait: bool) -> Result<usize> {
    let len = buf.len();

    while !buf.is_empty() {
        // SAFETY: buf is valid for buf.len() bytes.
        let result = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };

        if result < 0 {
            let error = Error::last_os_error();
            if error.is_interrupted() {
                continue;
            }
            if error.is_would_block() {
                if wait {
                    wait_writable(fd)?;
                } else {
                    std::thread::yield_now();
                }
                continue;
            }
            return Err(error);
        }

        buf = &buf[result as usize..];
    }

    Ok(len)
}

fn wait_writable(fd: RawFd) -> Result<()> {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };

    loop {
        // SAFETY: a single valid pollfd.
        let result = unsafe { libc::poll(&mut pollfd, 1, -1) };
        if result >= 0 {
            // POLLERR/POLLHUP surface on the next send
            return Ok(());
        }

        let error = Error::last_os_error();
        if !error.is_interrupted() {
            return Err(error);
        }
    }
}
