#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::net::TcpStream;
use std::os::unix::io::RawFd;

use sendfile::{Peer, Request, Result, Transfer};

pub const CHUNK_SIZE: usize = 4096;

/// "12345abcde" over and over, 10 MiB in total.
pub fn data() -> Vec<u8> {
    pattern(1024 * 1024)
}

pub fn pattern(repeat: usize) -> Vec<u8> {
    b"12345abcde".repeat(repeat)
}

pub fn data_file(data: &[u8]) -> Result<File> {
    let mut file = tempfile::tempfile()?;
    file.write_all(data)?;
    file.flush()?;
    Ok(file)
}

pub struct Fixture {
    pub data: Vec<u8>,
    pub file: File,
    pub peer: Peer,
    pub client: TcpStream,
}

impl Fixture {
    pub fn new() -> Result<Self> {
        Self::with_data(data())
    }

    pub fn with_data(data: Vec<u8>) -> Result<Self> {
        let file = data_file(&data)?;
        let peer = Peer::bind("127.0.0.1:0")?;
        let client = peer.connect()?;

        Ok(Self { data, file, peer, client })
    }

    /// Hangs up and returns everything the peer got.
    pub fn finish(self) -> Result<Vec<u8>> {
        drop(self.client);
        self.peer.wait()
    }
}

/// How an application is supposed to drive `sendfile()`: reissue the same
/// request on WouldBlock, pass everything else on.
pub fn send_retrying(request: &Request) -> Result<Transfer> {
    loop {
        match request.send() {
            Ok(transfer) => {
                assert!(transfer.offset - request.offset() <= transfer.sent as i64);
                return Ok(transfer);
            }
            Err(error) if error.is_would_block() => continue,
            Err(error) => return Err(error),
        }
    }
}

/// Sends from `offset` in `CHUNK_SIZE` pieces until end of file. Returns
/// the total and the final offset.
pub fn send_to_eof(out_fd: RawFd, in_fd: RawFd, mut offset: i64) -> Result<(usize, i64)> {
    let mut total = 0;
    loop {
        let transfer = send_retrying(&Request::from_raw_fds(out_fd, in_fd, offset, CHUNK_SIZE))?;
        if transfer.is_eof() {
            assert_eq!(transfer.offset, offset);
            return Ok((total, offset));
        }
        assert!(transfer.sent <= CHUNK_SIZE);
        assert_eq!(transfer.offset - offset, transfer.sent as i64);
        total += transfer.sent;
        offset = transfer.offset;
    }
}

pub fn set_socket_option(fd: RawFd, option: libc::c_int, value: libc::c_int) -> Result<()> {
    // SAFETY: value lives across the call and the length matches.
    let result = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            option,
            &value as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t)
    };
    if result < 0 {
        return Err(sendfile::Error::last_os_error());
    }
    Ok(())
}

/// Closing after this sends RST instead of FIN.
pub fn set_linger_zero(fd: RawFd) -> Result<()> {
    let linger = libc::linger { l_onoff: 1, l_linger: 0 };

    // SAFETY: linger lives across the call and the length matches.
    let result = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_LINGER,
            &linger as *const libc::linger as *const libc::c_void,
            std::mem::size_of::<libc::linger>() as libc::socklen_t)
    };
    if result < 0 {
        return Err(sendfile::Error::last_os_error());
    }
    Ok(())
}
