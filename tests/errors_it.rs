mod util;

use std::net::{TcpListener, TcpStream};
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use sendfile::{sendfile, ErrorType, Result};
use util::{data, data_file, set_linger_zero, set_socket_option};

#[test]
fn test_would_block_on_full_send_buffer() -> Result<()> {
    let data = data();
    let file = data_file(&data)?;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    set_socket_option(listener.as_raw_fd(), libc::SO_RCVBUF, 4096)?;
    let client = TcpStream::connect(listener.local_addr()?)?;
    // accepted but never read from
    let (_server, _) = listener.accept()?;

    set_socket_option(client.as_raw_fd(), libc::SO_SNDBUF, 4096)?;
    client.set_nonblocking(true)?;

    let mut offset = 0;
    loop {
        match sendfile(client.as_raw_fd(), file.as_raw_fd(), offset, 65536) {
            Ok(transfer) => {
                assert!(!transfer.is_eof(), "sent all {} bytes without blocking", data.len());
                assert!(transfer.offset > offset);
                offset = transfer.offset;
            }
            Err(error) => {
                assert_eq!(error.error_type(), ErrorType::WouldBlock);
                assert_eq!(error.raw_os_error(), Some(libc::EAGAIN));
                break;
            }
        }
    }

    Ok(())
}

#[test]
fn test_connection_reset() -> Result<()> {
    let data = data();
    let file = data_file(&data)?;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let client = TcpStream::connect(listener.local_addr()?)?;
    let (server, _) = listener.accept()?;

    set_linger_zero(server.as_raw_fd())?;
    drop(server);
    std::thread::sleep(Duration::from_millis(100));

    let mut offset = 0;
    let error = loop {
        match sendfile(client.as_raw_fd(), file.as_raw_fd(), offset, 65536) {
            Ok(transfer) => {
                assert!(!transfer.is_eof(), "peer never noticed to be gone");
                offset = transfer.offset;
            }
            Err(error) => break error,
        }
    };

    assert_eq!(error.error_type(), ErrorType::ConnectionReset);
    let errno = error.raw_os_error();
    assert!(errno == Some(libc::ECONNRESET) || errno == Some(libc::EPIPE), "errno: {:?}", errno);

    Ok(())
}

#[test]
fn test_bad_descriptor_keeps_errno() -> Result<()> {
    let file = data_file(b"12345abcde")?;

    let error = sendfile(-1, file.as_raw_fd(), 0, 10).unwrap_err();

    assert_eq!(error.error_type(), ErrorType::OS);
    assert_eq!(error.raw_os_error(), Some(libc::EBADF));

    Ok(())
}
