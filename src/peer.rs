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

use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver};

use crate::{Error, Result};

pub const GREETING: &[u8] = b"220 ready\r\n";

#[derive(Debug)]
pub struct Peer {
    local_addr: SocketAddr,
    receiver: Receiver<Result<Vec<u8>>>,
    handle: Option<JoinHandle<()>>,
}

impl Peer {
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let local_addr = listener.local_addr()?;
        let (sender, receiver) = bounded(1);

        let handle = std::thread::Builder::new()
            .name(format!("peer {}", local_addr))
            .spawn(move || {
                // nobody waiting for it is fine
                let _ = sender.send(serve(listener));
            })?;

        log::debug!("peer listening on {}", local_addr);

        Ok(Self {
            local_addr,
            receiver,
            handle: Some(handle),
        })
    }

    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn connect(&self) -> Result<TcpStream> {
        let mut stream = TcpStream::connect(self.local_addr)?;
        read_greeting(&mut stream)?;
        Ok(stream)
    }

    pub fn wait(mut self) -> Result<Vec<u8>> {
        let result = match self.receiver.recv() {
            Ok(result) => result,
            Err(_) => Err(Error::new(format!("peer {} exited without a result", self.local_addr))),
        };

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                return Err(Error::new(format!("peer {} panicked", self.local_addr)));
            }
        }

        result
    }
}

impl Drop for Peer {
    fn drop(&mut self) {
        if self.handle.take().is_none() {
            return;
        }

        // Nobody connected and nobody will wait: poke accept() so the thread
        // finishes and the port is released. Not joined, a stuck client would
        // block the drop.
        let mut addr = self.local_addr;
        if addr.ip().is_unspecified() {
            addr.set_ip(match addr.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            });
        }
        if let Err(error) = TcpStream::connect(addr) {
            log::debug!("peer {}: wake up on drop: {}", self.local_addr, error);
        }
    }
}

pub fn read_greeting(stream: &mut TcpStream) -> Result<()> {
    let mut greeting = [0u8; GREETING.len()];
    stream.read_exact(&mut greeting)?;

    if greeting != GREETING {
        return Err(Error::new(format!(
            "unexpected greeting: {:?}",
            String::from_utf8_lossy(&greeting))));
    }

    Ok(())
}

fn serve(listener: TcpListener) -> Result<Vec<u8>> {
    let (mut stream, addr) = listener.accept()?;
    log::debug!("peer {}: accepted {}", listener.local_addr()?, addr);

    stream.write_all(GREETING)?;

    let mut data = Vec::new();
    stream.read_to_end(&mut data)?;

    log::debug!("peer: {} closed after {} bytes", addr, data.len());

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_until_close() {
        let peer = Peer::bind("127.0.0.1:0").unwrap();
        let mut stream = peer.connect().unwrap();
        stream.write_all(b"hello ").unwrap();
        stream.write_all(b"world").unwrap();
        drop(stream);

        assert_eq!(peer.wait().unwrap(), b"hello world");
    }

    #[test]
    fn drop_without_connection_releases_port() {
        let peer = Peer::bind("127.0.0.1:0").unwrap();
        let addr = peer.local_addr();
        drop(peer);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        loop {
            match TcpStream::connect(addr) {
                Err(error) if error.kind() == std::io::ErrorKind::ConnectionRefused => break,
                _ => {
                    assert!(std::time::Instant::now() < deadline, "{} still accepting", addr);
                    std::thread::sleep(std::time::Duration::from_millis(10));
                }
            }
        }
    }
}
