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

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use std::fs::File;
use std::net::TcpStream;

use sendfile::peer::read_greeting;
use sendfile::util::{format_size, parse_size};
use sendfile::{send_all, Error, Peer, Result, SendOptions, CAPABILITY, DEFAULT_CHUNK_SIZE};

fn arg_human_readable<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("human-readable")
        .long("human-readable")
        .short("h")
        .takes_value(false)
        .help("Print sizes like 1.0 K, 2.2 M, 4.1 G etc.")
}

fn arg_address<'a, 'b>(index: u64) -> Arg<'a, 'b> {
    Arg::with_name("address")
        .index(index)
        .required(true)
        .value_name("ADDR")
        .help("host:port, e.g. 127.0.0.1:2121")
}

fn arg_framing<'a, 'b>(name: &'a str, help: &'b str) -> Arg<'a, 'b> {
    Arg::with_name(name)
        .long(name)
        .takes_value(true)
        .multiple(true)
        .number_of_values(1)
        .value_name("TEXT")
        .help(help)
}

fn size_of(args: &ArgMatches, name: &str) -> Result<Option<u64>> {
    match args.value_of(name) {
        Some(value) => match parse_size(value) {
            Ok(size) => Ok(Some(size)),
            Err(error) => Err(error.with_context(format!("--{}", name))),
        },
        None => Ok(None),
    }
}

fn show_size(size: u64, human_readable: bool) -> String {
    if human_readable {
        format_size(size)
    } else {
        size.to_string()
    }
}

fn send(args: &ArgMatches) -> Result<()> {
    let path = args.value_of("file").unwrap();
    let address = args.value_of("address").unwrap();
    let human_readable = args.is_present("human-readable");

    let offset: i64 = match args.value_of("offset") {
        Some(value) => match value.parse() {
            Ok(offset) => offset,
            Err(error) => return Err(Error::from(error).with_context("--offset")),
        },
        None => 0,
    };
    let count = size_of(args, "count")?;
    let chunk_size = match size_of(args, "chunk-size")? {
        Some(size) if size > 0 && size <= usize::MAX as u64 => size as usize,
        Some(size) => return Err(Error::new(format!("--chunk-size: illegal value: {}", size))),
        None => DEFAULT_CHUNK_SIZE,
    };

    let headers: Vec<&[u8]> = args.values_of("header")
        .map(|values| values.map(str::as_bytes).collect())
        .unwrap_or_default();
    let trailers: Vec<&[u8]> = args.values_of("trailer")
        .map(|values| values.map(str::as_bytes).collect())
        .unwrap_or_default();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) => return Err(Error::new(format!("{}: {}", path, error))),
    };

    let mut stream = TcpStream::connect(address)?;
    if !args.is_present("skip-greeting") {
        read_greeting(&mut stream)?;
    }
    if args.is_present("nonblocking") {
        stream.set_nonblocking(true)?;
    }

    let sent = send_all(&stream, &file, offset, count, &SendOptions {
        chunk_size,
        headers: &headers,
        trailers: &trailers,
        wait_writable: true,
    })?;

    println!("sent {} ({} from file) in {} calls, final offset {}",
        show_size(sent.total, human_readable),
        show_size(sent.file_bytes, human_readable),
        sent.calls,
        sent.offset);

    Ok(())
}

fn serve(args: &ArgMatches) -> Result<()> {
    let address = args.value_of("address").unwrap();
    let human_readable = args.is_present("human-readable");

    let peer = Peer::bind(address)?;
    println!("listening on {}", peer.local_addr());

    let data = peer.wait()?;
    println!("received {}", show_size(data.len() as u64, human_readable));

    if let Some(path) = args.value_of("output") {
        if let Err(error) = std::fs::write(path, &data) {
            return Err(Error::new(format!("{}: {}", path, error)));
        }
    }

    Ok(())
}

fn run() -> Result<()> {
    let app = App::new("sendfile - zero-copy file to socket transfer")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Mathias Panzenböck <grosser.meister.morti@gmx.net>")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(Arg::with_name("verbose")
            .long("verbose")
            .short("v")
            .global(true)
            .takes_value(false)
            .help("Log what is going on. RUST_LOG overrides this."));

    let app = app
        .subcommand(SubCommand::with_name("send")
            .alias("s")
            .about("Send a file to a TCP endpoint with sendfile().")
            .arg(Arg::with_name("offset")
                .long("offset")
                .short("o")
                .takes_value(true)
                .allow_hyphen_values(true)
                .value_name("OFFSET")
                .help("Start at this byte offset of FILE. [default: 0]"))
            .arg(Arg::with_name("count")
                .long("count")
                .short("c")
                .takes_value(true)
                .value_name("SIZE")
                .help("Send at most SIZE bytes of FILE. [default: until end of file]"))
            .arg(Arg::with_name("chunk-size")
                .long("chunk-size")
                .short("C")
                .takes_value(true)
                .value_name("SIZE")
                .help("Bytes per sendfile() call. [default: 4096]"))
            .arg(arg_framing("header", "Send TEXT before the file data. Repeatable."))
            .arg(arg_framing("trailer", "Send TEXT after the file data. Repeatable."))
            .arg(Arg::with_name("skip-greeting")
                .long("skip-greeting")
                .takes_value(false)
                .help("Don't wait for the peer's greeting line before sending."))
            .arg(Arg::with_name("nonblocking")
                .long("nonblocking")
                .takes_value(false)
                .help("Put the socket into non-blocking mode."))
            .arg(arg_human_readable())
            .arg(Arg::with_name("file")
                .index(1)
                .required(true)
                .value_name("FILE")
                .help("File to send."))
            .arg(arg_address(2)))
        .subcommand(SubCommand::with_name("serve")
            .about(
                "Accept one connection, greet it and collect everything it \
                 sends until it closes.")
            .arg(Arg::with_name("output")
                .long("output")
                .short("O")
                .takes_value(true)
                .value_name("FILE")
                .help("Write the received bytes to FILE."))
            .arg(arg_human_readable())
            .arg(arg_address(1)))
        .subcommand(SubCommand::with_name("info")
            .about("Show what sendfile() can do on this platform."));

    let matches = match app.get_matches_safe() {
        Ok(matches) => matches,
        Err(error) if error.kind == clap::ErrorKind::HelpDisplayed ||
                      error.kind == clap::ErrorKind::VersionDisplayed => error.exit(),
        Err(error) => return Err(error.into()),
    };

    let verbose = matches.is_present("verbose") ||
        matches.subcommand().1.map_or(false, |args| args.is_present("verbose"));
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if verbose { "debug" } else { "warn" })
    ).init();

    match matches.subcommand() {
        ("send",  Some(args)) => send(args)?,
        ("serve", Some(args)) => serve(args)?,
        ("info",  Some(_))    => {
            println!("capability:       {}", CAPABILITY.name());
            println!("headers/trailers: {}", if CAPABILITY.supports_headers() { "native" } else { "emulated" });
            println!("max chunk size:   {}", sendfile::MAX_CHUNK_SIZE);
        }
        (cmd, _) => {
            return Err(Error::new(format!(
                "unknown subcommand: {}\n\
                 For more information try --help",
                 cmd
            )));
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}
