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

use crate::{Error, Result};

const UNITS: [(char, u32); 6] = [
    ('K', 1),
    ('M', 2),
    ('G', 3),
    ('T', 4),
    ('P', 5),
    ('E', 6),
];

pub fn format_size(size: u64) -> String {
    for &(unit, exp) in UNITS.iter().rev() {
        let scale = 1u64 << (10 * exp);
        if size >= scale {
            // divide in two steps so E doesn't lose everything to f64 rounding
            return format!("{:.1} {}", (size / (scale >> 10)) as f64 / 1024.0, unit);
        }
    }
    format!("{} B", size)
}

pub fn parse_size(value: &str) -> Result<u64> {
    let mut value = value.trim();

    if let Some(rest) = value.strip_suffix('B').or_else(|| value.strip_suffix('b')) {
        value = rest.trim_end();
    }

    let (number, exp) = match value.chars().last() {
        Some(last) => match UNITS.iter().find(|(unit, _)| unit.eq_ignore_ascii_case(&last)) {
            Some(&(_, exp)) => (value[..value.len() - 1].trim_end(), exp),
            None => (value, 0),
        },
        None => (value, 0),
    };

    let number: u64 = number.parse()?;
    match number.checked_mul(1u64 << (10 * exp)) {
        Some(size) => Ok(size),
        None => Err(Error::new(format!("size too big: {}", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_suffixed_sizes() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size(" 64K ").unwrap(), 64 * 1024);
        assert_eq!(parse_size("10 M").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size("2GB").unwrap(), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("1k").unwrap(), 1024);
        assert_eq!(parse_size("1kb").unwrap(), 1024);
        assert_eq!(parse_size("512 b").unwrap(), 512);
        assert_eq!(parse_size("0").unwrap(), 0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("K").is_err());
        assert!(parse_size("12X").is_err());
        assert!(parse_size("-1").is_err());
        assert!(parse_size("100000E").is_err());
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 K");
        assert_eq!(format_size(10 * 1024 * 1024), "10.0 M");
    }
}
