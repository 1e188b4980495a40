//! Reads the textual program-image format from spec.md §6.2 into the
//! 2000-cell store handed to the memory thread.
//!
//! Format, line by line:
//!   - `.K`            sets the load cursor to index K
//!   - `<digit|->...`  a signed integer, deposited at the cursor, which then
//!                     advances by one; anything after the first run of
//!                     whitespace is a comment and is ignored
//!   - blank, or starting with a space: skipped without advancing the cursor

use nom::character::complete::{char, digit1};
use nom::combinator::{map_res, opt, recognize};
use nom::sequence::pair;
use nom::IResult;
use std::io::BufRead;
use std::path::Path;

use crate::error::SimError;
use crate::memory::STORE_SIZE;

fn signed_integer(input: &str) -> IResult<&str, i32> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse::<i32>)(input)
}

fn dot_directive(input: &str) -> IResult<&str, i32> {
    let (rest, _) = char('.')(input)?;
    signed_integer(rest)
}

/// Loads a program image from `path`, returning the initialised store.
pub fn load_image(path: &Path) -> Result<Box<[i32; STORE_SIZE]>, SimError> {
    let file = std::fs::File::open(path)
        .map_err(|e| SimError::Loader(format!("cannot open {}: {e}", path.display())))?;
    let reader = std::io::BufReader::new(file);

    let mut store = Box::new([0i32; STORE_SIZE]);
    let mut cursor: i64 = 0;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| SimError::Loader(format!("read error: {e}")))?;
        let lineno = lineno + 1;

        if line.is_empty() || line.starts_with(' ') {
            continue;
        }

        if let Some(rest) = line.strip_prefix('.') {
            let (_, k) = dot_directive(&line).map_err(|_| {
                SimError::Loader(format!("line {lineno}: malformed cursor directive \"{rest}\""))
            })?;
            cursor = k as i64;
            continue;
        }

        if line.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
            let (_, value) = signed_integer(&line).map_err(|_| {
                SimError::Loader(format!("line {lineno}: malformed integer \"{line}\""))
            })?;
            deposit(&mut store, cursor, value, lineno)?;
            cursor += 1;
            continue;
        }

        return Err(SimError::Loader(format!(
            "line {lineno}: unrecognised line \"{line}\""
        )));
    }

    Ok(store)
}

fn deposit(
    store: &mut [i32; STORE_SIZE],
    cursor: i64,
    value: i32,
    lineno: usize,
) -> Result<(), SimError> {
    if cursor < 0 || cursor >= STORE_SIZE as i64 {
        return Err(SimError::Loader(format!(
            "line {lineno}: address {cursor} is out of range 0..={}",
            STORE_SIZE - 1
        )));
    }
    store[cursor as usize] = value;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_image(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_sequential_cells() {
        let file = write_image("1\n42\n9\n1\n50\n");
        let store = load_image(file.path()).unwrap();
        assert_eq!(&store[0..5], &[1, 42, 9, 1, 50]);
    }

    #[test]
    fn cursor_directive_repositions_load_address() {
        let file = write_image("1\n0\n21\n10\n1\n7\n50\n.10\n50\n");
        let store = load_image(file.path()).unwrap();
        assert_eq!(&store[0..7], &[1, 0, 21, 10, 1, 7, 50]);
        assert_eq!(store[10], 50);
    }

    #[test]
    fn blank_and_space_lines_do_not_advance_cursor() {
        let file = write_image("1\n\n 5 ignored\n42\n");
        let store = load_image(file.path()).unwrap();
        assert_eq!(&store[0..2], &[1, 42]);
    }

    #[test]
    fn trailing_comment_after_whitespace_is_ignored() {
        let file = write_image("1 this is AC load\n42 the value\n");
        let store = load_image(file.path()).unwrap();
        assert_eq!(&store[0..2], &[1, 42]);
    }

    #[test]
    fn out_of_range_address_is_a_loader_error() {
        let file = write_image(".2000\n1\n");
        let err = load_image(file.path()).unwrap_err();
        assert!(matches!(err, SimError::Loader(_)));
    }
}
