//! Writing command results to standard output.

use std::io::{self, Write};

fn is_broken_pipe(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::BrokenPipe
}

/// Write `line` and a newline, treating a closed pipe as success.
pub(super) fn write_line(writer: &mut impl Write, line: &str) -> io::Result<()> {
    let written = writer
        .write_all(line.as_bytes())
        .and_then(|()| writer.write_all(b"\n"))
        .and_then(|()| writer.flush());
    match written {
        Ok(()) => Ok(()),
        Err(err) if is_broken_pipe(&err) => Ok(()),
        Err(err) => Err(err),
    }
}
