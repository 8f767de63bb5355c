//! Line iteration over the run log.
//!
//! The log mixes our own UTF-8 records with raw archiver output in whatever code page the
//! archiver prints, so lines are yielded as raw bytes. A trailing `\r` is dropped along with
//! the `\n`.

use std::io::{BufRead, Result};

pub struct LogLines<R> {
    reader: R,
}

impl<R: BufRead> Iterator for LogLines<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                Some(Ok(buf))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

pub fn log_lines<R: BufRead>(reader: R) -> LogLines<R> {
    LogLines { reader }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_log_lines_strips_terminators() {
        let lines: Vec<_> = log_lines(Cursor::new("a\r\nb\n\nc"))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(lines, vec![b"a".to_vec(), b"b".to_vec(), vec![], b"c".to_vec()]);
    }

    #[test]
    fn test_log_lines_keeps_non_utf8_bytes() {
        let lines: Vec<_> = log_lines(Cursor::new(b"ok\ncaf\xe9\r\n\xff\xfe\n".to_vec()))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            lines,
            vec![b"ok".to_vec(), b"caf\xe9".to_vec(), b"\xff\xfe".to_vec()]
        );
    }

    #[test]
    fn test_log_lines_empty() {
        assert_eq!(log_lines(Cursor::new("")).count(), 0);
    }
}
