use crate::backup::log_lines::log_lines;
use crate::backup::notifications::Notification;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddMsg;
use itertools::Itertools;
use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub static STATUS_TOPIC: &str = "Backup Status";

/// Returns the last `n` lines of the file, oldest first.
///
/// Only the window is held in memory; it grows with the lines read, not with `n`. Bytes that
/// are not UTF-8 are replaced, the result goes into a mail body.
pub fn tail_lines<P: AsRef<Path>>(path: P, n: usize) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(Error::from)
        .add_msg(format!("Error opening file {:?}", path))?;

    let mut window = VecDeque::new();
    for line in log_lines(BufReader::new(file)) {
        let line = line
            .map_err(Error::from)
            .add_msg(format!("Error scanning file {:?}", path))?;
        if n == 0 {
            continue;
        }
        if window.len() == n {
            window.pop_front();
        }
        window.push_back(String::from_utf8_lossy(&line).into_owned());
    }

    Ok(window.into_iter().collect())
}

pub fn notify<N: Notification>(notifier: &N, lines: &[String]) -> Result<()> {
    notifier.send(STATUS_TOPIC, lines.iter().join("\n"))
}
