//! Trimming of the run log.
//!
//! Two policies, age takes precedence:
//!
//! - **Age** (`max_age_days > 0`): a line starting with `[YYYY-MM-DD HH:MM:SS]` is kept when its
//!   timestamp is at most `max_age_days * 24h` old. Lines without a timestamp (archiver output,
//!   wrapped messages) are held back and take the verdict of the *next* timestamped line: kept
//!   if it is fresh, dropped if it has expired. Lines after the last timestamp are kept only
//!   when that timestamp was fresh; with no timestamp at all nothing survives. A line whose
//!   bracket matches but does not parse as a date is dropped, reported in the outcome, and
//!   leaves the held-back lines alone.
//! - **Line count** (`max_age_days == 0`, `max_lines > 0`): the last `max_lines` lines.
//!
//! The keep/drop decision is computed for every line first, the file is rewritten afterwards.
//! Lines are handled as bytes, kept lines are written back exactly as read.
//!
//! Trimming runs before the run's logging is set up, so nothing here logs; problems come back
//! in [`TrimOutcome`].

use crate::backup::log_lines::log_lines;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddMsg;
use chrono::format::ParseError;
use chrono::{Duration, Local, NaiveDateTime};
use regex::bytes::Regex;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use std::sync::LazyLock;
use tempfile::NamedTempFile;

pub static LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2})\]")
        .expect("valid timestamp regex")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrimPolicy {
    Age(Duration),
    LineCount(usize),
    Keep,
}

impl TrimPolicy {
    pub fn select(max_lines: usize, max_age_days: u32) -> Self {
        if max_age_days > 0 {
            TrimPolicy::Age(Duration::days(i64::from(max_age_days)))
        } else if max_lines > 0 {
            TrimPolicy::LineCount(max_lines)
        } else {
            TrimPolicy::Keep
        }
    }
}

/// A line that looks timestamped but whose timestamp is not a valid date.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MalformedLine {
    pub line: String,
    pub error: ParseError,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrimOutcome {
    Unchanged {
        lines: usize,
    },
    Trimmed {
        before: usize,
        after: usize,
        malformed: Vec<MalformedLine>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LineStamp {
    Fresh,
    Expired,
    Malformed(ParseError),
    Missing,
}

fn classify(line: &[u8], now: NaiveDateTime, max_age: Duration) -> LineStamp {
    let Some(captures) = TIMESTAMP_RE.captures(line) else {
        return LineStamp::Missing;
    };
    let stamp = String::from_utf8_lossy(&captures[1]);
    match NaiveDateTime::parse_from_str(&stamp, LOG_TIME_FORMAT) {
        Ok(ts) if now.signed_duration_since(ts) <= max_age => LineStamp::Fresh,
        Ok(_) => LineStamp::Expired,
        Err(e) => LineStamp::Malformed(e),
    }
}

/// Per-line keep/drop decision, plus the lines whose timestamp could not be parsed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgePlan {
    pub keep: Vec<bool>,
    pub malformed: Vec<MalformedLine>,
}

/// Keep/drop decision for every line under the age policy.
pub fn plan_by_age<S: AsRef<[u8]>>(lines: &[S], max_age: Duration, now: NaiveDateTime) -> AgePlan {
    let mut plan = AgePlan {
        keep: vec![false; lines.len()],
        malformed: Vec::new(),
    };
    let mut pending: Vec<usize> = Vec::new();
    let mut last_fresh = None;

    for (idx, line) in lines.iter().enumerate() {
        match classify(line.as_ref(), now, max_age) {
            LineStamp::Fresh => {
                pending.drain(..).for_each(|p| plan.keep[p] = true);
                plan.keep[idx] = true;
                last_fresh = Some(true);
            }
            LineStamp::Expired => {
                pending.clear();
                last_fresh = Some(false);
            }
            LineStamp::Malformed(error) => plan.malformed.push(MalformedLine {
                line: String::from_utf8_lossy(line.as_ref()).into_owned(),
                error,
            }),
            LineStamp::Missing => pending.push(idx),
        }
    }

    if last_fresh == Some(true) {
        pending.into_iter().for_each(|p| plan.keep[p] = true);
    }
    plan
}

/// Keep/drop decision for every line under the line count policy.
pub fn plan_by_line_count(line_count: usize, max_lines: usize) -> Vec<bool> {
    let first_kept = line_count.saturating_sub(max_lines);
    (0..line_count).map(|idx| idx >= first_kept).collect()
}

pub fn trim_log<P: AsRef<Path>>(path: P, max_lines: usize, max_age_days: u32) -> Result<TrimOutcome> {
    trim_log_at(path, max_lines, max_age_days, Local::now().naive_local())
}

/// Same as [`trim_log`] with an explicit "now", in the log's local time.
pub fn trim_log_at<P: AsRef<Path>>(
    path: P,
    max_lines: usize,
    max_age_days: u32,
    now: NaiveDateTime,
) -> Result<TrimOutcome> {
    let path = path.as_ref();
    let lines = read_lines(path)?;
    let before = lines.len();

    let (plan, malformed) = match TrimPolicy::select(max_lines, max_age_days) {
        TrimPolicy::Age(max_age) => {
            let AgePlan { keep, malformed } = plan_by_age(&lines, max_age, now);
            (keep, malformed)
        }
        TrimPolicy::LineCount(max) if before > max => (plan_by_line_count(before, max), vec![]),
        TrimPolicy::LineCount(_) | TrimPolicy::Keep => {
            return Ok(TrimOutcome::Unchanged { lines: before })
        }
    };

    let kept: Vec<Vec<u8>> = lines
        .into_iter()
        .zip(plan)
        .filter_map(|(line, keep)| keep.then_some(line))
        .collect();
    let after = kept.len();

    write_replacement(path, &kept)?;
    Ok(TrimOutcome::Trimmed {
        before,
        after,
        malformed,
    })
}

fn read_lines(path: &Path) -> Result<Vec<Vec<u8>>> {
    let file = File::open(path)
        .map_err(Error::from)
        .add_msg(format!("Opening log file {:?}", path))?;
    log_lines(BufReader::new(file))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(Error::from)
        .add_msg(format!("Scanning log file {:?}", path))
}

/// Writes the kept lines to a sibling temp file and renames it over the log, so the original
/// stays intact until the new content is on disk.
fn write_replacement(path: &Path, lines: &[Vec<u8>]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut content = Vec::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        content.extend_from_slice(line);
        content.push(b'\n');
    }

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(Error::from)
        .add_msg(format!("Creating log file replacement in {:?}", dir))?;
    tmp.write_all(&content)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(Error::from)
        .add_msg(format!("Writing to log file {:?}", tmp.path()))?;
    tmp.persist(path)
        .map_err(Error::from)
        .add_msg(format!("Replacing log file {:?}", path))?;
    Ok(())
}
