use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use chrono::NaiveDate;
use rand::rngs::OsRng;
use rand::TryRngCore;

pub static ARCHIVE_PREFIX: &str = "backup_";
pub static ARCHIVE_EXT: &str = "7z";
pub const ARCHIVE_ID_LEN: usize = 6;

const ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
// largest multiple of the charset length that fits in a byte, keeps the draw unbiased
const ACCEPT_BELOW: u8 = (256 / ID_CHARSET.len() * ID_CHARSET.len()) as u8;

/// Random identifier of `length` characters from `A-Z0-9`, drawn from the OS generator.
pub fn random_id(length: usize) -> Result<String> {
    let mut rng = OsRng;
    let mut id = String::with_capacity(length);
    let mut buf = [0u8; 32];
    while id.len() < length {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| Error::random_id(e.to_string()))?;
        let missing = length - id.len();
        id.extend(
            buf.iter()
                .filter(|b| **b < ACCEPT_BELOW)
                .map(|b| ID_CHARSET[*b as usize % ID_CHARSET.len()] as char)
                .take(missing),
        );
    }
    Ok(id)
}

/// `backup_<YYYY-MM-DD>_<ID>.7z`
pub fn archive_file_name<S: AsRef<str>>(date: NaiveDate, id: S) -> String {
    format!(
        "{}{}_{}.{}",
        ARCHIVE_PREFIX,
        date.format("%Y-%m-%d"),
        id.as_ref(),
        ARCHIVE_EXT
    )
}

pub fn new_archive_file_name(date: NaiveDate) -> Result<String> {
    random_id(ARCHIVE_ID_LEN).map(|id| archive_file_name(date, id))
}

/// Prefix and extension match; the middle part is not checked.
pub fn is_archive_file_name<S: AsRef<str>>(name: S) -> bool {
    let name = name.as_ref();
    name.starts_with(ARCHIVE_PREFIX)
        && name
            .strip_suffix(ARCHIVE_EXT)
            .is_some_and(|rest| rest.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_id_charset_and_length() {
        for len in [0, 1, 6, 64] {
            let id = random_id(len).unwrap();
            assert_eq!(id.len(), len);
            assert!(id
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_random_id_distinct() {
        let ids: HashSet<_> = (0..100).map(|_| random_id(ARCHIVE_ID_LEN).unwrap()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_archive_file_name_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(archive_file_name(date, "AB12CD"), "backup_2024-03-09_AB12CD.7z");
    }

    #[test]
    fn test_new_archive_file_name_is_recognized() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let name = new_archive_file_name(date).unwrap();
        assert!(name.starts_with("backup_2024-03-09_"));
        assert_eq!(name.len(), "backup_2024-03-09_XXXXXX.7z".len());
        assert!(is_archive_file_name(&name));
    }

    #[test]
    fn test_is_archive_file_name() {
        assert!(is_archive_file_name("backup_2024-01-01_ABCDEF.7z"));
        assert!(is_archive_file_name("backup_anything.7z"));
        assert!(!is_archive_file_name("backup_2024-01-01_ABCDEF.7z.tmp"));
        assert!(!is_archive_file_name("backup_2024-01-01_ABCDEF.zip"));
        assert!(!is_archive_file_name("backup_2024-01-01_ABCDEF7z"));
        assert!(!is_archive_file_name("other_2024-01-01_ABCDEF.7z"));
        assert!(!is_archive_file_name("backup.log"));
    }
}
