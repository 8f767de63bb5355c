pub mod archive_prune;
pub mod log_trim;
