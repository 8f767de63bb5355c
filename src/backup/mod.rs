pub mod archiver;
pub mod backup_config;
pub mod log_lines;
pub mod logging;
pub mod notifications;
pub mod paths;
pub mod redacted;
pub mod result_error;
pub mod retention;
pub mod run;
pub mod validate;

macro_rules! function_path {
    () => {
        concat!(module_path!(), "::", function_name!(), " ", file!(), ":", line!())
    };
}

pub(crate) use function_path;
