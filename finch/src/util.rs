use std::path::Path;
use std::time::SystemTime;

use log::LevelFilter;

use warbler::err;
use warbler::error::Result;

#[track_caller]
pub fn dircheck<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => err! {
            format!("{} must point to a directory", path.display()),
            "path is not a directory" => path.display(),
        },
        Err(e) => err! {
            format!("{} must point to an existing directory", path.display()),
            "path does not exist" => path.display(),
            "error" => e,
        },
    }
}

/// `-q` wins over any number of `-v`.
pub fn log_level(verbose: u32, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

pub fn millis(since: SystemTime) -> u128 {
    since.elapsed().map_or(0, |d| d.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_beats_verbose() {
        assert_eq!(log_level(0, false), LevelFilter::Info);
        assert_eq!(log_level(1, false), LevelFilter::Debug);
        assert_eq!(log_level(3, false), LevelFilter::Trace);
        assert_eq!(log_level(2, true), LevelFilter::Error);
    }

    #[test]
    fn dircheck_rejects_files_and_missing_paths() {
        let dir = std::env::temp_dir();
        assert!(dircheck(&dir).is_ok());
        assert!(dircheck(dir.join("finch-util-does-not-exist")).is_err());

        let file = dir.join(format!("finch-util-{}.txt", std::process::id()));
        std::fs::write(&file, "x").unwrap();
        assert!(dircheck(&file).is_err());
        std::fs::remove_file(file).unwrap();
    }
}
