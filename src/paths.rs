use std::path::PathBuf;

const DATA_FILE_NAME: &str = "apps.json";
const LOG_FILE_NAME: &str = "app-organizer.log";

pub struct AppPaths {
    pub data_file: PathBuf,
    pub log_file: PathBuf,
}

impl AppPaths {
    /// `apps.json` in the working directory; the log goes under
    /// `~/.local/app-organizer` when a home directory is known.
    pub fn new() -> Self {
        Self {
            data_file: PathBuf::from(DATA_FILE_NAME),
            log_file: default_log_dir().join(LOG_FILE_NAME),
        }
    }
}

fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".local/app-organizer"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_file_is_relative() {
        let paths = AppPaths::new();
        assert_eq!(paths.data_file, PathBuf::from("apps.json"));
        assert!(paths.log_file.ends_with(LOG_FILE_NAME));
    }
}
