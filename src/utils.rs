use std::{fs, io, path::Path};

use chrono::Local;
use tracing_subscriber::EnvFilter;

pub fn create_folder_if_not_exists(dir: impl AsRef<Path>) -> io::Result<()> {
    let dir = dir.as_ref();
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Sortable local timestamp used for checkpoints and output files
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S_%3f").to_string()
}

/// Log to stderr, filtered by RUST_LOG (defaults to info)
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_sort_chronologically() {
        let first = timestamp();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = timestamp();
        assert!(first < second);
    }

    #[test]
    fn creates_nested_folders() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        create_folder_if_not_exists(&nested).unwrap();
        create_folder_if_not_exists(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
