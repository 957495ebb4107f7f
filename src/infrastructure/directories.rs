use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

use crate::config::DirectoryConfig;

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub logs_dir: PathBuf,
}

pub fn ensure_directories(cfg: &DirectoryConfig) -> Result<ResolvedPaths> {
    let logs_dir = ensure_dir(&cfg.logs_dir)?;

    let write_check = logs_dir.join(".write-test");
    fs::write(&write_check, b"ok")
        .with_context(|| format!("logs directory {} is not writable", logs_dir.display()))?;
    fs::remove_file(&write_check)?;
    Ok(ResolvedPaths { logs_dir })
}

fn ensure_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    if !dir.exists() {
        fs::create_dir_all(&dir).with_context(|| format!("failed to create directory {}", path))?;
    }
    Ok(dir.canonicalize().unwrap_or(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_logs_dir() {
        let root = tempfile::tempdir().unwrap();
        let wanted = root.path().join("nested").join("logs");
        let cfg = DirectoryConfig {
            logs_dir: wanted.display().to_string(),
        };

        let paths = ensure_directories(&cfg).unwrap();
        assert!(paths.logs_dir.is_dir());
        assert!(!paths.logs_dir.join(".write-test").exists());
    }
}
