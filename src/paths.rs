use anyhow::Context;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "azchat";

/// Which per-user directory to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Config,
    State,
}

impl Kind {
    fn xdg_var(self) -> &'static str {
        match self {
            Kind::Config => "XDG_CONFIG_HOME",
            Kind::State => "XDG_STATE_HOME",
        }
    }

    fn home_suffix(self) -> &'static [&'static str] {
        match self {
            Kind::Config => &[".config"],
            Kind::State => &[".local", "state"],
        }
    }

    fn home_subdir(self) -> &'static str {
        match self {
            Kind::Config => "config",
            Kind::State => "state",
        }
    }
}

/// `AZCHAT_HOME` wins over `XDG_*`, which wins over `HOME`. Creates nothing.
fn resolve(kind: Kind, lookup: impl Fn(&str) -> Option<OsString>) -> anyhow::Result<PathBuf> {
    let var = |name: &str| lookup(name).filter(|v| !v.is_empty()).map(PathBuf::from);

    if let Some(base) = var("AZCHAT_HOME") {
        return Ok(base.join(kind.home_subdir()));
    }
    if let Some(xdg) = var(kind.xdg_var()) {
        return Ok(xdg.join(APP_DIR));
    }

    let mut dir = var("HOME").context("HOME is not set")?;
    dir.extend(kind.home_suffix());
    Ok(dir.join(APP_DIR))
}

fn ensure_dir(path: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))?;
    Ok(path.to_path_buf())
}

/// Where `config.toml` is looked up. Only read, so the directory may not exist.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    resolve(Kind::Config, |name| std::env::var_os(name))
}

/// Writable state directory (TUI log file); created on demand.
pub fn state_dir() -> anyhow::Result<PathBuf> {
    ensure_dir(&resolve(Kind::State, |name| std::env::var_os(name))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn azchat_home_wins() {
        let vars = env(&[
            ("AZCHAT_HOME", "/opt/az"),
            ("XDG_CONFIG_HOME", "/xdg/config"),
            ("XDG_STATE_HOME", "/xdg/state"),
            ("HOME", "/home/u"),
        ]);
        assert_eq!(resolve(Kind::Config, &vars).unwrap(), PathBuf::from("/opt/az/config"));
        assert_eq!(resolve(Kind::State, &vars).unwrap(), PathBuf::from("/opt/az/state"));
    }

    #[test]
    fn xdg_beats_home() {
        let vars = env(&[
            ("XDG_CONFIG_HOME", "/xdg/config"),
            ("XDG_STATE_HOME", "/xdg/state"),
            ("HOME", "/home/u"),
        ]);
        assert_eq!(resolve(Kind::Config, &vars).unwrap(), PathBuf::from("/xdg/config/azchat"));
        assert_eq!(resolve(Kind::State, &vars).unwrap(), PathBuf::from("/xdg/state/azchat"));
    }

    #[test]
    fn home_fallback() {
        let vars = env(&[("HOME", "/home/u"), ("XDG_CONFIG_HOME", "")]);
        assert_eq!(
            resolve(Kind::Config, &vars).unwrap(),
            PathBuf::from("/home/u/.config/azchat")
        );
        assert_eq!(
            resolve(Kind::State, &vars).unwrap(),
            PathBuf::from("/home/u/.local/state/azchat")
        );
    }

    #[test]
    fn missing_home_is_an_error() {
        let err = resolve(Kind::Config, env(&[])).unwrap_err();
        assert!(err.to_string().contains("HOME is not set"));
    }

    #[test]
    fn resolving_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("fresh");
        let vars = env(&[("AZCHAT_HOME", base.to_str().unwrap())]);
        let cfg = resolve(Kind::Config, &vars).unwrap();
        assert_eq!(cfg, base.join("config"));
        assert!(!base.exists());
    }
}
