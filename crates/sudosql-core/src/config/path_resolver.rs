use std::path::{Component, Path, PathBuf};

/// Resolves paths found in a config file relative to that file's directory.
#[derive(Clone)]
pub struct PathResolver {
    base_dir: PathBuf,
}

impl PathResolver {
    pub fn new(config_path: &Path) -> Self {
        let base_dir = config_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        Self { base_dir }
    }

    pub fn resolve_opt_str(&self, p: &mut Option<String>) {
        if let Some(s) = p.as_mut() {
            self.resolve_str(s);
        }
    }

    pub fn resolve_str(&self, s: &mut String) {
        if s.trim().is_empty() {
            return;
        }
        let pb = PathBuf::from(&*s);
        if pb.is_absolute() {
            return;
        }
        *s = self.join_clean(&pb).to_string_lossy().to_string();
    }

    pub fn resolve_path(&self, p: &mut PathBuf) {
        if p.as_os_str().is_empty() || p.is_absolute() {
            return;
        }
        *p = self.join_clean(p);
    }

    fn join_clean(&self, rel: &Path) -> PathBuf {
        let joined = self.base_dir.join(rel);

        let mut out = PathBuf::new();
        for c in joined.components() {
            match c {
                Component::CurDir => {}
                Component::ParentDir => {
                    out.pop();
                }
                Component::RootDir | Component::Prefix(_) | Component::Normal(_) => {
                    out.push(c.as_os_str())
                }
            }
        }
        out
    }
}
