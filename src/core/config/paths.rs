use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub store_path: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let store_path = project_root.join("store").join("base.json");
        let log_dir = project_root.join("logs");

        let _ = fs::create_dir_all(&log_dir);

        AppPaths {
            project_root,
            store_path,
            log_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("MANUALBOT_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("store").join("base.json").exists()
        || manifest_dir.join("config.yml").exists()
    {
        return manifest_dir;
    }

    env::current_dir().unwrap_or(manifest_dir)
}
