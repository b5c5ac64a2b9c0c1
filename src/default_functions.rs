use directories::ProjectDirs;
use std::path::PathBuf;

pub(crate) fn default_functions_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("me", "shoryuken", "calcbook")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("default.rhai");
    Some(path)
}

/// Put the per-user `default.rhai` ahead of explicitly given files so those
/// can replace its definitions.
pub(crate) fn prepend_default_functions_if_present(
    functions: &mut Vec<PathBuf>,
    no_default_functions: bool,
) {
    if no_default_functions {
        return;
    }
    let Some(path) = default_functions_path() else {
        return;
    };
    if path.is_file() {
        functions.insert(0, path);
    } else {
        tracing::debug!("No default functions file at {}", path.display());
    }
}
