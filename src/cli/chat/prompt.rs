use std::fs;
use std::path::{Path, PathBuf};

use eyre::WrapErr;
use rustyline::{Config, Editor, Result};

pub fn generate_prompt(custom_prompt: Option<&str>) -> String {
    custom_prompt.unwrap_or("> ").to_string()
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .history_ignore_dups(true)
        .auto_add_history(false)
        .build();
    Editor::with_config(config)
}

/// Where typed lines are remembered between sessions. This is the line
/// editor's recall buffer, never the conversation itself.
pub fn history_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("chatbot-cli").join("input_history.txt"))
}

/// Create the history file's directory and hand the path to `save`.
pub fn persist_history<F>(path: &Path, save: F) -> eyre::Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("cannot create {}", dir.display()))?;
    }
    save(path).wrap_err_with(|| format!("cannot write {}", path.display()))
}
