use std::path::{Path, PathBuf};

/// `<root>/<dataset_name>/<db_id>/<schema_type>.txt`
pub fn entry_path(root: &Path, dataset_name: &str, db_id: &str, schema_type: &str) -> PathBuf {
    root.join(component(dataset_name))
        .join(component(db_id))
        .join(format!("{}.txt", component(schema_type)))
}

/// Keeps a key part inside its own directory level.
fn component(raw: &str) -> String {
    let s: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    match s.as_str() {
        "" | "." | ".." => "_".repeat(s.len().max(1)),
        _ => s,
    }
}
