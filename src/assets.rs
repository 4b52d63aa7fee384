// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Asset folder ingestion: text files an operator wants the workflow to
//! see (challenge notes, API specs, captured requests).

use std::path::Path;
use tracing::warn;

use crate::context::ContextEngine;

/// Extensions treated as binary and skipped during ingestion.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "ico", "svgz", "pdf", "zip", "tar", "gz", "bz2", "xz",
    "7z", "exe", "dll", "so", "dylib", "bin", "class", "jar", "war", "pyc", "wasm", "db",
    "sqlite", "woff", "woff2", "ttf", "otf", "mp3", "mp4", "avi", "mov",
];

/// Extension-based binary check. Content sniffing is overkill here: the
/// worst case of a miss is one unreadable asset in the context.
pub fn is_binary_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| BINARY_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Walk `folder` and feed every readable text file into the context as a
/// write-once asset. Unreadable files are skipped with a warning.
pub fn add_assets_from_folder(context: &mut ContextEngine, folder: &Path) {
    let mut pending = vec![folder.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not read assets directory {}: {}", dir.display(), e);
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            if is_binary_file(&path) {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    context.add_asset_file(&path.display().to_string(), &content);
                }
                Err(e) => {
                    warn!("Could not read asset {}: {}", path.display(), e);
                }
            }
        }
    }
    context.add_assets_to_context();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_extensions() {
        assert!(is_binary_file(Path::new("logo.png")));
        assert!(is_binary_file(Path::new("archive.TAR")));
        assert!(!is_binary_file(Path::new("notes.txt")));
        assert!(!is_binary_file(Path::new("Makefile")));
    }
}
