//! Directory enumeration

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Produces candidate module files under a root directory
#[async_trait]
pub trait DirectoryResolver: Send + Sync {
    async fn resolve(&self, root: &Path, recursive: bool) -> std::io::Result<Vec<PathBuf>>;
}

/// Filesystem resolver.
///
/// Files of each directory are returned in lexicographic order, before the
/// contents of its subdirectories (visited in the same order).
///
/// Links to files are followed. Links to directories are never descended
/// into, and entries that cannot be inspected (dangling links, races with
/// deletion) are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDirectoryResolver;

#[async_trait]
impl DirectoryResolver for FsDirectoryResolver {
    async fn resolve(&self, root: &Path, recursive: bool) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(directory) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&directory).await?;
            let mut local_files = Vec::new();
            let mut local_dirs = Vec::new();

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = match entry.file_type().await {
                    Ok(file_type) => file_type,
                    Err(e) => {
                        debug!("⏭️ Skipping {}: {}", path.display(), e);
                        continue;
                    }
                };

                if file_type.is_symlink() {
                    match tokio::fs::metadata(&path).await {
                        Ok(target) if target.is_file() => local_files.push(path),
                        Ok(target) if target.is_dir() => {
                            debug!("⏭️ Not following directory link {}", path.display());
                        }
                        Ok(_) => {}
                        Err(e) => debug!("⏭️ Skipping link {}: {}", path.display(), e),
                    }
                } else if file_type.is_file() {
                    local_files.push(path);
                } else if recursive && file_type.is_dir() {
                    local_dirs.push(path);
                }
            }

            local_files.sort();
            files.extend(local_files);

            // Reverse so the stack pops subdirectories in lexicographic order
            local_dirs.sort();
            pending.extend(local_dirs.into_iter().rev());
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, "").unwrap();
    }

    #[tokio::test]
    async fn test_flat_listing_is_sorted_and_skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.toml"));
        touch(&dir.path().join("a.toml"));
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("nested").join("c.toml"));

        let files = FsDirectoryResolver.resolve(dir.path(), false).await.unwrap();
        let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap().to_owned()).collect();
        assert_eq!(names, vec!["a.toml", "b.toml"]);
    }

    #[tokio::test]
    async fn test_recursive_listing() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("root.toml"));
        for sub in ["z", "a"] {
            std::fs::create_dir(dir.path().join(sub)).unwrap();
            touch(&dir.path().join(sub).join("inner.json"));
        }

        let files = FsDirectoryResolver.resolve(dir.path(), true).await.unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("root.toml"),
                PathBuf::from("a/inner.json"),
                PathBuf::from("z/inner.json"),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_link_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("ping.toml"));
        std::os::unix::fs::symlink(
            dir.path().join("missing.toml"),
            dir.path().join(".#ping.toml"),
        )
        .unwrap();

        let files = FsDirectoryResolver.resolve(dir.path(), true).await.unwrap();
        assert_eq!(files, vec![dir.path().join("ping.toml")]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_links_are_followed_and_directory_links_are_not() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        touch(&nested.join("inner.toml"));
        touch(&dir.path().join("target.json"));

        std::os::unix::fs::symlink(dir.path(), nested.join("loop")).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("self")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("target.json"), dir.path().join("alias.json"))
            .unwrap();

        let files = FsDirectoryResolver.resolve(dir.path(), true).await.unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("alias.json"),
                PathBuf::from("target.json"),
                PathBuf::from("nested/inner.toml"),
            ]
        );
    }
}
