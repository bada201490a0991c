//! Lookup of resources referenced by URI from the document.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Source of external files referenced by the document.
///
/// `Ok(None)` means the resource does not exist; `Err` is reserved for
/// failures while reading one that does.
pub trait ResourceResolver {
    fn resolve(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;
}

/// Resolve relative paths against a directory on the file system.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    base: PathBuf,
}

impl DirectoryResolver {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl ResourceResolver for DirectoryResolver {
    fn resolve(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        let path = self.base.join(path);
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }
}

/// Resolver for self-contained documents: every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl ResourceResolver for NoResolver {
    fn resolve(&self, _path: &Path) -> io::Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

#[cfg(test)]
mod test {
    use std::{fs, path::Path};

    use super::{DirectoryResolver, NoResolver, ResourceResolver};

    #[test]
    fn directory_resolver_reads_relative_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("data.bin"), [1u8, 2, 3]).unwrap();

        let resolver = DirectoryResolver::new(dir.path());
        assert_eq!(
            resolver.resolve(Path::new("data.bin")).unwrap(),
            Some(vec![1, 2, 3])
        );
        assert_eq!(resolver.resolve(Path::new("missing.bin")).unwrap(), None);
    }

    #[test]
    fn no_resolver_misses() {
        assert_eq!(NoResolver.resolve(Path::new("a.bin")).unwrap(), None);
    }
}
