use crate::jvm::{BinaryName, Name};
use crate::transform::Error;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Destination for classes produced by transforms
pub trait FileAccess {
    /// Add a class which wasn't part of the input
    fn add_class(&mut self, name: &BinaryName, bytes: &[u8]) -> Result<(), Error>;

    /// Replace the bytes of an existing class
    fn modify_class(&mut self, name: &BinaryName, bytes: &[u8]) -> Result<(), Error>;
}

/// Classes written as `<root>/<name>.class`
#[derive(Debug, Clone)]
pub struct DirectoryAccess {
    pub root: PathBuf,
}

impl DirectoryAccess {
    pub fn new(root: impl Into<PathBuf>) -> DirectoryAccess {
        DirectoryAccess { root: root.into() }
    }

    pub fn class_path(&self, name: &BinaryName) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(name.as_str().split('/'));
        path.set_extension("class");
        path
    }

    fn write_class(&self, name: &BinaryName, bytes: &[u8]) -> Result<(), Error> {
        let path = self.class_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}

impl FileAccess for DirectoryAccess {
    fn add_class(&mut self, name: &BinaryName, bytes: &[u8]) -> Result<(), Error> {
        self.write_class(name, bytes)
    }

    fn modify_class(&mut self, name: &BinaryName, bytes: &[u8]) -> Result<(), Error> {
        self.write_class(name, bytes)
    }
}

/// Classes kept in memory, keyed by binary name
#[derive(Debug, Clone, Default)]
pub struct MemoryAccess {
    pub classes: BTreeMap<String, Vec<u8>>,
}

impl MemoryAccess {
    pub fn new() -> MemoryAccess {
        MemoryAccess::default()
    }
}

impl FileAccess for MemoryAccess {
    fn add_class(&mut self, name: &BinaryName, bytes: &[u8]) -> Result<(), Error> {
        self.classes.insert(name.as_str().to_owned(), bytes.to_vec());
        Ok(())
    }

    fn modify_class(&mut self, name: &BinaryName, bytes: &[u8]) -> Result<(), Error> {
        self.classes.insert(name.as_str().to_owned(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::Path;

    #[test]
    fn class_paths() {
        let access = DirectoryAccess::new("out");
        let name = BinaryName::from_string("gen/mymod/PlatformMethods".to_owned()).unwrap();
        assert_eq!(
            access.class_path(&name),
            Path::new("out").join("gen").join("mymod").join("PlatformMethods.class")
        );

        let nested = BinaryName::from_string("a/B$C".to_owned()).unwrap();
        assert_eq!(
            access.class_path(&nested),
            Path::new("out").join("a").join("B$C.class")
        );
    }

    #[test]
    fn writes_to_disk() {
        let root = std::env::temp_dir().join(format!("platform-inject-{}", std::process::id()));
        let mut access = DirectoryAccess::new(&root);
        let name = BinaryName::from_string("x/y/Z".to_owned()).unwrap();
        access.add_class(&name, &[0xCA, 0xFE]).unwrap();
        assert_eq!(fs::read(access.class_path(&name)).unwrap(), vec![0xCA, 0xFE]);
        fs::remove_dir_all(&root).unwrap();
    }
}
