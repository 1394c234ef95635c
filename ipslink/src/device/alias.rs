//! Alias namespaces: where stable identifiers are looked up.

use {
    crate::{
        device::DeviceIdentifier,
        error::{Error, Result},
    },
    log::{debug, trace},
    std::{
        fs, io,
        path::{Path, PathBuf},
    },
};

/// Default location of udev's stable serial links.
pub const DEFAULT_BY_ID_DIR: &str = "/dev/serial/by-id";

/// One alias and the port it currently points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    /// The stable identifier.
    pub identifier: DeviceIdentifier,
    /// Current raw port address behind it.
    pub target: String,
}

impl Alias {
    /// An alias with `name` pointing at `target`.
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        let name = name.into();
        let path = Path::new(DEFAULT_BY_ID_DIR).join(&name);
        Self {
            identifier: DeviceIdentifier::new(name, path),
            target: target.into(),
        }
    }
}

/// A host namespace of stable device aliases.
pub trait AliasNamespace {
    /// All aliases, in a stable order.
    ///
    /// Returns `Ok(None)` when the namespace does not exist on this host, and
    /// an error only when it exists but cannot be read.
    fn aliases(&self) -> Result<Option<Vec<Alias>>>;
}

impl<T: AliasNamespace + ?Sized> AliasNamespace for &T {
    fn aliases(&self) -> Result<Option<Vec<Alias>>> {
        (**self).aliases()
    }
}

/// A directory of symlinks such as `/dev/serial/by-id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByIdDirectory {
    dir: PathBuf,
}

impl Default for ByIdDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_BY_ID_DIR)
    }
}

impl ByIdDirectory {
    /// Use `dir` as the alias directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory being read.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl AliasNamespace for ByIdDirectory {
    fn aliases(&self) -> Result<Option<Vec<Alias>>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Alias directory {} not present", self.dir.display());
                return Ok(None);
            },
            Err(e) => {
                return Err(Error::Enumeration(format!(
                    "cannot read {}: {e}",
                    self.dir.display()
                )));
            },
        };

        let mut links = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::Enumeration(format!("cannot read {}: {e}", self.dir.display()))
            })?;
            links.push(entry.path());
        }
        // read_dir order is filesystem-dependent
        links.sort();

        let mut aliases = Vec::with_capacity(links.len());
        for path in links {
            let Some(name) = path
                .file_name()
                .map(|n| {
                    n.to_string_lossy()
                        .into_owned()
                })
            else {
                continue;
            };

            match fs::canonicalize(&path) {
                Ok(target) => {
                    let target = target
                        .to_string_lossy()
                        .into_owned();
                    trace!("Alias {name} -> {target}");
                    aliases.push(Alias {
                        identifier: DeviceIdentifier::new(name, path),
                        target,
                    });
                },
                Err(e) => debug!("Skipping dangling alias {}: {e}", path.display()),
            }
        }

        Ok(Some(aliases))
    }
}

/// A fixed alias table, for hosts without udev and for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticAliases(Option<Vec<Alias>>);

impl StaticAliases {
    /// A namespace holding exactly `aliases`.
    pub fn new(aliases: Vec<Alias>) -> Self {
        Self(Some(aliases))
    }

    /// A namespace that does not exist on this host.
    pub fn unavailable() -> Self {
        Self(None)
    }
}

impl AliasNamespace for StaticAliases {
    fn aliases(&self) -> Result<Option<Vec<Alias>>> {
        Ok(self
            .0
            .clone())
    }
}
