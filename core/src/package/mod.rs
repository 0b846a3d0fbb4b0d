//! Package configuration: the graph description, how it is loaded, and the
//! per-package cache it is resolved against.

mod loader;
mod store;
mod types;

pub use loader::{find_package_root, JsonPackageLoader, PackageLoader};
pub use store::{LoadedPackage, PackageStore};
pub use types::{Construct, PackageConfig, PackageInfo, PackageMeta};
