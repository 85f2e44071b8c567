// src/recipe/mod.rs

//! Recipe discovery: parsing `PKGBUILD`/srcinfo pairs into a dependency
//! graph of buildable packages.

pub mod discovery;
pub mod model;
pub mod pkgbuild;

pub use discovery::discover_packages;
pub use model::{BuildMode, PackageGraph, Recipe};
