//! # rail_manifest
//!
//! Read-only access to the locally distributed railway manifests.
//!
//! A project carries its manifests under `.techtrain/manifests/`:
//!
//! ```text
//! .techtrain/manifests/
//! ├── railway.json      # railway id + station order -> file name mapping
//! ├── station-1.json    # one file per station
//! └── station-2.json
//! ```
//!
//! The remote railway only knows stations by `order`. The mapping in
//! `railway.json` is the only way to get from an order to the local test
//! definition, so lookups always go through [`ManifestRailway::station_file`].
//!
//! # Example
//!
//! ```rust,no_run
//! use rail_manifest::ManifestStore;
//!
//! let store = ManifestStore::for_project(".");
//! let railway = store.get_railway()?;
//! if let Some(station) = store.get_station(1) {
//!     println!("{} has {} test(s)", station.name, station.tests.len());
//! }
//! # Ok::<(), rail_manifest::ManifestError>(())
//! ```

pub mod error;
pub mod models;
pub mod store;

pub use error::{ManifestError, ManifestResult};
pub use models::{ManifestRailway, ManifestStation, StationPrepare, StationTest};
pub use store::{ManifestStore, MANIFEST_DIR, RAILWAY_FILE};
