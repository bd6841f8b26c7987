//! Archive container providers.

pub mod zip;

pub use self::zip::ZipArchiveProvider;
