//! Content backup: change detection and snapshot archiving.

pub mod archiver;
pub mod detector;

pub use archiver::{ArchiveOptions, SnapshotArchiver};
pub use detector::ChangeDetector;
