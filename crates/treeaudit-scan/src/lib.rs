pub mod entry;
pub mod ignore;
pub mod preview;
pub mod walk;

pub use entry::{FileEntry, ScanSummary, ScanWarning, WarningKind};
pub use ignore::{IgnoreRules, DEFAULT_IGNORES};
pub use walk::{scan_tree, ScanOptions};
