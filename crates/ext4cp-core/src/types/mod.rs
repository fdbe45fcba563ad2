//! Value types shared by the volume layer and the extraction engine.

pub mod dest_dir;
pub mod entry_kind;
pub mod logical_path;

pub use dest_dir::DestDir;
pub use entry_kind::EntryKind;
pub use logical_path::LogicalPath;
