pub mod catalog;
pub mod cross;
pub mod cycles;
pub mod engine;
pub mod plugin;
pub mod scan;

pub use cross::{infer_module_type, CrossValidator};
pub use cycles::{detect_cycles, slice_edges};
pub use engine::RuleEngine;
pub use plugin::ScanPlugin;
pub use scan::{ProjectScanner, ProjectTree, ScanReport};
