pub mod marketplace;
pub mod plugin;
pub mod request;
pub mod verdict;

pub use marketplace::Marketplace;
pub use plugin::PluginName;
pub use request::{ChangeSetRequest, CompareMode};
pub use verdict::{Verdict, VersionVerdict};
