pub mod command;
pub mod static_scan;

pub use command::CommandReviewerPlugin;
pub use static_scan::StaticScanReviewerPlugin;
