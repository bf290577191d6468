pub mod pdf;
pub mod snapshot_fetcher;

pub use snapshot_fetcher::{probe_rtsp_online, DefaultSnapshotFetcher, SnapshotFetcher};
