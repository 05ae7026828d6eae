//! ScanSource trait - scan producer abstraction
//!
//! Decouples ingestion from where scans come from (synthetic generator,
//! recorded file, live driver).

use std::sync::Arc;

use crate::ScanPacket;

/// Callback a source invokes once per produced scan.
pub type ScanCallback = Arc<dyn Fn(ScanPacket) + Send + Sync>;

/// Scan data source
///
/// Sources push packets through a callback from their own thread, the same
/// way sensor drivers deliver data.
///
/// ```ignore
/// let source: Box<dyn ScanSource> = MockScanSource::boxed(config);
/// source.listen(Arc::new(|packet| println!("{}", packet.seq)));
/// // ...
/// source.stop();
/// ```
pub trait ScanSource: Send + Sync {
    /// Source ID
    fn source_id(&self) -> &str;

    /// Start producing scans into `callback`.
    ///
    /// Calling this while already listening is a no-op.
    fn listen(&self, callback: ScanCallback);

    /// Stop producing scans
    fn stop(&self);

    /// Whether the source is currently producing
    fn is_listening(&self) -> bool;
}
