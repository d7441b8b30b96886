pub mod native;
pub mod traits;

pub use native::NativeRunner;
pub use traits::{CommandRunner, ProcessOutput, ProcessSpec};

use std::sync::Arc;

/// Runner used by the gateway and CLI.
pub fn create_runner() -> Arc<dyn CommandRunner> {
    Arc::new(NativeRunner::new())
}
