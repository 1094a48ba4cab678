//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the compute and generation
//! service traits, so handlers and poll loops can be exercised without a
//! cloud project or a GPU host.
//!
//! # Example
//!
//! ```rust,ignore
//! use vmctl_core::testing::{fixtures, MockComputeApi, MockGenerationApi};
//!
//! let compute = MockComputeApi::with_statuses(vec![InstanceStatus::Staging, InstanceStatus::Running]);
//! let generation = MockGenerationApi::new();
//! generation
//!     .set_history(vec![Ok(fixtures::history_with_images("p1", &[("9", &["out.png"])]))])
//!     .await;
//!
//! // Use in AppState...
//! ```

mod mock_compute;
mod mock_generation;

pub use mock_compute::{ComputeCall, MockComputeApi};
pub use mock_generation::{GenerationCall, MockGenerationApi};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::comfy::{History, HistoryEntry, ImageRef, NodeOutput};
    use crate::compute::InstanceRef;

    pub const PROJECT: &str = "test-project";
    pub const ZONE: &str = "asia-northeast1-a";
    pub const INSTANCE: &str = "comfy-vm";

    /// The instance the test configuration points at.
    pub fn instance_ref() -> InstanceRef {
        InstanceRef {
            project: PROJECT.to_string(),
            zone: ZONE.to_string(),
            instance: INSTANCE.to_string(),
        }
    }

    /// History holding one finished job with images per node.
    pub fn history_with_images(prompt_id: &str, nodes: &[(&str, &[&str])]) -> History {
        let outputs = nodes
            .iter()
            .map(|(node, files)| {
                let images = files
                    .iter()
                    .map(|filename| ImageRef {
                        filename: filename.to_string(),
                        subfolder: String::new(),
                        kind: "output".to_string(),
                    })
                    .collect();
                (
                    node.to_string(),
                    NodeOutput {
                        images,
                        extra: Default::default(),
                    },
                )
            })
            .collect();

        let mut history = History::default();
        history.jobs.insert(
            prompt_id.to_string(),
            HistoryEntry {
                outputs,
                status: None,
                extra: Default::default(),
            },
        );
        history
    }
}
