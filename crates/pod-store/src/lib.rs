//! Cluster store access for the DemoPod operator
//!
//! The reconciler never talks to the Kubernetes API directly. It goes through
//! the [`PodStore`] trait, which has two implementations:
//!
//! - [`KubePodStore`]: backed by a `kube::Client`
//! - `MockPodStore`: in-memory fake for unit tests (`test-util` feature)
//!
//! # Example
//!
//! ```no_run
//! use pod_store::{KubePodStore, PodStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let store = KubePodStore::new(client);
//!
//! let demo_pod = store.get_demo_pod("default", "web").await?;
//! let pods = store.list_pods("default", &demo_pod.selector_labels()).await?;
//! println!("{} pods labelled for web", pods.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod selector;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubePodStore;
pub use error::StoreError;
pub use selector::{label_selector, matches_labels, pod_phase};
pub use store_trait::PodStore;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockOperation, MockPodStore};
