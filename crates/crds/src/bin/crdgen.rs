//! Prints the DemoPod CustomResourceDefinition as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/demopod.yaml`

use crds::DemoPod;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crd = DemoPod::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
