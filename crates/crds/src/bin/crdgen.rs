//! Emit the IPPool CRD manifest as YAML.
//!
//! Usage: `cargo run --bin crdgen > config/crd/ippool.yaml`

use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&crds::IPPool::crd())?);
    Ok(())
}
