//! Prints the `Migration` CustomResourceDefinition as YAML.
//!
//! ```bash
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::CustomResourceExt;
use migration_controller::crd::Migration;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&Migration::crd())?);
    Ok(())
}
