// Example: Degraded Environment Demo
//
// Shows how the engine classifies an environment whose committed
// executions revert despite clean simulations - every probe fails with
// the divergence diagnostic and the verdict comes back INCOMPATIBLE.
//
// Run this example with:
//   cargo run --example degraded_environment_demo

use std::sync::Arc;

use chainprobe_prober::prelude::*;

#[tokio::main]
async fn main() {
    env_logger::init();

    println!("========================================");
    println!("Chainprobe: Degraded Environment");
    println!("========================================\n");

    let env = Arc::new(
        TestEnvironmentBuilder::new()
            .with_forced_commit_revert("storage frozen at fork block")
            .build(),
    );
    let report = Assessor::new(env).assess().await;

    for (name, result) in &report.per_probe {
        let marker = if result.success { "PASS" } else { "FAIL" };
        println!("{marker}  {name:<22} {}", result.detail);
    }

    println!("\nVerdict: {}", report.verdict);

    match report.require_compatible() {
        Ok(()) => println!("environment accepted"),
        Err(e) => println!("environment rejected: {e}"),
    }
}
