// Example: Full Compatibility Assessment Demo
//
// Runs the complete probe catalog against the in-process environment and
// prints the resulting report:
// - two-phase execution per probe (dry-run, then commit)
// - tiered aggregation into a single verdict
// - the report's flat wire shape
//
// Run this example with:
//   cargo run --example full_assessment_demo
//
// With probe-level logging:
//   RUST_LOG=info cargo run --example full_assessment_demo

use std::sync::Arc;

use chainprobe_prober::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("========================================");
    println!("Chainprobe Compatibility Assessment");
    println!("========================================\n");

    let env = Arc::new(TestEnvironmentBuilder::new().build());
    let report = Assessor::new(env).assess().await;

    for (name, result) in &report.per_probe {
        let marker = if result.success { "PASS" } else { "FAIL" };
        println!("{marker}  {name:<22} cost={:<8} {}", result.cost, result.detail);
    }

    println!("\nVerdict: {}", report.verdict);
    println!("\nWire format:");
    println!("{}", serde_json::to_string_pretty(&report)?);

    report.require_compatible()?;
    Ok(())
}
