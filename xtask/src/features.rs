use anyhow::Result;

use crate::cargo;

/// Feature sets each library crate must compile with on its own
const FEATURE_COMBINATIONS: &[(&str, &[&str])] = &[
    ("carebridge-common", &["--no-default-features"]),
    ("carebridge-common", &["--features", "foundation"]),
    ("carebridge-common", &["--features", "runtime"]),
    ("carebridge-common", &["--features", "test-utils"]),
    ("carebridge-core", &["--no-default-features"]),
    ("carebridge-core", &["--features", "test-utils"]),
];

/// Check that the optional feature tiers compile in isolation.
pub fn test_feature_matrix() -> Result<()> {
    println!("Testing {} feature combinations...", FEATURE_COMBINATIONS.len());

    for (index, (package, flags)) in FEATURE_COMBINATIONS.iter().enumerate() {
        let label = if flags.is_empty() { "default".to_string() } else { flags.join(" ") };
        let position = index + 1;
        let total = FEATURE_COMBINATIONS.len();
        println!("\n[{position}/{total}] cargo check -p {package} {label}");

        let mut args = vec!["check", "-p", package];
        args.extend_from_slice(flags);
        cargo(&args, &format!("{package} ({label}) failed to compile"))?;

        println!("✅ {package} ({label}) compiled successfully");
    }

    println!("\n✅ All {} feature combinations compile successfully!", FEATURE_COMBINATIONS.len());
    Ok(())
}
