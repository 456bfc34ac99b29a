//! Basic example of using promptpack as a library
//!
//! Converts every Markdown file under `./IN` into a request body in `./OUT`.

use promptpack::{Config, Pipeline};

fn main() -> anyhow::Result<()> {
    let config = Config::builder()
        .input_dir("./IN")
        .output_dir("./OUT")
        .create_output_dir(true)
        .build()?;

    let stats = Pipeline::new(config)?.run()?;

    stats.print_summary();

    println!(
        "\n✓ Wrote {} payloads ({} documents skipped)",
        stats.files_written, stats.extract.skipped
    );
    println!("✓ Output written to: {}", stats.output_directory);

    Ok(())
}
