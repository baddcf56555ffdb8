//! Generate static files

use anyhow::Result;
use std::time::Instant;

use crate::generator::Generator;
use crate::Blog;

/// Build the whole site into the public directory
pub async fn run(blog: &Blog) -> Result<()> {
    let start = Instant::now();

    let generator = Generator::new(blog)?;
    let report = generator.generate().await?;

    tracing::info!(
        "Generated {} posts and copied {} assets in {:.2}s",
        report.posts,
        report.assets,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
