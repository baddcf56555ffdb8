//! List site content

use anyhow::Result;

use crate::content::PostSummary;
use crate::generator::Generator;
use crate::helpers::DateFormatter;
use crate::Blog;

/// Print every post, walking all pages of the list
pub async fn run(blog: &Blog) -> Result<()> {
    let generator = Generator::new(blog)?;
    let posts = generator.all_posts().await?;
    let dates = DateFormatter::new(blog.config.tz()?, &blog.config.date_format);

    println!("Posts ({}):", posts.len());
    for post in &posts {
        println!("  {}", format_line(post, &dates)?);
    }

    Ok(())
}

fn format_line(post: &PostSummary, dates: &DateFormatter) -> Result<String> {
    let date = match &post.first_publication_date {
        Some(date) => dates.format(date, None)?,
        None => "-".to_string(),
    };
    Ok(format!("{} - {} [{}]", date, post.title, post.uid))
}
