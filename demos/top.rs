//! Example showing how to page through the trending images.
//!
//! This example shows:
//! - Building an immutable search from the default one
//! - Streaming the results one page at a time
//! - Reading derived views (artists, thumbnails) off each image

use derpibooru::{
    search::{Limit, Search, SortField},
    Client,
};
use futures::TryStreamExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    let client = Client::new();

    // Trending images, 10 per page, 20 in total
    let top = Search::new().top().with_per_page(10).with_limit(Limit::At(20));
    println!("browse at: {}", top.build_url());

    let mut images = Box::pin(top.images(&client));
    while let Some(image) = images.try_next().await? {
        println!(
            "#{} score {:?} by {:?}\n  {}",
            image.id(),
            image.score(),
            image.artists(),
            image.thumb().unwrap_or_else(|| image.url())
        );
    }

    // The original search is untouched and can be branched again
    let oldest = top.with_sort(SortField::CreatedAt).ascending().with_limit(Limit::At(1));
    if let Some(mut image) = Box::pin(oldest.images(&client)).try_next().await? {
        let id = image.id();
        let comments = image.comments(&client).await?;
        println!("oldest trending image {id} has {} comments", comments.len());
    }

    Ok(())
}
