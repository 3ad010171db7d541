//! Example demonstrating a reverse image search.
//!
//! Pass an image URL as the first argument.

use derpibooru::{search::Search, Client};
use futures::TryStreamExt;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init()?;

    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .scraping(false)
        .build()?;

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://derpicdn.net/img/view/2012/1/2/0.png".to_string());

    // Surface server errors instead of treating them as "no matches"
    let search = Search::new().strict(true).reverse(url, 0.25)?;
    let matches: Vec<_> = search.images(&client).try_collect().await?;

    println!("{} matches", matches.len());
    for image in &matches {
        println!("{} {}", image.url(), image.source());
    }
    Ok(())
}
