use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use item_loader::config::{Config, ListingKind};
use item_loader::{HttpTransport, Item, ItemLoader, LoaderCallbacks, PagedLoaderBuilder};

/// Walk a paginated listing endpoint to the end and print its items
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Absolute URL of the listing endpoint
    #[arg(value_name = "URL", value_parser = Url::parse)]
    url: Url,

    /// Listing view whose page size to use
    #[arg(value_enum, default_value_t = ListingKind::Grid)]
    kind: ListingKind,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("item_loader=debug")),
        )
        .init();

    let config = Config::load()?;
    let page_size = config.listings.page_size(args.kind)?;
    info!("Loading {} as {:?} listing (page size {})", args.url, args.kind, page_size);

    let transport = Arc::new(HttpTransport::new(&config.http)?);
    let callbacks = LoaderCallbacks::new(
        |count| info!("Listing reports {} items", count),
        |items: &[Item]| info!("{} items loaded", items.len()),
    )
    .on_error(|err| warn!("Listing stopped early: {}", err));

    let loader = PagedLoaderBuilder::new(page_size.get())
        .max_items(config.listings.max_items().map(|max| max.get()))
        .request_url(args.url.as_str())
        .response_shape(config.response.shape())
        .transport(transport)
        .build(callbacks)?;

    while loader.can_load_more() {
        loader.load_next_page();
        loader.until_settled().await;
    }

    for item in loader.items() {
        println!("{}", item);
    }

    Ok(())
}
