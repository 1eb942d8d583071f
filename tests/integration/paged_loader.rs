use item_loader::{ItemLoader, LoaderError, PagedItemLoader, PagedLoaderBuilder};
use mockito::Server;
use serde_json::json;
use std::sync::Arc;

use crate::common::*;

fn media_loader(
    server: &Server,
    page_size: usize,
    max_items: Option<usize>,
    recorder: &Arc<Recorder>,
) -> PagedItemLoader {
    PagedLoaderBuilder::new(page_size)
        .max_items(max_items)
        .request_url(format!("{}{}", server.url(), MEDIA_PATH))
        .build(recorder.callbacks())
        .unwrap()
}

async fn load_and_settle(loader: &PagedItemLoader) {
    loader.load_next_page();
    loader.until_settled().await;
}

#[tokio::test]
async fn test_partial_last_page() {
    let mut server = Server::new_async().await;
    let mut mocks = Vec::new();
    for page in 1..=3 {
        mocks.push(mock_page(&mut server, MEDIA_PATH, page, 2, 200, &listing_page(5, page, 2), 1).await);
    }

    let recorder = Recorder::new();
    let loader = media_loader(&server, 2, None, &recorder);

    for _ in 0..3 {
        load_and_settle(&loader).await;
    }

    assert_eq!(
        recorder.events(),
        vec![Event::Count(5), Event::Load(2), Event::Raw, Event::Load(4), Event::Load(5)]
    );
    assert_eq!(recorder.loads()[2], media_items(0..5));
    assert!(loader.is_exhausted());
    assert_eq!(loader.total_pages(), Some(3));
    for mock in &mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_first_page_failure_is_terminal() {
    let mut server = Server::new_async().await;
    let mock = mock_page(&mut server, MEDIA_PATH, 1, 10, 500, &json!({"detail": "boom"}), 1).await;

    let recorder = Recorder::new();
    let loader = media_loader(&server, 10, None, &recorder);

    load_and_settle(&loader).await;
    load_and_settle(&loader).await;
    load_and_settle(&loader).await;

    assert!(recorder.counts().is_empty());
    assert!(recorder.loads().is_empty());
    assert!(matches!(
        recorder.errors().as_slice(),
        [LoaderError::Status { status: 500, .. }]
    ));
    assert!(loader.is_exhausted());
    assert_eq!(loader.total_count(), None);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_cap_truncates_page() {
    let mut server = Server::new_async().await;
    let first = mock_page(&mut server, MEDIA_PATH, 1, 2, 200, &listing_page(10, 1, 2), 1).await;
    let second = mock_page(&mut server, MEDIA_PATH, 2, 2, 200, &listing_page(10, 2, 2), 1).await;
    let third = mock_page(&mut server, MEDIA_PATH, 3, 2, 200, &listing_page(10, 3, 2), 0).await;

    let recorder = Recorder::new();
    let loader = media_loader(&server, 2, Some(3), &recorder);

    load_and_settle(&loader).await;
    load_and_settle(&loader).await;
    load_and_settle(&loader).await;

    assert_eq!(recorder.counts(), vec![10]);
    assert_eq!(recorder.loads(), vec![media_items(0..2), media_items(0..3)]);
    assert_eq!(loader.loaded_count(), 3);
    assert!(loader.is_exhausted());
    first.assert_async().await;
    second.assert_async().await;
    third.assert_async().await;
}

#[tokio::test]
async fn test_empty_listing() {
    let mut server = Server::new_async().await;
    let mock = mock_page(&mut server, MEDIA_PATH, 1, 24, 200, &page_body(0, 0..0), 1).await;

    let recorder = Recorder::new();
    let loader = media_loader(&server, 24, None, &recorder);

    load_and_settle(&loader).await;
    load_and_settle(&loader).await;

    assert_eq!(recorder.counts(), vec![0]);
    assert_eq!(recorder.loads(), vec![Vec::<item_loader::Item>::new()]);
    assert!(loader.is_exhausted());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_first_page_url_and_raw_response() {
    let mut server = Server::new_async().await;
    let mut first_body = listing_page(6, 1, 3);
    first_body["tags"] = json!(["music", "travel"]);
    let first = mock_page(&mut server, "/api/v1/playlists/p1", 1, 3, 200, &first_body, 1).await;
    let second = mock_page(&mut server, MEDIA_PATH, 2, 3, 200, &listing_page(6, 2, 3), 1).await;

    let recorder = Recorder::new();
    let loader = PagedLoaderBuilder::new(3)
        .first_page_url(format!("{}/api/v1/playlists/p1", server.url()))
        .request_url(format!("{}{}", server.url(), MEDIA_PATH))
        .build(recorder.callbacks())
        .unwrap();

    load_and_settle(&loader).await;
    load_and_settle(&loader).await;

    assert_eq!(recorder.raw(), vec![first_body]);
    assert_eq!(recorder.load_lengths(), vec![3, 6]);
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_request_url_query_is_kept() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v1/search")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("q".into(), "cats".into()),
            mockito::Matcher::UrlEncoded("page".into(), "1".into()),
            mockito::Matcher::UrlEncoded("page_size".into(), "12".into()),
        ]))
        .with_status(200)
        .with_body(page_body(1, 0..1).to_string())
        .expect(1)
        .create_async()
        .await;

    let recorder = Recorder::new();
    let loader = PagedLoaderBuilder::new(12)
        .request_url(format!("{}/api/v1/search?q=cats", server.url()))
        .build(recorder.callbacks())
        .unwrap();

    load_and_settle(&loader).await;

    assert_eq!(recorder.counts(), vec![1]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_later_failure_keeps_items() {
    let mut server = Server::new_async().await;
    let _first = mock_page(&mut server, MEDIA_PATH, 1, 2, 200, &listing_page(6, 1, 2), 1).await;
    let _second = mock_page(&mut server, MEDIA_PATH, 2, 2, 200, &json!({"count": 6}), 1).await;
    let third = mock_page(&mut server, MEDIA_PATH, 3, 2, 200, &listing_page(6, 3, 2), 0).await;

    let recorder = Recorder::new();
    let loader = media_loader(&server, 2, None, &recorder);

    load_and_settle(&loader).await;
    load_and_settle(&loader).await;
    load_and_settle(&loader).await;

    // The failed page reports the unchanged list so the view leaves its loading state
    assert_eq!(recorder.loads(), vec![media_items(0..2), media_items(0..2)]);
    assert!(matches!(
        recorder.errors().as_slice(),
        [LoaderError::MalformedResponse(_)]
    ));
    assert!(loader.is_exhausted());
    third.assert_async().await;
}

#[tokio::test]
async fn test_growth_is_prefix_extension() {
    let mut server = Server::new_async().await;
    let mut mocks = Vec::new();
    for page in 1..=5 {
        mocks.push(mock_page(&mut server, MEDIA_PATH, page, 4, 200, &listing_page(18, page, 4), 1).await);
    }

    let recorder = Recorder::new();
    let loader = media_loader(&server, 4, None, &recorder);

    while loader.can_load_more() {
        load_and_settle(&loader).await;
    }

    let loads = recorder.loads();
    assert_eq!(recorder.load_lengths(), vec![4, 8, 12, 16, 18]);
    for pair in loads.windows(2) {
        assert!(pair[1].len() >= pair[0].len());
        assert_eq!(&pair[1][..pair[0].len()], pair[0].as_slice());
    }
    assert_eq!(recorder.counts(), vec![18]);
}
