//! `AllSearchClient` against a local mock of the search endpoint.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use place_crawler::all_search::{AllSearchClient, ALL_SEARCH_PATH};
use place_crawler::{ResultAggregator, SearchLocation};

fn test_client(server: &MockServer) -> AllSearchClient {
    AllSearchClient::new(&server.uri(), Duration::from_secs(5), Duration::ZERO)
        .expect("failed to build test client")
}

fn gangnam() -> SearchLocation {
    SearchLocation::new("서울 강남", 127.0378515499566, 37.4774550570593)
}

fn page_of(names: &[&str]) -> serde_json::Value {
    let list: Vec<_> = names
        .iter()
        .map(|n| {
            json!({
                "id": format!("id-{n}"),
                "name": n,
                "address": format!("{n} 주소"),
                "roadAddress": format!("{n} 도로명"),
                "category": ["카페"],
                "tel": "02-000-0000",
                "x": "127.03",
                "y": "37.49"
            })
        })
        .collect();
    json!({ "result": { "place": { "list": list } } })
}

async fn mount_page(server: &MockServer, page: u32, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(ALL_SEARCH_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn pages_until_an_empty_list() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page_of(&["A", "B"])).await;
    mount_page(&server, 2, page_of(&["C"])).await;
    mount_page(&server, 3, page_of(&[])).await;

    let records = test_client(&server).search("카페", &gangnam()).await;
    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert_eq!(records.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(records[2].road_address.as_deref(), Some("C 도로명"));
    assert_eq!(records[0].search_query, "카페");
}

#[tokio::test]
async fn stops_after_five_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ALL_SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_of(&["X"])))
        .expect(5)
        .mount(&server)
        .await;

    let records = test_client(&server).search("카페", &gangnam()).await;
    assert_eq!(records.len(), 5);
}

#[tokio::test]
async fn forbidden_keeps_earlier_pages() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page_of(&["A"])).await;
    Mock::given(method("GET"))
        .and(path(ALL_SEARCH_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let records = test_client(&server).search("카페", &gangnam()).await;
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn unexpected_shape_and_server_error_stop_paging() {
    let server = MockServer::start().await;
    mount_page(&server, 1, json!({ "result": { "address": {} } })).await;
    let records = test_client(&server).search("카페", &gangnam()).await;
    assert!(records.is_empty());

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ALL_SEARCH_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    let records = test_client(&server).search("카페", &gangnam()).await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn sends_coordinates_and_browser_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ALL_SEARCH_PATH))
        .and(query_param("query", "강남 맛집"))
        .and(query_param("type", "all"))
        .and(query_param("searchCoord", "127.0378515499566;37.4774550570593"))
        .and(header_exists("accept-language"))
        .and(header_exists("referer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_of(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let records = test_client(&server).search("강남 맛집", &gangnam()).await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn multiple_locations_merge_without_duplicates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ALL_SEARCH_PATH))
        .and(query_param("searchCoord", "127.1;37.1"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_of(&["A", "B"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ALL_SEARCH_PATH))
        .and(query_param("searchCoord", "127.2;37.2"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_of(&["B", "C"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ALL_SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_of(&[])))
        .mount(&server)
        .await;

    let locations = vec![
        SearchLocation::new("first", 127.1, 37.1),
        SearchLocation::new("second", 127.2, 37.2),
    ];
    let mut aggregator = ResultAggregator::new();
    let total = test_client(&server)
        .search_locations("카페", &locations, Duration::ZERO, &mut aggregator)
        .await;

    assert_eq!(total, 3);
    let records = aggregator.records("카페");
    assert_eq!(records[1].name, "B");
    assert_eq!(records[1].search_location.as_deref(), Some("first"));
    assert_eq!(records[2].name, "C");
    assert_eq!(records[2].search_location.as_deref(), Some("second"));
}
