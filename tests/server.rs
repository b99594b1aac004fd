//! End-to-end server tests over real TCP, driven by the crate's own client.

use std::time::Duration;

use rshttp::{Client, Config, HttpError, Method, Router, Server, Status};

async fn spawn(router: Router) -> (Server, String) {
    let server = Server::bind("127.0.0.1:0", router, Config::server())
        .await
        .unwrap();
    let base = format!("http://{}", server.local_addr());
    (server, base)
}

#[tokio::test]
async fn test_round_trip_with_path_capture() {
    let mut router = Router::new();
    router.add(Method::Get, "/hello/:name", |req, res| {
        res.set_body(format!("hello {}", req.attr("name")));
        Ok(())
    });
    let (server, base) = spawn(router).await;

    let client = Client::new();
    let response = client.get(&format!("{base}/hello/world")).await.unwrap();
    assert_eq!(response.status, Status::OK);
    assert_eq!(response.body, b"hello world");

    server.shutdown().await;
}

#[tokio::test]
async fn test_literal_route_wins_over_capture() {
    let mut router = Router::new();
    router.add(Method::Get, "/items/:id", |_req, res| {
        res.set_body("by id");
        Ok(())
    });
    router.add(Method::Get, "/items/count", |_req, res| {
        res.set_body("count");
        Ok(())
    });
    let (server, base) = spawn(router).await;

    let client = Client::new();
    let counted = client.get(&format!("{base}/items/count")).await.unwrap();
    assert_eq!(counted.body, b"count");
    let by_id = client.get(&format!("{base}/items/42")).await.unwrap();
    assert_eq!(by_id.body, b"by id");

    server.shutdown().await;
}

#[tokio::test]
async fn test_query_parameters_reach_the_handler() {
    let mut router = Router::new();
    router.add(Method::Get, "/search", |req, res| {
        res.set_body(format!("q={} limit={}", req.attr("q"), req.attributes().get_i64("limit", 10)));
        Ok(())
    });
    let (server, base) = spawn(router).await;

    let client = Client::new();
    let response = client
        .get(&format!("{base}/search?q=rust&limit=5"))
        .await
        .unwrap();
    assert_eq!(response.body, b"q=rust limit=5");

    server.shutdown().await;
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    // A GET route must exist so the miss is NotFound, not UnsupportedMethod.
    let mut router = Router::new();
    router.add(Method::Get, "/known", |_req, res| {
        res.set_body("known");
        Ok(())
    });
    let (server, base) = spawn(router).await;

    let client = Client::new();
    let response = client.get(&format!("{base}/missing")).await.unwrap();
    assert_eq!(response.status, Status::NOT_FOUND);

    server.shutdown().await;
}

#[tokio::test]
async fn test_method_without_routes_is_400() {
    let (server, base) = spawn(Router::new()).await;

    let client = Client::new();
    let response = client.get(&format!("{base}/anything")).await.unwrap();
    assert_eq!(response.status, Status::BAD_REQUEST);

    server.shutdown().await;
}

#[tokio::test]
async fn test_typed_handler_error_status_reaches_the_wire() {
    let mut router = Router::new();
    router.add(Method::Get, "/down", |_req, _res| {
        Err(HttpError::service_unavailable("try later").into())
    });
    let (server, base) = spawn(router).await;

    let client = Client::new();
    let response = client.get(&format!("{base}/down")).await.unwrap();
    assert_eq!(response.status, Status::SERVICE_UNAVAILABLE);
    assert_eq!(response.body, b"try later");

    server.shutdown().await;
}

#[tokio::test]
async fn test_postponed_response_over_tcp() {
    let mut router = Router::new();
    router.add(Method::Get, "/later", |_req, res| {
        let postponed = res.postpone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            postponed.set_status(Status::ACCEPTED);
            postponed.set_body("done waiting");
            postponed.done();
        });
        Ok(())
    });
    let (server, base) = spawn(router).await;

    let client = Client::new();
    let response = client.get(&format!("{base}/later")).await.unwrap();
    assert_eq!(response.status, Status::ACCEPTED);
    assert_eq!(response.body, b"done waiting");

    // The connection stays usable after a postponed exchange.
    let mut router_check = client.get(&format!("{base}/later")).await.unwrap();
    assert_eq!(router_check.status, Status::ACCEPTED);
    assert_eq!(std::mem::take(&mut router_check.body), b"done waiting");

    server.shutdown().await;
}

#[tokio::test]
async fn test_methods_dispatch_independently() {
    let mut router = Router::new();
    router.add(Method::Get, "/thing", |_req, res| {
        res.set_body("got");
        Ok(())
    });
    router.add(Method::Delete, "/thing", |_req, res| {
        res.set_body("deleted");
        Ok(())
    });
    let (server, base) = spawn(router).await;

    let client = Client::new();
    let got = client.get(&format!("{base}/thing")).await.unwrap();
    assert_eq!(got.body, b"got");
    let deleted = client.delete(&format!("{base}/thing")).await.unwrap();
    assert_eq!(deleted.body, b"deleted");

    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let (server, base) = spawn(Router::new()).await;
    server.shutdown().await;

    let client = Client::new();
    let result = client
        .get_timeout(&format!("{base}/x"), Duration::from_secs(1))
        .await;
    assert!(result.is_err());
}
