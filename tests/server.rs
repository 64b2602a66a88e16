use std::net::SocketAddr;
use std::time::Duration;

use routekit::{
    health::Probes, routes, Request, Response, Route, Router, Routes, Server, ServerConfig,
    Service, StatusCode,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct StatusApi;

async fn status(_req: Request) -> Response {
    Response::text("ok")
}

async fn echo(req: Request) -> Response {
    Response::builder()
        .status(StatusCode::CREATED)
        .text(String::from_utf8_lossy(req.body()).into_owned())
}

async fn slow(_req: Request) -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late"
}

routes! {
    impl StatusApi {
        #[allow(non_snake_case)]
        pub fn GetStatus(&self) -> Route {
            Route::get(status)
        }

        #[allow(non_snake_case)]
        pub fn PostEcho(&self) -> Route {
            Route::post(echo)
        }
    }
}

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), routekit::Error>>,
}

async fn start(server: Server) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve_with_shutdown(listener, async move {
        let _ = rx.await;
    }));
    Running { addr, stop, handle }
}

impl Running {
    async fn shutdown(self) {
        self.stop.send(()).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

async fn send(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8(buf).unwrap()
}

/// Writes `raw` and keeps the connection open without sending more. Returns
/// what the server wrote before closing, or `None` if it was still open
/// after `wait`.
async fn send_and_stall(addr: SocketAddr, raw: &str, wait: Duration) -> Option<String> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    match tokio::time::timeout(wait, stream.read_to_end(&mut buf)).await {
        Ok(_) => Some(String::from_utf8_lossy(&buf).into_owned()),
        Err(_) => None,
    }
}

fn install_probes(router: &mut Router) {
    Service::new(Probes, false).bind(router);
}

fn install_versioned_api(router: &mut Router) {
    Service::new(StatusApi, false).bind(&mut router.group("/api/v1"));
}

fn get(path: &str) -> String {
    format!("GET {path} HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
}

#[tokio::test]
async fn bound_service_answers_on_derived_path() {
    let mut server = Server::new("status", None);
    server.install([|router: &mut Router| Service::new(StatusApi, false).bind(router)]);
    let running = start(server).await;

    let res = send(running.addr, &get("/get_status")).await;
    assert!(res.starts_with("HTTP/1.1 200"), "{res}");
    assert!(res.ends_with("ok"), "{res}");

    running.shutdown().await;
}

#[tokio::test]
async fn request_body_reaches_the_handler() {
    let mut server = Server::new("echo", None);
    server.install([|router: &mut Router| Service::new(StatusApi, false).bind(router)]);
    let running = start(server).await;

    let raw = "POST /post_echo HTTP/1.1\r\nhost: localhost\r\ncontent-length: 5\r\nconnection: close\r\n\r\nhello";
    let res = send(running.addr, raw).await;
    assert!(res.starts_with("HTTP/1.1 201"), "{res}");
    assert!(res.ends_with("hello"), "{res}");

    running.shutdown().await;
}

#[tokio::test]
async fn unknown_path_and_wrong_verb_are_not_found() {
    let mut server = Server::new("status", None);
    server.install([|router: &mut Router| Service::new(StatusApi, false).bind(router)]);
    let running = start(server).await;

    let res = send(running.addr, &get("/missing")).await;
    assert!(res.starts_with("HTTP/1.1 404"), "{res}");

    let res = send(running.addr, &get("/post_echo")).await;
    assert!(res.starts_with("HTTP/1.1 404"), "{res}");

    running.shutdown().await;
}

#[tokio::test]
async fn services_bound_on_groups_serve_under_the_prefix() {
    let mut server = Server::new("grouped", None);
    server.install([install_probes as fn(&mut Router), install_versioned_api]);
    let running = start(server).await;

    let res = send(running.addr, &get("/api/v1/get_status")).await;
    assert!(res.ends_with("ok"), "{res}");

    let res = send(running.addr, &get("/readyz")).await;
    assert!(res.ends_with("ready"), "{res}");

    let res = send(running.addr, &get("/get_status")).await;
    assert!(res.starts_with("HTTP/1.1 404"), "{res}");

    running.shutdown().await;
}

#[tokio::test]
async fn handler_past_write_timeout_gets_503() {
    let mut server = Server::new("slow", Some(ServerConfig { port: 0, read_timeout: 0, write_timeout: 1 }));
    server.router_mut().get("/slow", slow);
    let running = start(server).await;

    let res = send(running.addr, &get("/slow")).await;
    assert!(res.starts_with("HTTP/1.1 503"), "{res}");

    running.shutdown().await;
}

#[tokio::test]
async fn body_not_sent_within_read_timeout_gets_408() {
    let mut server = Server::new("stalled", Some(ServerConfig { port: 0, read_timeout: 1, write_timeout: 0 }));
    server.install([|router: &mut Router| Service::new(StatusApi, false).bind(router)]);
    let running = start(server).await;

    // Promises five body bytes, sends two.
    let raw = "POST /post_echo HTTP/1.1\r\nhost: localhost\r\ncontent-length: 5\r\nconnection: close\r\n\r\nhe";
    let res = send_and_stall(running.addr, raw, Duration::from_secs(5))
        .await
        .expect("connection still open after the read timeout");
    assert!(res.is_empty() || res.starts_with("HTTP/1.1 408"), "{res}");

    running.shutdown().await;
}

#[tokio::test]
async fn head_not_sent_within_read_timeout_closes_the_connection() {
    let mut server = Server::new("stalled", Some(ServerConfig { port: 0, read_timeout: 1, write_timeout: 0 }));
    server.install([|router: &mut Router| Service::new(StatusApi, false).bind(router)]);
    let running = start(server).await;

    // No blank line: the head never completes.
    let raw = "GET /get_status HTTP/1.1\r\nhost: localhost\r\n";
    let res = send_and_stall(running.addr, raw, Duration::from_secs(5)).await;
    assert!(res.is_some(), "connection still open after the read timeout");
    assert!(!res.unwrap().contains("200 OK"));

    running.shutdown().await;
}

#[tokio::test]
#[should_panic(expected = "server run failed")]
async fn run_panics_when_the_port_is_taken() {
    let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    Server::new("clash", Some(ServerConfig { port, ..Default::default() }))
        .run()
        .await;
}
