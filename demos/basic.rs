//! Minimal routekit example — a users API declared as a handler object,
//! plus health checks.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -H 'x-user-id: 7' http://localhost:3000/api/get_user
//!   curl -X POST http://localhost:3000/api/create_user -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:3000/api/delete_user
//!   curl http://localhost:3000/healthz

use routekit::{
    health::Probes, routes, Request, Response, Route, Router, Server, ServerConfig, Service,
    StatusCode,
};

struct Users;

routes! {
    impl Users {
        #[allow(non_snake_case)]
        pub fn GetUser(&self) -> Route {
            Route::get(get_user)
        }

        #[allow(non_snake_case)]
        pub fn CreateUser(&self) -> Route {
            Route::post(create_user)
        }

        #[allow(non_snake_case)]
        pub fn DeleteUser(&self) -> Route {
            Route::delete(delete_user)
        }

        // Not routed: takes an argument. Shows up in the verbose skip log.
        pub fn find(&self, id: u64) -> Option<u64> {
            (id == 42).then_some(id)
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ServerConfig { port: 3000, ..Default::default() };
    let mut server = Server::new("users", Some(config));
    server.install([install_api as fn(&mut Router), install_probes]);
    server.run().await;
}

fn install_api(router: &mut Router) {
    Service::new(Users, true).bind(&mut router.group("/api"));
}

fn install_probes(router: &mut Router) {
    Service::new(Probes, false).bind(router);
}

// GET /api/get_user
async fn get_user(req: Request) -> Response {
    let id = req.header("x-user-id").unwrap_or("42");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

// POST /api/create_user
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/api/get_user")
        .json(r#"{"id":"99","name":"new_user"}"#)
}

// DELETE /api/delete_user → 204 No Content
async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}
