mod api;
mod config;
mod device_farm;
mod error;
mod orchestration;
mod package;
mod poll;
mod routes;
mod storage;

use crate::api::build_api;

#[tokio::main]
async fn main() {
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    let router = build_api().await;
    axum::serve(listener, router).await.unwrap();
}
