//! Live-listener tests: real sockets, remounting while serving, shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use waypoint::config::RoutesConfig;
use waypoint::demo::demo_source;
use waypoint::dispatch::{handler, reply, Context, Next, Reply};
use waypoint::mount::{Declaration, RouteDeclaration, Registrar};
use waypoint::routing::Methods;

mod common;

async fn v1(_cx: Context) -> Reply {
    reply("v1")
}

async fn v2(_cx: Context) -> Reply {
    reply("v2")
}

fn version(pattern: &str, declaration: Declaration) -> Vec<RouteDeclaration> {
    vec![RouteDeclaration::new(Methods::get(), pattern, declaration)]
}

#[tokio::test]
async fn test_demo_over_tcp() {
    let registry = common::registry(demo_source(RoutesConfig::default()));
    let (addr, shutdown) = common::spawn_server(registry).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/hello/ana"))
        .send()
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-powered-by"], "waypoint");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "Hello, ana");

    let res = client
        .head(format!("http://{addr}/profile/bob"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "");

    shutdown.trigger();
}

#[tokio::test]
async fn test_remount_while_serving() {
    let registry = common::registry(version("/v", Declaration::handler(v1)));
    let (addr, shutdown) = common::spawn_server(Arc::clone(&registry)).await;
    let client = common::client();
    let url = format!("http://{addr}/v");

    assert_eq!(client.get(&url).send().await.unwrap().text().await.unwrap(), "v1");

    let report = registry
        .remount_from(Arc::new(version("/v", Declaration::handler(v2))))
        .unwrap();
    assert_eq!(report.routes, 1);
    assert_eq!(client.get(&url).send().await.unwrap().text().await.unwrap(), "v2");

    // A conflicting source is rejected and the active table keeps serving.
    let conflicting = vec![
        RouteDeclaration::new(Methods::get(), "/[a]", Declaration::handler(v1)),
        RouteDeclaration::new(Methods::get(), "/[b]", Declaration::handler(v1)),
    ];
    assert!(registry.remount_from(Arc::new(conflicting)).is_err());
    assert_eq!(client.get(&url).send().await.unwrap().text().await.unwrap(), "v2");

    // The adopted source is the one remount() rebuilds from.
    registry.remount().unwrap();
    assert_eq!(client.get(&url).send().await.unwrap().text().await.unwrap(), "v2");

    shutdown.trigger();
}

#[tokio::test]
async fn test_in_flight_request_finishes_on_old_table() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    let (hook_entered, hook_release) = (Arc::clone(&entered), Arc::clone(&release));
    let parked = Declaration::route(move |r: &mut Registrar<'_>| {
        let (entered, release) = (Arc::clone(&hook_entered), Arc::clone(&hook_release));
        r.on_request(move |_cx: Context, next: Next| {
            let (entered, release) = (Arc::clone(&entered), Arc::clone(&release));
            async move {
                entered.notify_one();
                release.notified().await;
                next.run().await
            }
        });
        handler(v1)
    });

    let registry = common::registry(version("/v", parked));
    let (addr, shutdown) = common::spawn_server(Arc::clone(&registry)).await;
    let client = common::client();
    let url = format!("http://{addr}/v");

    let in_flight = tokio::spawn({
        let (client, url) = (client.clone(), url.clone());
        async move { client.get(&url).send().await.unwrap().text().await.unwrap() }
    });
    entered.notified().await;

    registry
        .remount_from(Arc::new(version("/v", Declaration::handler(v2))))
        .unwrap();
    assert_eq!(client.get(&url).send().await.unwrap().text().await.unwrap(), "v2");

    release.notify_one();
    assert_eq!(in_flight.await.unwrap(), "v1");

    shutdown.trigger();
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let registry = common::registry(version("/v", Declaration::handler(v1)));
    let (addr, shutdown) = common::spawn_server(registry).await;
    let client = common::client();

    assert!(client.get(format!("http://{addr}/v")).send().await.is_ok());

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let result = client
        .get(format!("http://{addr}/v"))
        .timeout(Duration::from_secs(2))
        .send()
        .await;
    assert!(result.is_err());
}
