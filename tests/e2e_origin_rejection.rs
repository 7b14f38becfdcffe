//! Cross-origin attempts are refused before any session or process exists

use termgate_gateway::{Gateway, GatewayConfig, RunningGateway};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Error as WsError},
};

async fn start() -> RunningGateway {
    Gateway::new(GatewayConfig::default().with_port(0))
        .unwrap()
        .start()
        .await
        .unwrap()
}

async fn attempt(gateway: &RunningGateway, headers: &[(&'static str, &str)]) -> Result<(), u16> {
    let mut request = gateway.url().into_client_request().unwrap();
    for (name, value) in headers {
        request
            .headers_mut()
            .insert(*name, HeaderValue::from_str(value).unwrap());
    }

    match connect_async(request).await {
        Ok(_) => Ok(()),
        Err(WsError::Http(response)) => Err(response.status().as_u16()),
        Err(other) => panic!("unexpected transport error: {other:?}"),
    }
}

#[tokio::test]
async fn test_foreign_origins_rejected() {
    let gateway = start().await;

    for origin in [
        "http://attacker.example",
        "https://evil.example",
        "http://localhost.evil.example",
        "http://127.0.0.1.nip.io",
        "null",
        "chrome-extension://abcdef",
    ] {
        assert_eq!(attempt(&gateway, &[("Origin", origin)]).await, Err(403), "{origin}");
    }

    let stats = gateway.stats();
    assert_eq!(stats.rejected_policy, 6);
    assert_eq!(stats.accepted, 0);
    assert_eq!(stats.processes_spawned, 0);
    assert_eq!(gateway.connection_state(), None);

    gateway.stop().await;
}

#[tokio::test]
async fn test_foreign_host_without_origin_rejected() {
    let gateway = start().await;

    let status = attempt(&gateway, &[("Host", "attacker.example")]).await;
    assert_eq!(status, Err(403));
    assert_eq!(gateway.connection_state(), None);

    gateway.stop().await;
}

#[tokio::test]
async fn test_loopback_origin_accepted() {
    let gateway = start().await;
    let origin = format!("http://localhost:{}", gateway.local_addr().port());

    assert_eq!(attempt(&gateway, &[("Origin", origin.as_str())]).await, Ok(()));
    assert_eq!(gateway.stats().accepted, 1);

    gateway.stop().await;
}
