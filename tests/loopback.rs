//! Two real webrtc-rs peers in one process, signaling over localhost HTTP.

use sdp_signal::peer::DataChannelBridge;
use sdp_signal::{
    ConnectionEstablisher, HttpSignalingClient, HttpSignalingServer, NegotiationEngine,
    SessionConfig, WebRtcEngine,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn offerer_messages_reach_the_answerer() {
    let cancel = CancellationToken::new();
    let mut server = HttpSignalingServer::bind("127.0.0.1:0", &cancel).await.unwrap();
    let config = SessionConfig {
        address: server.local_addr().to_string(),
        ice_servers: vec![],
        send_interval: Duration::from_millis(200),
        signaling_timeout: Some(Duration::from_secs(10)),
        include_loopback: true,
        ..Default::default()
    };

    let answerer = WebRtcEngine::new(&config).await.unwrap();
    let answer_events = answerer.take_events().unwrap();
    let answer_config = config.clone();
    let answer_cancel = cancel.clone();
    let received = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = received.clone();
    let answer_task = tokio::spawn(async move {
        ConnectionEstablisher::new(&answerer, &answer_config, answer_cancel.clone())
            .answer(&mut server)
            .await
            .unwrap();
        let stats = DataChannelBridge::accept(&answer_config)
            .run(answer_events, answer_cancel, move |_, text| {
                sink.lock().unwrap().push(text.to_string())
            })
            .await
            .unwrap();
        answerer.close().await.unwrap();
        stats
    });

    let offerer = WebRtcEngine::new(&config).await.unwrap();
    let offer_events = offerer.take_events().unwrap();
    let client = HttpSignalingClient::new(&config.address).unwrap();
    let bridge = DataChannelBridge::open(&offerer, &config).await.unwrap();
    let session = ConnectionEstablisher::new(&offerer, &config, cancel.clone())
        .offer(&client)
        .await
        .unwrap();
    assert!(session.local.payload.contains("m=application"));
    let offer_cancel = cancel.clone();
    let offer_task = tokio::spawn(bridge.run(offer_events, offer_cancel, |_, _| {}));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    while received.lock().unwrap().len() < 2 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    cancel.cancel();

    offer_task.await.unwrap().unwrap();
    answer_task.await.unwrap();
    offerer.close().await.unwrap();

    let received = received.lock().unwrap().clone();
    assert!(received.len() >= 2, "got {received:?}");
    assert!(received.iter().all(|m| m.starts_with("offer to answer: ")));
}
