//! End-to-end tests for push delivery.
//!
//! Each test starts real receivers on loopback ephemeral ports and pushes
//! with an HTTP client. The receiver acknowledges only after every listener
//! has returned, so listener side effects are visible once `send` resolves.

use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use oneapi_push::{
    Delivery, ListenerHandle, NotificationDomain, PushConfig, PushDispatcher, ReceiverState,
};
use tokio::time::timeout;

const ROAMING_JSON: &str = concat!(
    r#"{"terminalRoamingStatusList":{"roaming":{"address":"45534534","currentRoaming":null,"#,
    r#""servingMccMnc":{"mcc":"219","mnc":"02"},"resourceURL":null,"retrievalStatus":"Error","#,
    r#""extendedData":{"destinationAddress":"54353","statusId":5,"doneTime":1198908717056,"#,
    r#""pricePerMessage":5.0,"mccMnc":"21902","servingMsc":"543553","censoredServingMsc":"5345","#,
    r#""gsmErrorCode":0,"originalNetworkName":"VIP-NET","portedNetworkName":"TELE2","#,
    r#""servingHlr":"5435","imsi":"219020000627769","originalNetworkPrefix":"91","#,
    r#""originalCountryPrefix":"385","originalCountryName":"Croatia","isNumberPorted":true,"#,
    r#""portedNetworkPrefix":"95","portedCountryPrefix":"385","portedCountryName":"Croatia","#,
    r#""numberInRoaming":false},"callbackData":null}}}"#,
);

const INBOUND_JSON: &str = concat!(
    r#"{"inboundSMSMessageList":{"inboundSMSMessage":[{"dateTime":"2013-05-21T10:04:33.000+0000","#,
    r#""destinationAddress":"385997701356","messageId":"msg-1","message":"Hello","#,
    r#""resourceURL":null,"senderAddress":"38598123456"},"#,
    r#"{"dateTime":"2013-05-21T10:04:35.000+0000","destinationAddress":"385997701356","#,
    r#""messageId":"msg-2","message":"World","resourceURL":null,"senderAddress":"38598123456"}],"#,
    r#""numberOfMessagesInThisBatch":2,"resourceURL":null,"totalNumberOfPendingMessages":0,"#,
    r#""callbackData":null}}"#,
);

fn dispatcher() -> PushDispatcher {
    PushDispatcher::new(PushConfig::local()).expect("local config is valid")
}

async fn push(
    dispatcher: &PushDispatcher,
    domain: NotificationDomain,
    body: &str,
) -> reqwest::Response {
    let url = dispatcher.notify_url(domain).expect("receiver should be running");
    push_to(url.as_str(), body).await.expect("push should be accepted")
}

async fn push_to(url: &str, body: &str) -> reqwest::Result<reqwest::Response> {
    let client = reqwest::Client::new();
    timeout(
        Duration::from_secs(5),
        client
            .post(url)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send(),
    )
    .await
    .expect("Timeout waiting for push response")
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// The documented roaming push decodes with a null currentRoaming kept absent.
#[tokio::test]
async fn test_roaming_status_push_reaches_typed_listener() {
    let dispatcher = dispatcher();
    let received = Arc::new(Mutex::new(Vec::new()));

    let sink = received.clone();
    dispatcher
        .on_roaming_status(move |result| {
            let notification = result.expect("roaming push should decode");
            sink.lock().unwrap().push(notification.roaming.clone());
        })
        .await
        .unwrap();

    let response = push(&dispatcher, NotificationDomain::RoamingStatus, ROAMING_JSON).await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");

    let received = received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].address, "45534534");
    assert_eq!(received[0].current_roaming, None);
    assert_eq!(
        received[0].extended_data.as_ref().unwrap().original_network_name.as_deref(),
        Some("VIP-NET")
    );

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_inbound_push_delivers_whole_batch() {
    let dispatcher = dispatcher();
    let texts = Arc::new(Mutex::new(Vec::new()));

    let sink = texts.clone();
    dispatcher
        .on_inbound_messages(move |result| {
            if let Ok(batch) = result {
                let mut sink = sink.lock().unwrap();
                sink.extend(batch.messages.iter().map(|m| m.message.clone()));
            }
        })
        .await
        .unwrap();

    push(&dispatcher, NotificationDomain::InboundMessage, INBOUND_JSON).await;

    assert_eq!(*texts.lock().unwrap(), vec!["Hello".to_string(), "World".to_string()]);
    dispatcher.shutdown().await;
}

/// No listener means no socket; nothing is mutated by the failed attempt.
#[tokio::test]
async fn test_push_without_listeners_is_refused() {
    let port = free_port();
    let config = PushConfig::local().with_port(NotificationDomain::InboundMessage, port);
    let dispatcher = PushDispatcher::new(config).unwrap();

    let result = push_to(&format!("http://127.0.0.1:{port}/"), INBOUND_JSON).await;

    let error = result.expect_err("nothing should be listening");
    assert!(error.is_connect(), "expected connection refused, got {error}");
    assert_eq!(dispatcher.state(NotificationDomain::InboundMessage), ReceiverState::Idle);
    assert_eq!(dispatcher.listener_count(NotificationDomain::InboundMessage), 0);
}

#[tokio::test]
async fn test_last_removal_closes_the_port() {
    let dispatcher = dispatcher();
    let domain = NotificationDomain::DeliveryInfo;

    let handle = dispatcher.add_listener(domain, |_| {}).await.unwrap();
    let url = dispatcher.notify_url(domain).unwrap();

    dispatcher.remove_listener(handle).await;
    assert_eq!(dispatcher.state(domain), ReceiverState::Idle);

    let error = push_to(url.as_str(), "{}").await.expect_err("receiver should be closed");
    assert!(error.is_connect(), "expected connection refused, got {error}");
}

/// Every listener sees the same push once, in registration order.
#[tokio::test]
async fn test_listeners_invoked_in_registration_order() {
    let dispatcher = dispatcher();
    let calls = Arc::new(Mutex::new(Vec::new()));

    for index in 0..5 {
        let calls = calls.clone();
        dispatcher
            .add_listener(NotificationDomain::RoamingStatus, move |delivery: &Delivery| {
                let address = delivery
                    .as_ref()
                    .ok()
                    .and_then(|n| n.as_roaming_status())
                    .map(|r| r.roaming.address.clone());
                calls.lock().unwrap().push((index, address));
            })
            .await
            .unwrap();
    }

    push(&dispatcher, NotificationDomain::RoamingStatus, ROAMING_JSON).await;

    let calls = calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 5);
    for (position, (index, address)) in calls.iter().enumerate() {
        assert_eq!(*index, position);
        assert_eq!(address.as_deref(), Some("45534534"));
    }

    dispatcher.shutdown().await;
}

/// A malformed body is acknowledged and handed to listeners as an error.
#[tokio::test]
async fn test_malformed_push_reaches_listeners_as_error() {
    let dispatcher = dispatcher();
    let errors = Arc::new(Mutex::new(Vec::new()));

    let sink = errors.clone();
    dispatcher
        .on_delivery_info(move |result| {
            if let Err(e) = result {
                sink.lock().unwrap().push(e.clone());
            }
        })
        .await
        .unwrap();

    let truncated = r#"{"deliveryInfoNotification":"#;
    let response = push(&dispatcher, NotificationDomain::DeliveryInfo, truncated).await;
    assert_eq!(response.status(), 200);

    let errors = errors.lock().unwrap().clone();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].domain, NotificationDomain::DeliveryInfo);
    assert!(errors[0].reason.contains("invalid JSON"));

    dispatcher.shutdown().await;
}

/// A panicking listener is logged and skipped; the rest still run.
#[tokio::test]
async fn test_panicking_listener_is_isolated() {
    let dispatcher = dispatcher();
    let domain = NotificationDomain::RoamingStatus;
    let survivor_calls = Arc::new(AtomicUsize::new(0));

    dispatcher
        .add_listener(domain, |_| panic!("listener failure"))
        .await
        .unwrap();

    let counter = survivor_calls.clone();
    dispatcher
        .add_listener(domain, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

    for _ in 0..2 {
        let response = push(&dispatcher, domain, ROAMING_JSON).await;
        assert_eq!(response.status(), 200);
    }

    assert_eq!(survivor_calls.load(Ordering::SeqCst), 2);
    assert_eq!(dispatcher.state(domain), ReceiverState::Running);

    dispatcher.shutdown().await;
}

/// A listener removed by an earlier listener in the same fan-out is skipped.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_listener_removed_mid_fan_out_is_not_invoked() {
    let dispatcher = dispatcher();
    let domain = NotificationDomain::InboundMessage;
    let runtime = tokio::runtime::Handle::current();

    let victim: Arc<Mutex<Option<ListenerHandle>>> = Arc::new(Mutex::new(None));
    let victim_calls = Arc::new(AtomicUsize::new(0));

    let remover = dispatcher.clone();
    let target = victim.clone();
    dispatcher
        .add_listener(domain, move |_| {
            let handle = target.lock().unwrap().take();
            if let Some(handle) = handle {
                // Listeners run on the blocking pool; the first listener stays
                // registered so this removal never waits on a drain
                runtime.block_on(remover.remove_listener(handle));
            }
        })
        .await
        .unwrap();

    let counter = victim_calls.clone();
    let handle = dispatcher
        .add_listener(domain, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();
    *victim.lock().unwrap() = Some(handle);

    push(&dispatcher, domain, INBOUND_JSON).await;
    push(&dispatcher, domain, INBOUND_JSON).await;

    assert_eq!(victim_calls.load(Ordering::SeqCst), 0);
    assert_eq!(dispatcher.listener_count(domain), 1);

    dispatcher.shutdown().await;
}

/// Each domain has its own receiver and listeners.
#[tokio::test]
async fn test_domains_are_independent() {
    let dispatcher = dispatcher();
    let inbound_calls = Arc::new(AtomicUsize::new(0));
    let roaming_calls = Arc::new(AtomicUsize::new(0));

    let counter = inbound_calls.clone();
    dispatcher
        .add_listener(NotificationDomain::InboundMessage, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();
    let counter = roaming_calls.clone();
    let roaming = dispatcher
        .add_listener(NotificationDomain::RoamingStatus, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

    assert_ne!(
        dispatcher.endpoint_port(NotificationDomain::InboundMessage),
        dispatcher.endpoint_port(NotificationDomain::RoamingStatus)
    );

    push(&dispatcher, NotificationDomain::RoamingStatus, ROAMING_JSON).await;
    assert_eq!(roaming_calls.load(Ordering::SeqCst), 1);
    assert_eq!(inbound_calls.load(Ordering::SeqCst), 0);

    // Stopping one domain leaves the other running
    dispatcher.remove_listener(roaming).await;
    assert_eq!(dispatcher.state(NotificationDomain::RoamingStatus), ReceiverState::Idle);
    assert_eq!(dispatcher.state(NotificationDomain::InboundMessage), ReceiverState::Running);

    push(&dispatcher, NotificationDomain::InboundMessage, INBOUND_JSON).await;
    assert_eq!(inbound_calls.load(Ordering::SeqCst), 1);

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_oversized_push_is_rejected_without_dispatch() {
    let config = PushConfig::local().with_max_body_bytes(64);
    let dispatcher = PushDispatcher::new(config).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    dispatcher
        .add_listener(NotificationDomain::RoamingStatus, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

    let url = dispatcher.notify_url(NotificationDomain::RoamingStatus).unwrap();
    let response = push_to(url.as_str(), ROAMING_JSON).await.unwrap();

    assert_eq!(response.status(), 413);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    dispatcher.shutdown().await;
}

/// Shutdown waits for a push whose listeners are still running, and the
/// pusher still gets its acknowledgment.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_drains_in_flight_push() {
    let dispatcher = dispatcher();
    let domain = NotificationDomain::RoamingStatus;
    let started = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));

    let (entered, exited) = (started.clone(), finished.clone());
    dispatcher
        .add_listener(domain, move |_| {
            entered.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            exited.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

    let url = dispatcher.notify_url(domain).unwrap();
    let client = reqwest::Client::new();
    let in_flight = tokio::spawn(async move {
        client.post(url.as_str()).body(ROAMING_JSON).send().await.map(|r| r.status())
    });

    timeout(Duration::from_secs(2), async {
        while started.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("listener should start");

    let stopper = dispatcher.clone();
    let shutdown = tokio::spawn(async move { stopper.shutdown().await });

    timeout(Duration::from_secs(2), async {
        while dispatcher.state(domain) != ReceiverState::Stopping {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("receiver should report Stopping while draining");
    assert_eq!(finished.load(Ordering::SeqCst), 0);

    timeout(Duration::from_secs(5), shutdown).await.unwrap().unwrap();

    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.state(domain), ReceiverState::Idle);

    let status = timeout(Duration::from_secs(5), in_flight).await.unwrap().unwrap();
    assert_eq!(status.unwrap(), 200);
}
