//! PUB/SUB integration tests over direct TCP sockets.

use std::time::Duration;

use tokio::time::timeout;

use ruleflow_bus::topics;
use ruleflow_bus::transport::Transport;
use ruleflow_bus::{EventPublisher, EventSubscriber, Message, ZmqPublisher, ZmqSubscriber};

const TIMEOUT: Duration = Duration::from_secs(3);
const SETTLE: Duration = Duration::from_millis(150);

#[tokio::test]
async fn subscriber_only_sees_its_domain() {
    let transport = Transport::tcp("127.0.0.1", 16200);
    let publisher = ZmqPublisher::bind(&transport).await.unwrap();
    tokio::time::sleep(SETTLE).await;

    let sub = ZmqSubscriber::connect(&transport).await.unwrap();
    sub.subscribe(&topics::domain_prefix(topics::DEFAULT_PREFIX, "d1"))
        .await
        .unwrap();
    tokio::time::sleep(SETTLE).await;

    publisher
        .publish(Message::new("d2", "temp", b"other".to_vec()))
        .await
        .unwrap();
    let mine = Message::new("d1", "temp", b"mine".to_vec());
    let id = mine.id;
    publisher.publish(mine).await.unwrap();

    let got = timeout(TIMEOUT, sub.recv()).await.expect("timed out").unwrap();
    assert_eq!(got.id, id);
    assert_eq!(got.domain, "d1");

    let nothing = timeout(Duration::from_millis(300), sub.recv()).await;
    assert!(nothing.is_err(), "message from another domain leaked through");
}

#[tokio::test]
async fn custom_prefix_changes_topic() {
    let transport = Transport::tcp("127.0.0.1", 16201);
    let publisher = ZmqPublisher::bind(&transport)
        .await
        .unwrap()
        .with_prefix("out.");
    tokio::time::sleep(SETTLE).await;

    let sub = ZmqSubscriber::connect(&transport).await.unwrap();
    sub.subscribe("out.").await.unwrap();
    tokio::time::sleep(SETTLE).await;

    publisher
        .publish(Message::new("d1", "alerts", b"hot".to_vec()))
        .await
        .unwrap();

    let got = timeout(TIMEOUT, sub.recv()).await.expect("timed out").unwrap();
    assert_eq!(got.channel, "alerts");
    assert_eq!(got.payload, b"hot");
}
