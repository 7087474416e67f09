mod support;

use bytes::Bytes;
use chrono::{Local, TimeZone};
use rumqttc::QoS;
use smartdoorbell::config::Config;
use smartdoorbell::doorbell::Doorbell;
use smartdoorbell::mqtt::{ConnectionState, ResponseCode};
use support::{eventually, Call, FakeTransport};

const CONFIG: &str = r#"
[mqtt]
pub_topic = "home/frontdoor"
qos = 1

[mqtt.broker]
host = "broker.local"
user = "bell"
passwd = "secret"
"#;

#[tokio::test]
async fn press_publishes_timestamp() {
    let transport = FakeTransport::acknowledging(ResponseCode::NoError);
    let config = Config::from_toml(CONFIG).unwrap();
    let doorbell = Doorbell::from_config(&config, transport.clone());
    let session = doorbell.session().expect("mqtt configured");
    assert!(session.id().starts_with("smartdoorbell_"));

    doorbell.enter().await.unwrap();
    eventually("connect", || session.state() == ConnectionState::Connected).await;

    let pressed = Local.with_ymd_and_hms(2024, 5, 1, 18, 30, 5).unwrap();
    doorbell.ring_at(pressed).await;

    assert_eq!(
        transport.publishes(),
        vec![Call::Publish {
            topic: "home/frontdoor".to_owned(),
            qos: QoS::AtLeastOnce,
            payload: Bytes::from_static(b"2024-05-01 18:30:05.000000"),
        }]
    );
    assert!(transport.subscribes().is_empty());

    doorbell.exit().await;
    assert_eq!(transport.disconnects(), 1);
}

#[tokio::test]
async fn missing_mqtt_section_runs_without_session() {
    let transport = FakeTransport::new();
    let config = Config::from_toml("[gpio]\nswitch_pin = 4\n").unwrap();
    let doorbell = Doorbell::from_config(&config, transport.clone());

    assert!(doorbell.session().is_none());
    doorbell.enter().await.unwrap();
    doorbell.ring().await;
    doorbell.exit().await;

    assert!(transport.calls().is_empty());
}
