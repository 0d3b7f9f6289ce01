//! End-to-end runtime tests against a recording mock device.
//!
//! These drive the same paths the WebSocket session handler uses, with the
//! serial side replaced by a plain channel and the device by a command log.

use std::sync::{Arc, Mutex};

use flowbridge_daemon::{reader, server, tick, BridgeConfig, BridgeRuntime};
use flowbridge_device::{DeviceControl, Result as DeviceResult};
use flowbridge_protocol::BridgeEvent;
use tokio::sync::mpsc;

#[derive(Default)]
struct MockDevice {
    commands: Mutex<Vec<char>>,
}

impl MockDevice {
    fn commands(&self) -> Vec<char> {
        self.commands.lock().unwrap().clone()
    }
}

impl DeviceControl for MockDevice {
    fn send_reset(&self) -> DeviceResult<()> {
        self.commands.lock().unwrap().push('r');
        Ok(())
    }

    fn open_valve(&self) -> DeviceResult<()> {
        self.commands.lock().unwrap().push('o');
        Ok(())
    }

    fn close_valve(&self) -> DeviceResult<()> {
        self.commands.lock().unwrap().push('c');
        Ok(())
    }
}

fn runtime() -> (Arc<MockDevice>, Arc<BridgeRuntime>) {
    let device = Arc::new(MockDevice::default());
    let runtime = BridgeRuntime::new(BridgeConfig::default(), device.clone());
    (device, runtime)
}

/// Feed raw device lines through the ingest task and wait for it to finish.
async fn feed_lines(runtime: &Arc<BridgeRuntime>, lines: &[&str]) {
    let (tx, rx) = mpsc::unbounded_channel();
    for line in lines {
        tx.send((*line).to_string()).unwrap();
    }
    drop(tx);
    reader::run(rx, runtime.clone()).await;
}

fn parse(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn test_frames_reach_connected_clients_on_tick() {
    let (_device, runtime) = runtime();
    feed_lines(&runtime, &["FlowSensor ready", "100,42", "garbage,,", "200,44,812.5"]).await;

    let (_id, mut rx) = runtime.clients.register().await;
    tick::broadcast_tick(&runtime).await;

    let live = parse(&rx.recv().await.unwrap());
    assert_eq!(live["type"], "live");
    assert_eq!(live["millis"], 200);
    assert_eq!(live["pulses"], 44);
    assert_eq!(live["weight"], 812.5);
}

#[tokio::test]
async fn test_no_tick_traffic_without_clients() {
    let (_device, runtime) = runtime();
    feed_lines(&runtime, &["100,42"]).await;

    // Nothing to assert on the wire; the tick must simply not panic with an
    // empty registry and must not start a session by itself.
    tick::broadcast_tick(&runtime).await;
    assert!(!runtime.engine.is_running().await);
}

#[tokio::test]
async fn test_start_ack_is_unicast() {
    let (device, runtime) = runtime();
    let (id_a, mut rx_a) = runtime.clients.register().await;
    let (_id_b, mut rx_b) = runtime.clients.register().await;

    server::dispatch_command(&runtime, id_a, r#"{"cmd":"start","volume":1.0}"#).await;

    let ack = parse(&rx_a.recv().await.unwrap());
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["status"], "started");
    assert!(rx_b.try_recv().is_err(), "ack must not be broadcast");
    assert_eq!(device.commands(), vec!['r', 'o']);
}

#[tokio::test]
async fn test_explicit_stop_reports_to_everyone() {
    let (device, runtime) = runtime();
    let (id_a, mut rx_a) = runtime.clients.register().await;
    let (_id_b, mut rx_b) = runtime.clients.register().await;

    server::dispatch_command(&runtime, id_a, "start").await;
    feed_lines(&runtime, &["12300,450"]).await;
    server::dispatch_command(&runtime, id_a, "stop").await;

    // Issuer sees the started ack, the stopped ack, then the result.
    let started = parse(&rx_a.recv().await.unwrap());
    assert_eq!(started["status"], "started");
    let stopped = parse(&rx_a.recv().await.unwrap());
    assert_eq!(stopped["status"], "stopped");
    let cal_a = parse(&rx_a.recv().await.unwrap());
    assert_eq!(cal_a["type"], "cal");
    assert_eq!(cal_a["delta"], 450);
    assert_eq!(cal_a["ppl"], 450.0);

    // The other viewer sees only the result.
    let cal_b = parse(&rx_b.recv().await.unwrap());
    assert_eq!(cal_b["type"], "cal");
    assert!(rx_b.try_recv().is_err());

    assert_eq!(device.commands(), vec!['r', 'o', 'c']);
}

#[tokio::test]
async fn test_auto_stop_result_is_broadcast() {
    let (device, runtime) = runtime();
    let (id_a, mut rx_a) = runtime.clients.register().await;
    let (_id_b, mut rx_b) = runtime.clients.register().await;

    server::dispatch_command(&runtime, id_a, r#"{"cmd":"start","pulses":500}"#).await;
    let _ack = rx_a.recv().await.unwrap();

    // Two ticks short of the target, then one at it.
    feed_lines(&runtime, &["1000,250"]).await;
    tick::broadcast_tick(&runtime).await;
    feed_lines(&runtime, &["2000,499"]).await;
    tick::broadcast_tick(&runtime).await;
    feed_lines(&runtime, &["3000,500"]).await;
    tick::broadcast_tick(&runtime).await;

    // Each client got three live frames; the last one precedes the result
    // and reflects the triggering reading.
    for rx in [&mut rx_a, &mut rx_b] {
        for expected_pulses in [250, 499, 500] {
            let live = parse(&rx.recv().await.unwrap());
            assert_eq!(live["type"], "live");
            assert_eq!(live["pulses"], expected_pulses);
        }
        let cal = parse(&rx.recv().await.unwrap());
        assert_eq!(cal["type"], "cal");
        assert_eq!(cal["delta"], 500);
        assert!(cal.get("pps").is_some(), "pulse-armed run reports pps");
    }

    assert_eq!(device.commands(), vec!['r', 'o', 'c']);

    // Target cleared: further ticks produce live frames only.
    feed_lines(&runtime, &["4000,900"]).await;
    tick::broadcast_tick(&runtime).await;
    let after = parse(&rx_a.recv().await.unwrap());
    assert_eq!(after["type"], "live");
    assert!(rx_a.try_recv().is_err());
}

#[tokio::test]
async fn test_wrong_state_and_unknown_commands_stay_silent() {
    let (device, runtime) = runtime();
    let (id, mut rx) = runtime.clients.register().await;

    server::dispatch_command(&runtime, id, "stop").await;
    server::dispatch_command(&runtime, id, "calibrate").await;
    server::dispatch_command(&runtime, id, r#"{"volume":2.0}"#).await;

    assert!(rx.try_recv().is_err(), "no replies for ignored commands");
    assert!(device.commands().is_empty());

    // Start twice: one ack, one silent no-op.
    server::dispatch_command(&runtime, id, "start").await;
    server::dispatch_command(&runtime, id, "start").await;
    assert_eq!(parse(&rx.recv().await.unwrap())["status"], "started");
    assert!(rx.try_recv().is_err());
    assert_eq!(device.commands(), vec!['r', 'o']);
}

#[tokio::test]
async fn test_reset_queues_status_for_next_client() {
    let (device, runtime) = runtime();
    let (id, mut rx) = runtime.clients.register().await;

    server::dispatch_command(&runtime, id, "reset").await;
    assert_eq!(parse(&rx.recv().await.unwrap())["status"], "reset-sent");
    assert_eq!(device.commands(), vec!['r']);

    // The device confirms; the confirmation lands in the backlog for the
    // next client to connect, exactly as it does before any client exists.
    feed_lines(&runtime, &["reset-ack"]).await;
    assert_eq!(
        runtime.backlog.pop().await,
        Some(BridgeEvent::status("counter-reset"))
    );
    assert_eq!(runtime.backlog.pop().await, None);
}

#[tokio::test]
async fn test_reset_zeroes_live_telemetry() {
    let (_device, runtime) = runtime();
    let (id, mut rx) = runtime.clients.register().await;

    feed_lines(&runtime, &["5000,123,42.0"]).await;
    server::dispatch_command(&runtime, id, "reset").await;
    let _ack = rx.recv().await.unwrap();

    tick::broadcast_tick(&runtime).await;
    let live = parse(&rx.recv().await.unwrap());
    assert_eq!(live["millis"], 0);
    assert_eq!(live["pulses"], 0);
    assert!(live.get("weight").is_none(), "weight absent again after reset");
}
