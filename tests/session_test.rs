//! Integration tests for the session lifecycle over the mock platform.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use launcher_link::link::{
    BondState, CommandFrame, CommandState, DeviceHandle, MockPlatform, ProtocolVariant, Session,
    Telemetry, SERIAL_PORT_UUID,
};

const TICK: Duration = Duration::from_millis(10);
const WAIT: Duration = Duration::from_secs(2);

fn device() -> DeviceHandle {
    DeviceHandle {
        address: "AA:BB:CC:DD:EE:FF".to_string(),
        name: "Launcher".to_string(),
    }
}

struct Callbacks {
    telemetry: mpsc::UnboundedReceiver<Telemetry>,
    completions: mpsc::UnboundedReceiver<bool>,
}

fn connect(platform: &Arc<MockPlatform>, variant: ProtocolVariant) -> (Session, Callbacks) {
    let (telemetry_tx, telemetry) = mpsc::unbounded_channel();
    let (done_tx, completions) = mpsc::unbounded_channel();
    let session = Session::connect(
        platform.clone(),
        device(),
        variant,
        move |frame| {
            let _ = telemetry_tx.send(frame);
        },
        move |failed| {
            let _ = done_tx.send(failed);
        },
    );
    (session, Callbacks { telemetry, completions })
}

async fn next_completion(callbacks: &mut Callbacks) -> bool {
    timeout(WAIT, callbacks.completions.recv())
        .await
        .expect("completion timed out")
        .expect("completion channel closed")
}

async fn next_telemetry(callbacks: &mut Callbacks) -> Telemetry {
    timeout(WAIT, callbacks.telemetry.recv())
        .await
        .expect("telemetry timed out")
        .expect("telemetry channel closed")
}

async fn wait_host(platform: &MockPlatform) -> DuplexStream {
    timeout(WAIT, async {
        loop {
            if let Some(host) = platform.take_host() {
                return host;
            }
            sleep(TICK).await;
        }
    })
    .await
    .expect("transport never opened")
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            sleep(TICK).await;
        }
    })
    .await
    .expect("condition timed out")
}

#[tokio::test]
async fn test_connects_immediately_when_already_bonded() {
    let platform = Arc::new(MockPlatform::bonded());
    let (session, mut callbacks) = connect(&platform, ProtocolVariant::current());

    assert!(!next_completion(&mut callbacks).await);
    assert_eq!(platform.bond_requests(), 0);
    assert!(platform.discovery_cancelled());
    assert_eq!(platform.opened(), vec![SERIAL_PORT_UUID]);

    session.close().await;
}

#[tokio::test]
async fn test_bonds_then_connects() {
    let platform = Arc::new(MockPlatform::unbonded());
    let (session, mut callbacks) = connect(&platform, ProtocolVariant::current());

    wait_until(|| platform.bond_requests() == 1).await;
    platform.emit_bond(BondState::Bonding, BondState::Bonded).await;

    assert!(!next_completion(&mut callbacks).await);
    assert_eq!(platform.opened().len(), 1);

    session.close().await;
}

#[tokio::test]
async fn test_bond_rejection_fails_without_opening_transport() {
    let platform = Arc::new(MockPlatform::unbonded());
    let (session, mut callbacks) = connect(&platform, ProtocolVariant::current());

    wait_until(|| platform.bond_requests() == 1).await;
    platform
        .emit_bond(BondState::Bonding, BondState::NotBonded)
        .await;

    assert!(next_completion(&mut callbacks).await);
    assert!(platform.opened().is_empty());
    assert!(session.closed().await);
}

#[tokio::test]
async fn test_refused_connect_delivers_failure() {
    let platform = Arc::new(MockPlatform::bonded());
    platform.refuse_connect();
    let (session, mut callbacks) = connect(&platform, ProtocolVariant::current());

    assert!(next_completion(&mut callbacks).await);
    assert!(session.closed().await);
}

#[tokio::test]
async fn test_write_order_is_preserved() {
    let platform = Arc::new(MockPlatform::bonded());
    let (session, mut callbacks) = connect(&platform, ProtocolVariant::current());
    assert!(!next_completion(&mut callbacks).await);
    let mut host = wait_host(&platform).await;

    session.send(&CommandFrame::new(vec![1, 2, 3]));
    session.send(&CommandFrame::new(vec![4, 5]));

    let mut buf = [0u8; 5];
    timeout(WAIT, host.read_exact(&mut buf))
        .await
        .expect("read timed out")
        .expect("read failed");
    assert_eq!(buf, [1, 2, 3, 4, 5]);

    session.close().await;
}

#[tokio::test]
async fn test_encoded_state_reaches_the_wire() {
    let platform = Arc::new(MockPlatform::bonded());
    let (session, mut callbacks) = connect(&platform, ProtocolVariant::current());
    assert!(!next_completion(&mut callbacks).await);
    let mut host = wait_host(&platform).await;

    session.send_state(&CommandState {
        left_motor: 10,
        right_motor: 20,
        servo_horizontal: 5,
        servo_vertical: 6,
        stepper_delay: 300,
        stepper_position: 300.4,
    });

    let mut buf = [0u8; 8];
    timeout(WAIT, host.read_exact(&mut buf))
        .await
        .expect("read timed out")
        .expect("read failed");
    assert_eq!(buf, [10, 20, 5, 6, 44, 1, 44, 1]);

    session.close().await;
}

#[tokio::test]
async fn test_telemetry_decoded_across_chunk_boundaries() {
    let platform = Arc::new(MockPlatform::bonded());
    let (session, mut callbacks) = connect(&platform, ProtocolVariant::current());
    assert!(!next_completion(&mut callbacks).await);
    let mut host = wait_host(&platform).await;

    // One and a half frames, then the missing byte.
    host.write_all(&[0, 100, 0, 1, 44]).await.unwrap();
    host.flush().await.unwrap();
    assert_eq!(next_telemetry(&mut callbacks).await, Telemetry::Speed(100));

    host.write_all(&[1]).await.unwrap();
    host.flush().await.unwrap();
    assert_eq!(
        next_telemetry(&mut callbacks).await,
        Telemetry::StepperPosition(300)
    );

    session.close().await;
}

#[tokio::test]
async fn test_legacy_variant_uses_advertised_service_and_per_byte_delivery() {
    let platform = Arc::new(MockPlatform::bonded());
    platform.set_services(vec![SERIAL_PORT_UUID]);
    let (session, mut callbacks) = connect(&platform, ProtocolVariant::legacy());
    assert!(!next_completion(&mut callbacks).await);
    assert_eq!(platform.opened(), vec![SERIAL_PORT_UUID]);
    let mut host = wait_host(&platform).await;

    host.write_all(&[0, 1]).await.unwrap();
    host.flush().await.unwrap();

    assert_eq!(next_telemetry(&mut callbacks).await, Telemetry::Speed(0));
    assert_eq!(
        next_telemetry(&mut callbacks).await,
        Telemetry::StepperPosition(0)
    );

    session.close().await;
}

#[tokio::test]
async fn test_missing_advertisement_fails_the_session() {
    let platform = Arc::new(MockPlatform::bonded());
    let (session, mut callbacks) = connect(&platform, ProtocolVariant::legacy());

    assert!(next_completion(&mut callbacks).await);
    assert!(platform.opened().is_empty());
    assert!(session.closed().await);
}

#[tokio::test]
async fn test_close_is_idempotent_with_a_single_completion() {
    let platform = Arc::new(MockPlatform::bonded());
    let (session, mut callbacks) = connect(&platform, ProtocolVariant::current());
    assert!(!next_completion(&mut callbacks).await);

    session.close().await;
    session.close().await;

    assert!(session.is_closed());
    // Clean close, and no second completion signal.
    assert!(!session.closed().await);
    assert!(callbacks.completions.try_recv().is_err());
}

#[tokio::test]
async fn test_reader_eof_terminates_the_session() {
    let platform = Arc::new(MockPlatform::bonded());
    let (session, mut callbacks) = connect(&platform, ProtocolVariant::current());
    assert!(!next_completion(&mut callbacks).await);
    let host = wait_host(&platform).await;

    drop(host);

    // Terminates as failed; the one-shot completion stays consumed.
    assert!(timeout(WAIT, session.closed()).await.expect("never closed"));
    assert!(callbacks.completions.try_recv().is_err());
}

#[tokio::test]
async fn test_fault_racing_close_still_tears_down_once() {
    let platform = Arc::new(MockPlatform::bonded());
    let (session, mut callbacks) = connect(&platform, ProtocolVariant::current());
    assert!(!next_completion(&mut callbacks).await);
    let host = wait_host(&platform).await;

    drop(host);
    session.close().await;

    assert!(session.is_closed());
    assert!(callbacks.completions.try_recv().is_err());
}

#[tokio::test]
async fn test_close_during_bonding_is_abandonment_not_failure() {
    let platform = Arc::new(MockPlatform::unbonded());
    let (session, mut callbacks) = connect(&platform, ProtocolVariant::current());

    wait_until(|| platform.bond_requests() == 1).await;
    session.close().await;

    assert!(platform.opened().is_empty());
    // No completion at all for an abandoned session.
    assert!(callbacks.completions.try_recv().is_err());
}

#[tokio::test]
async fn test_dropping_the_last_handle_shuts_the_transport() {
    let platform = Arc::new(MockPlatform::bonded());
    let (session, mut callbacks) = connect(&platform, ProtocolVariant::current());
    assert!(!next_completion(&mut callbacks).await);
    let mut host = wait_host(&platform).await;

    drop(session);

    let mut buf = [0u8; 1];
    let read = timeout(WAIT, host.read(&mut buf))
        .await
        .expect("read timed out")
        .expect("read failed");
    assert_eq!(read, 0);
}
