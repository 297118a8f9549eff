mod common;

use std::sync::Arc;

use common::{capture_logs, ScriptedTransport};
use nav_client::{dead_reckon, ClientError, FailureState, PathfindingClient, TransportError};
use nav_runtime::{
    EnvelopeDecodeError, MovementFlags, PhysicsInput, PhysicsOutput, Position, QueryKind,
    Response,
};

const DEGRADED_LINE: &str = "entering degraded mode";
const INDIVIDUAL_LINE: &str = "physics_step.transport_failed";

fn walking_input() -> PhysicsInput {
    PhysicsInput::new(0, Position::new(10.0, 10.0, 5.0), 0.1)
        .with_flags(MovementFlags::FORWARD)
        .with_facing(0.0)
}

fn engine_output() -> PhysicsOutput {
    PhysicsOutput {
        position: Position::new(10.7, 10.0, 5.0),
        velocity: Position::new(7.0, 0.0, 0.0),
        movement_flags: MovementFlags::FORWARD,
        orientation: 0.0,
        pitch: 0.0,
        fall_time: 0.0,
    }
}

#[test]
fn transport_failures_fall_back_to_dead_reckoning() {
    let mut client = PathfindingClient::new(ScriptedTransport::new().fail(1));
    let input = walking_input();

    let output = client
        .physics_step(&input)
        .expect("transport failure must not surface from physics_step");

    assert_eq!(output, dead_reckon(&input));
    assert_eq!(client.consecutive_failures(), 1);
    assert!(!client.is_available());
}

#[test]
fn escalation_logs_three_warnings_then_one_degraded_line() {
    let mut client = PathfindingClient::new(ScriptedTransport::new().fail(10));
    let input = walking_input();

    let ((), logs) = capture_logs(|| {
        for _ in 0..4 {
            client.physics_step(&input).unwrap();
        }
    });
    assert_eq!(logs.count_containing(INDIVIDUAL_LINE), 3);
    assert_eq!(logs.count_containing(DEGRADED_LINE), 1);
    assert_eq!(logs.events().len(), 4);
    assert!(logs
        .events()
        .iter()
        .all(|event| event.level == tracing::Level::WARN));

    let ((), quiet) = capture_logs(|| {
        for _ in 0..6 {
            client.physics_step(&input).unwrap();
        }
    });
    assert!(
        quiet.events().is_empty(),
        "failures past the threshold must be silent, got {:?}",
        quiet.events()
    );
    assert_eq!(client.consecutive_failures(), 10);
}

#[test]
fn first_success_resets_silently_and_rearms_degraded_notice() {
    let mut transport = ScriptedTransport::new().fail(5);
    transport.push(Ok(Response::PhysicsStep(engine_output())));
    let transport = transport.fail(4);
    let mut client = PathfindingClient::new(transport);
    let input = walking_input();

    let ((), first_streak) = capture_logs(|| {
        for _ in 0..5 {
            client.physics_step(&input).unwrap();
        }
    });
    assert_eq!(first_streak.count_containing(DEGRADED_LINE), 1);

    let (output, recovery) = capture_logs(|| client.physics_step(&input).unwrap());
    assert_eq!(output, engine_output());
    assert!(recovery.events().is_empty());
    assert!(client.is_available());
    assert_eq!(client.consecutive_failures(), 0);

    let ((), second_streak) = capture_logs(|| {
        for _ in 0..4 {
            client.physics_step(&input).unwrap();
        }
    });
    assert_eq!(second_streak.count_containing(INDIVIDUAL_LINE), 3);
    assert_eq!(second_streak.count_containing(DEGRADED_LINE), 1);
}

#[test]
fn protocol_error_on_physics_step_propagates() {
    let transport = ScriptedTransport::new().respond(Response::error("unknown map id 77"));
    let mut client = PathfindingClient::new(transport);

    let (result, logs) = capture_logs(|| client.physics_step(&walking_input()));
    match result {
        Err(ClientError::Protocol { kind, message }) => {
            assert_eq!(kind, QueryKind::PhysicsStep);
            assert!(message.contains("unknown map id 77"));
        }
        other => panic!("expected protocol error, got {other:?}"),
    }
    assert_eq!(client.consecutive_failures(), 1);
    assert_eq!(logs.count_containing(DEGRADED_LINE), 0);
}

#[test]
fn wrong_response_kind_is_a_failure() {
    let transport = ScriptedTransport::new().respond(Response::LineOfSight {
        in_line_of_sight: true,
    });
    let mut client = PathfindingClient::new(transport);

    let err = client.physics_step(&walking_input()).unwrap_err();
    assert!(matches!(
        err,
        ClientError::UnexpectedResponse {
            kind: QueryKind::PhysicsStep,
            actual: QueryKind::LineOfSight
        }
    ));
    assert!(!client.is_available());
}

#[test]
fn invalid_input_never_reaches_the_wire() {
    let mut client = PathfindingClient::new(ScriptedTransport::new());
    let mut input = walking_input();
    input.delta_time = 0.0;

    let err = client.physics_step(&input).unwrap_err();
    assert!(matches!(err, ClientError::InvalidInput(_)));
    assert!(client.transport().sent.is_empty());
    assert!(client.is_available());
}

#[test]
fn undecodable_physics_reply_is_not_dead_reckoned() {
    let mut transport = ScriptedTransport::new();
    transport.push(Err(TransportError::Decode(
        EnvelopeDecodeError::VersionMismatch {
            expected: 1,
            found: 2,
        },
    )));
    let mut client = PathfindingClient::new(transport);

    let (result, logs) = capture_logs(|| client.physics_step(&walking_input()));
    match result {
        Err(ClientError::Protocol { kind, message }) => {
            assert_eq!(kind, QueryKind::PhysicsStep);
            assert!(message.contains("version"), "message {message}");
        }
        other => panic!("expected protocol error, got {other:?}"),
    }
    assert!(!client.failure_state().is_degraded());
    assert_eq!(client.consecutive_failures(), 1);
    assert_eq!(logs.count_containing(INDIVIDUAL_LINE), 0);
    assert_eq!(logs.count_containing(DEGRADED_LINE), 0);
}

#[test]
fn unreachable_errors_are_told_apart_from_codec_errors() {
    assert!(TransportError::Closed.is_unreachable());
    assert!(TransportError::Unresolved("nowhere:1".into()).is_unreachable());
    assert!(!TransportError::Decode(EnvelopeDecodeError::MissingPayload).is_unreachable());
}

#[test]
fn independent_clients_do_not_share_streaks() {
    let mut failing = PathfindingClient::new(ScriptedTransport::new().fail(6));
    let mut healthy = PathfindingClient::new(
        ScriptedTransport::new().respond(Response::PhysicsStep(engine_output())),
    );
    let input = walking_input();

    for _ in 0..6 {
        failing.physics_step(&input).unwrap();
    }
    assert!(!failing.is_available());
    assert!(healthy.is_available());

    healthy.physics_step(&input).unwrap();
    assert!(healthy.is_available());
    assert_eq!(failing.consecutive_failures(), 6);
}

#[test]
fn injected_state_is_shared_explicitly() {
    let shared = Arc::new(FailureState::new());
    let mut first =
        PathfindingClient::with_failure_state(ScriptedTransport::new().fail(2), shared.clone());
    let mut second = PathfindingClient::with_failure_state(
        ScriptedTransport::new().respond(Response::PhysicsStep(engine_output())),
        shared.clone(),
    );
    let input = walking_input();

    first.physics_step(&input).unwrap();
    first.physics_step(&input).unwrap();
    assert_eq!(second.consecutive_failures(), 2);

    second.physics_step(&input).unwrap();
    assert!(first.is_available());
    assert_eq!(shared.consecutive_failures(), 0);
}
