use nav_runtime::{
    Capsule, GroundHeight, MovementFlags, PhysicsInput, Position, Request, Response,
    PROTOCOL_VERSION,
};
use nav_server::{dispatch, handle_frame, StaticWorldEngine, WorldDescription};

fn engine() -> StaticWorldEngine {
    StaticWorldEngine::builtin()
}

fn p(x: f32, y: f32, z: f32) -> Position {
    Position::new(x, y, z)
}

#[test]
fn every_query_kind_is_answered_with_its_own_kind() {
    let engine = engine();
    let requests = vec![
        Request::ComputePath {
            map_id: 0,
            start: p(0.0, 0.0, 0.0),
            end: p(20.0, 0.0, 0.0),
            want_smoothed: true,
        },
        Request::LineOfSight {
            map_id: 0,
            from: p(0.0, 0.0, 1.0),
            to: p(20.0, 0.0, 1.0),
        },
        Request::GroundHeight {
            map_id: 0,
            position: p(11.0, 0.0, 9.0),
            max_search_distance: 20.0,
        },
        Request::PhysicsStep(
            PhysicsInput::new(0, p(0.0, -10.0, 0.0), 0.05).with_flags(MovementFlags::FORWARD),
        ),
        Request::PathDistance {
            map_id: 0,
            start: p(0.0, 0.0, 0.0),
            end: p(5.0, 0.0, 0.0),
        },
        Request::LiquidLevel {
            map_id: 0,
            position: p(-50.0, -50.0, 0.0),
        },
        Request::AreaInfo {
            map_id: 0,
            position: p(0.0, 0.0, 0.0),
        },
        Request::CapsuleOverlap {
            map_id: 0,
            capsule: Capsule {
                bottom: p(0.0, 0.0, 0.0),
                top: p(0.0, 0.0, 2.0),
                radius: 0.5,
            },
        },
    ];

    for request in &requests {
        let response = dispatch(&engine, request);
        assert_eq!(
            response.kind(),
            Some(request.kind()),
            "{request:?} answered with {response:?}"
        );
    }
}

#[test]
fn unknown_map_is_reported_for_every_kind() {
    let engine = engine();
    let requests = [
        Request::ComputePath {
            map_id: 404,
            start: Position::zero(),
            end: p(1.0, 0.0, 0.0),
            want_smoothed: false,
        },
        Request::LineOfSight {
            map_id: 404,
            from: Position::zero(),
            to: p(1.0, 0.0, 0.0),
        },
        Request::GroundHeight {
            map_id: 404,
            position: Position::zero(),
            max_search_distance: 1.0,
        },
        Request::PhysicsStep(PhysicsInput::new(404, Position::zero(), 0.1)),
        Request::AreaInfo {
            map_id: 404,
            position: Position::zero(),
        },
    ];
    for request in &requests {
        assert_eq!(
            dispatch(&engine, request),
            Response::error("unknown map id 404")
        );
    }
}

#[test]
fn line_of_sight_is_stable_and_symmetric() {
    let engine = engine();
    let a = p(-3.0, 2.0, 1.5);
    let b = p(25.0, -1.0, 1.5);
    let forward = Request::LineOfSight {
        map_id: 0,
        from: a,
        to: b,
    };
    let backward = Request::LineOfSight {
        map_id: 0,
        from: b,
        to: a,
    };

    let first = dispatch(&engine, &forward);
    for _ in 0..10 {
        assert_eq!(dispatch(&engine, &forward), first);
    }
    assert_eq!(dispatch(&engine, &backward), first);
}

#[test]
fn path_distance_matches_path_length() {
    let engine = engine();
    let response = dispatch(
        &engine,
        &Request::PathDistance {
            map_id: 0,
            start: p(0.0, 0.0, 0.0),
            end: p(20.0, 0.0, 0.0),
        },
    );
    let Response::PathDistance(distance) = response else {
        panic!("unexpected response {response:?}");
    };
    assert!(distance.found);
    assert!(distance.distance > 20.0);

    let unreachable = dispatch(
        &engine,
        &Request::PathDistance {
            map_id: 0,
            start: p(0.0, 0.0, 0.0),
            end: p(11.0, 0.0, 0.0),
        },
    );
    assert_eq!(
        unreachable,
        Response::PathDistance(nav_runtime::PathDistance::default())
    );
}

#[test]
fn frames_round_trip_through_the_wire_codec() {
    let engine = engine();
    let request = Request::GroundHeight {
        map_id: 0,
        position: p(11.0, 0.0, 9.0),
        max_search_distance: 20.0,
    };
    let frame = request.encode_to_vec().unwrap();
    assert_eq!(
        handle_frame(&engine, &frame),
        Response::GroundHeight(GroundHeight::found(8.0))
    );
}

#[test]
fn wrong_protocol_version_is_rejected() {
    let engine = engine();
    let request = Request::AreaInfo {
        map_id: 0,
        position: Position::zero(),
    };
    let mut envelope = request.to_proto();
    envelope.protocol_version = PROTOCOL_VERSION + 1;
    let frame = prost::Message::encode_to_vec(&envelope);

    match handle_frame(&engine, &frame) {
        Response::Error { message } => assert!(message.contains("malformed request")),
        other => panic!("expected error response, got {other:?}"),
    }
}

#[test]
fn custom_world_without_floor_has_no_ground() {
    let world = WorldDescription::from_json_str(r#"{ "maps": [ { "id": 7, "name": "void" } ] }"#)
        .unwrap();
    let engine = StaticWorldEngine::new(world).unwrap();
    let response = dispatch(
        &engine,
        &Request::GroundHeight {
            map_id: 7,
            position: Position::zero(),
            max_search_distance: 1000.0,
        },
    );
    assert_eq!(response, Response::GroundHeight(GroundHeight::missing()));
}
