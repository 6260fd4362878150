use std::{cell::Cell, f32::consts::PI, rc::Rc};

use cgmath::{InnerSpace, Matrix3, Rad, Rotation, Vector3};
use flow_stage::{
    data_structures::scene_graph::{Shadows, traverse},
    registry::{AssetDescriptor, Euler, LoadStatus, ModelRegistry},
};
use futures::executor::LocalPool;

use crate::common::test_utils::{FakeLoader, RecordingSink, assert_close};

mod common;

fn setup() -> (LocalPool, FakeLoader, RecordingSink, ModelRegistry) {
    let pool = LocalPool::new();
    let loader = FakeLoader::new();
    let sink = RecordingSink::default();
    let registry = ModelRegistry::new(Rc::new(loader.clone()), pool.spawner()).with_sink(sink.clone());
    (pool, loader, sink, registry)
}

#[test]
fn animated_asset_becomes_one_entry_whose_mixer_follows_the_frames() {
    let (mut pool, loader, sink, registry) = setup();
    let ticket = registry.load(AssetDescriptor::new("coca.glb"));
    pool.run_until_stalled();
    assert_eq!(registry.status(ticket), Some(LoadStatus::Pending));
    assert!(registry.is_empty());

    loader.succeed("coca.glb", &[2.0]);
    pool.run_until_stalled();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.status(ticket), Some(LoadStatus::Loaded));

    for _ in 0..10 {
        registry.advance_all(0.25);
    }
    let entry = registry.get(ticket).expect("entry is loaded");
    let mixer = entry.mixer.as_ref().expect("animated assets get a mixer");
    assert_close(mixer.time(), 2.5);
    // 2.5 s into a 2 s clip that repeats
    assert_eq!(mixer.actions().len(), 1);
    assert!(mixer.actions()[0].is_playing());
    assert_close(mixer.actions()[0].time(), 0.5);
    assert!(sink.failures().is_empty());
}

#[test]
fn every_clip_is_played() {
    let (mut pool, loader, _sink, registry) = setup();
    let ticket = registry.load(AssetDescriptor::new("rifa.glb"));
    loader.succeed("rifa.glb", &[1.0, 3.0, 0.5]);
    pool.run_until_stalled();

    let entry = registry.get(ticket).expect("entry is loaded");
    let mixer = entry.mixer.as_ref().expect("animated assets get a mixer");
    assert_eq!(mixer.actions().len(), 3);
    assert!(mixer.actions().iter().all(|a| a.is_playing()));
}

#[test]
fn still_asset_gets_no_mixer_and_a_notice() {
    let (mut pool, loader, sink, registry) = setup();
    let ticket = registry.load(AssetDescriptor::new("still.glb"));
    loader.succeed("still.glb", &[]);
    pool.run_until_stalled();

    assert_eq!(registry.len(), 1);
    assert!(registry.get(ticket).expect("entry is loaded").mixer.is_none());
    assert_eq!(sink.notices(), vec!["No animations found in still.glb".to_string()]);
    assert!(sink.failures().is_empty());

    let before = registry.get(ticket).expect("entry is loaded").model.transform();
    registry.advance_all(1.0);
    let after = registry.get(ticket).expect("entry is loaded").model.transform();
    assert_eq!(before, after);
}

#[test]
fn entries_keep_request_order_when_loads_finish_in_reverse() {
    let (mut pool, loader, _sink, registry) = setup();
    let descriptors = [
        AssetDescriptor::new("coca.glb"),
        AssetDescriptor::new("cj2.glb")
            .with_position(5.0, 1.5, 0.0)
            .with_scale(0.08, 0.08, 0.08)
            .with_rotation(Euler::new(0.0, PI, 0.0)),
        AssetDescriptor::new("rifa.glb")
            .with_position(-5.0, 1.5, 0.0)
            .with_scale(2.0, 2.0, 2.0)
            .with_rotation(Euler::new(0.0, PI / 2.0, 0.0)),
    ];
    let tickets: Vec<_> = descriptors
        .iter()
        .map(|d| registry.load(d.clone()))
        .collect();
    assert_eq!(loader.requested(), vec!["coca.glb", "cj2.glb", "rifa.glb"]);

    for path in ["rifa.glb", "cj2.glb", "coca.glb"] {
        loader.succeed(path, &[1.0]);
        pool.run_until_stalled();
    }
    assert_eq!(registry.len(), 3);

    // (position, scale, where the rotation sends the x axis)
    let placements = [
        ([0.0, 0.0, 0.0], 1.0, [1.0, 0.0, 0.0]),
        ([5.0, 1.5, 0.0], 0.08, [-1.0, 0.0, 0.0]),
        ([-5.0, 1.5, 0.0], 2.0, [0.0, 0.0, -1.0]),
    ];
    let mut seen = Vec::new();
    registry.for_each_entry(|ticket, entry| {
        let placed = entry.model.transform();
        let (position, scale, x_axis) = placements[ticket.index()];
        assert_eq!(placed.position, cgmath::Vector3::from(position));
        assert_eq!(placed.scale, cgmath::Vector3::new(scale, scale, scale));
        let rotated = placed.rotation.rotate_vector(cgmath::Vector3::unit_x());
        assert!(
            (rotated - cgmath::Vector3::from(x_axis)).magnitude() < 1e-5,
            "{} rotates x to {:?}",
            entry.descriptor.path,
            rotated
        );
        seen.push((ticket, entry.descriptor.path.clone()));
    });
    let expected: Vec<_> = tickets
        .iter()
        .copied()
        .zip(descriptors.iter().map(|d| d.path.clone()))
        .collect();
    assert_eq!(seen, expected);

    // every entry got its own mixer
    registry.advance_all(0.5);
    registry.for_each_entry(|_, entry| {
        let mixer = entry.mixer.as_ref().expect("animated assets get a mixer");
        assert_close(mixer.time(), 0.5);
    });
}

#[test]
fn failed_load_is_reported_and_leaves_the_registry_untouched() {
    let (mut pool, loader, sink, registry) = setup();
    let good = registry.load(AssetDescriptor::new("coca.glb"));
    let bad = registry.load(AssetDescriptor::new("missing.glb"));
    loader.fail("missing.glb", "404 Not Found");
    loader.succeed("coca.glb", &[1.0]);
    pool.run_until_stalled();

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.failed(), 1);
    assert_eq!(registry.status(bad), Some(LoadStatus::Failed));
    assert!(registry.get(bad).is_none());
    assert!(registry.get(good).is_some());

    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("missing.glb"), "{}", failures[0]);
    assert!(failures[0].contains("404 Not Found"), "{}", failures[0]);

    registry.advance_all(0.1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn advancing_before_anything_loaded_does_nothing() {
    let (mut pool, loader, sink, registry) = setup();
    registry.advance_all(0.5);

    let ticket = registry.load(AssetDescriptor::new("coca.glb"));
    registry.advance_all(0.5);
    registry.advance_all(0.5);
    assert_eq!(registry.pending(), 1);
    assert!(registry.is_empty());

    loader.succeed("coca.glb", &[1.0]);
    pool.run_until_stalled();
    let entry = registry.get(ticket).expect("entry is loaded");
    let mixer = entry.mixer.as_ref().expect("animated assets get a mixer");
    // frames before completion are not replayed
    assert_close(mixer.time(), 0.0);
    assert!(sink.failures().is_empty());
}

#[test]
fn zero_delta_keeps_playback_where_it_is() {
    let (mut pool, loader, _sink, registry) = setup();
    let ticket = registry.load(AssetDescriptor::new("coca.glb"));
    loader.succeed("coca.glb", &[1.0]);
    pool.run_until_stalled();

    registry.advance_all(0.3);
    for _ in 0..5 {
        registry.advance_all(0.0);
    }
    let entry = registry.get(ticket).expect("entry is loaded");
    let mixer = entry.mixer.as_ref().expect("animated assets get a mixer");
    assert_close(mixer.time(), 0.3);
    assert_close(mixer.actions()[0].time(), 0.3);
}

#[test]
fn callback_runs_once_the_entry_is_published() {
    let (mut pool, loader, _sink, registry) = setup();
    let seen_len = Rc::new(Cell::new(None));
    let seen_in_callback = seen_len.clone();
    let ticket = registry.request_load(
        AssetDescriptor::new("cj2.glb").with_position(5.0, 1.5, 0.0),
        move |registry, ticket| {
            seen_in_callback.set(Some(registry.len()));
            registry
                .with_entry_mut(ticket, |entry| {
                    assert_eq!(entry.model.transform().position, cgmath::Vector3::new(5.0, 1.5, 0.0));
                    entry.model.name = "renamed".to_string();
                })
                .expect("the entry is visible to the callback");
        },
    );
    assert_eq!(seen_len.get(), None);

    loader.succeed("cj2.glb", &[1.0]);
    pool.run_until_stalled();
    assert_eq!(seen_len.get(), Some(1));
    assert_eq!(registry.get(ticket).expect("entry is loaded").model.name, "renamed");

    seen_len.set(None);
    registry.advance_all(0.1);
    assert_eq!(seen_len.get(), None);
}

#[test]
fn callbacks_may_request_more_loads() {
    let (mut pool, loader, _sink, registry) = setup();
    registry.request_load(AssetDescriptor::new("coca.glb"), |registry, _| {
        registry.load(AssetDescriptor::new("rifa.glb"));
    });
    loader.succeed("coca.glb", &[1.0]);
    pool.run_until_stalled();
    assert_eq!(loader.requested(), vec!["coca.glb", "rifa.glb"]);
    assert_eq!(registry.pending(), 1);

    loader.succeed("rifa.glb", &[1.0]);
    pool.run_until_stalled();
    assert_eq!(registry.len(), 2);
}

#[test]
fn callback_is_skipped_for_failed_loads() {
    let (mut pool, loader, _sink, registry) = setup();
    let called = Rc::new(Cell::new(false));
    let called_in_callback = called.clone();
    registry.request_load(AssetDescriptor::new("broken.glb"), move |_, _| {
        called_in_callback.set(true)
    });
    loader.fail("broken.glb", "not a glTF file");
    pool.run_until_stalled();
    assert!(!called.get());
}

#[test]
fn mesh_nodes_cast_and_receive_shadows() {
    let (mut pool, loader, _sink, registry) = setup();
    let ticket = registry.load(AssetDescriptor::new("coca.glb"));
    loader.succeed("coca.glb", &[1.0]);
    pool.run_until_stalled();

    let entry = registry.get(ticket).expect("entry is loaded");
    let mut mesh_nodes = 0;
    traverse(&entry.model.root, cgmath::SquareMatrix::identity(), &mut |node, _| {
        match node.mesh() {
            Some(_) => {
                mesh_nodes += 1;
                assert_eq!(node.shadows(), Some(Shadows::BOTH));
            }
            None => assert_eq!(node.shadows(), None),
        }
    });
    assert_eq!(mesh_nodes, 1);
}

#[test]
fn animation_moves_the_body_node_of_each_entry() {
    let (mut pool, loader, _sink, registry) = setup();
    let ticket = registry.load(AssetDescriptor::new("coca.glb").with_position(0.0, 0.0, 3.0));
    loader.succeed("coca.glb", &[2.0]);
    pool.run_until_stalled();

    registry.advance_all(0.5);
    let entry = registry.get(ticket).expect("entry is loaded");
    let item = &entry.model.draw_items()[0];
    // slide clip at 0.5 s plus the placement offset
    assert_close(item.world.w.x, 0.5);
    assert_close(item.world.w.z, 3.0);
    // placement itself is never animated
    assert_eq!(entry.model.transform().position, cgmath::Vector3::new(0.0, 0.0, 3.0));
}

#[test]
fn entries_can_be_changed_in_place() {
    let (mut pool, loader, _sink, registry) = setup();
    let ticket = registry.load(AssetDescriptor::new("coca.glb"));
    loader.succeed("coca.glb", &[1.0]);
    pool.run_until_stalled();

    let stopped = registry.with_entry_mut(ticket, |entry| {
        let mixer = entry.mixer.as_mut().expect("animated assets get a mixer");
        mixer.clip_action(0).map(|action| action.stop().is_playing())
    });
    assert_eq!(stopped, Some(Some(false)));

    registry.advance_all(0.4);
    let entry = registry.get(ticket).expect("entry is loaded");
    assert_close(entry.mixer.as_ref().expect("mixer").actions()[0].time(), 0.0);
}

#[test]
fn a_shut_down_executor_fails_the_load() {
    let pool = LocalPool::new();
    let spawner = pool.spawner();
    drop(pool);
    let sink = RecordingSink::default();
    let registry = ModelRegistry::new(FakeLoader::new(), spawner).with_sink(sink.clone());

    let ticket = registry.load(AssetDescriptor::new("coca.glb"));
    assert_eq!(registry.status(ticket), Some(LoadStatus::Failed));
    assert_eq!(registry.failed(), 1);
    assert_eq!(sink.failures().len(), 1);
    assert!(sink.failures()[0].contains("coca.glb"), "{}", sink.failures()[0]);
}

#[test]
fn euler_rotation_is_applied_in_radians() {
    let rotation = Euler::new(0.0, PI, 0.0).to_quaternion();
    let x = rotation.rotate_vector(cgmath::Vector3::unit_x());
    assert!((x - cgmath::Vector3::new(-1.0, 0.0, 0.0)).magnitude() < 1e-5);

    let quarter = Euler::from_degrees(0.0, 90.0, 0.0).to_quaternion();
    let z = quarter.rotate_vector(cgmath::Vector3::unit_z());
    assert!((z - cgmath::Vector3::unit_x()).magnitude() < 1e-5);
}

#[test]
fn euler_angles_compose_x_then_y_then_z() {
    let (mut pool, loader, _sink, registry) = setup();
    let ticket = registry.load(
        AssetDescriptor::new("tilted.glb")
            .with_position(1.0, 2.0, 3.0)
            .with_scale(2.0, 2.0, 2.0)
            .with_rotation(Euler::new(0.3, 0.5, 0.7)),
    );
    loader.succeed("tilted.glb", &[]);
    pool.run_until_stalled();

    // intrinsic XYZ: the matrix is Rx * Ry * Rz
    let rotation = Matrix3::from_angle_x(Rad(0.3))
        * Matrix3::from_angle_y(Rad(0.5))
        * Matrix3::from_angle_z(Rad(0.7));
    let reversed = Matrix3::from_angle_z(Rad(0.7))
        * Matrix3::from_angle_y(Rad(0.5))
        * Matrix3::from_angle_x(Rad(0.3));

    let entry = registry.get(ticket).expect("entry is loaded");
    let world = entry.model.transform().to_matrix();
    for axis in [Vector3::unit_x(), Vector3::unit_y(), Vector3::unit_z()] {
        let placed = (world * axis.extend(1.0)).truncate();
        let expected = rotation * (axis * 2.0) + Vector3::new(1.0, 2.0, 3.0);
        assert!((placed - expected).magnitude() < 1e-5, "{:?} vs {:?}", placed, expected);
    }
    let x_image = (world * Vector3::unit_x().extend(0.0)).truncate();
    assert!((x_image - reversed * Vector3::unit_x() * 2.0).magnitude() > 1e-2);
}
