//! Integration tests for lidarviz-visualization
//!
//! These tests drive the frame loop through the headless backend and check
//! the behavior seen by producers on other threads.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use approx::assert_relative_eq;
use lidarviz_core::{Error, Pose, SensorInfo, CALREF, SPEZIA, SPEZIA_N, CALREF_N};
use lidarviz_visualization::*;
use nalgebra::Point3;
use ndarray::{Array1, Array2, Array3};

fn headless() -> (PointViz, FrameProbe, EventQueue) {
    let backend = HeadlessBackend::new(800, 600);
    let probe = backend.probe();
    let events = backend.events();
    (PointViz::new(VizConfig::default(), backend), probe, events)
}

fn wait_for_frames(probe: &FrameProbe, count: u64) {
    while probe.frames() < count {
        thread::yield_now();
    }
}

#[test]
fn test_stop_from_other_thread() {
    let (mut viz, probe, _events) = headless();
    let handle = viz.handle();

    let stopper = thread::spawn(move || {
        wait_for_frames(&probe, 1);
        handle.set_running(false);
        probe.frames()
    });

    viz.run().unwrap();
    let seen = stopper.join().unwrap();
    assert!(!viz.running());
    // only the batch in flight is finished
    assert!(viz.frame_count() <= seen + FRAMES_PER_BATCH as u64);
    assert_eq!(viz.frame_count() % FRAMES_PER_BATCH as u64, 0);
}

#[test]
fn test_interrupt_propagates_as_cancellation() {
    let (mut viz, probe, _events) = headless();
    let interrupt = viz.interrupt_handle();

    let trigger = thread::spawn(move || {
        wait_for_frames(&probe, 1);
        interrupt.trigger();
    });

    let result = viz.run();
    trigger.join().unwrap();
    assert!(matches!(result, Err(Error::Interrupted)));
    assert!(result.is_err_and(|e| e.is_interrupted()));
    assert!(!viz.running());
    assert!(!viz.interrupt_handle().is_triggered());
}

#[test]
fn test_poses_follow_point_index_modulo() {
    let (mut viz, probe, _events) = headless();
    let cloud = Arc::new(Cloud::with_poses(4, 2).unwrap());
    viz.add(&cloud);

    let poses = [Pose::translation(10.0, 0.0, 0.0), Pose::translation(0.0, -10.0, 0.0)];
    cloud.set_column_poses(&poses).unwrap();
    let xyz = Array2::from_shape_vec(
        (4, 3),
        vec![1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
    )
    .unwrap();
    cloud.set_xyz(xyz.view()).unwrap();

    viz.update();
    viz.run_once().unwrap();

    let scene = probe.last_scene().unwrap();
    let frame = &scene.clouds[0];
    assert_relative_eq!(frame.world_point(0), Point3::new(11.0, 0.0, 0.0), epsilon = 1e-9);
    assert_relative_eq!(frame.world_point(1), Point3::new(0.0, -9.0, 0.0), epsilon = 1e-9);
    assert_relative_eq!(frame.world_point(2), Point3::new(10.0, 0.0, 1.0), epsilon = 1e-9);
    assert_relative_eq!(frame.world_point(3), Point3::new(1.0, -9.0, 1.0), epsilon = 1e-9);
}

#[test]
fn test_structured_cloud_from_producer_thread() {
    let (mut viz, probe, _events) = headless();
    let info = SensorInfo::synthetic(16, 4, 30.0);
    let cloud = Arc::new(Cloud::from_sensor(&info).unwrap());
    viz.add(&cloud);

    let handle = viz.handle();
    let producer = {
        let cloud = Arc::clone(&cloud);
        thread::spawn(move || {
            let range = Array2::from_elem((4, 16), 5000u32);
            cloud.set_range(range.view()).unwrap();
            cloud.set_key(Array2::from_elem((4, 16), 0.5f32).view()).unwrap();
            handle.update()
        })
    };
    assert!(producer.join().unwrap());

    viz.run_once().unwrap();
    let scene = probe.last_scene().unwrap();
    for p in scene.clouds[0].world_points() {
        let r = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
        assert_relative_eq!(r, 5.0, epsilon = 1e-4);
    }
}

#[test]
fn test_add_twice_remove_once() {
    let (mut viz, probe, _events) = headless();
    let label = Arc::new(Label::new_2d("status", 0.0, 0.0, false, true));

    assert!(viz.add(&label));
    assert!(!viz.add(&label));
    viz.run_once().unwrap();
    assert_eq!(probe.last_scene().unwrap().labels.len(), 1);

    assert!(viz.remove(&label));
    viz.run_once().unwrap();
    assert!(probe.last_scene().unwrap().is_empty());

    let never_added = Arc::new(Cuboid::new(Pose::identity(), &[1.0, 0.0, 0.0, 1.0]).unwrap());
    assert!(!viz.remove(&never_added));
    assert_eq!(viz.handle().object_count(), 0);
}

#[test]
fn test_scene_keeps_dropped_object_rendered() {
    let (mut viz, probe, _events) = headless();
    {
        let cuboid = Arc::new(Cuboid::new(Pose::identity(), &[0.0, 1.0, 0.0]).unwrap());
        viz.add(cuboid);
    }
    for _ in 0..3 {
        viz.run_once().unwrap();
        assert_eq!(probe.last_scene().unwrap().cuboids[0].rgba, [0.0, 1.0, 0.0, 1.0]);
    }
}

#[test]
fn test_key_handler_overlay_order() {
    let (mut viz, _probe, events) = headless();
    let log = Arc::new(Mutex::new(Vec::new()));

    for (name, pass) in [("first", true), ("second", false), ("third", true)] {
        let log = Arc::clone(&log);
        viz.push_key_handler(Box::new(move |_: &WindowCtx, key: Key, _: Modifiers| {
            log.lock().unwrap().push((name, key));
            pass
        }));
    }

    events.push(InputEvent::Key {
        key: Key::SPACE,
        mods: Modifiers::NONE,
        action: Action::Press,
    });
    viz.run_once().unwrap();

    assert_eq!(*log.lock().unwrap(), vec![("third", Key::SPACE), ("second", Key::SPACE)]);
}

#[test]
fn test_lock_frame_waits_for_batch_boundary() {
    let (mut viz, probe, _events) = headless();
    let handle = viz.handle();
    let cloud = Arc::new(Cloud::new(2).unwrap());
    let cuboid = Arc::new(Cuboid::new(Pose::identity(), &[]).unwrap());
    viz.add(&cloud);
    viz.add(&cuboid);

    let producer = thread::spawn(move || {
        wait_for_frames(&probe, 1);
        {
            let _frame = handle.lock_frame();
            cloud.set_point_size(5.0);
            cuboid.set_rgba(&[1.0, 1.0, 1.0, 1.0]).unwrap();
            handle.update();
            thread::sleep(Duration::from_millis(5));
        }
        wait_for_frames(&probe, probe.frames() + 1);
        handle.set_running(false);
        probe.last_scene().unwrap()
    });

    viz.run().unwrap();
    let scene = producer.join().unwrap();
    assert_eq!(scene.clouds[0].point_size(), 5.0);
    assert_eq!(scene.cuboids[0].rgba, [1.0, 1.0, 1.0, 1.0]);
}

#[test]
fn test_image_placement_echo() {
    let image = Image::from_array(Array2::<f32>::zeros((3, 5)).view()).unwrap();
    image.set_position(-1.0, 1.0, -1.0, 1.0);
    let p = image.position();
    assert_eq!([p.x_min, p.x_max, p.y_min, p.y_max], [-1.0, 1.0, -1.0, 1.0]);
}

#[test]
fn test_cuboid_rgba_rules() {
    let cuboid = Cuboid::new(Pose::identity(), &[1.0, 0.0, 0.0, 1.0]).unwrap();
    cuboid.set_rgba(&[0.2, 0.4, 0.6]).unwrap();
    assert_eq!(cuboid.rgba(), [0.2, 0.4, 0.6, 1.0]);
    assert!(matches!(
        cuboid.set_rgba(&[0.0; 5]),
        Err(Error::SizeMismatch { expected: 4, actual: 5 })
    ));
    assert_eq!(cuboid.rgba(), [0.2, 0.4, 0.6, 1.0]);
}

#[test]
fn test_setters_reject_wrong_sizes_without_writing() {
    let cloud = Cloud::new(6).unwrap();
    cloud.set_key(Array1::from_elem(6, 0.25f32).view()).unwrap();
    cloud.set_mask(Array2::from_elem((6, 4), 0.5f32).view()).unwrap();

    assert!(cloud.set_key(Array1::<f32>::zeros(5).view()).is_err());
    assert!(cloud.set_mask(Array2::<f32>::zeros((6, 3)).view()).is_err());
    assert!(cloud.set_xyz(Array2::<f32>::zeros((6, 2)).view()).is_err());
    assert!(cloud.set_palette(Array2::<f32>::zeros((4, 2)).view()).is_err());
    assert!(cloud.set_column_poses(&[Pose::identity(); 5]).is_err());

    let frame = cloud.snapshot();
    assert!(frame.key().iter().all(|k| *k == 0.25));
    assert!(frame.mask().iter().all(|m| *m == 0.5));
    assert_eq!(frame.palette(), &*SPEZIA);

    let image = Image::from_array(Array2::<f32>::zeros((3, 5)).view()).unwrap();
    assert!(image.set_mask(Array3::<f32>::zeros((3, 5, 2)).view()).is_err());
    assert_eq!(image.size(), (5, 3));
}

#[test]
fn test_builtin_palettes() {
    assert_eq!(SPEZIA.len(), SPEZIA_N);
    assert_eq!(CALREF.len(), CALREF_N);
    let cloud = Cloud::new(1).unwrap();
    cloud.set_palette_table(CALREF.clone());
    assert_eq!(cloud.snapshot().palette().len(), CALREF_N);
}
