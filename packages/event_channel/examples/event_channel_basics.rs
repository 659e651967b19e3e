//! Example demonstrating the subscription lifecycle of event channels.
//!
//! A small camera rig exposes channels that a renderer and a status line subscribe to.

use std::cell::Cell;
use std::rc::Rc;

use event_channel::{Error, EventChannel, on_any, once_first};

struct CameraRig {
    moved: EventChannel<(f32, f32)>,
    zoomed: EventChannel<f32>,
    animation_finished: EventChannel<()>,
    animation_interrupted: EventChannel<()>,
}

impl CameraRig {
    fn new() -> Self {
        Self {
            moved: EventChannel::with_label("camera_moved"),
            zoomed: EventChannel::with_label("camera_zoomed"),
            animation_finished: EventChannel::with_label("animation_finished"),
            animation_interrupted: EventChannel::with_label("animation_interrupted"),
        }
    }
}

fn main() -> Result<(), Error> {
    println!("=== Event Channel Example ===");

    let rig = CameraRig::new();

    // Example 1: Persistent listener
    println!("\n1. Persistent listener:");
    let position = rig.moved.subscribe(|(x, y): &(f32, f32)| {
        println!("Camera moved to ({x}, {y})");
    });
    rig.moved.emit((1.0, 2.0))?;
    rig.moved.emit((3.0, 4.0))?;
    position.destroy()?;

    // Example 2: Destroying twice is reported
    println!("\n2. Destroying twice:");
    match position.destroy() {
        Ok(()) => println!("Unexpectedly destroyed twice"),
        Err(error) => println!("Second destroy failed: {error}"),
    }

    // Example 3: Once listener
    println!("\n3. Once listener:");
    let _first_zoom = rig.zoomed.subscribe_once(|level: &f32| {
        println!("First zoom to {level}x");
    });
    rig.zoomed.emit(2.0)?;
    rig.zoomed.emit(4.0)?;
    println!("Listeners left on zoomed: {}", rig.zoomed.listener_count());

    // Example 4: Redraw whenever anything changes
    println!("\n4. Listening to several channels:");
    let redraws = Rc::new(Cell::new(0_u32));
    let redraw = on_any(
        {
            let redraws = Rc::clone(&redraws);
            move |_: &()| redraws.set(redraws.get() + 1)
        },
        &[&rig.animation_finished, &rig.animation_interrupted],
    );
    rig.animation_finished.emit(())?;
    rig.animation_interrupted.emit(())?;
    println!("Redraws: {}", redraws.get());
    redraw.destroy()?;

    // Example 5: Whichever happens first
    println!("\n5. Whichever channel emits first:");
    let settled = once_first(
        |_: &()| println!("Animation settled"),
        &[&rig.animation_finished, &rig.animation_interrupted],
    );
    rig.animation_interrupted.emit(())?;
    rig.animation_finished.emit(())?;
    println!("Triggered by channel #{:?}", settled.triggered_by());

    println!("\n=== Example completed ===");

    Ok(())
}
