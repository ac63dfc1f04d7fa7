//! easel Message Loop Example
//!
//! Opens an 800x600 window and reacts to input:
//! - Any key prints its code
//! - Escape quits
//! - Space clears the window to white
//! - Left click draws a red circle at the cursor
//! - Timer 1 (every 500 ms) clears to a random color
//!
//! Run with: cargo run -p easel --example message_loop
//!
//! Set `EASEL_HEADLESS=1` to run without a display. A scripted input thread
//! then plays a short session and closes the window.

use std::thread;
use std::time::Duration;

use easel::prelude::*;
use easel::{HeadlessBackend, HeadlessController};
use rand::Rng;
use tracing_subscriber::EnvFilter;

const BLINK_TIMER: TimerId = TimerId(1);

fn random_color(rng: &mut impl Rng) -> Color {
    Color::rgb(rng.r#gen(), rng.r#gen(), rng.r#gen())
}

/// Play a few inputs against a headless session, then close its window.
fn script(native: HeadlessController) {
    let pause = || thread::sleep(Duration::from_millis(300));

    pause();
    native.key_down(KeyCode::Char('H'), Modifiers::NONE);
    native.click(MouseButton::Left, 200, 150);
    pause();
    native.key_down(KeyCode::Space, Modifiers::NONE);
    native.click(MouseButton::Left, 400, 300);
    pause();
    native.request_close();
}

fn run(mut host: Host, headless: Option<HeadlessBackend>) -> Result<(), HostError> {
    host.init(HostConfig::new("easel message loop", 800, 600))?;
    host.set_timer(BLINK_TIMER, Duration::from_millis(500))?;

    host.fill_rect(20, 20, 200, 100, Color::LIGHT_BLUE)?;
    host.draw_text("Click, type, or press Escape", 30, 60, 18.0, Color::BLACK)?;

    let scripted = headless
        .and_then(|backend| backend.controller())
        .map(|native| thread::spawn(move || script(native)));

    let mut rng = rand::thread_rng();
    while let Some(event) = host.get_message()? {
        let drawn = match event.kind() {
            EventKind::KeyDown => {
                let Some(key) = event.as_key() else { continue };
                println!("key down: {:?}", key.key);
                match key.key {
                    KeyCode::Escape => break,
                    KeyCode::Space => host.clear(Color::WHITE),
                    _ => Ok(()),
                }
            }
            EventKind::LeftButtonDown => match event.as_mouse() {
                Some(mouse) => host.fill_circle(mouse.x, mouse.y, 20, Color::RED),
                None => Ok(()),
            },
            EventKind::Timer => host.clear(random_color(&mut rng)),
            EventKind::Close => break,
            _ => Ok(()),
        };
        match drawn {
            // The window closed while this event was still queued.
            Err(HostError::NotInitialized) => break,
            other => other?,
        }
    }

    host.kill_timer(BLINK_TIMER)?;
    host.close()?;

    if let Some(scripted) = scripted {
        let _ = scripted.join();
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let headless = std::env::var("EASEL_HEADLESS").is_ok_and(|v| v == "1");
    let result = if headless {
        let backend = HeadlessBackend::new();
        run(Host::with_backend(backend.clone()), Some(backend))
    } else {
        run(Host::new(), None)
    };

    if let Err(e) = result {
        eprintln!("easel: {e}");
        std::process::exit(1);
    }
}
