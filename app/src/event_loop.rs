use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::prelude::*;

use crate::{GameView, PointerEvent};

/// Period of the clock and long-press timer.
pub const TICK: Duration = Duration::from_millis(100);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Pointer(PointerEvent),
    Tick,
    Quit,
}

/// Background thread feeding [`Event::Tick`] into a loop until dropped.
#[derive(Debug)]
pub struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(sender: Sender<Event>, period: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::spawn({
            let stop = Arc::clone(&stop);
            move || {
                while !stop.load(Ordering::Relaxed) {
                    thread::sleep(period);
                    if sender.send(Event::Tick).is_err() {
                        break;
                    }
                }
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Ticker thread panicked");
            }
        }
    }
}

/// Press, wait `hold`, release.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Gesture {
    pub down: PointerEvent,
    pub up: PointerEvent,
    pub hold: Duration,
}

/// Plays `gestures` in real time on its own thread, `pace` apart, then sends [`Event::Quit`].
///
/// Ticks from a [`Ticker`] interleave with the gestures, so the clock advances and holds turn
/// into long presses just as they would for a player.
pub fn spawn_script(sender: Sender<Event>, gestures: Vec<Gesture>, pace: Duration) -> JoinHandle<()> {
    thread::spawn(move || {
        for gesture in gestures {
            thread::sleep(pace);
            if sender.send(Event::Pointer(gesture.down)).is_err() {
                return;
            }
            thread::sleep(gesture.hold);
            if sender.send(Event::Pointer(gesture.up)).is_err() {
                return;
            }
        }
        thread::sleep(pace);
        // the loop may already be gone, nothing left to tell it then
        let _ = sender.send(Event::Quit);
    })
}

/// Single-threaded owner of the view. Other threads talk to it only through [`Event`]s.
pub struct GameLoop {
    view: GameView,
    sender: Sender<Event>,
    events: Receiver<Event>,
}

impl GameLoop {
    pub fn new(view: GameView) -> Self {
        let (sender, events) = mpsc::channel();
        Self {
            view,
            sender,
            events,
        }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.sender.clone()
    }

    pub fn view(&self) -> &GameView {
        &self.view
    }

    pub fn into_view(self) -> GameView {
        self.view
    }

    /// Handles events until [`Event::Quit`], reading the time from `clock` for each one.
    ///
    /// Returns how many pointer events were dispatched.
    pub fn run(&mut self, mut clock: impl FnMut() -> DateTime<Utc>) -> usize {
        let mut dispatched = 0;
        while let Ok(event) = self.events.recv() {
            match event {
                Event::Pointer(pointer) => {
                    self.view.dispatch(pointer, clock());
                    dispatched += 1;
                }
                Event::Tick => self.view.tick(clock()),
                Event::Quit => break,
            }
        }
        log::debug!("Event loop done after {} pointer events", dispatched);
        dispatched
    }
}
