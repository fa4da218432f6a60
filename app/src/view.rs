use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use chrono::prelude::*;
use pixmines_core::{ButtonFace, Coord2, from_linear_index, linear_index};
use pixmines_stage::{Clip, ClipHandle, Movie, PointerInput, Raster, StageError};

use crate::GameSession;
use crate::skin::{self, Icon};

/// Clips the view updates every frame, resolved once after the movie is built.
#[derive(Clone, Debug)]
pub struct ClipCache {
    pub button: ClipHandle,
    pub bombs: Vec<ClipHandle>,
    pub time: Vec<ClipHandle>,
    /// One per cell, row-major.
    pub icons: Vec<ClipHandle>,
}

impl ClipCache {
    pub fn resolve(movie: &Movie, size: Coord2) -> Result<Self, StageError> {
        let icons = movie.locate_all(skin::SCENE, skin::LAYER, skin::ICONS)?;
        let cells = size.0 as usize * size.1 as usize;
        if icons.len() < cells {
            return Err(StageError::ClipNotFound {
                clip: skin::ICONS.to_owned(),
                occurrence: icons.len(),
            });
        }

        Ok(Self {
            button: movie.locate(skin::SCENE, skin::LAYER, skin::BUTTON, 0)?,
            bombs: movie.locate_all(skin::SCENE, skin::LAYER, skin::BOMBS)?,
            time: movie.locate_all(skin::SCENE, skin::LAYER, skin::TIME)?,
            icons,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Up,
    Move,
    Leave,
}

/// Raw pointer event in screen pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub x: i32,
    pub y: i32,
    pub input: PointerInput,
}

impl PointerEvent {
    pub const fn new(kind: PointerKind, (x, y): (i32, i32), input: PointerInput) -> Self {
        Self { kind, x, y, input }
    }
}

#[derive(Clone, Debug)]
struct Held {
    target: ClipHandle,
    input: PointerInput,
    ticks: u32,
}

/// Binds a built [`Movie`] to a [`GameSession`].
///
/// Clip callbacks only touch the session; frames are pushed into the movie afterwards by
/// [`GameView::sync`], so no callback ever needs the movie itself.
pub struct GameView {
    movie: Movie,
    cache: ClipCache,
    session: Rc<RefCell<GameSession>>,
    clock: Rc<Cell<DateTime<Utc>>>,
    hold_ticks: u32,
    held: Option<Held>,
    hover: Option<ClipHandle>,
}

impl GameView {
    pub fn new(movie: Movie, session: GameSession, hold_ticks: u32) -> Result<Self, StageError> {
        let cache = ClipCache::resolve(&movie, session.board().size())?;
        let mut view = Self {
            movie,
            cache,
            session: Rc::new(RefCell::new(session)),
            clock: Rc::new(Cell::new(DateTime::<Utc>::MIN_UTC)),
            hold_ticks: hold_ticks.max(1),
            held: None,
            hover: None,
        };
        view.wire_button();
        view.wire_icons();
        Ok(view)
    }

    pub fn movie(&self) -> &Movie {
        &self.movie
    }

    pub fn session(&self) -> Ref<'_, GameSession> {
        self.session.borrow()
    }

    pub fn render(&self) -> Raster {
        self.movie.render()
    }

    /// Screen position of the middle of the cell at `coords`.
    pub fn cell_center(&self, coords: Coord2) -> Option<(i32, i32)> {
        let size = self.session.borrow().board().size();
        if coords.0 >= size.0 || coords.1 >= size.1 {
            return None;
        }
        let handle = self.cache.icons.get(linear_index(coords, size))?;
        let bounds = self.movie.clip(handle)?.bounds();
        Some((
            bounds.x + bounds.width as i32 / 2,
            bounds.y + bounds.height as i32 / 2,
        ))
    }

    fn wire_button(&mut self) {
        let Some(button) = self.movie.clip_mut(&self.cache.button) else {
            return;
        };

        let session = Rc::clone(&self.session);
        button.on_press(move |_| session.borrow_mut().press_button());
        button.on_release(restart_when_pressed(&self.session));
        button.on_release_outside(restart_when_pressed(&self.session));
    }

    fn wire_icons(&mut self) {
        let size = self.session.borrow().board().size();

        for (index, handle) in self.cache.icons.iter().enumerate() {
            let Some(icon) = self.movie.clip_mut(handle) else {
                continue;
            };
            let coords = from_linear_index(index, size);

            let (session, clock) = (Rc::clone(&self.session), Rc::clone(&self.clock));
            icon.on_press(move |input| {
                let mut session = session.borrow_mut();
                if input.is_alternate() {
                    session.alternate(coords, clock.get());
                } else {
                    session.press(coords);
                }
            });

            let (session, clock) = (Rc::clone(&self.session), Rc::clone(&self.clock));
            icon.on_long_press(move |_| {
                let mut session = session.borrow_mut();
                session.alternate(coords, clock.get());
                session.release_press();
            });

            let (session, clock) = (Rc::clone(&self.session), Rc::clone(&self.clock));
            icon.on_release(move |_| {
                let mut session = session.borrow_mut();
                let pressed = session.board().cell_at(coords).pressed;
                session.release_press();
                if pressed {
                    session.primary(coords, clock.get());
                }
            });

            let session = Rc::clone(&self.session);
            icon.on_release_outside(move |_| session.borrow_mut().release_press());
        }
    }

    /// Routes a pointer event to the clip under it, then refreshes the frames.
    pub fn dispatch(&mut self, event: PointerEvent, now: DateTime<Utc>) {
        self.clock.set(now);
        let target = self.movie.hit_test(event.x, event.y);
        log::trace!("{:?} at ({}, {}) on {:?}", event.kind, event.x, event.y, target);

        match event.kind {
            PointerKind::Down => {
                if let Some(target) = target {
                    self.with_clip(&target, |clip| clip.press(event.input));
                    self.held = Some(Held {
                        target,
                        input: event.input,
                        ticks: 0,
                    });
                }
            }
            PointerKind::Up => {
                if let Some(held) = self.held.take() {
                    if target.as_ref() == Some(&held.target) {
                        self.with_clip(&held.target, |clip| clip.release(event.input));
                    } else {
                        self.with_clip(&held.target, |clip| clip.release_outside(event.input));
                    }
                }
            }
            PointerKind::Move => {
                if self.hover != target {
                    if let Some(previous) = self.hover.take() {
                        self.with_clip(&previous, |clip| clip.leave());
                    }
                    if let Some(next) = &target {
                        self.with_clip(next, |clip| clip.enter(event.input));
                    }
                    self.hover = target;
                }
                if let Some(hover) = self.hover.clone() {
                    self.with_clip(&hover, |clip| clip.hover(event.input));
                }
            }
            PointerKind::Leave => {
                if let Some(previous) = self.hover.take() {
                    self.with_clip(&previous, |clip| clip.leave());
                }
            }
        }

        self.sync(now);
    }

    /// Periodic update: advances the long-press timer and refreshes the clock digits.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.clock.set(now);

        let fire = match &mut self.held {
            Some(held) if held.input.left_button() && !held.input.is_alternate() => {
                held.ticks += 1;
                held.ticks == self.hold_ticks
            }
            _ => false,
        };
        if fire {
            if let Some(held) = self.held.clone() {
                log::trace!("long press on {:?}", held.target);
                self.with_clip(&held.target, |clip| clip.long_press(held.input));
            }
        }

        self.sync(now);
    }

    /// Pushes the session state into the clip frames.
    pub fn sync(&mut self, now: DateTime<Utc>) {
        let session = self.session.borrow();
        let board = session.board();
        let state = board.state();

        show(&mut self.movie, &self.cache.button, board.button_face().frame());

        for (handle, frame) in self.cache.bombs.iter().zip(skin::counter_frames(board.flags_left())) {
            show(&mut self.movie, handle, frame);
        }

        if !state.is_finished() {
            let elapsed = session.elapsed_secs(now).min(999) as i32;
            for (handle, frame) in self.cache.time.iter().zip(skin::counter_frames(elapsed)) {
                show(&mut self.movie, handle, frame);
            }
        }

        let size = board.size();
        for (index, handle) in self.cache.icons.iter().enumerate() {
            let cell = board.cell_at(from_linear_index(index, size));
            show(&mut self.movie, handle, Icon::for_cell(cell, state).frame());
        }
    }

    fn with_clip(&mut self, handle: &ClipHandle, f: impl FnOnce(&mut Clip)) {
        if let Some(clip) = self.movie.clip_mut(handle) {
            f(clip);
        }
    }
}

fn show(movie: &mut Movie, handle: &ClipHandle, frame: usize) {
    if let Some(clip) = movie.clip_mut(handle) {
        clip.set_frame(frame, true);
    }
}

fn restart_when_pressed(session: &Rc<RefCell<GameSession>>) -> impl FnMut(PointerInput) + 'static {
    let session = Rc::clone(session);
    move |_| {
        let mut session = session.borrow_mut();
        if session.board().button_face() == ButtonFace::Pressed {
            let seed = session.seed().wrapping_add(1);
            session.restart(seed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skin::tests::blank_sheet;
    use pixmines_core::{Board, GameState};

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    /// 4x4 board with a wall of bombs across the third row.
    fn view() -> GameView {
        let board = Board::with_bombs((4, 4), &[(0, 2), (1, 2), (2, 2), (3, 2)]).unwrap();
        let movie = skin::build_movie(&blank_sheet(), skin::SCENES, board.size(), 1).unwrap();
        GameView::new(movie, GameSession::with_board(board, 1), 3).unwrap()
    }

    fn frame(view: &GameView, handle: &ClipHandle) -> usize {
        view.movie().clip(handle).unwrap().frame_index()
    }

    fn frames(view: &GameView, handles: &[ClipHandle]) -> Vec<usize> {
        handles.iter().map(|handle| frame(view, handle)).collect()
    }

    fn icon(view: &GameView, coords: Coord2) -> usize {
        frame(view, &view.cache.icons[linear_index(coords, (4, 4))])
    }

    fn click(view: &mut GameView, coords: Coord2, input: PointerInput, now: DateTime<Utc>) {
        let pos = view.cell_center(coords).unwrap();
        view.dispatch(PointerEvent::new(PointerKind::Down, pos, input), now);
        view.dispatch(PointerEvent::new(PointerKind::Up, pos, PointerInput::empty()), now);
    }

    #[test]
    fn cache_covers_every_cell() {
        let view = view();
        assert_eq!(view.cache.icons.len(), 16);
        assert_eq!(view.cache.bombs.len(), 3);
        assert_eq!(view.cache.time.len(), 3);
        assert_eq!(view.cell_center((0, 0)), Some((20, 63)));
        assert_eq!(view.cell_center((4, 0)), None);
    }

    #[test]
    fn left_press_sinks_and_release_reveals() {
        let mut view = view();
        let pos = view.cell_center((2, 0)).unwrap();

        view.dispatch(PointerEvent::new(PointerKind::Down, pos, PointerInput::LEFT), at(0));
        assert_eq!(frame(&view, &view.cache.button), ButtonFace::Evaluating.frame());
        assert_eq!(icon(&view, (2, 0)), Icon::Number(0).frame());
        assert!(view.session().state().is_waiting());

        view.dispatch(PointerEvent::new(PointerKind::Up, pos, PointerInput::empty()), at(1));
        assert_eq!(view.session().state(), GameState::Playing);
        assert_eq!(icon(&view, (2, 0)), Icon::Number(0).frame());
        assert_eq!(icon(&view, (1, 1)), Icon::Number(3).frame());
        assert_eq!(icon(&view, (0, 3)), Icon::Closed.frame());
        assert_eq!(frame(&view, &view.cache.button), ButtonFace::Playing.frame());
    }

    #[test]
    fn release_outside_cancels() {
        let mut view = view();
        let pos = view.cell_center((2, 0)).unwrap();
        let other = view.cell_center((2, 3)).unwrap();

        view.dispatch(PointerEvent::new(PointerKind::Down, pos, PointerInput::LEFT), at(0));
        view.dispatch(PointerEvent::new(PointerKind::Up, other, PointerInput::empty()), at(0));

        assert!(view.session().state().is_waiting());
        assert_eq!(icon(&view, (2, 0)), Icon::Closed.frame());
        assert_eq!(icon(&view, (2, 3)), Icon::Closed.frame());
        assert_eq!(frame(&view, &view.cache.button), ButtonFace::Playing.frame());
    }

    #[test]
    fn right_click_flags_and_updates_counter() {
        let mut view = view();
        click(&mut view, (3, 3), PointerInput::RIGHT, at(0));

        assert_eq!(icon(&view, (3, 3)), Icon::Marked.frame());
        assert_eq!(frames(&view, &view.cache.bombs), [0, 0, 3]);

        for x in 0..4 {
            click(&mut view, (x, 0), PointerInput::LEFT | PointerInput::CONTROL, at(0));
        }
        click(&mut view, (0, 1), PointerInput::RIGHT, at(0));
        assert_eq!(frames(&view, &view.cache.bombs), [skin::MINUS_DIGIT, 0, 2]);
        assert!(view.session().state().is_waiting());
    }

    #[test]
    fn holding_the_left_button_flags() {
        let mut view = view();
        let pos = view.cell_center((0, 3)).unwrap();

        view.dispatch(PointerEvent::new(PointerKind::Down, pos, PointerInput::LEFT), at(0));
        for _ in 0..3 {
            view.tick(at(0));
        }
        assert!(view.session().board().cell_at((0, 3)).flagged);
        assert_eq!(icon(&view, (0, 3)), Icon::Marked.frame());

        // letting go afterwards must not reveal the cell
        view.dispatch(PointerEvent::new(PointerKind::Up, pos, PointerInput::empty()), at(0));
        view.tick(at(0));
        assert!(view.session().state().is_waiting());
        assert!(view.session().board().cell_at((0, 3)).flagged);
    }

    #[test]
    fn losing_uncovers_the_board_and_freezes_the_clock() {
        let mut view = view();
        click(&mut view, (0, 0), PointerInput::LEFT, at(0));
        click(&mut view, (3, 3), PointerInput::RIGHT, at(1));
        view.tick(at(4));
        assert_eq!(frames(&view, &view.cache.time), [0, 0, 4]);

        click(&mut view, (0, 2), PointerInput::LEFT, at(7));
        assert_eq!(view.session().state(), GameState::Lost);
        assert_eq!(frame(&view, &view.cache.button), ButtonFace::Lost.frame());
        assert_eq!(icon(&view, (0, 2)), Icon::AnswerIsBomb.frame());
        assert_eq!(icon(&view, (1, 2)), Icon::Bomb.frame());
        assert_eq!(icon(&view, (3, 3)), Icon::AnswerNoBomb.frame());
        assert_eq!(frames(&view, &view.cache.time), [0, 0, 7]);

        view.tick(at(60));
        assert_eq!(frames(&view, &view.cache.time), [0, 0, 7]);
    }

    #[test]
    fn button_restarts_the_game() {
        let mut view = view();
        click(&mut view, (0, 0), PointerInput::LEFT, at(0));
        assert_eq!(view.session().state(), GameState::Playing);

        let button = view.movie().clip(&view.cache.button).unwrap().bounds();
        let pos = (button.x + 2, button.y + 2);
        view.dispatch(PointerEvent::new(PointerKind::Down, pos, PointerInput::LEFT), at(1));
        assert_eq!(frame(&view, &view.cache.button), ButtonFace::Pressed.frame());
        view.dispatch(PointerEvent::new(PointerKind::Up, pos, PointerInput::empty()), at(1));

        assert!(view.session().state().is_waiting());
        assert_eq!(view.session().seed(), 2);
        assert_eq!(icon(&view, (0, 0)), Icon::Closed.frame());
        assert_eq!(frame(&view, &view.cache.button), ButtonFace::Playing.frame());
    }

    #[test]
    fn hover_tracks_enter_and_leave() {
        let mut view = view();
        let entered = Rc::new(Cell::new(0));
        let left = Rc::new(Cell::new(0));
        let handle = view.cache.icons[0].clone();
        {
            let clip = view.movie.clip_mut(&handle).unwrap();
            let counter = Rc::clone(&entered);
            clip.on_enter(move |_| counter.set(counter.get() + 1));
            let counter = Rc::clone(&left);
            clip.on_leave(move || counter.set(counter.get() + 1));
        }

        let inside = view.cell_center((0, 0)).unwrap();
        let outside = view.cell_center((1, 0)).unwrap();
        for pos in [inside, (inside.0 + 1, inside.1), outside] {
            view.dispatch(PointerEvent::new(PointerKind::Move, pos, PointerInput::empty()), at(0));
        }

        assert_eq!((entered.get(), left.get()), (1, 1));
    }
}
