//! Recording fakes shared by the player integration tests

#![allow(dead_code)]

use paint_preview_cache::{Bitmap, BitmapMatrix};
use paint_preview_player::{
    BallisticScroller, BitmapReply, CompositorDelegate, FrameId, FrameMediator, PlayerConfig,
};
use paint_preview_render::{FrameView, SubFrameId};
use paint_preview_scheduler::{ManualTaskQueue, Rect, TileCoord};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

pub const CONTENT: (i32, i32) = (560, 1150);

/// Install a test subscriber once; enable with `RUST_LOG=debug`
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request {
    pub frame: FrameId,
    pub coord: TileCoord,
    pub clip: Rect,
    pub scale: f32,
}

/// Compositor that records requests and holds replies until told to answer
#[derive(Default)]
pub struct RecordingCompositor {
    requests: Mutex<Vec<Request>>,
    pending: Mutex<Vec<(BitmapReply, Rect, f32)>>,
    clicks: Mutex<Vec<(FrameId, i32, i32)>>,
}

impl RecordingCompositor {
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_coords(&self) -> Vec<TileCoord> {
        self.requests().iter().map(|request| request.coord).collect()
    }

    pub fn clicks(&self) -> Vec<(FrameId, i32, i32)> {
        self.clicks.lock().unwrap().clone()
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Answer every held request with a tile of the requested size
    pub fn succeed_all(&self) -> usize {
        self.answer(|_| true)
    }

    /// Answer every held request, failing those for which `ok` is false
    pub fn answer(&self, ok: impl Fn(TileCoord) -> bool) -> usize {
        let replies: Vec<_> = self.pending.lock().unwrap().drain(..).collect();
        let count = replies.len();
        for (reply, clip, scale) in replies {
            if ok(reply.coord()) {
                let size = clip.scaled(scale);
                reply.success(Bitmap::filled(
                    size.width() as u32,
                    size.height() as u32,
                    [255, 255, 255, 255],
                ));
            } else {
                reply.error();
            }
        }
        count
    }

    /// Forget every held request without answering
    pub fn drop_all(&self) -> usize {
        self.pending.lock().unwrap().drain(..).count()
    }

    /// Take the held replies so the test can answer them later
    pub fn take_replies(&self) -> Vec<BitmapReply> {
        self.pending
            .lock()
            .unwrap()
            .drain(..)
            .map(|(reply, _, _)| reply)
            .collect()
    }
}

impl CompositorDelegate for RecordingCompositor {
    fn request_bitmap(&self, frame: FrameId, clip: Rect, scale: f32, reply: BitmapReply) {
        self.requests.lock().unwrap().push(Request {
            frame,
            coord: reply.coord(),
            clip,
            scale,
        });
        self.pending.lock().unwrap().push((reply, clip, scale));
    }

    fn on_click(&self, frame: FrameId, x: i32, y: i32) {
        self.clicks.lock().unwrap().push((frame, x, y));
    }
}

#[derive(Debug, Default)]
pub struct ScrollerState {
    pub script: VecDeque<(i32, i32)>,
    pub current: (i32, i32),
    pub finished: bool,
    pub aborted: usize,
    pub flings: Vec<[i32; 6]>,
}

/// Scroller that replays a fixed list of positions
#[derive(Clone, Default)]
pub struct ScriptedScroller {
    pub state: Arc<Mutex<ScrollerState>>,
}

impl ScriptedScroller {
    pub fn with_script(positions: &[(i32, i32)]) -> Self {
        let scroller = Self::default();
        {
            let mut state = scroller.state.lock().unwrap();
            state.script = positions.iter().copied().collect();
            state.finished = true;
        }
        scroller
    }

    pub fn aborted(&self) -> usize {
        self.state.lock().unwrap().aborted
    }

    pub fn flings(&self) -> Vec<[i32; 6]> {
        self.state.lock().unwrap().flings.clone()
    }
}

impl BallisticScroller for ScriptedScroller {
    fn fling(&mut self, start_x: i32, start_y: i32, velocity_x: i32, velocity_y: i32, max_x: i32, max_y: i32) {
        let mut state = self.state.lock().unwrap();
        state.current = (start_x, start_y);
        state.finished = false;
        state
            .flings
            .push([start_x, start_y, velocity_x, velocity_y, max_x, max_y]);
    }

    fn compute_scroll_offset(&mut self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.finished {
            return false;
        }
        match state.script.pop_front() {
            Some(position) => {
                state.current = position;
                true
            }
            None => {
                state.finished = true;
                false
            }
        }
    }

    fn current_x(&self) -> i32 {
        self.state.lock().unwrap().current.0
    }

    fn current_y(&self) -> i32 {
        self.state.lock().unwrap().current.1
    }

    fn is_finished(&self) -> bool {
        self.state.lock().unwrap().finished
    }

    fn abort(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.aborted += 1;
        state.finished = true;
    }
}

/// View that keeps everything it is sent
#[derive(Debug, Default)]
pub struct RecordingView {
    pub matrix: BitmapMatrix,
    pub matrix_updates: usize,
    pub tile_dimensions: (i32, i32),
    pub layouts: usize,
    pub viewports: Vec<Rect>,
    pub sub_frames: Vec<Vec<(SubFrameId, Rect)>>,
}

impl FrameView for RecordingView {
    fn update_bitmap_matrix(&mut self, matrix: BitmapMatrix) {
        self.matrix = matrix;
        self.matrix_updates += 1;
    }

    fn update_tile_dimensions(&mut self, tile_width: i32, tile_height: i32) {
        self.tile_dimensions = (tile_width, tile_height);
    }

    fn update_viewport(&mut self, viewport: Rect) {
        self.viewports.push(viewport);
    }

    fn update_layout(&mut self, matrix: BitmapMatrix, tile_width: i32, tile_height: i32, viewport: Rect) {
        self.layouts += 1;
        self.matrix = matrix;
        self.tile_dimensions = (tile_width, tile_height);
        self.viewports.push(viewport);
    }

    fn update_sub_frames(&mut self, visible: &[(SubFrameId, Rect)]) {
        self.sub_frames.push(visible.to_vec());
    }
}

pub struct Harness {
    pub mediator: FrameMediator<RecordingView>,
    pub compositor: Arc<RecordingCompositor>,
    pub scroller: ScriptedScroller,
    pub queue: Arc<ManualTaskQueue>,
}

pub fn harness(config: PlayerConfig) -> Harness {
    harness_with_scroller(config, ScriptedScroller::default())
}

pub fn harness_with_scroller(config: PlayerConfig, scroller: ScriptedScroller) -> Harness {
    init_tracing();
    let compositor = Arc::new(RecordingCompositor::default());
    let queue = Arc::new(ManualTaskQueue::new());
    let mediator = FrameMediator::new(
        FrameId(7),
        CONTENT,
        config,
        compositor.clone(),
        Box::new(scroller.clone()),
        queue.clone(),
        RecordingView::default(),
    )
    .unwrap();
    Harness {
        mediator,
        compositor,
        scroller,
        queue,
    }
}

/// Harness laid out with a 100x200 window at scale 1
pub fn laid_out(config: PlayerConfig) -> Harness {
    let mut harness = harness(config);
    harness.mediator.update_viewport_size(100, 200, 1.0).unwrap();
    harness
}

pub fn coords(pairs: &[(usize, usize)]) -> Vec<TileCoord> {
    pairs
        .iter()
        .map(|&(row, col)| TileCoord::new(row, col))
        .collect()
}
