//! Crop rectangle gestures in raw-image pixel space

use crate::domain::{DragState, Rect};

/// Corner grab area, in view points
pub const CORNER_DIAMETER: f32 = 16.0;
/// Edge grab band, in view points
pub const EDGE_GRAB_THICKNESS: f32 = 8.0;

/// Which handle of `rect` lies under `(x, y)`. `scale` converts the view
/// point grab sizes into raw pixels.
pub fn drag_state_at(rect: Rect, x: f32, y: f32, scale: f32) -> DragState {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let corner = CORNER_DIAMETER * 0.5 / scale;
    let edge = EDGE_GRAB_THICKNESS * 0.5 / scale;
    let (l, t, r, b) = (
        rect.left as f32,
        rect.top as f32,
        rect.right as f32,
        rect.bottom as f32,
    );
    let near = |a: f32, b: f32, d: f32| (a - b).abs() <= d;
    let within = |v: f32, lo: f32, hi: f32| v >= lo && v <= hi;

    if near(x, l, corner) && near(y, t, corner) {
        return DragState::NW;
    }
    if near(x, r, corner) && near(y, t, corner) {
        return DragState::NE;
    }
    if near(x, l, corner) && near(y, b, corner) {
        return DragState::SW;
    }
    if near(x, r, corner) && near(y, b, corner) {
        return DragState::SE;
    }
    if within(x, l, r) && near(y, t, edge) {
        return DragState::N;
    }
    if within(x, l, r) && near(y, b, edge) {
        return DragState::S;
    }
    if within(y, t, b) && near(x, l, edge) {
        return DragState::W;
    }
    if within(y, t, b) && near(x, r, edge) {
        return DragState::E;
    }
    DragState::None
}

/// Resize `prev` by dragging handle `state` to `(x, y)`. Dragging past the
/// opposite side reflects the handle, so the rectangle never inverts.
pub fn resize(prev: Rect, state: DragState, x: i32, y: i32) -> (DragState, Rect) {
    let reflection_point = match state {
        DragState::None => return (state, prev),
        DragState::NW => (prev.right, prev.bottom),
        DragState::N => (0, prev.bottom),
        DragState::NE => (prev.left, prev.bottom),
        DragState::E => (prev.left, 0),
        DragState::SE => (prev.left, prev.top),
        DragState::S => (0, prev.top),
        DragState::SW => (prev.right, prev.top),
        DragState::W => (prev.right, 0),
    };

    let new_state = match state {
        DragState::SE | DragState::NW | DragState::NE | DragState::SW => {
            if x < reflection_point.0 && y < reflection_point.1 {
                DragState::NW
            } else if x > reflection_point.0 && y > reflection_point.1 {
                DragState::SE
            } else if x > reflection_point.0 && y < reflection_point.1 {
                DragState::NE
            } else if x < reflection_point.0 && y > reflection_point.1 {
                DragState::SW
            } else {
                state
            }
        }
        DragState::N | DragState::S => {
            if y < reflection_point.1 {
                DragState::N
            } else {
                DragState::S
            }
        }
        DragState::E | DragState::W => {
            if x > reflection_point.0 {
                DragState::E
            } else {
                DragState::W
            }
        }
        DragState::None => DragState::None,
    };

    let top_left = match new_state {
        DragState::NW => (x, y),
        DragState::NE => (reflection_point.0, y),
        DragState::SE => (reflection_point.0, reflection_point.1),
        DragState::SW => (x, reflection_point.1),
        DragState::N => (prev.left, y),
        DragState::E => (reflection_point.0, prev.top),
        DragState::S => (prev.left, reflection_point.1),
        DragState::W => (x, prev.top),
        DragState::None => (prev.left, prev.top),
    };
    let bottom_right = match new_state {
        DragState::NW => (reflection_point.0, reflection_point.1),
        DragState::NE => (x, reflection_point.1),
        DragState::SE => (x, y),
        DragState::SW => (reflection_point.0, y),
        DragState::N => (prev.right, reflection_point.1),
        DragState::E => (x, prev.bottom),
        DragState::S => (prev.right, y),
        DragState::W => (reflection_point.0, prev.bottom),
        DragState::None => (prev.right, prev.bottom),
    };

    (
        new_state,
        Rect {
            left: top_left.0,
            top: top_left.1,
            right: bottom_right.0,
            bottom: bottom_right.1,
        },
    )
}

/// An in-progress pointer gesture on the crop rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropGesture {
    /// Dragging a handle
    Resize(DragState),
    /// Dragging the whole rectangle; the grab point relative to its origin
    Move { grab_x: i32, grab_y: i32 },
    /// Drawing a fresh rectangle from an anchor
    Draw { anchor_x: i32, anchor_y: i32 },
}

impl CropGesture {
    /// Pick the gesture for a pointer-down at `(x, y)` raw pixels
    pub fn begin(rect: Rect, x: f32, y: f32, scale: f32) -> Self {
        let state = drag_state_at(rect, x, y, scale);
        let (xi, yi) = (x.round() as i32, y.round() as i32);
        if state != DragState::None {
            CropGesture::Resize(state)
        } else if rect.contains_point(xi, yi) {
            CropGesture::Move {
                grab_x: xi - rect.left,
                grab_y: yi - rect.top,
            }
        } else {
            CropGesture::Draw {
                anchor_x: xi,
                anchor_y: yi,
            }
        }
    }

    /// New crop rectangle for the pointer at `(x, y)`, kept inside `bounds`
    pub fn update(&mut self, rect: Rect, x: f32, y: f32, bounds: Rect) -> Rect {
        let x = (x.round() as i32).clamp(bounds.left, bounds.right);
        let y = (y.round() as i32).clamp(bounds.top, bounds.bottom);
        match *self {
            CropGesture::Resize(state) => {
                let (state, next) = resize(rect, state, x, y);
                *self = CropGesture::Resize(state);
                next
            }
            CropGesture::Move { grab_x, grab_y } => {
                let (w, h) = (rect.width(), rect.height());
                let left = (x - grab_x).clamp(bounds.left, (bounds.right - w).max(bounds.left));
                let top = (y - grab_y).clamp(bounds.top, (bounds.bottom - h).max(bounds.top));
                Rect::from_xywh(left, top, w, h)
            }
            CropGesture::Draw { anchor_x, anchor_y } => Rect::new(anchor_x, anchor_y, x, y),
        }
    }
}
