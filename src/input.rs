use eframe::egui;

/// Raw action codes as delivered by the host's motion events.
const ACTION_DOWN: i32 = 0;
const ACTION_UP: i32 = 1;
const ACTION_MOVE: i32 = 2;
const ACTION_POINTER_DOWN: i32 = 5;
const ACTION_POINTER_UP: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    Down,
    Up,
    Move,
}

/// A single touch sample in physical pixels.
///
/// Secondary pointers are folded onto the primary button and the pointer id
/// is carried for logging only; multi-touch is not distinguished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub action: TouchAction,
    pub secondary: bool,
    pub x: f32,
    pub y: f32,
    pub pointer_id: i32,
}

impl TouchEvent {
    /// Decodes a host action code. Unknown codes yield `None`.
    pub fn from_raw(action: i32, x: f32, y: f32, pointer_id: i32) -> Option<Self> {
        let (action, secondary) = match action {
            ACTION_DOWN => (TouchAction::Down, false),
            ACTION_UP => (TouchAction::Up, false),
            ACTION_MOVE => (TouchAction::Move, false),
            ACTION_POINTER_DOWN => (TouchAction::Down, true),
            ACTION_POINTER_UP => (TouchAction::Up, true),
            _ => return None,
        };
        Some(Self {
            action,
            secondary,
            x,
            y,
            pointer_id,
        })
    }

    /// Appends the equivalent egui events: always a position update, plus a
    /// primary button change for down and up.
    pub fn push_events(&self, pixels_per_point: f32, out: &mut Vec<egui::Event>) {
        let ppp = if pixels_per_point > 0.0 {
            pixels_per_point
        } else {
            1.0
        };
        let pos = egui::pos2(self.x / ppp, self.y / ppp);
        out.push(egui::Event::PointerMoved(pos));

        let pressed = match self.action {
            TouchAction::Down => true,
            TouchAction::Up => false,
            TouchAction::Move => return,
        };
        out.push(egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::default(),
        });
    }
}
