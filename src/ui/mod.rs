//! The UI layer stack: an ordered list of [`UILayer`]s, bottom to top.
//! Key and character events go to the top layer only; system events
//! broadcast to every layer; mouse events walk top-down until one layer
//! consumes them. Rendering asks each dirty layer to redraw into its own
//! region, short-circuiting once a full-screen layer is found (everything
//! beneath it is necessarily invisible).

pub mod adaptive_fps;
pub mod keybindings;
pub mod layers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Function(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharEvent {
    pub ch: char,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub x: u16,
    pub y: u16,
    pub button: MouseButton,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    Resize { width: u16, height: u16 },
    FocusGained,
    FocusLost,
    Tick,
}

/// Whether an event was handled. Mouse routing stops at the first layer
/// (top-down) that returns `Consumed`; every other event class ignores
/// this and is delivered per its own rule (top-only or broadcast).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Consumed,
    Ignored,
}

pub trait UILayer: Send {
    fn on_key(&mut self, _event: KeyEvent) -> EventOutcome {
        EventOutcome::Ignored
    }

    fn on_char(&mut self, _event: CharEvent) -> EventOutcome {
        EventOutcome::Ignored
    }

    fn on_mouse(&mut self, _event: MouseEvent) -> EventOutcome {
        EventOutcome::Ignored
    }

    fn on_system(&mut self, _event: SystemEvent) {}

    /// Whether this layer covers the entire screen. A full-screen layer's
    /// presence means layers beneath it contribute nothing to the
    /// rendered frame and can be skipped.
    fn is_full_screen(&self) -> bool {
        false
    }

    /// Whether this layer has unrendered changes. Reset by the stack
    /// after a render pass that includes this layer.
    fn is_dirty(&self) -> bool;

    fn render(&self, frame: &mut dyn std::fmt::Write);

    /// Exposes the concrete layer as [`std::any::Any`] so callers outside
    /// the stack (e.g. a shutdown handler reading back pane state) can
    /// recover it with [`std::any::Any::downcast_ref`].
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Bottom-to-top stack of layers. Index 0 is the bottom (normally the
/// file manager view); the last element is on top and receives keyboard
/// input first.
#[derive(Default)]
pub struct UILayerStack {
    layers: Vec<Box<dyn UILayer>>,
}

impl UILayerStack {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    pub fn push(&mut self, layer: Box<dyn UILayer>) {
        self.layers.push(layer);
    }

    pub fn pop(&mut self) -> Option<Box<dyn UILayer>> {
        self.layers.pop()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn top_mut(&mut self) -> Option<&mut Box<dyn UILayer>> {
        self.layers.last_mut()
    }

    pub fn layer_at(&self, index: usize) -> Option<&dyn UILayer> {
        self.layers.get(index).map(|b| b.as_ref())
    }

    /// Finds the topmost layer of concrete type `T`, bottom-to-top order
    /// isn't assumed -- the file manager is normally alone at index 0, but
    /// this still finds it correctly if dialogs are stacked above it.
    pub fn top_as<T: UILayer + 'static>(&self) -> Option<&T> {
        self.layers.iter().rev().find_map(|layer| layer.as_any().downcast_ref::<T>())
    }

    /// Only the top layer sees key events -- a modal dialog stacked over
    /// the file manager should not leak keystrokes through to it.
    pub fn dispatch_key(&mut self, event: KeyEvent) -> EventOutcome {
        match self.layers.last_mut() {
            Some(top) => top.on_key(event),
            None => EventOutcome::Ignored,
        }
    }

    pub fn dispatch_char(&mut self, event: CharEvent) -> EventOutcome {
        match self.layers.last_mut() {
            Some(top) => top.on_char(event),
            None => EventOutcome::Ignored,
        }
    }

    /// Delivered to every layer, top to bottom, regardless of consumption
    /// -- a resize affects every layer's layout, not just the focused one.
    pub fn dispatch_system(&mut self, event: SystemEvent) {
        for layer in self.layers.iter_mut().rev() {
            layer.on_system(event);
        }
    }

    /// Top to bottom, stopping at the first layer that consumes the
    /// event (a dialog's buttons shadow whatever is drawn underneath
    /// them).
    pub fn dispatch_mouse(&mut self, event: MouseEvent) -> EventOutcome {
        for layer in self.layers.iter_mut().rev() {
            if layer.on_mouse(event) == EventOutcome::Consumed {
                return EventOutcome::Consumed;
            }
        }
        EventOutcome::Ignored
    }

    /// The indices that actually need to render this frame: every dirty
    /// layer from the top down to (and including) the topmost full-screen
    /// layer, or the bottom of the stack if none is full-screen.
    pub fn dirty_render_range(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        for (i, layer) in self.layers.iter().enumerate().rev() {
            indices.push(i);
            if layer.is_full_screen() {
                break;
            }
        }
        indices.sort_unstable();
        indices.retain(|&i| self.layers[i].is_dirty() || self.layers[i].is_full_screen());
        indices
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
