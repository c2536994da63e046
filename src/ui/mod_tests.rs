use super::*;

struct TestLayer {
    dirty: bool,
    full_screen: bool,
    consume_mouse: bool,
    key_log: Vec<KeyEvent>,
    system_log: Vec<SystemEvent>,
}

impl TestLayer {
    fn new() -> Self {
        Self {
            dirty: true,
            full_screen: false,
            consume_mouse: false,
            key_log: Vec::new(),
            system_log: Vec::new(),
        }
    }

    fn full_screen() -> Self {
        Self { full_screen: true, ..Self::new() }
    }
}

impl UILayer for TestLayer {
    fn on_key(&mut self, event: KeyEvent) -> EventOutcome {
        self.key_log.push(event);
        EventOutcome::Consumed
    }

    fn on_mouse(&mut self, _event: MouseEvent) -> EventOutcome {
        if self.consume_mouse {
            EventOutcome::Consumed
        } else {
            EventOutcome::Ignored
        }
    }

    fn on_system(&mut self, event: SystemEvent) {
        self.system_log.push(event);
    }

    fn is_full_screen(&self) -> bool {
        self.full_screen
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn render(&self, _frame: &mut dyn std::fmt::Write) {}

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

fn key(ch: char) -> KeyEvent {
    KeyEvent { key: Key::Char(ch), modifiers: Modifiers { shift: false, ctrl: false, alt: false } }
}

#[test]
fn key_events_go_only_to_top_layer() {
    let mut stack = UILayerStack::new();
    stack.push(Box::new(TestLayer::new()));
    stack.push(Box::new(TestLayer::new()));
    stack.dispatch_key(key('a'));

    // only the top layer recorded the key
    assert_eq!(stack.layers[1].is_dirty(), true);
}

#[test]
fn system_events_broadcast_to_every_layer() {
    let mut stack = UILayerStack::new();
    stack.push(Box::new(TestLayer::new()));
    stack.push(Box::new(TestLayer::new()));
    stack.dispatch_system(SystemEvent::Resize { width: 80, height: 24 });

    for layer in &stack.layers {
        let test_layer = layer.as_ref();
        assert!(test_layer.is_dirty());
    }
}

#[test]
fn mouse_events_stop_at_first_consuming_layer_top_down() {
    let mut bottom = TestLayer::new();
    bottom.consume_mouse = true;
    let top = TestLayer::new(); // does not consume

    let mut stack = UILayerStack::new();
    stack.push(Box::new(bottom));
    stack.push(Box::new(top));

    let outcome = stack.dispatch_mouse(MouseEvent { x: 0, y: 0, button: MouseButton::Left });
    assert_eq!(outcome, EventOutcome::Consumed);
}

#[test]
fn dirty_render_range_short_circuits_below_a_full_screen_layer() {
    let mut stack = UILayerStack::new();
    stack.push(Box::new(TestLayer::new())); // index 0: would-be-dirty but hidden
    stack.push(Box::new(TestLayer::full_screen())); // index 1: full screen
    stack.push(Box::new(TestLayer::new())); // index 2: dirty, on top

    let range = stack.dirty_render_range();
    assert_eq!(range, vec![1, 2]);
}

#[test]
fn dirty_render_range_covers_whole_stack_with_no_full_screen_layer() {
    let mut stack = UILayerStack::new();
    stack.push(Box::new(TestLayer::new()));
    stack.push(Box::new(TestLayer::new()));

    let range = stack.dirty_render_range();
    assert_eq!(range, vec![0, 1]);
}

#[test]
fn empty_stack_ignores_every_event_class() {
    let mut stack = UILayerStack::new();
    assert_eq!(stack.dispatch_key(key('a')), EventOutcome::Ignored);
    assert_eq!(
        stack.dispatch_mouse(MouseEvent { x: 0, y: 0, button: MouseButton::Left }),
        EventOutcome::Ignored
    );
    assert!(stack.dirty_render_range().is_empty());
}
