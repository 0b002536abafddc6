use std::sync::Mutex;

use agora_core::WhiteboardSurface;

/// Renders whiteboard commands as terminal lines.
///
/// Keeps a running note count so a `clear` has visible effect in a log-only
/// rendering.
pub struct TerminalWhiteboard {
    items: Mutex<usize>,
}

impl TerminalWhiteboard {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(0),
        }
    }

    fn items(&self) -> std::sync::MutexGuard<'_, usize> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WhiteboardSurface for TerminalWhiteboard {
    fn add_note(&self, text: &str, x: Option<i64>, y: Option<i64>) {
        let mut items = self.items();
        *items += 1;
        match (x, y) {
            (Some(x), Some(y)) => println!("[board] note #{} at ({}, {}): {}", items, x, y, text),
            _ => println!("[board] note #{}: {}", items, text),
        }
    }

    fn add_image(&self, src: &str, _x: Option<i64>, _y: Option<i64>) {
        let mut items = self.items();
        *items += 1;
        println!("[board] image #{}: {}", items, src);
    }

    fn clear(&self) {
        *self.items() = 0;
        println!("[board] cleared");
    }
}
