use std::time::Instant;
use winit::window::Window;

/// Counts frames and reports the rate in the window title twice a second.
pub struct FrameStats {
    base_title: String,
    last_report: Instant,
    frame_count: u32,
}

impl FrameStats {
    pub fn new(base_title: String) -> Self {
        Self {
            base_title,
            last_report: Instant::now(),
            frame_count: 0,
        }
    }

    pub fn frame(&mut self, window: Option<&Window>) {
        self.frame_count = self.frame_count.saturating_add(1);
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_report);
        if elapsed.as_secs_f32() >= 0.5 {
            let fps = self.frame_count as f32 / elapsed.as_secs_f32();
            if let Some(window) = window {
                window.set_title(&format!("{} - {:.1} fps", self.base_title, fps));
            }
            self.frame_count = 0;
            self.last_report = now;
        }
    }
}
