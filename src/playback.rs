use std::time::Duration;

use crate::project::Project;

/// Fixed-tick animation playback. Only ever moves the current-frame pointer.
#[derive(Clone, Debug, Default)]
pub struct Playback {
    playing: bool,
    elapsed: Duration,
}

impl Playback {
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Stop and rewind the accumulator; the current frame stays where it is.
    pub fn stop(&mut self) {
        self.playing = false;
        self.elapsed = Duration::ZERO;
    }

    pub fn toggle(&mut self) {
        if self.playing { self.stop() } else { self.play() }
    }

    /// Advance by `dt` and return the frame to show. Frame `i` is shown while
    /// the accumulator is inside `[sum(d[..i]), sum(d[..=i]))`; running past
    /// the last frame resets the accumulator and returns frame 0.
    pub fn tick(&mut self, dt: Duration, durations: &[Duration]) -> Option<usize> {
        if !self.playing || durations.is_empty() {
            return None;
        }
        self.elapsed += dt;
        let mut threshold = Duration::ZERO;
        for (idx, duration) in durations.iter().enumerate() {
            threshold += *duration;
            if self.elapsed < threshold {
                return Some(idx);
            }
        }
        self.elapsed = Duration::ZERO;
        Some(0)
    }

    /// Tick against the project's frame table and select the resulting frame.
    /// Returns true when the current frame changed.
    pub fn advance(&mut self, project: &mut Project, dt: Duration) -> bool {
        let durations = project.frame_durations();
        match self.tick(dt, &durations) {
            Some(frame) if frame != project.current_frame => {
                project.current_frame = frame;
                project.clamp_indices();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::canvas_ops::add_frame;
    use pretty_assertions::assert_eq;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn selects_frame_by_cumulative_duration() {
        let mut playback = Playback::default();
        let durations = [ms(100), ms(50), ms(200)];
        assert_eq!(playback.tick(ms(10), &durations), None);
        playback.play();
        assert_eq!(playback.tick(ms(99), &durations), Some(0));
        assert_eq!(playback.tick(ms(1), &durations), Some(1));
        assert_eq!(playback.tick(ms(49), &durations), Some(1));
        assert_eq!(playback.tick(ms(1), &durations), Some(2));
        assert_eq!(playback.tick(ms(199), &durations), Some(2));
    }

    #[test]
    fn overrun_wraps_and_resets() {
        let mut playback = Playback::default();
        playback.play();
        let durations = [ms(100), ms(100)];
        assert_eq!(playback.tick(ms(250), &durations), Some(0));
        assert_eq!(playback.elapsed(), Duration::ZERO);
        assert_eq!(playback.tick(ms(120), &durations), Some(1));
    }

    #[test]
    fn zero_length_table_stays_on_first_frame() {
        let mut playback = Playback::default();
        playback.play();
        assert_eq!(playback.tick(ms(5), &[Duration::ZERO]), Some(0));
        assert_eq!(playback.tick(ms(5), &[]), None);
    }

    #[test]
    fn advance_moves_only_the_frame_pointer() {
        let mut project = Project::new(2, 2, ms(100)).unwrap();
        add_frame(&mut project);
        project.current_frame = 0;
        let before: Vec<Vec<u8>> = project.frames.iter().map(|f| f.layers[0].to_rgba_bytes()).collect();

        let mut playback = Playback::default();
        playback.toggle();
        assert!(!playback.advance(&mut project, ms(40)));
        assert!(playback.advance(&mut project, ms(80)));
        assert_eq!(project.current_frame, 1);
        assert!(playback.advance(&mut project, ms(100)));
        assert_eq!(project.current_frame, 0);

        let after: Vec<Vec<u8>> = project.frames.iter().map(|f| f.layers[0].to_rgba_bytes()).collect();
        assert_eq!(before, after);
        playback.toggle();
        assert!(!playback.is_playing());
    }
}
