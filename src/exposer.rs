//! Forcing a lazily-rendered results list to materialize.
//!
//! Virtualized lists only render items near the scroll position, so the
//! exposer repeatedly scrolls the results container to its end and pauses
//! to let the host page append more items. The effort is bounded: a fixed
//! number of cycles against the container, or a single whole-page scroll
//! when no container exists. Pages needing more cycles are under-scraped.

use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ExposureConfig;
use crate::page::PageContext;

/// Suspends the scrape between scroll actions so the page can render.
pub trait Pause {
    fn pause(&self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// What was scrolled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollTarget {
    /// The results container matched by this selector
    Container(String),
    /// No container was found; the whole page was scrolled once
    Window,
}

/// Progress of one exposure run. Lives only for the duration of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureState {
    pub target: ScrollTarget,
    pub iterations_done: u32,
    pub iterations_planned: u32,
}

impl ExposureState {
    pub fn is_complete(&self) -> bool {
        self.iterations_done >= self.iterations_planned
    }
}

#[derive(Debug, Clone)]
pub struct Exposer {
    container_selector: String,
    iterations: u32,
    delay: Duration,
    fallback_delay: Duration,
}

impl Exposer {
    pub fn new(config: &ExposureConfig) -> Self {
        Self {
            container_selector: config.container_selector.clone(),
            iterations: config.iterations,
            delay: Duration::from_millis(config.delay_ms),
            fallback_delay: Duration::from_millis(config.fallback_delay_ms),
        }
    }

    /// Number of pause cycles the run will take once the target is known.
    pub fn planned_iterations(&self, target: &ScrollTarget) -> u32 {
        match target {
            ScrollTarget::Container(_) => self.iterations,
            ScrollTarget::Window => 1,
        }
    }

    pub fn expose(&self, page: &dyn PageContext, pause: &dyn Pause) -> Result<ExposureState> {
        self.expose_with_progress(page, pause, |_| {})
    }

    /// Run the bounded scroll loop, calling `on_iteration` after every pause.
    pub fn expose_with_progress<F>(
        &self,
        page: &dyn PageContext,
        pause: &dyn Pause,
        mut on_iteration: F,
    ) -> Result<ExposureState>
    where
        F: FnMut(&ExposureState),
    {
        let target = if page.has_element(&self.container_selector)? {
            ScrollTarget::Container(self.container_selector.clone())
        } else {
            ScrollTarget::Window
        };

        let mut state = ExposureState {
            iterations_planned: self.planned_iterations(&target),
            target,
            iterations_done: 0,
        };

        match state.target.clone() {
            ScrollTarget::Container(selector) => {
                info!("Scrolling results container '{}' {} times", selector, self.iterations);
                for _ in 0..self.iterations {
                    if !page.scroll_element_to_end(&selector)? {
                        debug!("Results container '{}' detached mid-scroll", selector);
                    }
                    pause.pause(self.delay);
                    state.iterations_done += 1;
                    debug!("Scroll {}/{} complete", state.iterations_done, state.iterations_planned);
                    on_iteration(&state);
                }
            }
            ScrollTarget::Window => {
                info!("No results container on {}, scrolling whole page", page.describe());
                page.scroll_window_to_end()?;
                pause.pause(self.fallback_delay);
                state.iterations_done = 1;
                on_iteration(&state);
            }
        }

        Ok(state)
    }
}
