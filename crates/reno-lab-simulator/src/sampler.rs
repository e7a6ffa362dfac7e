use rand::Rng;
use rand::rngs::StdRng;

/// Source of independent uniform draws in `[0, 1)`.
pub trait UniformSource {
    fn next_uniform(&mut self) -> f64;
}

impl UniformSource for StdRng {
    fn next_uniform(&mut self) -> f64 {
        self.random::<f64>()
    }
}

impl<S: UniformSource + ?Sized> UniformSource for &mut S {
    fn next_uniform(&mut self) -> f64 {
        (**self).next_uniform()
    }
}

/// What happened to one window's worth of segments during a single RTT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub attempted: u64,
    pub acked: u64,
    pub lost: bool,
}

/// Segments sent for a window: nearest integer (ties to even), never below one.
pub fn segments_for_window(window: f64, mss: f64) -> u64 {
    (window / mss).round_ties_even().max(1.0) as u64
}

/// Send one window and draw a loss decision for each segment, in order.
pub fn sample<S: UniformSource + ?Sized>(
    window: f64,
    mss: f64,
    loss_rate: f64,
    rng: &mut S,
) -> TickOutcome {
    let attempted = segments_for_window(window, mss);
    let mut acked = 0;
    let mut lost = false;
    for _ in 0..attempted {
        if rng.next_uniform() < loss_rate {
            lost = true;
        } else {
            acked += 1;
        }
    }
    TickOutcome {
        attempted,
        acked,
        lost,
    }
}
