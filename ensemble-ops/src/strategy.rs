//! Iteration strategy over a build-order sequence.
//!
//! Commands never loop over repositories themselves; they hand a step
//! closure to a [`Strategy`]. [`Sequential`] runs one repository at a time to
//! completion, which is what shared lockfiles and `node_modules` require.

use ensemble_core::RepoName;

/// Returned by each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub trait Strategy {
    /// Visit `order`, calling `step` per name until it returns [`Flow::Stop`].
    /// Returns how many names were visited (including the one that stopped).
    fn visit(&self, order: &[RepoName], step: &mut dyn FnMut(&RepoName) -> Flow) -> usize;
}

/// Strictly one after another, in the given order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl Strategy for Sequential {
    fn visit(&self, order: &[RepoName], step: &mut dyn FnMut(&RepoName) -> Flow) -> usize {
        let mut visited = 0;
        for name in order {
            visited += 1;
            if step(name) == Flow::Stop {
                break;
            }
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_stops_after_the_stopping_step() {
        let order: Vec<RepoName> = ["a", "b", "c"].into_iter().map(RepoName::from).collect();
        let mut seen = Vec::new();
        let visited = Sequential.visit(&order, &mut |name| {
            seen.push(name.clone());
            if name.as_str() == "b" {
                Flow::Stop
            } else {
                Flow::Continue
            }
        });
        assert_eq!(visited, 2);
        assert_eq!(seen, order[..2].to_vec());
    }

    #[test]
    fn sequential_visits_everything_when_never_stopped() {
        let order: Vec<RepoName> = ["a", "b"].into_iter().map(RepoName::from).collect();
        assert_eq!(Sequential.visit(&order, &mut |_| Flow::Continue), 2);
    }
}
