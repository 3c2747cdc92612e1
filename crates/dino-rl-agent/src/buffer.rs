//! Experience buffer of (input, label) training pairs

use std::collections::VecDeque;

use dino_rl_core::{ActionLabel, BufferRetention, FeatureVector};

/// One supervised training pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Example {
    /// Oracle input
    pub input: FeatureVector,
    /// Training target
    pub label: ActionLabel,
}

impl Example {
    /// Pair an input with its label
    #[must_use]
    pub fn new(input: FeatureVector, label: ActionLabel) -> Self {
        Self { input, label }
    }
}

/// Two parallel, append-only sequences that always have equal length.
///
/// Nothing in the learning loop clears the buffer; with
/// [`BufferRetention::Window`] the oldest pairs are evicted once full.
#[derive(Debug, Clone)]
pub struct ExperienceBuffer {
    inputs: VecDeque<FeatureVector>,
    labels: VecDeque<ActionLabel>,
    retention: BufferRetention,
    evicted: usize,
}

impl ExperienceBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new(retention: BufferRetention) -> Self {
        let capacity = match retention {
            BufferRetention::Unbounded => 0,
            BufferRetention::Window(n) => n,
        };
        Self {
            inputs: VecDeque::with_capacity(capacity),
            labels: VecDeque::with_capacity(capacity),
            retention,
            evicted: 0,
        }
    }

    /// Append one pair
    pub fn push(&mut self, example: Example) {
        if let BufferRetention::Window(capacity) = self.retention {
            if self.inputs.len() >= capacity {
                self.inputs.pop_front();
                self.labels.pop_front();
                self.evicted += 1;
            }
        }
        self.inputs.push_back(example.input);
        self.labels.push_back(example.label);
        debug_assert_eq!(self.inputs.len(), self.labels.len());
    }

    /// Append several pairs in order
    pub fn extend(&mut self, examples: impl IntoIterator<Item = Example>) {
        for example in examples {
            self.push(example);
        }
    }

    /// Number of stored pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Check if buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Pairs dropped by the retention window so far
    #[must_use]
    pub fn evicted(&self) -> usize {
        self.evicted
    }

    /// Pair at `index`, oldest first
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Example> {
        Some(Example::new(*self.inputs.get(index)?, *self.labels.get(index)?))
    }

    /// Iterate over stored pairs, oldest first
    pub fn iter(&self) -> impl Iterator<Item = Example> + '_ {
        self.inputs
            .iter()
            .zip(&self.labels)
            .map(|(input, label)| Example::new(*input, *label))
    }

    /// Contiguous views of both sequences for a training call
    pub fn training_set(&mut self) -> (&[FeatureVector], &[ActionLabel]) {
        self.inputs.make_contiguous();
        self.labels.make_contiguous();
        (self.inputs.as_slices().0, self.labels.as_slices().0)
    }
}

impl Default for ExperienceBuffer {
    fn default() -> Self {
        Self::new(BufferRetention::Unbounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn example(i: usize) -> Example {
        let x = i as f64;
        Example::new(FeatureVector([x, 0.0, 0.0, 0.0]), ActionLabel([0.0, 0.0, x]))
    }

    #[test]
    fn keeps_pairs_aligned_in_order() {
        let mut buffer = ExperienceBuffer::default();
        buffer.extend((0..5).map(example));

        assert_eq!(buffer.len(), 5);
        let (inputs, labels) = buffer.training_set();
        assert_eq!(inputs.len(), labels.len());
        for (i, (input, label)) in inputs.iter().zip(labels).enumerate() {
            assert_eq!(input.0[0], i as f64);
            assert_eq!(label.0[2], i as f64);
        }
    }

    #[test]
    fn window_evicts_oldest() {
        let mut buffer = ExperienceBuffer::new(BufferRetention::Window(3));
        buffer.extend((0..5).map(example));

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.evicted(), 2);
        assert_eq!(buffer.get(0), Some(example(2)));
        assert_eq!(buffer.get(2), Some(example(4)));

        let (inputs, labels) = buffer.training_set();
        assert_eq!(inputs.len(), 3);
        assert_eq!(labels.len(), 3);
        assert_eq!(inputs[0].0[0], 2.0);
    }

    proptest! {
        #[test]
        fn unbounded_length_is_running_sum(batches in proptest::collection::vec(0usize..4, 0..20)) {
            let mut buffer = ExperienceBuffer::default();
            let mut expected = 0;
            for batch in batches {
                let before = buffer.len();
                buffer.extend((0..batch).map(example));
                expected += batch;
                prop_assert!(buffer.len() >= before);
                prop_assert_eq!(buffer.len(), expected);
            }
        }
    }
}
