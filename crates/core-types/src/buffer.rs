use std::fmt;
use std::iter;
use std::ops::{Index, IndexMut};

use tracing::trace;

use crate::value::ChannelValue;

static OFF_VALUE: ChannelValue = ChannelValue::OFF;

/// A sequence of channel values.
///
/// The representation is lazy: `shift` and `multiply` only adjust the
/// `(offset, repeat)` header, and indexed reads resolve logically against
/// it. Mutable access materializes the affected prefix first, so callers
/// never observe a gap between the logical and the physical layout.
///
/// Representation invariant: `len() == offset + repeat * values.len()`.
#[derive(Debug, Clone, Default)]
pub struct ChannelBuffer {
    offset: usize,
    repeat: usize,
    values: Vec<ChannelValue>,
}

impl ChannelBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer of `size` zero-valued channels.
    pub fn zeroed(size: usize) -> Self {
        ChannelBuffer {
            offset: size,
            repeat: 1,
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.offset + self.repeat * self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Logical read; indices below the shift offset read as zero.
    pub fn get(&self, index: usize) -> ChannelValue {
        if index < self.offset || self.values.is_empty() {
            ChannelValue::OFF
        } else {
            self.values[(index - self.offset) % self.values.len()]
        }
    }

    pub fn set(&mut self, index: usize, value: ChannelValue) {
        self[index] = value;
    }

    /// Logically prepends `offset` zero-valued channels.
    pub fn shift(&mut self, offset: usize) {
        self.offset += offset;
    }

    /// Logically repeats the current content `factor` times.
    pub fn multiply(&mut self, factor: usize) {
        debug_assert!(factor >= 1);
        if factor <= 1 {
            return;
        }
        if self.values.is_empty() {
            self.offset *= factor;
        } else if self.offset == 0 {
            self.repeat *= factor;
        } else {
            // Leading zeros are part of the repeated content and cannot be
            // expressed in the header, so flatten first.
            self.materialize();
            self.repeat = factor;
        }
    }

    /// Sets every channel to `value`.
    pub fn fill(&mut self, value: ChannelValue) {
        if value.on() && self.offset > 0 {
            self.materialize();
        }
        self.values.fill(value);
    }

    /// Grows with zero-valued channels or truncates.
    pub fn resize(&mut self, size: usize) {
        if size == self.len() {
            return;
        }
        self.materialize();
        self.values.resize(size, ChannelValue::OFF);
        self.offset = 0;
        self.repeat = 1;
    }

    pub fn clear(&mut self) {
        self.offset = 0;
        self.repeat = 0;
        self.values.clear();
    }

    /// Iterates the logical content without materializing.
    pub fn iter(&self) -> impl Iterator<Item = ChannelValue> + '_ {
        iter::repeat(ChannelValue::OFF)
            .take(self.offset)
            .chain(self.values.iter().copied().cycle().take(self.repeat * self.values.len()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChannelValue> {
        self.materialize();
        self.values.iter_mut()
    }

    /// Flattens the header into contiguous storage.
    fn materialize(&mut self) {
        self.expand_to(0);
    }

    /// Expands the repeat header and lowers the shift offset to `index`.
    fn expand_to(&mut self, index: usize) {
        if self.repeat <= 1 && self.offset <= index {
            return;
        }
        let before = (self.offset, self.repeat, self.values.len());
        if self.repeat > 1 {
            let base = self.values.len();
            self.values.reserve(base * (self.repeat - 1));
            for _ in 1..self.repeat {
                self.values.extend_from_within(0..base);
            }
            self.repeat = 1;
        }
        if self.offset > index {
            let fill = self.offset - index;
            self.values
                .splice(0..0, iter::repeat(ChannelValue::OFF).take(fill));
            self.offset = index;
        }
        trace!(
            target: "types.buffer",
            from = ?before,
            to = ?(self.offset, self.repeat, self.values.len()),
            "buffer expanded"
        );
    }
}

impl Index<usize> for ChannelBuffer {
    type Output = ChannelValue;

    fn index(&self, index: usize) -> &ChannelValue {
        if index < self.offset {
            &OFF_VALUE
        } else {
            &self.values[(index - self.offset) % self.values.len()]
        }
    }
}

impl IndexMut<usize> for ChannelBuffer {
    fn index_mut(&mut self, index: usize) -> &mut ChannelValue {
        if index < self.offset || self.repeat > 1 {
            self.expand_to(index);
        }
        let offset = self.offset;
        &mut self.values[index - offset]
    }
}

impl PartialEq for ChannelBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for ChannelBuffer {}

impl From<ChannelValue> for ChannelBuffer {
    fn from(value: ChannelValue) -> Self {
        ChannelBuffer {
            offset: 0,
            repeat: 1,
            values: vec![value],
        }
    }
}

impl FromIterator<ChannelValue> for ChannelBuffer {
    fn from_iter<I: IntoIterator<Item = ChannelValue>>(iter: I) -> Self {
        let values: Vec<ChannelValue> = iter.into_iter().collect();
        let repeat = usize::from(!values.is_empty());
        ChannelBuffer {
            offset: 0,
            repeat,
            values,
        }
    }
}

impl fmt::Display for ChannelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const SHOWN: usize = 3;
        write!(f, "[")?;
        for (i, value) in self.iter().take(SHOWN).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        if self.len() > SHOWN {
            write!(f, ", …")?;
        }
        write!(f, "]")
    }
}
