//! # Dashboard Model
//!
//! A named, fixed-capacity list of elements. Elements are appended at
//! configuration time, addressed by insertion index afterwards, and never
//! removed.
//!
//! The dashboard does not own a drawing target; [`Dashboard::render`]
//! takes one per call.

use heapless::{String, Vec};
use log::{debug, warn};

use crate::graphics::{Color, DisplayBackend};
use crate::render;

/// Maximum number of elements per dashboard
pub const MAX_ELEMENTS: usize = 32;

/// Label capacity in bytes
pub const LABEL_CAPACITY: usize = 64;

/// Dashboard name capacity in bytes
pub const NAME_CAPACITY: usize = 128;

/// Dashboard operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DashboardError {
    #[error("dashboard is full ({capacity} elements)")]
    CapacityExceeded { capacity: usize },
    #[error("element index {index} out of range (count {count})")]
    IndexOutOfRange { index: usize, count: usize },
}

/// Element kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Horizontal bar filled in proportion to the value
    Gauge,
    /// Frame only
    Label,
    /// Frame with a dotted grid
    Graph,
    /// Frame with a color-coded indicator
    Value,
}

impl ElementKind {
    /// Whether the value/range fields mean anything for this kind
    pub const fn carries_value(self) -> bool {
        !matches!(self, ElementKind::Label)
    }
}

/// A single dashboard element
#[derive(Debug, Clone, PartialEq)]
pub struct DashElement {
    pub kind: ElementKind,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub color: Color,
    pub label: String<LABEL_CAPACITY>,
    pub value: f32,
    pub min: f32,
    pub max: f32,
}

impl DashElement {
    /// Create an element with an empty label and a 0..100 range
    pub fn new(kind: ElementKind, x: u32, y: u32, width: u32, height: u32, color: Color) -> Self {
        Self {
            kind,
            x,
            y,
            width,
            height,
            color,
            label: String::new(),
            value: 0.0,
            min: 0.0,
            max: 100.0,
        }
    }

    pub fn gauge(x: u32, y: u32, width: u32, height: u32, color: Color) -> Self {
        Self::new(ElementKind::Gauge, x, y, width, height, color)
    }

    pub fn label(x: u32, y: u32, width: u32, height: u32, color: Color) -> Self {
        Self::new(ElementKind::Label, x, y, width, height, color)
    }

    pub fn graph(x: u32, y: u32, width: u32, height: u32, color: Color) -> Self {
        Self::new(ElementKind::Graph, x, y, width, height, color)
    }

    pub fn value(x: u32, y: u32, width: u32, height: u32, color: Color) -> Self {
        Self::new(ElementKind::Value, x, y, width, height, color)
    }

    /// Set the label, truncated to [`LABEL_CAPACITY`] bytes
    pub fn with_label(mut self, text: &str) -> Self {
        self.label = truncated(text);
        self
    }

    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_value(mut self, value: f32) -> Self {
        self.value = value;
        self
    }

    /// Current position within the range, in `0.0..=1.0`
    pub fn fraction(&self) -> f32 {
        render::fill_fraction(self.value, self.min, self.max)
    }

    /// `max == min`: no fill can be computed
    pub fn range_is_degenerate(&self) -> bool {
        self.max == self.min
    }
}

/// Copy as many whole characters of `text` as fit
fn truncated<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Named collection of up to [`MAX_ELEMENTS`] elements
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    name: String<NAME_CAPACITY>,
    elements: Vec<DashElement, MAX_ELEMENTS>,
}

impl Dashboard {
    pub fn new(name: &str) -> Self {
        let mut dash = Self::default();
        dash.init(name);
        dash
    }

    /// Reset to an empty dashboard called `name`
    pub fn init(&mut self, name: &str) {
        self.name = truncated(name);
        self.elements.clear();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, index: usize) -> Option<&DashElement> {
        self.elements.get(index)
    }

    pub fn elements(&self) -> &[DashElement] {
        &self.elements
    }

    /// Append an element and return its index.
    ///
    /// A full dashboard rejects the element and is left unchanged.
    pub fn add_element(&mut self, element: DashElement) -> Result<usize, DashboardError> {
        if element.kind.carries_value() && element.range_is_degenerate() {
            warn!(
                "{:?} '{}' has an empty range ({}..{}), it will always read as 0",
                element.kind, element.label, element.min, element.max
            );
        }

        let index = self.elements.len();
        self.elements
            .push(element)
            .map_err(|_| DashboardError::CapacityExceeded { capacity: MAX_ELEMENTS })?;
        debug!("added element {} to '{}'", index, self.name);
        Ok(index)
    }

    /// Replace the value of element `index`
    pub fn update_value(&mut self, index: usize, value: f32) -> Result<(), DashboardError> {
        let count = self.elements.len();
        let element = self
            .elements
            .get_mut(index)
            .ok_or(DashboardError::IndexOutOfRange { index, count })?;
        element.value = value;
        Ok(())
    }

    /// Clear `target` to black and draw every element in insertion order
    pub fn render<D: DisplayBackend + ?Sized>(&self, target: &mut D) {
        target.clear(Color::BLACK);
        for element in &self.elements {
            render::draw_element(target, element);
        }
    }
}
